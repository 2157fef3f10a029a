//! Graphics-device capability surface consumed by the asset layer.
//!
//! Handles are plain ids; the device owns the real objects. Every `create_*`
//! has a matching `delete_*`, and the asset that created a handle is the only
//! code allowed to delete it.

use std::fmt;

use asset::{AssetError, ShaderStage, layout::VertexLayout, texture::MipLevel};
use thiserror::Error;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub const KIND: &'static str = $kind;
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $kind, self.0)
            }
        }
    };
}

handle!(
    /// Vertex or index buffer.
    BufferId,
    "buffer"
);
handle!(
    /// Attribute layout bound to a vertex/index buffer pair.
    VertexArrayId,
    "vertex array"
);
handle!(TextureId, "texture");
handle!(
    /// One compiled shader stage.
    ShaderId,
    "shader"
);
handle!(ProgramId, "program");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    #[default]
    Nearest,
    Linear,
}

/// Pixel upload for a 2D RGBA8 texture. `levels[0]` is the full image.
#[derive(Clone, Copy, Debug)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub levels: &'a [MipLevel],
    pub filter: TextureFilter,
}

/// Where a named shader resource lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// Compiler output, unmodified.
    #[error("{0}")]
    Compile(String),

    #[error("link failed: {0}")]
    Link(String),

    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },

    #[error("backend error: {0}")]
    Backend(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

impl DeviceError {
    /// Map a stage compile failure to [`AssetError::Compile`], keeping the
    /// diagnostic; anything else becomes [`AssetError::Device`].
    pub fn into_asset_error(self, stage: ShaderStage) -> AssetError {
        match self {
            DeviceError::Compile(diagnostic) => AssetError::Compile { stage, diagnostic },
            other => other.into(),
        }
    }
}

impl From<DeviceError> for AssetError {
    fn from(err: DeviceError) -> Self {
        AssetError::Device(err.to_string())
    }
}

pub trait GraphicsDevice {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    fn create_buffer(&mut self, kind: BufferKind, label: &str, contents: &[u8])
    -> DeviceResult<BufferId>;
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Register `layout` against a vertex buffer and its index buffer.
    fn create_vertex_array(
        &mut self,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        layout: &VertexLayout,
    ) -> DeviceResult<VertexArrayId>;
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> DeviceResult<TextureId>;
    fn delete_texture(&mut self, texture: TextureId);

    /// Compile one stage. A rejected source yields [`DeviceError::Compile`]
    /// with the compiler's diagnostic.
    fn compile_shader(&mut self, stage: ShaderStage, label: &str, source: &str)
    -> DeviceResult<ShaderId>;
    fn delete_shader(&mut self, shader: ShaderId);

    /// Link two stages. `attributes` binds vertex input names to locations.
    fn link_program(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
        attributes: &[(u32, &str)],
    ) -> DeviceResult<ProgramId>;
    fn delete_program(&mut self, program: ProgramId);

    /// `None` if the program declares no resource with that name.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
}
