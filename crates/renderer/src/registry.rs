//! Named asset set with all-or-nothing loading.

use asset::{
    AssetResult,
    diagnostics::{DiagnosticSink, LogSink},
};

use crate::{
    device::GraphicsDevice,
    lifecycle::Asset,
    mesh_asset::MeshAsset,
    shader_asset::ShaderAsset,
    texture_asset::TextureAsset,
};

#[derive(Debug)]
pub enum SceneAsset {
    Mesh(MeshAsset),
    Texture(TextureAsset),
    Shader(ShaderAsset),
}

impl SceneAsset {
    pub fn kind(&self) -> &'static str {
        match self {
            SceneAsset::Mesh(_) => "mesh",
            SceneAsset::Texture(_) => "texture",
            SceneAsset::Shader(_) => "shader",
        }
    }

    fn inner(&self) -> &dyn Asset {
        match self {
            SceneAsset::Mesh(mesh) => mesh,
            SceneAsset::Texture(texture) => texture,
            SceneAsset::Shader(shader) => shader,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Asset {
        match self {
            SceneAsset::Mesh(mesh) => mesh,
            SceneAsset::Texture(texture) => texture,
            SceneAsset::Shader(shader) => shader,
        }
    }
}

impl Asset for SceneAsset {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn is_loaded(&self) -> bool {
        self.inner().is_loaded()
    }

    fn load_reporting(
        &mut self,
        device: &mut dyn GraphicsDevice,
        sink: &mut dyn DiagnosticSink,
    ) -> AssetResult<()> {
        self.inner_mut().load_reporting(device, sink)
    }

    fn unload(&mut self, device: &mut dyn GraphicsDevice) {
        self.inner_mut().unload(device)
    }
}

impl From<MeshAsset> for SceneAsset {
    fn from(mesh: MeshAsset) -> Self {
        SceneAsset::Mesh(mesh)
    }
}

impl From<TextureAsset> for SceneAsset {
    fn from(texture: TextureAsset) -> Self {
        SceneAsset::Texture(texture)
    }
}

impl From<ShaderAsset> for SceneAsset {
    fn from(shader: ShaderAsset) -> Self {
        SceneAsset::Shader(shader)
    }
}

/// Assets in registration order, addressed by name.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: Vec<SceneAsset>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset. Returns `false` and drops it if the name is taken.
    pub fn register(&mut self, asset: impl Into<SceneAsset>) -> bool {
        let asset = asset.into();
        if self.get(asset.name()).is_some() {
            log::warn!("{} '{}' is already registered", asset.kind(), asset.name());
            return false;
        }
        self.assets.push(asset);
        true
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneAsset> {
        self.assets.iter()
    }

    pub fn get(&self, name: &str) -> Option<&SceneAsset> {
        self.assets.iter().find(|asset| asset.name() == name)
    }

    pub fn mesh(&self, name: &str) -> Option<&MeshAsset> {
        match self.get(name)? {
            SceneAsset::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn texture(&self, name: &str) -> Option<&TextureAsset> {
        match self.get(name)? {
            SceneAsset::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn shader(&self, name: &str) -> Option<&ShaderAsset> {
        match self.get(name)? {
            SceneAsset::Shader(shader) => Some(shader),
            _ => None,
        }
    }

    pub fn loaded_count(&self) -> usize {
        self.assets.iter().filter(|asset| asset.is_loaded()).count()
    }

    /// Load every asset in registration order. On the first failure, every
    /// asset is unloaded again and the error is returned.
    pub fn load_all(&mut self, device: &mut dyn GraphicsDevice) -> AssetResult<()> {
        self.load_all_reporting(device, &mut LogSink)
    }

    /// [`load_all`](Self::load_all) with recoverable conditions sent to `sink`.
    pub fn load_all_reporting(
        &mut self,
        device: &mut dyn GraphicsDevice,
        sink: &mut dyn DiagnosticSink,
    ) -> AssetResult<()> {
        for index in 0..self.assets.len() {
            let asset = &mut self.assets[index];
            if let Err(err) = asset.load_reporting(device, sink) {
                log::error!("Failed to load {} '{}': {}", asset.kind(), asset.name(), err);
                self.unload_all(device);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Unload in reverse registration order. Unloaded assets are skipped.
    pub fn unload_all(&mut self, device: &mut dyn GraphicsDevice) {
        for asset in self.assets.iter_mut().rev() {
            asset.unload(device);
        }
    }
}
