//! Shader source text for a vertex/fragment pair.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{AssetError, AssetResult, ShaderStage};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSource {
    pub vertex_path: PathBuf,
    pub fragment_path: PathBuf,
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSource {
    /// Read both stages. Fails with [`AssetError::Io`] naming the first
    /// unreadable file.
    pub fn read(
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> AssetResult<Self> {
        let vertex_path = vertex_path.as_ref();
        let fragment_path = fragment_path.as_ref();
        let vertex =
            fs::read_to_string(vertex_path).map_err(|e| AssetError::io(vertex_path, e))?;
        let fragment =
            fs::read_to_string(fragment_path).map_err(|e| AssetError::io(fragment_path, e))?;
        Ok(Self {
            vertex_path: vertex_path.to_path_buf(),
            fragment_path: fragment_path.to_path_buf(),
            vertex,
            fragment,
        })
    }

    pub fn stage(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }
}
