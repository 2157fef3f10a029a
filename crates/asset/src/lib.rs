//! Asset loading/parsers (meshes, textures, shaders).
//! Everything here is CPU-side; device upload lives in the `renderer` crate.

pub mod diagnostics;
pub mod error;
pub mod layout;
pub mod mesh;
pub mod obj;
pub mod shader;
pub mod texture;
pub mod tokenizer;

pub use error::{AssetError, AssetResult, ShaderStage};
