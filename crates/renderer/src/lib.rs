//! Device-side asset handling: the graphics-device capability surface, its
//! headless and wgpu implementations, and the mesh, texture and shader
//! assets with their load/unload lifecycle.

pub mod device;
pub mod gpu_mesh;
pub mod headless;
pub mod lifecycle;
pub mod mesh_asset;
pub mod reflect;
pub mod registry;
pub mod shader_asset;
pub mod texture_asset;
pub mod wgpu_device;

pub use device::{DeviceError, DeviceResult, GraphicsDevice};
pub use headless::HeadlessDevice;
pub use lifecycle::Asset;
pub use registry::{AssetRegistry, SceneAsset};
pub use wgpu_device::WgpuDevice;
