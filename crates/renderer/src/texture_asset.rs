use std::path::{Path, PathBuf};

use asset::{AssetResult, diagnostics::DiagnosticSink, texture::TextureData};

use crate::{
    device::{GraphicsDevice, TextureDesc, TextureFilter, TextureId},
    lifecycle::{Asset, AssetState},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedTexture {
    pub texture: TextureId,
    pub source: PathBuf,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
}

/// An image file uploaded as a mipmapped 2D texture with nearest filtering.
#[derive(Debug)]
pub struct TextureAsset {
    name: String,
    path: PathBuf,
    state: AssetState<LoadedTexture>,
}

impl TextureAsset {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            state: AssetState::Unloaded,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn gpu(&self) -> Option<&LoadedTexture> {
        self.state.loaded()
    }
}

impl Asset for TextureAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    fn load_reporting(
        &mut self,
        device: &mut dyn GraphicsDevice,
        _sink: &mut dyn DiagnosticSink,
    ) -> AssetResult<()> {
        let (name, path) = (&self.name, &self.path);
        let loaded = self.state.load_with(|| {
            let image = TextureData::decode(path)?;
            let levels = image.mip_chain();
            let texture = device.create_texture(&TextureDesc {
                label: name,
                width: image.width,
                height: image.height,
                levels: &levels,
                filter: TextureFilter::Nearest,
            })?;
            Ok(LoadedTexture {
                texture,
                source: path.clone(),
                width: image.width,
                height: image.height,
                mip_levels: levels.len() as u32,
            })
        })?;
        if loaded {
            log::info!("Uploaded texture '{}' on {}", self.name, device.name());
        }
        Ok(())
    }

    fn unload(&mut self, device: &mut dyn GraphicsDevice) {
        if self
            .state
            .unload_with(|loaded| device.delete_texture(loaded.texture))
        {
            log::info!("Unloaded texture '{}'", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use asset::AssetError;
    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::headless::HeadlessDevice;

    fn write_png(dir: &tempfile::TempDir, file: &str, size: u32) -> PathBuf {
        let path = dir.path().join(file);
        RgbaImage::from_pixel(size, size, Rgba([90, 60, 30, 255]))
            .save_with_format(&path, image::ImageFormat::Png)
            .expect("save png");
        path
    }

    #[test]
    fn uploads_full_mip_chain_with_nearest_filtering() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut device = HeadlessDevice::new();
        let mut texture = TextureAsset::new("brown", write_png(&dir, "brown.png", 8));
        texture.load(&mut device).expect("load");

        let loaded = texture.gpu().expect("loaded");
        assert_eq!((loaded.width, loaded.height, loaded.mip_levels), (8, 8, 4));
        let record = device.texture(loaded.texture).expect("record");
        assert_eq!(record.mip_levels, 4);
        assert_eq!(record.filter, TextureFilter::Nearest);
    }

    #[test]
    fn load_and_unload_are_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut device = HeadlessDevice::new();
        let mut texture = TextureAsset::new("brown", write_png(&dir, "brown.png", 4));

        texture.load(&mut device).expect("load");
        let first = texture.gpu().map(|t| t.texture);
        texture.load(&mut device).expect("reload");
        assert_eq!(texture.gpu().map(|t| t.texture), first);
        assert_eq!(device.stats().created.textures, 1);

        texture.unload(&mut device);
        texture.unload(&mut device);
        assert_eq!(device.stats().deleted.textures, 1);
        assert_eq!(device.stats().stale_deletes, 0);
    }

    #[test]
    fn missing_or_corrupt_image_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let corrupt = dir.path().join("leaf.png");
        std::fs::write(&corrupt, b"not an image").expect("write");
        let mut device = HeadlessDevice::new();

        for path in [dir.path().join("missing.png"), corrupt] {
            let mut texture = TextureAsset::new("leaf", path);
            assert!(matches!(texture.load(&mut device), Err(AssetError::Io { .. })));
            assert!(!texture.is_loaded());
        }
        assert_eq!(device.live_handles(), 0);
    }

    #[test]
    fn allocation_failure_is_device_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut device = HeadlessDevice::new();
        device.fail_next_allocation("out of memory");
        let mut texture = TextureAsset::new("brown", write_png(&dir, "brown.png", 2));
        assert!(matches!(texture.load(&mut device), Err(AssetError::Device(_))));
        assert!(!texture.is_loaded());
    }
}
