//! Texture decoding and data structures.
//! Images decode to top-left-origin RGBA8; the format is detected from the
//! file content, not its extension.

use std::path::Path;

use image::{ImageReader, RgbaImage, imageops};

use crate::error::{AssetError, AssetResult};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFormat {
    Rgba8,
}

/// One level of a mip chain. Level 0 is the full-size image.
#[derive(Clone, Debug, PartialEq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl TextureData {
    /// Wrap raw RGBA8 pixels. Returns `None` if `data` has the wrong size.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let texture = Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
        };
        texture.is_valid().then_some(texture)
    }

    /// Decode an image file.
    pub fn decode<P: AsRef<Path>>(path: P) -> AssetResult<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| AssetError::io(path, e))?
            .decode()
            .map_err(|e| AssetError::image(path, e))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = rgba.into_raw();

        log::info!("Loaded texture {}x{} with {} bytes", width, height, data.len());

        Ok(Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
        })
    }

    /// Get the number of bytes per pixel for the format.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self.format {
            TextureFormat::Rgba8 => 4,
        }
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        let expected_size =
            self.width as usize * self.height as usize * self.bytes_per_pixel() as usize;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }

    pub fn mip_level_count(&self) -> u32 {
        mip_level_count(self.width, self.height)
    }

    /// Full mip chain, halving each dimension down to 1x1.
    pub fn mip_chain(&self) -> Vec<MipLevel> {
        let mut levels = Vec::with_capacity(self.mip_level_count() as usize);
        levels.push(MipLevel {
            width: self.width,
            height: self.height,
            data: self.data.clone(),
        });

        let Some(base) = RgbaImage::from_raw(self.width, self.height, self.data.clone()) else {
            return levels;
        };
        let (mut width, mut height) = (self.width, self.height);
        while width > 1 || height > 1 {
            width = (width / 2).max(1);
            height = (height / 2).max(1);
            let level = imageops::resize(&base, width, height, imageops::FilterType::Triangle);
            levels.push(MipLevel {
                width,
                height,
                data: level.into_raw(),
            });
        }
        levels
    }
}

/// Number of levels in a full mip chain for a `width` x `height` image.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    u32::BITS - width.max(height).max(1).leading_zeros()
}
