mod cache;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::Color;

pub use cache::{AssetCache, LoadProgress};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read asset file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("asset `{key}` is not cached")]
    NotFound { key: String },
    #[error("asset `{key}` is {actual:?}, not {expected:?}")]
    WrongKind {
        key: String,
        expected: AssetKind,
        actual: AssetKind,
    },
    #[error("pixel buffer for {width}x{height} image has {len} bytes")]
    PixelBufferSize { width: u32, height: u32, len: usize },
    #[error(
        "frame {frame} of spritesheet `{key}` lies outside the {sheet_width}x{sheet_height} sheet"
    )]
    FrameOutOfBounds {
        key: String,
        frame: u32,
        sheet_width: u32,
        sheet_height: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Audio,
}

/// Decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl ImageAsset {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, AssetError> {
        if rgba.len() != width as usize * height as usize * 4 {
            return Err(AssetError::PixelBufferSize {
                width,
                height,
                len: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn solid(width: u32, height: u32, color: Color) -> Self {
        let rgba = color
            .to_array()
            .repeat(width as usize * height as usize);
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let reader = ImageReader::open(path).map_err(|source| AssetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = reader.decode().map_err(|source| AssetError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let image = decoded.to_rgba8();
        Ok(Self {
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let texel = self.rgba.get(offset..offset + 4)?;
        Some(Color::rgba(texel[0], texel[1], texel[2], texel[3]))
    }

    /// Copies a sub-rectangle. `None` when it does not fit inside the image.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Option<ImageAsset> {
        if x.checked_add(width)? > self.width || y.checked_add(height)? > self.height {
            return None;
        }
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for row in y..y + height {
            let start = (row as usize * self.width as usize + x as usize) * 4;
            rgba.extend_from_slice(&self.rgba[start..start + width as usize * 4]);
        }
        Some(ImageAsset {
            width,
            height,
            rgba,
        })
    }
}

/// Raw encoded audio bytes. Decoding and playback belong to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    bytes: Vec<u8>,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let bytes = std::fs::read(path).map_err(|source| AssetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[derive(Debug, Clone)]
pub enum Asset {
    Image(Arc<ImageAsset>),
    Audio(Arc<AudioClip>),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Image(_) => AssetKind::Image,
            Asset::Audio(_) => AssetKind::Audio,
        }
    }
}

/// Typed view over a cached [`Asset`].
pub trait CachedAsset: Sized {
    const KIND: AssetKind;

    fn from_asset(asset: &Asset) -> Option<Self>;
}

impl CachedAsset for Arc<ImageAsset> {
    const KIND: AssetKind = AssetKind::Image;

    fn from_asset(asset: &Asset) -> Option<Self> {
        match asset {
            Asset::Image(image) => Some(Arc::clone(image)),
            Asset::Audio(_) => None,
        }
    }
}

impl CachedAsset for Arc<AudioClip> {
    const KIND: AssetKind = AssetKind::Audio;

    fn from_asset(asset: &Asset) -> Option<Self> {
        match asset {
            Asset::Audio(audio) => Some(Arc::clone(audio)),
            Asset::Image(_) => None,
        }
    }
}

/// Spritesheet description. The whole sheet is cached under `key` and each
/// named frame under `"{key}-{name}"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpritesheetConfig {
    pub key: String,
    pub path: PathBuf,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Frame name to frame index, counted left to right then top to bottom.
    #[serde(default)]
    pub frames: BTreeMap<String, u32>,
}

impl SpritesheetConfig {
    pub fn frame_key(&self, name: &str) -> String {
        format!("{}-{}", self.key, name)
    }

    /// Top-left pixel of frame `index` in a sheet `sheet_width` pixels wide.
    pub fn frame_origin(&self, index: u32, sheet_width: u32) -> (u32, u32) {
        let columns = (sheet_width / self.frame_width.max(1)).max(1);
        (
            (index % columns) * self.frame_width,
            (index / columns) * self.frame_height,
        )
    }
}
