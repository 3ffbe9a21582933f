//! Decoded image value handed to the SDK's augment step.

use crate::error::{JanusError, Result};
use std::path::Path;

/// Packed 8-bit pixel data: `channels` is 1 (grayscale) or 3 (BGR).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub channels: u8,
    pub columns: u32,
    pub rows: u32,
    pub frames: u32,
    /// `frames * rows * columns * channels` bytes, no row padding.
    pub data: Vec<u8>,
}

impl Media {
    /// Decode an image file into grayscale or BGR24.
    ///
    /// Sources that carry color are converted to BGR24; everything else
    /// becomes single-channel 8-bit gray.
    pub fn read(path: &Path) -> Result<Self> {
        let image = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(io) => {
                JanusError::Open(format!("{}: {io}", path.display()))
            }
            other => JanusError::InvalidImage(format!("{}: {other}", path.display())),
        })?;

        let columns = image.width();
        let rows = image.height();

        let (channels, data) = if image.color().has_color() {
            let mut rgb = image.to_rgb8().into_raw();
            for pixel in rgb.chunks_exact_mut(3) {
                pixel.swap(0, 2);
            }
            (3, rgb)
        } else {
            (1, image.to_luma8().into_raw())
        };

        tracing::trace!(path = %path.display(), columns, rows, channels, "decoded image");

        Ok(Self {
            channels,
            columns,
            rows,
            frames: 1,
            data,
        })
    }
}
