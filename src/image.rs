//! Image records held by the store

use crate::coords::Coords;
use crate::error::{Result, StoreError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Size and pixel layout of an image.
///
/// The store never looks at pixel content; this descriptor is what it
/// compares to keep a dataset dimensionally consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageFormat {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bytes per pixel, summed over all components
    pub bytes_per_pixel: u32,
    /// Components per pixel (1 for grayscale, 3 or 4 for RGB/RGBA)
    pub num_components: u32,
}

impl ImageFormat {
    pub fn new(width: u32, height: u32, bytes_per_pixel: u32, num_components: u32) -> Self {
        Self {
            width,
            height,
            bytes_per_pixel,
            num_components,
        }
    }

    /// Single-component image
    pub fn gray(width: u32, height: u32, bytes_per_pixel: u32) -> Self {
        Self::new(width, height, bytes_per_pixel, 1)
    }

    /// Expected payload length in bytes
    pub fn size_in_bytes(&self) -> usize {
        self.width as usize * self.height as usize * self.bytes_per_pixel as usize
    }

    /// Fail with [`StoreError::SizeMismatch`] unless `other` matches this format
    pub fn check_compatible(&self, other: &ImageFormat) -> Result<()> {
        if self == other {
            Ok(())
        } else {
            Err(StoreError::SizeMismatch {
                expected: *self,
                actual: *other,
            })
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} ({} B/px, {} component{})",
            self.width,
            self.height,
            self.bytes_per_pixel,
            self.num_components,
            if self.num_components == 1 { "" } else { "s" }
        )
    }
}

/// An opaque pixel payload addressed by its coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    coords: Coords,
    format: ImageFormat,
    pixels: Bytes,
    metadata: HashMap<String, String>,
}

impl Image {
    /// Create a new image
    pub fn new(coords: Coords, format: ImageFormat, pixels: impl Into<Bytes>) -> Self {
        Self {
            coords,
            format,
            pixels: pixels.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a per-image metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Same pixels at a different coordinate. The payload is shared, not copied.
    pub fn copy_at_coords(&self, coords: Coords) -> Self {
        Self {
            coords,
            format: self.format,
            pixels: self.pixels.clone(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn coords(&self) -> &Coords {
        &self.coords
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.format.width
    }

    pub fn height(&self) -> u32 {
        self.format.height
    }

    /// Raw pixel bytes
    pub fn pixels(&self) -> &Bytes {
        &self.pixels
    }

    /// Get a per-image metadata entry
    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|s| s.as_str())
    }
}
