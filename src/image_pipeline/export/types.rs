//! Export types: output formats, crop rectangles and 8-bit buffers

use std::path::Path;
use std::str::FromStr;

use crate::image_pipeline::common::error::{ReconstructionError, Result};

/// Encoded file format of the reconstruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Bmp,
    Tiff,
}

impl OutputFormat {
    /// Infers the format from the file extension (case-insensitive).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "bmp" => Ok(Self::Bmp),
            "tif" | "tiff" => Ok(Self::Tiff),
            _ => Err(ReconstructionError::UnsupportedFormat(format!(
                "cannot infer output format from {}",
                path.display()
            ))),
        }
    }

    pub(crate) fn image_format(&self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Bmp => image::ImageFormat::Bmp,
            Self::Tiff => image::ImageFormat::Tiff,
        }
    }
}

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    #[default]
    None,
    /// LZW compression
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - balanced
    DeflateBalanced,
    /// Deflate compression - best compression (slower)
    DeflateBest,
}

impl FromStr for TiffCompression {
    type Err = ReconstructionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "lzw" => Ok(Self::Lzw),
            "deflate-fast" => Ok(Self::DeflateFast),
            "deflate" | "deflate-balanced" => Ok(Self::DeflateBalanced),
            "deflate-best" => Ok(Self::DeflateBest),
            other => Err(ReconstructionError::InvalidParameter(format!(
                "unknown TIFF compression '{}'",
                other
            ))),
        }
    }
}

/// Crop rectangle `(y1, y2, x1, x2)` with half-open ranges `y1..y2`, `x1..x2`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub y1: usize,
    pub y2: usize,
    pub x1: usize,
    pub x2: usize,
}

impl CropRect {
    pub fn new(y1: usize, y2: usize, x1: usize, x2: usize) -> Self {
        Self { y1, y2, x1, x2 }
    }

    /// Checks that the rectangle is non-empty and fits a `height` x `width` image.
    pub fn validate(&self, height: usize, width: usize) -> Result<()> {
        let fits = self.y1 < self.y2 && self.y2 <= height && self.x1 < self.x2 && self.x2 <= width;
        if !fits {
            return Err(ReconstructionError::InvalidCrop {
                y1: self.y1,
                y2: self.y2,
                x1: self.x1,
                x2: self.x2,
                height,
                width,
            });
        }
        Ok(())
    }
}

impl FromStr for CropRect {
    type Err = ReconstructionError;

    /// Parses `"y1,y2,x1,x2"`.
    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<usize>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ReconstructionError::InvalidParameter(format!("crop '{}': {}", s, e)))?;

        match values.as_slice() {
            [y1, y2, x1, x2] => Ok(Self::new(*y1, *y2, *x1, *x2)),
            _ => Err(ReconstructionError::InvalidParameter(format!(
                "crop '{}' must be y1,y2,x1,x2",
                s
            ))),
        }
    }
}

/// What to do when the reconstruction is constant and min-max normalization
/// would divide by zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstantImagePolicy {
    /// Export an all-black image
    #[default]
    Zeros,
    /// Fail with `DegenerateReconstruction`
    Reject,
}

/// 8-bit image, samples interleaved as (height, width, channel)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedImage {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<u8>,
}
