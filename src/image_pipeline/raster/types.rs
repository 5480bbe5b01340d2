//! Raster data types shared by the loader, the filter core and the exporter

use ndarray::{Array2, Array3};

use crate::image_pipeline::common::error::{ReconstructionError, Result};

/// Floating-point image with axes (channel, height, width)
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    data: Array3<f64>,
}

impl RasterImage {
    /// Wraps a (channel, height, width) array; every axis must be non-empty.
    pub fn new(data: Array3<f64>) -> Result<Self> {
        let (channels, height, width) = data.dim();
        if channels == 0 || height == 0 || width == 0 {
            return Err(ReconstructionError::InvalidDimensions(width, height));
        }
        Ok(Self { data })
    }

    /// Single-channel raster from a (height, width) plane.
    pub fn from_plane(plane: Array2<f64>) -> Result<Self> {
        Self::new(plane.insert_axis(ndarray::Axis(0)))
    }

    pub fn channels(&self) -> usize {
        self.data.dim().0
    }

    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    pub fn width(&self) -> usize {
        self.data.dim().2
    }

    /// (channel, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn into_data(self) -> Array3<f64> {
        self.data
    }
}

/// Single-channel impulse response, peak-normalized to exactly 1.0
#[derive(Debug, Clone, PartialEq)]
pub struct PsfKernel {
    pub(crate) data: Array2<f64>,
}

impl PsfKernel {
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }
}
