//! Min-max normalization, cropping and 8-bit quantization of reconstructions

use ndarray::{Array3, s};
use tracing::{debug, warn};

use crate::image_pipeline::common::error::{ReconstructionError, Result};
use crate::image_pipeline::export::types::{ConstantImagePolicy, CropRect, QuantizedImage};
use crate::image_pipeline::raster::types::RasterImage;

/// Global min-max normalization to `[0, 1]`.
///
/// Non-finite samples are rejected. A constant image is handled according to
/// `policy` instead of dividing by zero.
pub fn normalize(image: &RasterImage, policy: ConstantImagePolicy) -> Result<Array3<f64>> {
    let data = image.data();
    if data.iter().any(|v| !v.is_finite()) {
        return Err(ReconstructionError::DegenerateReconstruction(
            "reconstruction contains non-finite samples".to_string(),
        ));
    }

    let min = data.iter().copied().fold(f64::INFINITY, f64::min);
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    debug!("Normalizing reconstruction, min {:.6e}, max {:.6e}", min, max);

    if !range.is_finite() {
        return Err(ReconstructionError::DegenerateReconstruction(format!(
            "sample range {} .. {} overflows",
            min, max
        )));
    }

    if range == 0.0 {
        return match policy {
            ConstantImagePolicy::Zeros => {
                warn!("Reconstruction is constant ({}), exporting a black image", min);
                Ok(Array3::zeros(data.dim()))
            }
            ConstantImagePolicy::Reject => Err(ReconstructionError::DegenerateReconstruction(
                format!("reconstruction is constant ({})", min),
            )),
        };
    }

    Ok(data.mapv(|v| (v - min) / range))
}

/// Slices a (channel, height, width) array to `rect`.
pub fn crop(data: &Array3<f64>, rect: &CropRect) -> Result<Array3<f64>> {
    let (_, height, width) = data.dim();
    rect.validate(height, width)?;
    Ok(data.slice(s![.., rect.y1..rect.y2, rect.x1..rect.x2]).to_owned())
}

/// Scales by 255, clamps to `[0, 255]` and truncates to `u8`, interleaving
/// channels.
pub fn quantize(data: &Array3<f64>) -> QuantizedImage {
    let (channels, height, width) = data.dim();
    let samples = data
        .view()
        .permuted_axes([1, 2, 0])
        .iter()
        .map(|&v| (v * 255.0).clamp(0.0, 255.0) as u8)
        .collect();

    QuantizedImage {
        width,
        height,
        channels,
        data: samples,
    }
}

/// Normalize, optionally crop, then quantize.
pub fn prepare_output(
    image: &RasterImage,
    crop_rect: Option<&CropRect>,
    policy: ConstantImagePolicy,
) -> Result<QuantizedImage> {
    let normalized = normalize(image, policy)?;
    let region = match crop_rect {
        Some(rect) => crop(&normalized, rect)?,
        None => normalized,
    };
    Ok(quantize(&region))
}
