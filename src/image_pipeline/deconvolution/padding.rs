//! Linear-ramp border padding used to align a measurement with the PSF shape.
//!
//! Each padded border ramps linearly from the edge sample down to zero at the
//! outermost pixel. The height axis is padded first, then the width axis, so the
//! corners ramp from the already padded columns.

use ndarray::{Array3, ArrayView1, ArrayViewMut1, Axis};
use tracing::debug;

use crate::image_pipeline::common::error::{ReconstructionError, Result};
use crate::image_pipeline::raster::types::RasterImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PadWidth {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl PadWidth {
    pub fn symmetric(vertical: usize, horizontal: usize) -> Self {
        Self {
            top: vertical,
            bottom: vertical,
            left: horizontal,
            right: horizontal,
        }
    }

    /// Padding that centers a `from` sized image inside `to`. Odd remainders go
    /// to the bottom and right.
    pub fn centered(from: (usize, usize), to: (usize, usize)) -> Result<Self> {
        let ((height, width), (target_height, target_width)) = (from, to);
        if height > target_height || width > target_width {
            return Err(ReconstructionError::DimensionMismatch {
                psf_height: target_height,
                psf_width: target_width,
                height,
                width,
            });
        }
        let vertical = target_height - height;
        let horizontal = target_width - width;
        Ok(Self {
            top: vertical / 2,
            bottom: vertical - vertical / 2,
            left: horizontal / 2,
            right: horizontal - horizontal / 2,
        })
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

pub fn ramp_pad(image: &RasterImage, pad: PadWidth) -> Result<RasterImage> {
    if pad.is_zero() {
        return Ok(image.clone());
    }

    let (channels, height, width) = image.dim();
    let padded_height = height + pad.top + pad.bottom;
    let padded_width = width + pad.left + pad.right;
    debug!(
        "Ramp padding {}x{} -> {}x{}",
        height, width, padded_height, padded_width
    );

    let mut vertical = Array3::<f64>::zeros((channels, padded_height, width));
    for (src, dst) in image
        .data()
        .lanes(Axis(1))
        .into_iter()
        .zip(vertical.lanes_mut(Axis(1)))
    {
        ramp_lane(src, dst, pad.top, pad.bottom);
    }

    let mut padded = Array3::<f64>::zeros((channels, padded_height, padded_width));
    for (src, dst) in vertical
        .lanes(Axis(2))
        .into_iter()
        .zip(padded.lanes_mut(Axis(2)))
    {
        ramp_lane(src, dst, pad.left, pad.right);
    }

    RasterImage::new(padded)
}

/// Centered ramp padding up to `height` x `width`.
pub fn pad_to_shape(image: &RasterImage, height: usize, width: usize) -> Result<RasterImage> {
    let pad = PadWidth::centered((image.height(), image.width()), (height, width))?;
    ramp_pad(image, pad)
}

fn ramp_lane(src: ArrayView1<f64>, mut dst: ArrayViewMut1<f64>, before: usize, after: usize) {
    let len = src.len();
    let first = src[0];
    let last = src[len - 1];

    for j in 0..before {
        dst[j] = first * j as f64 / before as f64;
    }
    for (i, &v) in src.iter().enumerate() {
        dst[before + i] = v;
    }
    for i in 0..after {
        dst[before + len + i] = last * (after - 1 - i) as f64 / after as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, array};

    fn raster(plane: ndarray::Array2<f64>) -> RasterImage {
        RasterImage::from_plane(plane).unwrap()
    }

    #[test]
    fn horizontal_ramps_fall_to_zero() {
        let image = raster(array![[1.0, 2.0]]);
        let padded = ramp_pad(
            &image,
            PadWidth {
                left: 2,
                right: 2,
                ..Default::default()
            },
        )
        .unwrap();

        let row: Vec<f64> = padded.data().iter().copied().collect();
        assert_eq!(row, vec![0.0, 0.5, 1.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn corners_ramp_from_padded_columns() {
        let image = raster(array![[4.0]]);
        let padded = ramp_pad(&image, PadWidth::symmetric(2, 2)).unwrap();

        assert_eq!(padded.dim(), (1, 5, 5));
        let data = padded.data();
        assert_eq!(data[[0, 2, 2]], 4.0);
        assert_eq!(data[[0, 1, 2]], 2.0);
        assert_eq!(data[[0, 2, 1]], 2.0);
        assert_eq!(data[[0, 1, 1]], 1.0);
        assert_eq!(data[[0, 0, 0]], 0.0);
        assert_eq!(data[[0, 4, 4]], 0.0);
    }

    #[test]
    fn channels_are_padded_independently() {
        let mut planes = Array3::<f64>::zeros((2, 1, 1));
        planes[[0, 0, 0]] = 1.0;
        planes[[1, 0, 0]] = 3.0;
        let image = RasterImage::new(planes).unwrap();

        let padded = ramp_pad(&image, PadWidth::symmetric(0, 1)).unwrap();

        assert_eq!(padded.dim(), (2, 1, 3));
        assert_eq!(padded.data()[[0, 0, 1]], 1.0);
        assert_eq!(padded.data()[[1, 0, 1]], 3.0);
        assert_eq!(padded.data()[[1, 0, 0]], 0.0);
    }

    #[test]
    fn pad_to_shape_centers_image() {
        let image = raster(array![[0.25, 0.5], [0.75, 1.0]]);
        let padded = pad_to_shape(&image, 5, 6).unwrap();

        assert_eq!(padded.dim(), (1, 5, 6));
        let data = padded.data();
        assert_eq!(data[[0, 1, 2]], 0.25);
        assert_eq!(data[[0, 1, 3]], 0.5);
        assert_eq!(data[[0, 2, 2]], 0.75);
        assert_eq!(data[[0, 2, 3]], 1.0);
    }

    #[test]
    fn centered_padding_splits_odd_remainders() {
        let pad = PadWidth::centered((2, 2), (5, 6)).unwrap();
        assert_eq!(
            pad,
            PadWidth {
                top: 1,
                bottom: 2,
                left: 2,
                right: 2
            }
        );
    }

    #[test]
    fn larger_image_cannot_be_padded_down() {
        let image = raster(array![[1.0, 1.0, 1.0]]);
        let err = pad_to_shape(&image, 1, 2).unwrap_err();
        assert!(matches!(err, ReconstructionError::DimensionMismatch { .. }));
    }

    #[test]
    fn zero_padding_is_a_copy() {
        let image = raster(array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(ramp_pad(&image, PadWidth::default()).unwrap(), image);
    }
}
