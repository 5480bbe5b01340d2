//! PSF preparation: channel collapse and peak normalization

use ndarray::{Array2, Axis};
use tracing::debug;

use crate::image_pipeline::common::error::{ReconstructionError, Result};
use crate::image_pipeline::raster::reader::ImageReader;
use crate::image_pipeline::raster::types::{PsfKernel, RasterImage};

impl PsfKernel {
    /// Sums all channels of a PSF capture into one intensity plane and
    /// peak-normalizes it.
    pub fn from_raster(capture: &RasterImage) -> Result<Self> {
        let intensity = capture.data().sum_axis(Axis(0));
        Self::from_intensity(intensity)
    }

    /// Peak-normalizes an intensity plane so its maximum is exactly 1.0.
    pub fn from_intensity(mut intensity: Array2<f64>) -> Result<Self> {
        let (height, width) = intensity.dim();
        if height == 0 || width == 0 {
            return Err(ReconstructionError::InvalidDimensions(width, height));
        }

        if intensity.iter().any(|v| !v.is_finite()) {
            return Err(ReconstructionError::DegeneratePsf(f64::NAN));
        }

        let peak = intensity.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if peak <= 0.0 {
            return Err(ReconstructionError::DegeneratePsf(peak));
        }

        debug!("PSF {}x{} peak {:.6}", height, width, peak);
        intensity.mapv_inplace(|v| v / peak);

        Ok(Self { data: intensity })
    }
}

/// Decodes a PSF capture and turns it into a kernel.
pub fn prepare_psf<R: ImageReader + ?Sized>(reader: &R, data: &[u8]) -> Result<PsfKernel> {
    let capture = reader.read_image(data)?;
    PsfKernel::from_raster(&capture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, array};

    #[test]
    fn channels_are_summed_then_peak_normalized() {
        let mut planes = Array3::<f64>::zeros((3, 2, 2));
        planes[[0, 0, 0]] = 0.2;
        planes[[1, 0, 0]] = 0.2;
        planes[[2, 0, 0]] = 0.4;
        planes[[0, 1, 1]] = 0.4;
        let capture = RasterImage::new(planes).unwrap();

        let psf = PsfKernel::from_raster(&capture).unwrap();

        assert_eq!(psf.height(), 2);
        assert_eq!(psf.width(), 2);
        assert_eq!(psf.data()[[0, 0]], 1.0);
        assert!((psf.data()[[1, 1]] - 0.5).abs() < 1e-12);
        assert_eq!(psf.data()[[0, 1]], 0.0);
    }

    #[test]
    fn peak_is_exactly_one() {
        let psf = PsfKernel::from_intensity(array![[0.3, 0.7], [0.1, 0.7 / 3.0]]).unwrap();
        let peak = psf.data().iter().copied().fold(f64::MIN, f64::max);
        assert_eq!(peak, 1.0);
    }

    #[test]
    fn all_black_capture_is_rejected() {
        let capture = RasterImage::new(Array3::zeros((3, 4, 4))).unwrap();
        let err = PsfKernel::from_raster(&capture).unwrap_err();
        assert!(matches!(err, ReconstructionError::DegeneratePsf(p) if p == 0.0));
    }

    #[test]
    fn non_finite_capture_is_rejected() {
        let err = PsfKernel::from_intensity(array![[f64::NAN, 0.0], [0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, ReconstructionError::DegeneratePsf(_)));
    }
}
