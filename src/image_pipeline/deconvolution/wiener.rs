//! Frequency-domain Wiener deconvolution.
//!
//! The filter is built once from the PSF spectrum as
//! `W = conj(H) / (|H|^2 + delta)` and applied to every channel of the
//! measurement. The spatial result is circularly shifted by half the array size
//! on both axes, so a PSF whose energy sits at the array center reproduces the
//! scene in place.

use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;
use rustfft::num_complex::Complex64;
use tracing::{debug, info, instrument};

use super::fft::FftPlan2d;
use super::target::ExecutionTarget;
use crate::image_pipeline::common::error::{ReconstructionError, Result};
use crate::image_pipeline::raster::types::{PsfKernel, RasterImage};

/// Regularized inverse filter with a fixed `delta` and execution target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WienerFilter {
    delta: f64,
    target: ExecutionTarget,
}

impl WienerFilter {
    pub fn new(delta: f64, target: ExecutionTarget) -> Result<Self> {
        validate_delta(delta)?;
        Ok(Self { delta, target })
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn target(&self) -> ExecutionTarget {
        self.target
    }

    /// Deconvolves every channel of `measurement` with `psf`.
    ///
    /// The output has the measurement's channel count and spatial shape. Shapes
    /// are checked before any transform runs.
    #[instrument(skip_all, fields(delta = self.delta, target = %self.target))]
    pub fn apply(&self, measurement: &RasterImage, psf: &PsfKernel) -> Result<RasterImage> {
        let (channels, height, width) = measurement.dim();
        check_shapes(psf, height, width)?;

        info!(channels, height, width, "Starting Wiener deconvolution");

        let plan = FftPlan2d::new(height, width);
        let filter = filter_spectrum(&plan.forward(psf.data().view()), self.delta);

        let restore = |channel: ArrayView2<f64>| -> Array2<f64> {
            let mut spectrum = plan.forward(channel);
            spectrum.zip_mut_with(&filter, |b, w| *b *= *w);
            recenter(&plan.inverse_real(spectrum))
        };

        let planes: Vec<Array2<f64>> = match self.target {
            ExecutionTarget::Cpu => measurement.data().outer_iter().map(restore).collect(),
            ExecutionTarget::Parallel => {
                let views: Vec<ArrayView2<f64>> = measurement.data().outer_iter().collect();
                views.into_par_iter().map(restore).collect()
            }
        };

        let views: Vec<ArrayView2<f64>> = planes.iter().map(|p| p.view()).collect();
        let data = ndarray::stack(Axis(0), &views)
            .map_err(|_| ReconstructionError::InvalidDimensions(width, height))?;

        debug!("Wiener deconvolution complete");
        RasterImage::new(data)
    }

    /// Magnitude `|W|` of the filter at every frequency bin of `psf`.
    pub fn response(&self, psf: &PsfKernel) -> Array2<f64> {
        let plan = FftPlan2d::new(psf.height(), psf.width());
        filter_spectrum(&plan.forward(psf.data().view()), self.delta).mapv(|w| w.norm())
    }
}

/// Convenience wrapper around [`WienerFilter::apply`].
pub fn wiener_deconvolve(
    measurement: &RasterImage,
    psf: &PsfKernel,
    delta: f64,
    target: ExecutionTarget,
) -> Result<RasterImage> {
    WienerFilter::new(delta, target)?.apply(measurement, psf)
}

fn validate_delta(delta: f64) -> Result<()> {
    if !delta.is_finite() || delta <= 0.0 {
        return Err(ReconstructionError::InvalidParameter(format!(
            "regularization delta must be finite and > 0, got {}",
            delta
        )));
    }
    Ok(())
}

fn check_shapes(psf: &PsfKernel, height: usize, width: usize) -> Result<()> {
    if psf.height() != height || psf.width() != width {
        return Err(ReconstructionError::DimensionMismatch {
            psf_height: psf.height(),
            psf_width: psf.width(),
            height,
            width,
        });
    }
    Ok(())
}

fn filter_spectrum(psf_spectrum: &Array2<Complex64>, delta: f64) -> Array2<Complex64> {
    psf_spectrum.mapv(|h| h.conj() / (h.norm_sqr() + delta))
}

/// `out[y][x] = plane[(y - h/2) mod h][(x - w/2) mod w]`
pub(crate) fn recenter(plane: &Array2<f64>) -> Array2<f64> {
    let (height, width) = plane.dim();
    let (dy, dx) = (height / 2, width / 2);
    Array2::from_shape_fn((height, width), |(y, x)| {
        plane[[(y + height - dy) % height, (x + width - dx) % width]]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn impulse_psf(height: usize, width: usize, at: (usize, usize)) -> PsfKernel {
        let mut plane = Array2::<f64>::zeros((height, width));
        plane[at] = 1.0;
        PsfKernel::from_intensity(plane).unwrap()
    }

    fn pattern(channels: usize, height: usize, width: usize) -> RasterImage {
        RasterImage::new(Array3::from_shape_fn((channels, height, width), |(c, y, x)| {
            let t = (c * 31 + y * 7 + x * 3) as f64;
            0.5 + 0.4 * (0.37 * t).sin() + 0.05 * (x as f64) / (width as f64)
        }))
        .unwrap()
    }

    fn min_max_normalize(values: &Array2<f64>) -> Array2<f64> {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        values.mapv(|v| (v - min) / (max - min))
    }

    /// Circular convolution where the PSF's center pixel is the zero displacement.
    fn convolve_centered(image: &RasterImage, psf: &Array2<f64>) -> RasterImage {
        let (channels, height, width) = image.dim();
        let (cy, cx) = (height / 2, width / 2);
        let data = image.data();
        RasterImage::new(Array3::from_shape_fn((channels, height, width), |(c, y, x)| {
            let mut acc = 0.0;
            for ((ky, kx), &weight) in psf.indexed_iter() {
                if weight == 0.0 {
                    continue;
                }
                let sy = (y + cy + height - ky) % height;
                let sx = (x + cx + width - kx) % width;
                acc += weight * data[[c, sy, sx]];
            }
            acc
        }))
        .unwrap()
    }

    fn high_frequency_energy(image: &RasterImage) -> f64 {
        let (_, height, width) = image.dim();
        let plan = FftPlan2d::new(height, width);
        let mut energy = 0.0;
        for channel in image.data().outer_iter() {
            let spectrum = plan.forward(channel);
            for ((ky, kx), z) in spectrum.indexed_iter() {
                let fy = ky.min(height - ky);
                let fx = kx.min(width - kx);
                if fy >= height / 4 || fx >= width / 4 {
                    energy += z.norm_sqr();
                }
            }
        }
        energy
    }

    #[test]
    fn centered_impulse_reproduces_five_by_five_measurement() {
        let psf = impulse_psf(5, 5, (2, 2));
        let measurement = pattern(1, 5, 5);

        let result = wiener_deconvolve(&measurement, &psf, 1e-6, ExecutionTarget::Cpu).unwrap();

        let expected = min_max_normalize(&measurement.data().index_axis(Axis(0), 0).to_owned());
        let actual = min_max_normalize(&result.data().index_axis(Axis(0), 0).to_owned());
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-3, "got {a}, expected {e}");
        }
    }

    #[test]
    fn centered_impulse_is_identity_for_multichannel_even_shapes() {
        let psf = impulse_psf(4, 6, (2, 3));
        let measurement = pattern(3, 4, 6);

        let result = wiener_deconvolve(&measurement, &psf, 1e-9, ExecutionTarget::Cpu).unwrap();

        assert_eq!(result.dim(), measurement.dim());
        for (a, e) in result.data().iter().zip(measurement.data().iter()) {
            assert!((a - e).abs() < 1e-6, "got {a}, expected {e}");
        }
    }

    #[test]
    fn convolution_round_trip_recovers_scene() {
        let (height, width) = (8, 10);
        let mut kernel = Array2::<f64>::zeros((height, width));
        let (cy, cx) = (height / 2, width / 2);
        kernel[[cy, cx]] = 1.0;
        for (y, x) in [(cy - 1, cx), (cy + 1, cx), (cy, cx - 1), (cy, cx + 1)] {
            kernel[[y, x]] = 1.0 / 6.0;
        }
        let psf = PsfKernel::from_intensity(kernel.clone()).unwrap();
        let scene = pattern(2, height, width);
        let measurement = convolve_centered(&scene, &kernel);

        let result = wiener_deconvolve(&measurement, &psf, 1e-10, ExecutionTarget::Cpu).unwrap();

        for (a, e) in result.data().iter().zip(scene.data().iter()) {
            assert!((a - e).abs() < 1e-6, "got {a}, expected {e}");
        }
    }

    #[test]
    fn filter_magnitude_never_grows_with_delta() {
        let mut kernel = Array2::<f64>::zeros((6, 6));
        kernel[[3, 3]] = 1.0;
        kernel[[3, 4]] = 0.6;
        kernel[[2, 2]] = 0.3;
        kernel[[5, 0]] = 0.1;
        let psf = PsfKernel::from_intensity(kernel).unwrap();

        let deltas = [1e-3, 1e-1, 1.0, 10.0, 1e3];
        let responses: Vec<Array2<f64>> = deltas
            .iter()
            .map(|&d| WienerFilter::new(d, ExecutionTarget::Cpu).unwrap().response(&psf))
            .collect();

        for pair in responses.windows(2) {
            for (weaker, stronger) in pair[0].iter().zip(pair[1].iter()) {
                assert!(*stronger <= *weaker + 1e-15);
            }
        }
    }

    #[test]
    fn high_frequency_energy_never_grows_with_delta() {
        let mut kernel = Array2::<f64>::zeros((8, 8));
        kernel[[4, 4]] = 1.0;
        kernel[[4, 5]] = 0.5;
        kernel[[5, 4]] = 0.25;
        let psf = PsfKernel::from_intensity(kernel).unwrap();
        let measurement = pattern(1, 8, 8);

        let energies: Vec<f64> = [1e-4, 1e-2, 1.0, 1e2, 1e4]
            .iter()
            .map(|&d| {
                let result = wiener_deconvolve(&measurement, &psf, d, ExecutionTarget::Cpu).unwrap();
                high_frequency_energy(&result)
            })
            .collect();

        for pair in energies.windows(2) {
            assert!(pair[1] <= pair[0] * (1.0 + 1e-9), "{:?}", energies);
        }
    }

    #[test]
    fn parallel_target_matches_cpu() {
        let psf = impulse_psf(6, 5, (1, 4));
        let measurement = pattern(4, 6, 5);

        let cpu = wiener_deconvolve(&measurement, &psf, 0.5, ExecutionTarget::Cpu).unwrap();
        let parallel =
            wiener_deconvolve(&measurement, &psf, 0.5, ExecutionTarget::Parallel).unwrap();

        assert_eq!(cpu, parallel);
    }

    #[test]
    fn non_positive_delta_is_rejected() {
        for delta in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = WienerFilter::new(delta, ExecutionTarget::Cpu).unwrap_err();
            assert!(matches!(err, ReconstructionError::InvalidParameter(_)));
        }
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let psf = impulse_psf(4, 4, (2, 2));
        let measurement = pattern(3, 4, 5);

        let err = wiener_deconvolve(&measurement, &psf, 1.0, ExecutionTarget::Cpu).unwrap_err();

        assert!(matches!(
            err,
            ReconstructionError::DimensionMismatch {
                psf_height: 4,
                psf_width: 4,
                height: 4,
                width: 5
            }
        ));
    }

    #[test]
    fn recenter_moves_origin_to_middle() {
        let mut plane = Array2::<f64>::zeros((5, 4));
        plane[[0, 0]] = 1.0;
        let shifted = recenter(&plane);
        assert_eq!(shifted[[2, 2]], 1.0);
        assert_eq!(shifted.sum(), 1.0);
    }
}
