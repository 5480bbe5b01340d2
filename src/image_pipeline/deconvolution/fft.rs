use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

/// Pre-planned forward and inverse 2-D transforms for one (height, width).
///
/// Rows are transformed in place over the contiguous buffer, columns after a
/// transpose, so both passes run on standard-layout memory.
pub(crate) struct FftPlan2d {
    height: usize,
    width: usize,
    forward_rows: Arc<dyn Fft<f64>>,
    forward_cols: Arc<dyn Fft<f64>>,
    inverse_rows: Arc<dyn Fft<f64>>,
    inverse_cols: Arc<dyn Fft<f64>>,
}

impl FftPlan2d {
    pub(crate) fn new(height: usize, width: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            height,
            width,
            forward_rows: planner.plan_fft_forward(width),
            forward_cols: planner.plan_fft_forward(height),
            inverse_rows: planner.plan_fft_inverse(width),
            inverse_cols: planner.plan_fft_inverse(height),
        }
    }

    pub(crate) fn forward(&self, plane: ArrayView2<f64>) -> Array2<Complex64> {
        debug_assert_eq!(plane.dim(), (self.height, self.width));
        let spectrum = plane.mapv(|v| Complex64::new(v, 0.0));
        self.transform(spectrum, &self.forward_rows, &self.forward_cols)
    }

    /// Inverse transform scaled by `1 / (height * width)`, keeping the real part.
    pub(crate) fn inverse_real(&self, spectrum: Array2<Complex64>) -> Array2<f64> {
        debug_assert_eq!(spectrum.dim(), (self.height, self.width));
        let scale = 1.0 / (self.height * self.width) as f64;
        self.transform(spectrum, &self.inverse_rows, &self.inverse_cols)
            .mapv(|z| z.re * scale)
    }

    fn transform(
        &self,
        data: Array2<Complex64>,
        rows: &Arc<dyn Fft<f64>>,
        cols: &Arc<dyn Fft<f64>>,
    ) -> Array2<Complex64> {
        let mut data = data.as_standard_layout().into_owned();
        process_lanes(&mut data, rows);

        let mut transposed = data.t().as_standard_layout().into_owned();
        process_lanes(&mut transposed, cols);

        transposed.t().as_standard_layout().into_owned()
    }
}

fn process_lanes(data: &mut Array2<Complex64>, fft: &Arc<dyn Fft<f64>>) {
    // Standard layout guarantees a contiguous slice made of whole lanes.
    if let Some(buffer) = data.as_slice_mut() {
        fft.process(buffer);
    }
}
