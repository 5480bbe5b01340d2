//! Deconvolution module: the Wiener filter core and shape alignment

mod fft;
pub mod padding;
pub mod target;
pub mod wiener;

pub use padding::{PadWidth, pad_to_shape, ramp_pad};
pub use target::ExecutionTarget;
pub use wiener::{WienerFilter, wiener_deconvolve};
