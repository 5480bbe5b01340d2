//! Raster loading module
//!
//! Decoding of capture files into normalized floating-point rasters and
//! preparation of PSF kernels.

mod reader;
mod standard_image_reader;
pub mod psf;
pub mod types;

pub use psf::prepare_psf;
pub use reader::ImageReader;
pub use standard_image_reader::{StandardImageReader, load_image};
pub use types::{PsfKernel, RasterImage};
