//! Export module
//!
//! Normalization, cropping and quantization of reconstructions, and encoding
//! them to PNG, JPEG, BMP or TIFF files.

mod file_output;
pub mod normalize;
mod standard_image_writer;
pub mod types;
mod writer;

pub use file_output::write_atomically;
pub use normalize::{crop, normalize, prepare_output, quantize};
pub use standard_image_writer::StandardImageWriter;
pub use types::{ConstantImagePolicy, CropRect, OutputFormat, QuantizedImage, TiffCompression};
pub use writer::ImageWriter;
