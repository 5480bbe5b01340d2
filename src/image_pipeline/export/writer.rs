use std::io::Write;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::config::ReconstructionConfig;
use crate::image_pipeline::export::types::{OutputFormat, QuantizedImage};

pub trait ImageWriter {
    fn write_image(
        &self,
        image: &QuantizedImage,
        format: OutputFormat,
        output: &mut dyn Write,
        config: &ReconstructionConfig,
    ) -> Result<()>;
}
