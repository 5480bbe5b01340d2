use std::io::{Cursor, Write};

use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use tracing::debug;

use crate::image_pipeline::common::error::{ReconstructionError, Result};
use crate::image_pipeline::config::ReconstructionConfig;
use crate::image_pipeline::export::types::{OutputFormat, QuantizedImage, TiffCompression};
use crate::image_pipeline::export::writer::ImageWriter;

/// Encodes TIFF with the `tiff` crate and every other format with `image`.
pub struct StandardImageWriter;

impl ImageWriter for StandardImageWriter {
    fn write_image(
        &self,
        image: &QuantizedImage,
        format: OutputFormat,
        output: &mut dyn Write,
        config: &ReconstructionConfig,
    ) -> Result<()> {
        debug!(
            "Encoding {:?} image: {}x{}, {} channel(s)",
            format, image.width, image.height, image.channels
        );

        let mut buffer = Vec::new();
        match format {
            OutputFormat::Tiff => encode_tiff(image, &mut buffer, config)?,
            _ => encode_with_image(image, format, &mut buffer)?,
        }

        output.write_all(&buffer)?;

        debug!("Encoding complete, {} bytes", buffer.len());
        Ok(())
    }
}

fn encode_tiff(
    image: &QuantizedImage,
    buffer: &mut Vec<u8>,
    config: &ReconstructionConfig,
) -> Result<()> {
    use tiff::encoder::{Compression, TiffEncoder, colortype, compression::DeflateLevel};

    let compression = match config.compression {
        TiffCompression::None => Compression::Uncompressed,
        TiffCompression::Lzw => Compression::Lzw,
        TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
        TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
        TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
    };

    let mut encoder = TiffEncoder::new(Cursor::new(buffer))
        .map_err(|e| ReconstructionError::EncodeError(e.to_string()))?
        .with_compression(compression);

    if let Some(predictor_val) = config.predictor {
        let predictor = match predictor_val {
            2 => tiff::tags::Predictor::Horizontal,
            _ => tiff::tags::Predictor::None,
        };
        encoder = encoder.with_predictor(predictor);
    }

    let (width, height) = (image.width as u32, image.height as u32);
    let written = match image.channels {
        1 => encoder.write_image::<colortype::Gray8>(width, height, &image.data),
        2 => encoder.write_image::<colortype::RGBA8>(width, height, &gray_alpha_to_rgba(&image.data)),
        3 => encoder.write_image::<colortype::RGB8>(width, height, &image.data),
        4 => encoder.write_image::<colortype::RGBA8>(width, height, &image.data),
        n => {
            return Err(ReconstructionError::UnsupportedFormat(format!(
                "TIFF output with {} channels",
                n
            )));
        }
    };
    written.map_err(|e| ReconstructionError::EncodeError(e.to_string()))
}

/// Expands interleaved gray+alpha samples to RGBA, which TIFF stores natively.
fn gray_alpha_to_rgba(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(2)
        .flat_map(|pixel| [pixel[0], pixel[0], pixel[0], pixel[1]])
        .collect()
}

fn encode_with_image(
    image: &QuantizedImage,
    format: OutputFormat,
    buffer: &mut Vec<u8>,
) -> Result<()> {
    if matches!(format, OutputFormat::Jpeg | OutputFormat::Bmp) && matches!(image.channels, 2 | 4) {
        return Err(ReconstructionError::UnsupportedFormat(format!(
            "{:?} output cannot carry an alpha channel",
            format
        )));
    }

    let (width, height) = (image.width as u32, image.height as u32);
    let data = image.data.clone();
    let size_error = || ReconstructionError::EncodeError("buffer does not match image size".to_string());

    let dynamic = match image.channels {
        1 => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, data).ok_or_else(size_error)?),
        2 => DynamicImage::ImageLumaA8(
            GrayAlphaImage::from_raw(width, height, data).ok_or_else(size_error)?,
        ),
        3 => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, data).ok_or_else(size_error)?),
        4 => DynamicImage::ImageRgba8(RgbaImage::from_raw(width, height, data).ok_or_else(size_error)?),
        n => {
            return Err(ReconstructionError::UnsupportedFormat(format!(
                "{:?} output with {} channels",
                format, n
            )));
        }
    };

    dynamic
        .write_to(&mut Cursor::new(buffer), format.image_format())
        .map_err(|e| ReconstructionError::EncodeError(e.to_string()))
}
