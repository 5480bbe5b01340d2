//! Image reader backed by the `image` crate.
//!
//! Decodes PNG, JPEG, BMP, TIFF and the other formats `image` understands into a
//! [`RasterImage`] whose samples are scaled by the maximum value of the source
//! sample type, so 8-bit sources land in `[0, 1]` after division by 255 and 16-bit
//! sources after division by 65535. Floating-point sources are kept as decoded.

use std::path::Path;

use image::{ColorType, DynamicImage};
use ndarray::Array3;
use tracing::debug;

use crate::image_pipeline::common::error::{ReconstructionError, Result};
use crate::image_pipeline::raster::reader::ImageReader;
use crate::image_pipeline::raster::types::RasterImage;

pub struct StandardImageReader;

impl ImageReader for StandardImageReader {
    fn read_image(&self, data: &[u8]) -> Result<RasterImage> {
        debug!("Decoding image, {} bytes", data.len());

        let decoded = image::load_from_memory(data)
            .map_err(|e| ReconstructionError::DecodeError(e.to_string()))?;

        to_raster(decoded)
    }
}

/// Reads and decodes an image file.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RasterImage> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        ReconstructionError::InputReadError(format!("{}: {}", path.display(), e))
    })?;
    StandardImageReader.read_image(&bytes)
}

fn scale_u8(values: Vec<u8>) -> Vec<f64> {
    values.into_iter().map(|v| v as f64 / u8::MAX as f64).collect()
}

fn scale_u16(values: Vec<u16>) -> Vec<f64> {
    values.into_iter().map(|v| v as f64 / u16::MAX as f64).collect()
}

fn widen_f32(values: Vec<f32>) -> Vec<f64> {
    values.into_iter().map(f64::from).collect()
}

pub(crate) fn to_raster(decoded: DynamicImage) -> Result<RasterImage> {
    let width = decoded.width() as usize;
    let height = decoded.height() as usize;
    let color = decoded.color();

    let (channels, samples) = match color {
        ColorType::L8 => (1, scale_u8(decoded.into_luma8().into_raw())),
        ColorType::La8 => (2, scale_u8(decoded.into_luma_alpha8().into_raw())),
        ColorType::Rgb8 => (3, scale_u8(decoded.into_rgb8().into_raw())),
        ColorType::Rgba8 => (4, scale_u8(decoded.into_rgba8().into_raw())),
        ColorType::L16 => (1, scale_u16(decoded.into_luma16().into_raw())),
        ColorType::La16 => (2, scale_u16(decoded.into_luma_alpha16().into_raw())),
        ColorType::Rgb16 => (3, scale_u16(decoded.into_rgb16().into_raw())),
        ColorType::Rgba16 => (4, scale_u16(decoded.into_rgba16().into_raw())),
        ColorType::Rgb32F => (3, widen_f32(decoded.into_rgb32f().into_raw())),
        ColorType::Rgba32F => (4, widen_f32(decoded.into_rgba32f().into_raw())),
        other => {
            return Err(ReconstructionError::UnsupportedFormat(format!(
                "color type {:?}",
                other
            )));
        }
    };

    debug!("Decoded image: {}x{}, {} channel(s) ({:?})", width, height, channels, color);

    // Decoders hand out interleaved (height, width, channel) samples.
    let interleaved = Array3::from_shape_vec((height, width, channels), samples)
        .map_err(|e| ReconstructionError::DecodeError(e.to_string()))?;
    let planar = interleaved
        .permuted_axes([2, 0, 1])
        .as_standard_layout()
        .into_owned();

    RasterImage::new(planar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
    use std::io::Cursor;

    fn encode_png(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn eight_bit_rgb_is_scaled_and_planar() {
        let mut rgb = RgbImage::new(3, 2);
        rgb.put_pixel(0, 0, Rgb([255, 0, 51]));
        rgb.put_pixel(2, 1, Rgb([0, 102, 255]));

        let raster = StandardImageReader
            .read_image(&encode_png(DynamicImage::ImageRgb8(rgb)))
            .unwrap();

        assert_eq!(raster.dim(), (3, 2, 3));
        let data = raster.data();
        assert_eq!(data[[0, 0, 0]], 1.0);
        assert_eq!(data[[1, 0, 0]], 0.0);
        assert!((data[[2, 0, 0]] - 0.2).abs() < 1e-12);
        assert!((data[[1, 1, 2]] - 0.4).abs() < 1e-12);
        assert_eq!(data[[2, 1, 2]], 1.0);
    }

    #[test]
    fn sixteen_bit_gray_uses_full_range() {
        let gray: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(2, 1, vec![u16::MAX, 0]).unwrap();

        let raster = StandardImageReader
            .read_image(&encode_png(DynamicImage::ImageLuma16(gray)))
            .unwrap();

        assert_eq!(raster.dim(), (1, 1, 2));
        assert_eq!(raster.data()[[0, 0, 0]], 1.0);
        assert_eq!(raster.data()[[0, 0, 1]], 0.0);
    }

    #[test]
    fn gray_keeps_single_channel() {
        let gray = GrayImage::from_pixel(4, 4, Luma([128]));
        let raster = StandardImageReader
            .read_image(&encode_png(DynamicImage::ImageLuma8(gray)))
            .unwrap();
        assert_eq!(raster.channels(), 1);
        assert!((raster.data()[[0, 3, 3]] - 128.0 / 255.0).abs() < 1e-12);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = StandardImageReader.read_image(b"not an image").unwrap_err();
        assert!(matches!(err, ReconstructionError::DecodeError(_)));
        assert!(err.is_io());
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let err = load_image("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, ReconstructionError::InputReadError(_)));
    }
}
