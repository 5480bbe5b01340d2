use std::io::Write;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::image_pipeline::{
    common::{
        error::{ReconstructionError, Result},
        timing::PipelineTimings,
    },
    config::{ReconstructionConfig, ShapeAlignment},
    deconvolution::{WienerFilter, pad_to_shape},
    export::{ImageWriter, OutputFormat, StandardImageWriter, prepare_output, write_atomically},
    raster::{ImageReader, PsfKernel, RasterImage, StandardImageReader},
};

pub struct ReconstructionPipeline<R: ImageReader, W: ImageWriter> {
    reader: R,
    writer: W,
    config: ReconstructionConfig,
}

impl ReconstructionPipeline<StandardImageReader, StandardImageWriter> {
    pub fn new(config: ReconstructionConfig) -> Self {
        Self {
            reader: StandardImageReader,
            writer: StandardImageWriter,
            config,
        }
    }
}

impl<R: ImageReader, W: ImageWriter> ReconstructionPipeline<R, W> {
    pub fn with_custom(reader: R, writer: W, config: ReconstructionConfig) -> Self {
        Self {
            reader,
            writer,
            config,
        }
    }

    pub(crate) fn filter(&self) -> Result<WienerFilter> {
        WienerFilter::new(self.config.delta, self.config.target)
    }

    fn align(&self, measurement: RasterImage, psf: &PsfKernel) -> Result<RasterImage> {
        let same_shape = measurement.height() == psf.height() && measurement.width() == psf.width();
        match self.config.alignment {
            ShapeAlignment::RampPad if !same_shape => {
                debug!(
                    "Padding measurement {}x{} to PSF shape {}x{}",
                    measurement.height(),
                    measurement.width(),
                    psf.height(),
                    psf.width()
                );
                pad_to_shape(&measurement, psf.height(), psf.width())
            }
            // Strict shapes are checked by the filter before any transform.
            _ => Ok(measurement),
        }
    }

    fn output_format(&self, output_path: &Path) -> Result<OutputFormat> {
        match self.config.output_format {
            Some(format) => Ok(format),
            None => OutputFormat::from_path(output_path),
        }
    }

    /// Decodes a PSF capture into a peak-normalized kernel.
    pub fn prepare_psf(&self, psf_data: &[u8]) -> Result<PsfKernel> {
        let capture = self.reader.read_image(psf_data)?;
        PsfKernel::from_raster(&capture)
    }

    /// Aligns `measurement` to `psf` and deconvolves it.
    pub fn reconstruct_image(&self, psf: &PsfKernel, measurement: RasterImage) -> Result<RasterImage> {
        let filter = self.filter()?;
        let aligned = self.align(measurement, psf)?;
        filter.apply(&aligned, psf)
    }

    #[instrument(skip_all, fields(psf_size = psf_data.len(), measurement_size = measurement_data.len()))]
    pub fn reconstruct(&self, psf_data: &[u8], measurement_data: &[u8]) -> Result<RasterImage> {
        info!("Starting reconstruction");
        self.filter()?;

        let psf = {
            let _span = tracing::info_span!("prepare_psf").entered();
            self.prepare_psf(psf_data)?
        };

        let measurement = {
            let _span = tracing::info_span!("decode_measurement").entered();
            self.reader.read_image(measurement_data)?
        };

        self.reconstruct_image(&psf, measurement)
    }

    /// Normalizes, crops and quantizes `reconstruction`, then encodes it to `output`.
    pub fn export(
        &self,
        reconstruction: &RasterImage,
        format: OutputFormat,
        output: &mut dyn Write,
    ) -> Result<()> {
        let quantized = {
            let _span = tracing::info_span!("quantize").entered();
            prepare_output(
                reconstruction,
                self.config.crop.as_ref(),
                self.config.constant_policy,
            )?
        };

        let _span = tracing::info_span!("encode", ?format).entered();
        self.writer.write_image(&quantized, format, output, &self.config)
    }

    pub fn reconstruct_to(
        &self,
        psf_data: &[u8],
        measurement_data: &[u8],
        format: OutputFormat,
        output: &mut dyn Write,
    ) -> Result<()> {
        let reconstruction = self.reconstruct(psf_data, measurement_data)?;
        self.export(&reconstruction, format, output)?;

        info!(
            height = reconstruction.height(),
            width = reconstruction.width(),
            "Reconstruction complete"
        );
        Ok(())
    }

    pub fn reconstruct_file<P: AsRef<Path>, M: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        psf_path: P,
        measurement_path: M,
        output_path: Q,
    ) -> Result<()> {
        self.reconstruct_file_with_timings(psf_path, measurement_path, output_path)
            .map(|_| ())
    }

    #[instrument(skip_all)]
    pub fn reconstruct_file_with_timings<P: AsRef<Path>, M: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        psf_path: P,
        measurement_path: M,
        output_path: Q,
    ) -> Result<PipelineTimings> {
        let psf_path = psf_path.as_ref();
        let mut timings = PipelineTimings::new();

        info!(psf = %psf_path.display(), "Loading PSF");
        self.filter()?;
        let psf_data = timings.measure("read_psf_file", || read_input(psf_path))?;
        let psf = timings.measure("prepare_psf", || self.prepare_psf(&psf_data))?;

        self.reconstruct_into_file(&psf, measurement_path.as_ref(), output_path.as_ref(), &mut timings)?;
        Ok(timings)
    }

    /// Runs measurement → output for an already prepared PSF. The output file
    /// is only created once the encoded buffer is complete.
    pub(crate) fn reconstruct_into_file(
        &self,
        psf: &PsfKernel,
        measurement_path: &Path,
        output_path: &Path,
        timings: &mut PipelineTimings,
    ) -> Result<()> {
        info!(
            measurement = %measurement_path.display(),
            output = %output_path.display(),
            "Reconstructing file"
        );

        let format = self.output_format(output_path)?;

        let measurement_data =
            timings.measure("read_measurement_file", || read_input(measurement_path))?;
        let measurement = timings.measure("decode_measurement", || {
            let _span = tracing::info_span!("decode_measurement").entered();
            self.reader.read_image(&measurement_data)
        })?;

        let reconstruction =
            timings.measure("deconvolve", || self.reconstruct_image(psf, measurement))?;

        let mut encoded = Vec::new();
        timings.measure("export", || self.export(&reconstruction, format, &mut encoded))?;

        timings.measure("write_output_file", || write_atomically(output_path, &encoded))?;

        info!(
            height = reconstruction.height(),
            width = reconstruction.width(),
            "Reconstruction complete"
        );
        Ok(())
    }

    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ReconstructionConfig) {
        self.config = config;
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    let _span = tracing::info_span!("read_input_file").entered();
    std::fs::read(path)
        .map_err(|e| ReconstructionError::InputReadError(format!("{}: {}", path.display(), e)))
}
