//! Image reconstruction pipeline module
//!
//! This module provides a structured approach to lensless image reconstruction,
//! with separate modules for raster loading, Wiener deconvolution, export and
//! pipeline orchestration.

pub mod common;
pub mod config;
pub mod conversions;
pub mod deconvolution;
pub mod export;
pub mod raster;

pub use common::{PipelineTimings, ReconstructionError, Result};

pub use config::{DEFAULT_DELTA, ReconstructionConfig, ReconstructionConfigBuilder, ShapeAlignment};

pub use raster::{ImageReader, PsfKernel, RasterImage, StandardImageReader, load_image, prepare_psf};

pub use deconvolution::{ExecutionTarget, WienerFilter, wiener_deconvolve};

pub use export::{
    ConstantImagePolicy, CropRect, ImageWriter, OutputFormat, StandardImageWriter, TiffCompression,
};

pub use conversions::{ReconstructionJob, ReconstructionPipeline, collect_images, jobs_for_directory};
