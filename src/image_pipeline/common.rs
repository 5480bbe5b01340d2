//! Common utilities module
//!
//! This module contains shared utilities used across the image pipeline.

pub mod error;
pub mod timing;

pub use error::{ReconstructionError, Result};
pub use timing::{PipelineTimings, StepTiming, Timer};
