//! Pipeline conversions module
//!
//! Orchestration of PSF + measurement to reconstruction, for single files and
//! for whole directories.

mod batch;
mod reconstruction;


pub use batch::{ReconstructionJob, collect_images, jobs_for_directory, natural_cmp};
pub use reconstruction::ReconstructionPipeline;
