//! Batch reconstruction of many measurements against one PSF

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::image_pipeline::{
    common::{
        error::{ReconstructionError, Result},
        timing::PipelineTimings,
    },
    conversions::ReconstructionPipeline,
    export::ImageWriter,
    raster::ImageReader,
};

const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp"];

/// One measurement file and where its reconstruction goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructionJob {
    pub measurement: PathBuf,
    pub output: PathBuf,
}

/// Recursively lists image files under `dir` in natural order.
pub fn collect_images<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(ReconstructionError::InputReadError(format!(
            "{}: not a directory",
            dir.display()
        )));
    }

    let root = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = format!("{}/**/*", root);
    let entries = glob::glob(&pattern)
        .map_err(|e| ReconstructionError::InputReadError(format!("{}: {}", dir.display(), e)))?;

    let mut images: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect();

    images.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));

    info!("Found {} image(s) in {}", images.len(), dir.display());
    Ok(images)
}

/// One job per image in `measurement_dir`, writing `<stem>.<extension>` into
/// `output_dir` under the same relative subdirectory as the measurement.
///
/// Fails with `InvalidParameter` when two measurements would share an output
/// path, e.g. `m1.png` and `m1.jpg` in the same directory.
pub fn jobs_for_directory<P: AsRef<Path>, Q: AsRef<Path>>(
    measurement_dir: P,
    output_dir: Q,
    extension: &str,
) -> Result<Vec<ReconstructionJob>> {
    let measurement_dir = measurement_dir.as_ref();
    let output_dir = output_dir.as_ref();

    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut jobs = Vec::new();
    for measurement in collect_images(measurement_dir)? {
        let relative = measurement
            .strip_prefix(measurement_dir)
            .unwrap_or(measurement.as_path())
            .with_extension(extension);
        let output = output_dir.join(relative);

        if let Some(previous) = claimed.insert(output.clone(), measurement.clone()) {
            return Err(ReconstructionError::InvalidParameter(format!(
                "{} and {} would both be written to {}",
                previous.display(),
                measurement.display(),
                output.display()
            )));
        }
        jobs.push(ReconstructionJob {
            measurement,
            output,
        });
    }
    Ok(jobs)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Chunk {
    // Digit runs compare by magnitude: significant length first, then digits.
    Number(usize, String),
    Text(String),
}

fn natural_key(s: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    let flush = |current: &mut String, in_digits: bool, chunks: &mut Vec<Chunk>| {
        if current.is_empty() {
            return;
        }
        let chunk = if in_digits {
            let significant = current.trim_start_matches('0').to_string();
            Chunk::Number(significant.len(), significant)
        } else {
            Chunk::Text(current.to_lowercase())
        };
        chunks.push(chunk);
        current.clear();
    };

    for ch in s.chars() {
        let is_digit = ch.is_ascii_digit();
        if is_digit != in_digits {
            flush(&mut current, in_digits, &mut chunks);
            in_digits = is_digit;
        }
        current.push(ch);
    }
    flush(&mut current, in_digits, &mut chunks);
    chunks
}

/// Compares strings treating digit runs as numbers, case-insensitively.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}

impl<R, W> ReconstructionPipeline<R, W>
where
    R: ImageReader + Sync,
    W: ImageWriter + Sync,
{
    /// Prepares the PSF once and reconstructs every job on the rayon pool.
    ///
    /// Fails as a whole only when delta is invalid or the PSF cannot be
    /// prepared; otherwise returns one result per job, in job order. Missing
    /// output directories are created.
    pub fn reconstruct_batch<P: AsRef<Path>>(
        &self,
        psf_path: P,
        jobs: &[ReconstructionJob],
    ) -> Result<Vec<Result<PipelineTimings>>> {
        let psf_path = psf_path.as_ref();
        self.filter()?;
        let psf_data = std::fs::read(psf_path).map_err(|e| {
            ReconstructionError::InputReadError(format!("{}: {}", psf_path.display(), e))
        })?;
        let psf = self.prepare_psf(&psf_data)?;

        info!(jobs = jobs.len(), psf = %psf_path.display(), "Starting batch reconstruction");

        let results: Vec<Result<PipelineTimings>> = jobs
            .par_iter()
            .map(|job| {
                let mut timings = PipelineTimings::new();
                create_output_parent(&job.output)
                    .and_then(|_| {
                        self.reconstruct_into_file(&psf, &job.measurement, &job.output, &mut timings)
                    })
                    .map(|_| timings)
                    .inspect_err(|e| warn!("{} failed: {}", job.measurement.display(), e))
            })
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(
            succeeded = results.len() - failed,
            failed,
            "Batch reconstruction complete"
        );
        Ok(results)
    }
}

fn create_output_parent(output: &Path) -> Result<()> {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|e| ReconstructionError::OutputWriteError(format!("{}: {}", parent.display(), e))),
        _ => Ok(()),
    }
}
