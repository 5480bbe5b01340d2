//! Atomic output files: the destination only appears once fully written

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::image_pipeline::common::error::{ReconstructionError, Result};

/// Writes `bytes` to a temporary file next to `path` and renames it into place.
///
/// On any failure the temporary file is removed and `path` is left untouched.
pub fn write_atomically<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let write_error =
        |e: std::io::Error| ReconstructionError::OutputWriteError(format!("{}: {}", path.display(), e));

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(directory).map_err(write_error)?;
    staged.write_all(bytes).map_err(write_error)?;
    staged.as_file().sync_all().map_err(write_error)?;
    staged.persist(path).map_err(|e| write_error(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
