//! # File Access
//!
//! Every file the binary reads goes through [`read_limited`]: the path is
//! canonicalized, must be a regular file, and must not exceed a size cap.

use crate::error::AppError;
use std::path::{Path, PathBuf};

/// Canonicalize `path` and make sure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, AppError> {
    let canonical = path.canonicalize().map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if !canonical.is_file() {
        return Err(AppError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }
    Ok(canonical)
}

fn validate_file_size(path: &Path, max: u64) -> Result<(), AppError> {
    let metadata = std::fs::metadata(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.len() > max {
        return Err(AppError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max,
        });
    }
    Ok(())
}

/// Validate and read a UTF-8 file of at most `max` bytes.
///
/// Returns the canonical path along with the content.
pub(crate) fn read_limited(path: &Path, max: u64) -> Result<(PathBuf, String), AppError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max)?;
    let content = std::fs::read_to_string(&validated).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((validated, content))
}
