//! Bundle (TAR) file checks done before anything is uploaded.

use crate::error::ArgumentError;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub path: PathBuf,
    pub size: u64,
}

/// The bundle must be a non-empty path naming an existing file.
pub fn validate_bundle(tar_file: &str) -> Result<Bundle, ArgumentError> {
    if tar_file.is_empty() {
        return Err(ArgumentError::Empty("TAR_FILE"));
    }
    let path = Path::new(tar_file);
    let size = match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => return Err(ArgumentError::MissingFile(tar_file.to_string())),
    };
    Ok(Bundle {
        path: path.to_path_buf(),
        size,
    })
}
