//! GitHub Actions step outputs.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const GITHUB_OUTPUT: &str = "GITHUB_OUTPUT";

/// The step-output file, when running under GitHub Actions.
pub fn github_output_path() -> Option<PathBuf> {
    std::env::var_os(GITHUB_OUTPUT)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Append `key=value` as one line, creating the file if needed.
pub fn append_output(path: &Path, key: &str, value: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{key}={value}")
}

/// Publish the record id for later workflow steps. Returns whether an
/// output file was configured.
pub fn publish_record_id(record_id: &str) -> io::Result<bool> {
    match github_output_path() {
        Some(path) => {
            append_output(&path, "record_id", record_id)?;
            tracing::debug!(path = %path.display(), "wrote record_id step output");
            Ok(true)
        }
        None => Ok(false),
    }
}
