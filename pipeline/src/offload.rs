//! Moving listed documents out of the input directory.
//!
//! A listing directory (typically a bucket from an earlier run) names the
//! documents to offload. Each input file with a matching name is moved into
//! the offload directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::scan::{ScanOptions, collect_documents};
use crate::transfer::{ensure_writable_dir, move_verified};

/// Outcome of one offload pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffloadSummary {
    /// `(file name, destination)` of every moved document.
    pub moved: Vec<(String, PathBuf)>,
    /// `(file name, error)` of every document that could not be moved.
    pub failed: Vec<(String, String)>,
    /// Listed names with no counterpart in the input directory.
    pub not_found: Vec<String>,
}

/// Moves input documents whose file names appear in `listing_dir` into
/// `offload_dir`.
///
/// Only the top level of both directories is considered. A name already
/// taken in `offload_dir` gets a `_duplicate` suffix before the extension.
///
/// # Errors
///
/// Returns [`InvalidInput`](PipelineError::InvalidInput) if either source
/// directory is missing, or a directory error if `offload_dir` cannot be
/// created. Per-file move failures are recorded in the summary.
pub fn offload_listed(
    input_dir: &Path,
    listing_dir: &Path,
    offload_dir: &Path,
    extensions: &[String],
) -> Result<OffloadSummary> {
    if !input_dir.is_dir() {
        return Err(PipelineError::InvalidInput(format!(
            "input directory does not exist: {}",
            input_dir.display()
        )));
    }

    let options = ScanOptions {
        recursive: false,
        extensions: extensions.to_vec(),
        ..ScanOptions::default()
    };
    let listed = collect_documents(listing_dir, &options)?;
    ensure_writable_dir(offload_dir)?;

    let mut summary = OffloadSummary::default();
    for entry in &listed.documents {
        let name = entry.file_name().to_string();
        let source = input_dir.join(&name);
        if !source.is_file() {
            warn!(document = %name, "listed document not found in input");
            summary.not_found.push(name);
            continue;
        }

        let destination = free_destination(offload_dir, &name);
        match move_verified(&source, &destination) {
            Ok(_) => {
                info!(document = %name, destination = %destination.display(), "offloaded");
                summary.moved.push((name, destination));
            }
            Err(err) => {
                warn!(document = %name, error = %err, "offload failed");
                summary.failed.push((name, err.to_string()));
            }
        }
    }

    Ok(summary)
}

/// `dir/name`, or `dir/<stem>_duplicate[_N].<ext>` if that is taken.
fn free_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let mut attempt = 1;
    loop {
        let suffix = if attempt == 1 {
            "_duplicate".to_string()
        } else {
            format!("_duplicate_{attempt}")
        };
        let file_name = match ext {
            Some(ext) => format!("{stem}{suffix}.{ext}"),
            None => format!("{stem}{suffix}"),
        };
        let candidate = dir.join(file_name);
        if !candidate.exists() {
            return candidate;
        }
        attempt += 1;
    }
}
