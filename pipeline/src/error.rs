//! Error types for validation runs.
//!
//! Only run-level conditions are errors. Per-document problems become
//! unreadable results or placement failures and never surface here.

use std::path::PathBuf;

use report_sorter_core::ValidatorError;
use thiserror::Error;

/// Errors that abort a validation run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// File I/O failure outside per-document handling.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An output directory could not be created.
    #[error("cannot create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An output directory exists but cannot be written to.
    #[error("directory {} is not writable: {source}", path.display())]
    Unwritable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The input location or run request is unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The validator configuration was rejected.
    #[error("invalid validator configuration: {0}")]
    Validator(#[from] ValidatorError),
}

/// Convenience alias for results with [`PipelineError`].
pub type Result<T> = std::result::Result<T, PipelineError>;
