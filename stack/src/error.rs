//! Error types for stack generation.

use std::path::PathBuf;

use report_sorter_pipeline::PipelineError;
use thiserror::Error;

/// Errors that abort a stacking run.
#[derive(Debug, Error)]
pub enum StackError {
    /// File I/O failure outside per-member handling.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stack output directory could not be created.
    #[error("cannot create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The grouping listing or input location is unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Scanning the input tree failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Convenience alias for results with [`StackError`].
pub type Result<T> = std::result::Result<T, StackError>;
