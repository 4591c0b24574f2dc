//! Bucket routing and file placement.
//!
//! [`Router::prepare`] checks every output location before any document is
//! read. [`Router::place`] then copies or moves each document into the bucket
//! named after its classification. A failure for one document is recorded
//! and never stops the others.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use report_sorter_core::{Classification, PlacementMode, RunMode, ValidationResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::transfer::{copy_verified, ensure_writable_dir, move_verified};

/// Output locations of a run.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use report_sorter_core::Classification;
/// use report_sorter_pipeline::OutputLayout;
///
/// let layout = OutputLayout::new("_out", "validated");
/// assert_eq!(layout.bucket(Classification::Invalid), Path::new("_out/validated/invalid"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLayout {
    /// Directory receiving the run reports.
    pub report_dir: PathBuf,
    /// Parent of the three bucket directories.
    pub validated_root: PathBuf,
}

impl OutputLayout {
    pub fn new(output_dir: impl Into<PathBuf>, validated_dir: impl AsRef<Path>) -> Self {
        let report_dir = output_dir.into();
        let validated_root = report_dir.join(validated_dir);
        Self {
            report_dir,
            validated_root,
        }
    }

    /// Destination directory for `classification`.
    pub fn bucket(&self, classification: Classification) -> PathBuf {
        self.validated_root.join(classification.as_str())
    }
}

/// Placement settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    pub layout: OutputLayout,
    pub placement: PlacementMode,
    pub run_mode: RunMode,
}

/// A validation result paired with the file it came from.
#[derive(Debug, Clone)]
pub struct ValidatedDocument {
    pub source: PathBuf,
    pub result: ValidationResult,
}

/// A document that reached its bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedDocument {
    pub document: String,
    pub classification: Classification,
    pub destination: PathBuf,
    /// SHA-256 of the placed content.
    pub sha256: String,
}

/// A document that could not be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementFailure {
    pub document: String,
    pub classification: Classification,
    pub destination: PathBuf,
    pub error: String,
}

/// Outcome of the placement pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementSummary {
    pub mode: PlacementMode,
    /// `true` in report-only runs, where nothing is placed.
    pub skipped: bool,
    pub placed: Vec<PlacedDocument>,
    pub failed: Vec<PlacementFailure>,
}

impl PlacementSummary {
    fn new(mode: PlacementMode, skipped: bool) -> Self {
        Self {
            mode,
            skipped,
            placed: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Number of documents placed into `classification`'s bucket.
    pub fn placed_in(&self, classification: Classification) -> usize {
        self.placed
            .iter()
            .filter(|doc| doc.classification == classification)
            .count()
    }
}

/// Places validated documents into their buckets.
#[derive(Debug, Clone)]
pub struct Router {
    config: RouterConfig,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.config.layout
    }

    /// Creates the report directory and, when placement is enabled, the three
    /// bucket directories, checking each is writable.
    ///
    /// # Errors
    ///
    /// Returns [`CreateDir`](crate::PipelineError::CreateDir) or
    /// [`Unwritable`](crate::PipelineError::Unwritable) naming the failed
    /// path. Nothing has been read or placed at that point.
    pub fn prepare(&self) -> Result<()> {
        ensure_writable_dir(&self.config.layout.report_dir)?;
        if self.config.run_mode == RunMode::Apply {
            for classification in Classification::ALL {
                ensure_writable_dir(&self.config.layout.bucket(classification))?;
            }
        }
        debug!(
            report_dir = %self.config.layout.report_dir.display(),
            run_mode = ?self.config.run_mode,
            "output directories ready"
        );
        Ok(())
    }

    /// Places every document into the bucket of its classification.
    ///
    /// Documents are flattened to their file name inside the bucket; a second
    /// document claiming the same destination in one run is recorded as a
    /// failure and left untouched.
    pub fn place(&self, documents: &[ValidatedDocument]) -> PlacementSummary {
        if self.config.run_mode == RunMode::ReportOnly {
            info!("report-only run, skipping placement");
            return PlacementSummary::new(self.config.placement, true);
        }

        let mut summary = PlacementSummary::new(self.config.placement, false);
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        for doc in documents {
            let classification = doc.result.classification;
            let destination = self
                .config
                .layout
                .bucket(classification)
                .join(doc.result.file_name());

            let outcome = if claimed.insert(destination.clone()) {
                let transferred = match self.config.placement {
                    PlacementMode::Copy => copy_verified(&doc.source, &destination),
                    PlacementMode::Move => move_verified(&doc.source, &destination),
                };
                transferred.map_err(|err| err.to_string())
            } else {
                Err(format!(
                    "destination {} already used by another document in this run",
                    destination.display()
                ))
            };

            match outcome {
                Ok(sha256) => {
                    debug!(
                        document = %doc.result.document,
                        destination = %destination.display(),
                        "placed"
                    );
                    summary.placed.push(PlacedDocument {
                        document: doc.result.document.clone(),
                        classification,
                        destination,
                        sha256,
                    });
                }
                Err(error) => {
                    warn!(document = %doc.result.document, %error, "placement failed");
                    summary.failed.push(PlacementFailure {
                        document: doc.result.document.clone(),
                        classification,
                        destination,
                        error,
                    });
                }
            }
        }

        info!(
            placed = summary.placed.len(),
            failed = summary.failed.len(),
            mode = %self.config.placement,
            "placement complete"
        );
        summary
    }
}
