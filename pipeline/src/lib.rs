//! Filesystem side of report sorting.
//!
//! Everything here consumes the pure classification from
//! `report_sorter_core` and performs the effects around it:
//!
//! - [`scan`]: collect report files from an input tree.
//! - [`load`]: read a file, turning read failures into unreadable results.
//! - [`router`]: prepare output directories and copy or move documents into
//!   their buckets with digest verification.
//! - [`reports`]: render and write the summary, CSV tables, rare-error
//!   listing and JSON report.
//! - [`run`]: the full sequential validation run.
//! - [`offload`]: move listed documents out of the input directory.
//!
//! # Example
//!
//! ```no_run
//! use report_sorter_core::{PlacementMode, RunMode, Validator, ValidatorConfig};
//! use report_sorter_pipeline::{OutputLayout, Router, RouterConfig, RunRequest, run_validation};
//!
//! let validator = Validator::new(ValidatorConfig::default()).unwrap();
//! let router = Router::new(RouterConfig {
//!     layout: OutputLayout::new("_out", "validated"),
//!     placement: PlacementMode::Copy,
//!     run_mode: RunMode::ReportOnly,
//! });
//! let outcome = run_validation(&validator, &router, &RunRequest::new("reports")).unwrap();
//! println!("{} documents", outcome.report.aggregate.counts.total);
//! ```

mod error;
pub mod load;
pub mod offload;
pub mod reports;
pub mod router;
pub mod run;
pub mod scan;
mod transfer;

pub use error::{PipelineError, Result};
pub use offload::{OffloadSummary, offload_listed};
pub use reports::{ReportPaths, ValidationReport, write_reports};
pub use router::{
    OutputLayout, PlacedDocument, PlacementFailure, PlacementSummary, Router, RouterConfig,
    ValidatedDocument,
};
pub use run::{RunOutcome, RunRequest, run_validation};
pub use scan::{ScanOptions, ScanOutcome, ScannedDocument, collect_documents, relative_name};
pub use transfer::file_digest;
