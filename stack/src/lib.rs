//! Consolidated stack documents from grouped service reports.
//!
//! A stacking run scans an input tree, groups the documents either by
//! directory or from a manual listing, and concatenates each group into one
//! document for downstream review. An index document records which reports
//! went into which stack.
//!
//! # Example
//!
//! ```no_run
//! use report_sorter_stack::{Grouping, StackOptions, StackRequest, run_stacking};
//!
//! let request = StackRequest {
//!     input_dir: "reports".into(),
//!     grouping: Grouping::Auto,
//!     titles_file: Some("__config/readable_titles.csv".into()),
//!     scan: Default::default(),
//!     options: StackOptions {
//!         output_dir: "_out/stacks".into(),
//!         separator: "\n\n------\n\n".to_string(),
//!         output_extension: "md".to_string(),
//!         generated_at: chrono::Local::now().naive_local(),
//!     },
//! };
//! let run = run_stacking(&request).unwrap();
//! println!("{} stacks, index at {}", run.stacks.len(), run.index.display());
//! ```

mod error;
mod grouping;
mod titles;
mod writer;

use std::path::PathBuf;

use report_sorter_pipeline::{ScanOptions, collect_documents};
use tracing::info;

pub use error::{Result, StackError};
pub use grouping::{
    GroupSpec, GroupingOutcome, StackGroup, auto_groups, manual_groups, parse_grouping,
};
pub use titles::TitleMap;
pub use writer::{
    StackFile, StackOptions, StackRun, StackSection, TOKENS_PER_WORD, estimate_tokens,
    index_file_name, render_index, render_stack, sanitize_name, stack_file_name, write_stacks,
};

/// How members are assigned to stacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouping {
    /// One stack per directory.
    Auto,
    /// Groups listed in the given file.
    Manual(PathBuf),
}

/// Inputs of one stacking run.
#[derive(Debug, Clone)]
pub struct StackRequest {
    pub input_dir: PathBuf,
    pub scan: ScanOptions,
    pub grouping: Grouping,
    /// Title map consulted for section headers; `None` uses file names.
    pub titles_file: Option<PathBuf>,
    pub options: StackOptions,
}

/// Scans, groups and writes every stack plus the index.
///
/// The stack output directory is never scanned for members.
///
/// # Errors
///
/// Fails if the input directory is missing, the grouping listing cannot be
/// read or defines no groups, or the output cannot be written.
pub fn run_stacking(request: &StackRequest) -> Result<StackRun> {
    let mut scan = request.scan.clone();
    scan.excluded_paths.push(request.options.output_dir.clone());
    let scanned = collect_documents(&request.input_dir, &scan)?;

    let outcome = match &request.grouping {
        Grouping::Auto => auto_groups(&request.input_dir, &scanned.documents),
        Grouping::Manual(path) => {
            let text = std::fs::read_to_string(path).map_err(|err| {
                StackError::InvalidInput(format!(
                    "cannot read grouping file {}: {err}",
                    path.display()
                ))
            })?;
            let specs = parse_grouping(&text);
            if specs.is_empty() {
                return Err(StackError::InvalidInput(format!(
                    "no groups defined in {}",
                    path.display()
                )));
            }
            manual_groups(&specs, &scanned.documents)
        }
    };

    let titles = match &request.titles_file {
        Some(path) => TitleMap::load(path)?,
        None => TitleMap::default(),
    };
    info!(
        groups = outcome.groups.len(),
        documents = scanned.documents.len(),
        titles = titles.len(),
        "writing stacks"
    );

    write_stacks(&outcome.groups, &titles, outcome.warnings, &request.options)
}
