//! Core validation and classification types for service reports.
//!
//! This crate is the pure half of report sorting. It never touches the
//! filesystem:
//!
//! - [`FieldRequirement`] / [`FieldSet`]: the labelled fields a report is
//!   expected to contain, with aliases for normalized matching.
//! - [`FieldMatcher`]: compiled line-anchored label recognition for one
//!   field in [`MatchMode::Normalized`] or [`MatchMode::Strict`] mode.
//! - [`Validator`]: classifies a [`ReportDocument`] as valid, invalid or
//!   maintenance and records missing fields, diagnostics and a word count.
//! - [`AggregateReport`]: run-level counts, frequency tables and word
//!   statistics, independent of document order.
//! - [`table`]: CSV helpers shared by the tabular reports and title maps.
//!
//! # Example
//!
//! ```
//! use report_sorter_core::*;
//!
//! let validator = Validator::new(ValidatorConfig::default()).unwrap();
//! let doc = ReportDocument::from_text("240314_PM_Cams.md", "Technician name: Steve\n");
//! let result = validator.validate(&doc);
//! assert_eq!(result.classification, Classification::Maintenance);
//!
//! let report = AggregateReport::build(&[result], DEFAULT_RARE_THRESHOLD);
//! assert_eq!(report.counts.maintenance, 1);
//! ```

mod aggregate;
mod fields;
mod matcher;
pub mod table;
mod types;
mod validate;

pub use aggregate::{
    AggregateReport, ClassificationCounts, DEFAULT_RARE_THRESHOLD, FrequencyEntry, RareDocument,
    WordCountEntry, WordCountStats, failure_signature,
};
pub use matcher::{FieldMatcher, LabelSpan, is_separator_line};
pub use types::*;
pub use validate::{
    DEFAULT_MAINTENANCE_PATTERN, Extraction, Validator, ValidatorConfig, ValidatorError,
    count_words, validate_field_set,
};
