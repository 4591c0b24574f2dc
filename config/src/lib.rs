//! YAML run configuration for report sorting and stacking.
//!
//! [`SorterConfig`] gathers every setting a run needs: input and output
//! locations, scanning rules, matching and placement modes, the field
//! catalogue and the stacking options. Every field has a default, so a YAML
//! file only needs to list what it changes.
//!
//! # Quick start
//!
//! ```no_run
//! use report_sorter_config::SorterConfig;
//! use report_sorter_core::Validator;
//!
//! let config = SorterConfig::load("report-sorter.yml").unwrap();
//! assert!(config.validate().is_empty());
//! let validator = Validator::new(config.validator_config()).unwrap();
//! ```

mod config;
mod error;

pub use config::{GroupingMode, SorterConfig, StackingConfig};
pub use error::{ConfigError, Result};
