//! Run configuration for validation, sorting and stacking.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! input_dir: reports
//! output_dir: _out
//! extensions: [md, txt]
//! ignored_directories: [drafts]
//! matching: strict
//! placement: copy
//! run_mode: apply
//! maintenance_pattern: PM
//! fields:
//!   - name: Date of service
//!     aliases: [Service date]
//!   - name: Next steps?
//!   - name: Parts used
//!     required: false
//! stacking:
//!   output_dir: _out/stacks
//!   grouping: manual
//!   grouping_file: __config/groups.md
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use report_sorter_core::{
    DEFAULT_MAINTENANCE_PATTERN, DEFAULT_RARE_THRESHOLD, FieldSet, MatchMode, PlacementMode,
    RunMode, ValidatorConfig, validate_field_set,
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// How documents are assigned to stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// One stack per directory containing documents.
    #[default]
    Auto,
    /// Groups listed in [`StackingConfig::grouping_file`].
    Manual,
}

/// Settings for the stacking feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackingConfig {
    /// Directory receiving stack documents and the index.
    pub output_dir: PathBuf,
    /// Marker written before each member document.
    pub separator: String,
    /// Two-column CSV mapping file names to display titles. A relative path
    /// is resolved against the input directory.
    pub titles_file: PathBuf,
    /// Extension of generated stack documents, without the dot.
    pub output_extension: String,
    pub grouping: GroupingMode,
    /// Group listing used in [`GroupingMode::Manual`].
    pub grouping_file: Option<PathBuf>,
    /// Directory names skipped while collecting stack members.
    pub ignored_directories: Vec<String>,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("_out/stacks"),
            separator: "\n\n------\n\n------\n\n".to_string(),
            titles_file: PathBuf::from("__config/readable_titles.csv"),
            output_extension: "md".to_string(),
            grouping: GroupingMode::Auto,
            grouping_file: None,
            ignored_directories: vec!["__config".to_string(), "_out".to_string()],
        }
    }
}

impl StackingConfig {
    /// Location of the title map for documents under `input_dir`.
    pub fn titles_path(&self, input_dir: &Path) -> PathBuf {
        if self.titles_file.is_absolute() {
            self.titles_file.clone()
        } else {
            input_dir.join(&self.titles_file)
        }
    }
}

/// Top-level configuration for a report-sorter run.
///
/// Built-in defaults are overridden by a YAML file, which command-line flags
/// override in turn.
///
/// # Examples
///
/// ```
/// use report_sorter_config::SorterConfig;
/// use report_sorter_core::{MatchMode, RunMode};
///
/// let config: SorterConfig = serde_yaml::from_str("matching: strict\n").unwrap();
/// assert_eq!(config.matching, MatchMode::Strict);
/// assert_eq!(config.run_mode, RunMode::ReportOnly);
/// assert_eq!(config.extensions, vec!["md"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SorterConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Directory holding the reports; the CLI can supply it instead.
    pub input_dir: Option<PathBuf>,
    /// Root directory for reports and validated buckets.
    pub output_dir: PathBuf,
    /// Subdirectory of `output_dir` holding the three buckets.
    pub validated_dir: String,
    /// Descend into subdirectories of the input directory.
    pub recursive: bool,
    /// File extensions (case-insensitive, without the dot) treated as reports.
    pub extensions: Vec<String>,
    /// Directory names skipped anywhere in the input tree.
    pub ignored_directories: Vec<String>,
    pub matching: MatchMode,
    pub placement: PlacementMode,
    pub run_mode: RunMode,
    /// Log valid documents as well as invalid ones.
    pub show_valid: bool,
    /// Regular expression searched in file names; empty disables the
    /// maintenance override.
    pub maintenance_pattern: String,
    /// Failure signatures shared by fewer documents than this are rare.
    pub rare_threshold: usize,
    pub fields: FieldSet,
    pub stacking: StackingConfig,
    /// Additional log file appended to alongside stderr.
    pub log_file: Option<PathBuf>,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            input_dir: None,
            output_dir: PathBuf::from("_out"),
            validated_dir: "validated".to_string(),
            recursive: true,
            extensions: vec!["md".to_string()],
            ignored_directories: Vec::new(),
            matching: MatchMode::Normalized,
            placement: PlacementMode::Copy,
            run_mode: RunMode::ReportOnly,
            show_valid: false,
            maintenance_pattern: DEFAULT_MAINTENANCE_PATTERN.to_string(),
            rare_threshold: DEFAULT_RARE_THRESHOLD,
            fields: FieldSet::service_report(),
            stacking: StackingConfig::default(),
            log_file: None,
        }
    }
}

impl SorterConfig {
    /// Loads configuration from a YAML file. Missing keys take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](ConfigError::Io) if the file cannot be read, or
    /// [`Yaml`](ConfigError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](ConfigError::Io) if the file cannot be written, or
    /// [`Yaml`](ConfigError::Yaml) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks for values that would make a run meaningless.
    ///
    /// # Examples
    ///
    /// ```
    /// use report_sorter_config::SorterConfig;
    ///
    /// let mut config = SorterConfig::default();
    /// assert!(config.validate().is_empty());
    ///
    /// config.extensions.clear();
    /// config.rare_threshold = 0;
    /// assert_eq!(config.validate().len(), 2);
    /// ```
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.normalized_extensions().is_empty() {
            errors.push(ConfigError::Invalid(
                "at least one file extension is required".to_string(),
            ));
        }
        if self.rare_threshold == 0 {
            errors.push(ConfigError::Invalid(
                "rare_threshold must be at least 1".to_string(),
            ));
        }
        if self.validated_dir.trim().is_empty() {
            errors.push(ConfigError::Invalid(
                "validated_dir cannot be empty".to_string(),
            ));
        }
        if self.stacking.grouping == GroupingMode::Manual && self.stacking.grouping_file.is_none()
        {
            errors.push(ConfigError::Invalid(
                "manual grouping requires stacking.grouping_file".to_string(),
            ));
        }
        errors.extend(
            validate_field_set(&self.fields)
                .into_iter()
                .map(|err| ConfigError::Invalid(err.to_string())),
        );

        errors
    }

    /// Extensions lowercased with any leading dot removed; blanks dropped.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }

    /// Validator settings derived from this configuration.
    pub fn validator_config(&self) -> ValidatorConfig {
        let pattern = self.maintenance_pattern.trim();
        ValidatorConfig {
            fields: self.fields.clone(),
            match_mode: self.matching,
            maintenance_pattern: (!pattern.is_empty()).then(|| pattern.to_string()),
        }
    }

    /// Directory holding the validated buckets.
    pub fn validated_root(&self) -> PathBuf {
        self.output_dir.join(&self.validated_dir)
    }
}
