//! Report validation and classification.
//!
//! [`Validator`] is built once from a [`ValidatorConfig`] and then applied to
//! each document independently. Validation is a pure function of the document
//! bytes, its name and the configuration: it never touches the filesystem and
//! keeps no state between documents.
//!
//! # Examples
//!
//! ```
//! use report_sorter_core::*;
//!
//! let config = ValidatorConfig {
//!     fields: FieldSet::new(vec![
//!         FieldRequirement::required("Technician name"),
//!         FieldRequirement::required("Date of service"),
//!         FieldRequirement::required("Service completed?"),
//!     ]),
//!     ..ValidatorConfig::default()
//! };
//! let validator = Validator::new(config).unwrap();
//!
//! let doc = ReportDocument::from_text(
//!     "240313_Cams.md",
//!     "Technician name: Steve Brown\nDate of service: 3/13/2024\n",
//! );
//! let result = validator.validate(&doc);
//! assert_eq!(result.classification, Classification::Invalid);
//! assert!(result.missing_fields.contains("Service completed?"));
//! assert_eq!(result.missing_fields.len(), 1);
//! ```

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matcher::{FieldMatcher, LabelSpan, is_separator_line, label_core};
use crate::types::{
    Classification, FieldSet, InvalidReason, Issue, IssueKind, MatchMode, ReportDocument,
    ValidationResult,
};

/// Default maintenance marker pattern, searched in the file name.
pub const DEFAULT_MAINTENANCE_PATTERN: &str = "PM";

/// Validator configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidatorError {
    /// The field set has no fields at all.
    #[error("field set must define at least one field")]
    EmptyFieldSet,
    /// A field name is empty or whitespace-only.
    #[error("field name cannot be empty")]
    EmptyFieldName,
    /// Two fields share a canonical name.
    #[error("duplicate field: {0}")]
    DuplicateField(String),
    /// An alias is empty or whitespace-only.
    #[error("empty alias for field: {0}")]
    EmptyLabel(String),
    /// The same label text is claimed by two fields.
    #[error("label '{label}' is used by more than one field")]
    DuplicateLabel { label: String },
    /// A field's labels could not be compiled into a matcher.
    #[error("invalid label pattern for field '{field}': {detail}")]
    LabelPattern { field: String, detail: String },
    /// The maintenance marker is not a valid regular expression.
    #[error("invalid maintenance pattern '{pattern}': {detail}")]
    MaintenancePattern { pattern: String, detail: String },
}

/// Everything the validator needs, passed explicitly at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub fields: FieldSet,
    pub match_mode: MatchMode,
    /// Regular expression searched in the file name; `None` disables the
    /// maintenance override.
    pub maintenance_pattern: Option<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            fields: FieldSet::service_report(),
            match_mode: MatchMode::Normalized,
            maintenance_pattern: Some(DEFAULT_MAINTENANCE_PATTERN.to_string()),
        }
    }
}

/// Checks a field set for structural problems.
///
/// Labels are compared the way normalized matching sees them: ignoring case,
/// runs of whitespace and trailing punctuation.
///
/// # Examples
///
/// ```
/// use report_sorter_core::*;
///
/// assert!(validate_field_set(&FieldSet::service_report()).is_empty());
///
/// let clash = FieldSet::new(vec![
///     FieldRequirement::required("Date of service"),
///     FieldRequirement::required("Visit date").with_alias("date of  service:"),
/// ]);
/// let errors = validate_field_set(&clash);
/// assert!(matches!(errors[0], ValidatorError::DuplicateLabel { .. }));
/// ```
pub fn validate_field_set(fields: &FieldSet) -> Vec<ValidatorError> {
    let mut errors = Vec::new();

    if fields.is_empty() {
        errors.push(ValidatorError::EmptyFieldSet);
        return errors;
    }

    let mut names: HashSet<&str> = HashSet::new();
    let mut labels: HashSet<String> = HashSet::new();

    for field in fields.iter() {
        let name = field.name.trim();
        if name.is_empty() {
            errors.push(ValidatorError::EmptyFieldName);
            return errors;
        }
        if !names.insert(name) {
            errors.push(ValidatorError::DuplicateField(name.to_string()));
            return errors;
        }

        for label in field.labels(true) {
            let folded = fold_label(label);
            if folded.is_empty() {
                errors.push(ValidatorError::EmptyLabel(field.name.clone()));
                return errors;
            }
            if !labels.insert(folded) {
                errors.push(ValidatorError::DuplicateLabel {
                    label: label.to_string(),
                });
                return errors;
            }
        }
    }

    errors
}

fn fold_label(label: &str) -> String {
    label_core(label)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Field values located in one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Non-empty captured values keyed by canonical field name.
    pub values: BTreeMap<String, String>,
    /// Number of label occurrences per canonical field name.
    pub occurrences: BTreeMap<String, usize>,
    /// Fields whose first label occurrence is not bold.
    pub unbolded: BTreeSet<String>,
}

impl Extraction {
    /// Returns `true` if any configured label appears in the document.
    pub fn has_any_label(&self) -> bool {
        self.occurrences.values().any(|count| *count > 0)
    }

    fn occurrences_of(&self, name: &str) -> usize {
        self.occurrences.get(name).copied().unwrap_or(0)
    }
}

/// Compiled validator for one configuration.
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidatorConfig,
    matchers: Vec<FieldMatcher>,
    maintenance: Option<Regex>,
}

impl Validator {
    /// Validates the configuration and compiles every field matcher.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidatorError`] found in the field set, or a
    /// pattern error for labels or the maintenance marker.
    pub fn new(config: ValidatorConfig) -> Result<Self, ValidatorError> {
        if let Some(first) = validate_field_set(&config.fields).into_iter().next() {
            return Err(first);
        }

        let matchers = config
            .fields
            .iter()
            .map(|field| {
                FieldMatcher::new(field, config.match_mode).map_err(|detail| {
                    ValidatorError::LabelPattern {
                        field: field.name.clone(),
                        detail,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let maintenance = match config.maintenance_pattern.as_deref() {
            Some(pattern) if !pattern.is_empty() => Some(Regex::new(pattern).map_err(|err| {
                ValidatorError::MaintenancePattern {
                    pattern: pattern.to_string(),
                    detail: err.to_string(),
                }
            })?),
            _ => None,
        };

        Ok(Self {
            config,
            matchers,
            maintenance,
        })
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Returns `true` if `file_name` carries the maintenance marker.
    pub fn is_maintenance(&self, file_name: &str) -> bool {
        self.maintenance
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(file_name))
    }

    /// Validates and classifies one document.
    pub fn validate(&self, document: &ReportDocument) -> ValidationResult {
        match document.text() {
            Ok(text) => self.validate_text(document.name(), text),
            Err(err) => ValidationResult::unreadable(
                document.name(),
                format!("content is not valid UTF-8: {err}"),
            ),
        }
    }

    /// Validates already-decoded text named `document`.
    ///
    /// The maintenance marker is searched in the final path component of
    /// `document`.
    pub fn validate_text(&self, document: &str, text: &str) -> ValidationResult {
        let text = normalize_newlines(text);
        let extraction = self.extract(&text);

        let mut issues = Vec::new();
        let mut missing_fields = BTreeSet::new();

        for matcher in &self.matchers {
            let name = matcher.name();
            let occurrences = extraction.occurrences_of(name);
            let has_value = extraction.values.contains_key(name);

            if matcher.required() && !has_value {
                missing_fields.insert(name.to_string());
                let kind = if occurrences == 0 {
                    IssueKind::Missing
                } else {
                    IssueKind::Empty
                };
                issues.push(Issue::new(kind, name));
            }
            let strict = self.config.match_mode == MatchMode::Strict;
            if strict && extraction.unbolded.contains(name) {
                issues.push(Issue::new(IssueKind::Unbolded, name));
            }
            if occurrences > 1 {
                issues.push(Issue::new(IssueKind::Duplicate, name));
            }
        }

        let file_name = document.rsplit('/').next().unwrap_or(document);
        let (classification, invalid_reason) = if self.is_maintenance(file_name) {
            (Classification::Maintenance, None)
        } else if missing_fields.is_empty() {
            (Classification::Valid, None)
        } else if extraction.has_any_label() {
            (Classification::Invalid, Some(InvalidReason::MissingFields))
        } else {
            (Classification::Invalid, Some(InvalidReason::Unstructured))
        };

        ValidationResult {
            document: document.to_string(),
            classification,
            invalid_reason,
            missing_fields,
            issues,
            word_count: count_words(&text),
            fields: extraction.values,
        }
    }

    /// Locates every configured field in `text` and captures its value.
    ///
    /// A value runs from the end of a label to the start of the next
    /// recognized label of any field, or to the end of the text. When a label
    /// appears more than once the first occurrence wins.
    pub fn extract(&self, text: &str) -> Extraction {
        let mut spans: Vec<(LabelSpan, usize)> = Vec::new();
        for (index, matcher) in self.matchers.iter().enumerate() {
            spans.extend(matcher.find(text).into_iter().map(|span| (span, index)));
        }
        // Earliest first; on equal starts the longer label wins.
        spans.sort_by(|(a, ai), (b, bi)| {
            a.start
                .cmp(&b.start)
                .then(b.end.cmp(&a.end))
                .then(ai.cmp(bi))
        });

        let mut kept: Vec<(LabelSpan, usize)> = Vec::with_capacity(spans.len());
        for (span, index) in spans {
            if kept.last().is_some_and(|(last, _)| span.start < last.end) {
                continue;
            }
            kept.push((span, index));
        }

        let mut extraction = Extraction::default();
        for matcher in &self.matchers {
            extraction.occurrences.insert(matcher.name().to_string(), 0);
        }

        for (position, (span, index)) in kept.iter().enumerate() {
            let name = self.matchers[*index].name();
            let count = extraction.occurrences.entry(name.to_string()).or_insert(0);
            *count += 1;
            if *count > 1 {
                continue;
            }
            if !span.bold {
                extraction.unbolded.insert(name.to_string());
            }

            let value_end = kept
                .get(position + 1)
                .map_or(text.len(), |(next, _)| next.start);
            let value = clean_value(&text[span.end..value_end]);
            if !value.is_empty() {
                extraction.values.insert(name.to_string(), value);
            }
        }

        extraction
    }

    /// Captured value of the field named `name`, if present and non-empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use report_sorter_core::{Validator, ValidatorConfig};
    ///
    /// let validator = Validator::new(ValidatorConfig::default()).unwrap();
    /// let text = "**Technician name:** Steve Brown\n**Date of service:** 3/13/2024\n";
    /// assert_eq!(
    ///     validator.extract_field(text, "Technician name").as_deref(),
    ///     Some("Steve Brown")
    /// );
    /// assert_eq!(validator.extract_field(text, "Next steps?"), None);
    /// ```
    pub fn extract_field(&self, text: &str, name: &str) -> Option<String> {
        let text = normalize_newlines(text);
        self.extract(&text).values.remove(name)
    }
}

/// Counts whitespace-delimited words, skipping separator-only lines.
///
/// # Examples
///
/// ```
/// use report_sorter_core::count_words;
///
/// assert_eq!(count_words("one two\n------\nthree"), 3);
/// assert_eq!(count_words(""), 0);
/// ```
pub fn count_words(text: &str) -> usize {
    text.lines()
        .filter(|line| !is_separator_line(line))
        .map(|line| line.split_whitespace().count())
        .sum()
}

fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Trims a captured value and drops trailing separator-only lines.
fn clean_value(raw: &str) -> String {
    let mut lines: Vec<&str> = raw.lines().collect();
    while lines
        .last()
        .is_some_and(|line| line.trim().is_empty() || is_separator_line(line))
    {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}
