//! Report type definitions for validation and classification.
//!
//! These types model one validation run: the field requirements a report is
//! checked against, the immutable input document, and the per-document
//! outcome. All of them serialize with [`serde`] so results can be written to
//! JSON reports unchanged.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Destination bucket assigned to one document.
///
/// # Examples
///
/// ```
/// use report_sorter_core::Classification;
///
/// assert_eq!(Classification::Maintenance.to_string(), "maintenance");
/// assert_eq!(Classification::ALL.len(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Every required field is present.
    Valid,
    /// At least one required field is missing, or the document is unreadable.
    Invalid,
    /// The file name carries the maintenance marker.
    Maintenance,
}

impl Classification {
    /// All classifications in report order.
    pub const ALL: [Classification; 3] = [Self::Valid, Self::Invalid, Self::Maintenance];

    /// Stable lowercase name, also used as the bucket directory name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Maintenance => "maintenance",
        }
    }

    /// Capitalized label used in tabular reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Valid => "Valid",
            Self::Invalid => "Invalid",
            Self::Maintenance => "Maintenance",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How field labels are compared against document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Case and whitespace insensitive, aliases accepted.
    #[default]
    Normalized,
    /// Canonical label only, exact casing, spacing and punctuation.
    Strict,
}

/// How a document reaches its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMode {
    /// Copy; the source stays where it is.
    #[default]
    Copy,
    /// Move; the source is removed after a verified placement.
    Move,
}

impl fmt::Display for PlacementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => f.write_str("copy"),
            Self::Move => f.write_str("move"),
        }
    }
}

/// Whether a run places files at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Only analyze and write reports.
    #[default]
    ReportOnly,
    /// Analyze, write reports and place documents into buckets.
    Apply,
}

/// A named field a service report is expected to contain.
///
/// `name` is the canonical label as it should appear in a report (for
/// example `"Date of service"` or `"Next steps?"`) and is the identity used
/// in missing-field sets. `aliases` are alternative labels accepted in
/// normalized matching only.
///
/// # Examples
///
/// ```
/// use report_sorter_core::FieldRequirement;
///
/// let field = FieldRequirement::required("Technician name").with_alias("Technician");
/// assert!(field.required);
/// assert_eq!(field.labels(true).count(), 2);
/// assert_eq!(field.labels(false).count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRequirement {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl FieldRequirement {
    /// Creates a required field with no aliases.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            required: true,
        }
    }

    /// Creates an optional field. Optional fields are extracted and bound
    /// neighbouring values but never make a document invalid.
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name)
        }
    }

    /// Adds an alternative label.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Adds several alternative labels.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Iterates the label texts to look for, canonical name first.
    pub fn labels(&self, include_aliases: bool) -> impl Iterator<Item = &str> {
        let aliases: &[String] = if include_aliases { &self.aliases } else { &[] };
        std::iter::once(self.name.as_str()).chain(aliases.iter().map(String::as_str))
    }
}

/// Ordered collection of field requirements.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSet {
    pub fields: Vec<FieldRequirement>,
}

impl FieldSet {
    pub fn new(fields: Vec<FieldRequirement>) -> Self {
        Self { fields }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldRequirement> {
        self.fields.iter()
    }

    /// Iterates only the fields that decide validity.
    pub fn required(&self) -> impl Iterator<Item = &FieldRequirement> {
        self.fields.iter().filter(|field| field.required)
    }

    pub fn find(&self, name: &str) -> Option<&FieldRequirement> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Vec<FieldRequirement>> for FieldSet {
    fn from(fields: Vec<FieldRequirement>) -> Self {
        Self::new(fields)
    }
}

/// Raw content of one input file, identified by its path relative to the
/// input root. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    name: String,
    bytes: Vec<u8>,
}

impl ReportDocument {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Convenience constructor for already-decoded text.
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, text.as_bytes().to_vec())
    }

    /// Identity of the document (relative path with `/` separators).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Final path component of [`name`](Self::name).
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decodes the content as UTF-8, dropping a leading byte order mark.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        let text = std::str::from_utf8(&self.bytes)?;
        Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
    }
}

/// Kind of a per-field diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// No label for the field was found.
    Missing,
    /// The label was found but no value follows it.
    Empty,
    /// Strict matching found the label without bold markers.
    Unbolded,
    /// The label appears more than once; the first occurrence is used.
    Duplicate,
}

/// One per-field diagnostic found while validating a document.
///
/// # Examples
///
/// ```
/// use report_sorter_core::{Issue, IssueKind};
///
/// let issue = Issue::new(IssueKind::Empty, "Next steps?");
/// assert_eq!(issue.code(), "EMPTY_FIELD:Next steps?");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub field: String,
}

impl Issue {
    pub fn new(kind: IssueKind, field: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
        }
    }

    /// Stable code used in frequency tables and logs.
    pub fn code(&self) -> String {
        let prefix = match self.kind {
            IssueKind::Missing => "MISSING_FIELD",
            IssueKind::Empty => "EMPTY_FIELD",
            IssueKind::Unbolded => "UNBOLDED_FIELD",
            IssueKind::Duplicate => "DUPLICATE_FIELD",
        };
        format!("{prefix}:{}", self.field)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// Why a document was classified [`Classification::Invalid`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidReason {
    /// One or more required fields have no captured value.
    MissingFields,
    /// No configured field label appears anywhere in the document.
    Unstructured,
    /// The content could not be read or decoded as text.
    Unreadable { detail: String },
}

impl InvalidReason {
    /// Stable code used in combination signatures and the summary report.
    pub fn code(&self) -> String {
        match self {
            Self::MissingFields => "MISSING_FIELDS".to_string(),
            Self::Unstructured => "UNSTRUCTURED_DOCUMENT".to_string(),
            Self::Unreadable { detail } => format!("UNREADABLE:{detail}"),
        }
    }
}

/// Outcome of validating one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Document identity (relative path).
    pub document: String,
    pub classification: Classification,
    /// Set only when `classification` is [`Classification::Invalid`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<InvalidReason>,
    /// Required fields with no captured value (also filled for maintenance
    /// documents, where it does not affect classification).
    pub missing_fields: BTreeSet<String>,
    pub issues: Vec<Issue>,
    pub word_count: usize,
    /// Captured values keyed by canonical field name.
    pub fields: BTreeMap<String, String>,
}

impl ValidationResult {
    /// Result for a document whose content could not be read or decoded.
    ///
    /// # Examples
    ///
    /// ```
    /// use report_sorter_core::{Classification, ValidationResult};
    ///
    /// let result = ValidationResult::unreadable("a.md", "permission denied");
    /// assert_eq!(result.classification, Classification::Invalid);
    /// assert!(result.is_unreadable());
    /// assert!(result.missing_fields.is_empty());
    /// ```
    pub fn unreadable(document: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            classification: Classification::Invalid,
            invalid_reason: Some(InvalidReason::Unreadable {
                detail: detail.into(),
            }),
            missing_fields: BTreeSet::new(),
            issues: Vec::new(),
            word_count: 0,
            fields: BTreeMap::new(),
        }
    }

    pub fn is_unreadable(&self) -> bool {
        matches!(self.invalid_reason, Some(InvalidReason::Unreadable { .. }))
    }

    pub fn is_unstructured(&self) -> bool {
        matches!(self.invalid_reason, Some(InvalidReason::Unstructured))
    }

    /// Final path component of the document identity.
    pub fn file_name(&self) -> &str {
        self.document.rsplit('/').next().unwrap_or(&self.document)
    }

    /// Issue codes plus the reason code for unreadable/unstructured documents.
    pub fn error_codes(&self) -> Vec<String> {
        let mut codes = Vec::with_capacity(self.issues.len() + 1);
        match &self.invalid_reason {
            Some(reason @ (InvalidReason::Unreadable { .. } | InvalidReason::Unstructured)) => {
                codes.push(reason.code());
            }
            _ => {}
        }
        codes.extend(self.issues.iter().map(Issue::code));
        codes
    }
}
