//! Field label recognition.
//!
//! A label is recognized only at the start of a line, after optional
//! indentation, blockquote markers, heading hashes, a list bullet or number,
//! and an optional opening bold marker. What may follow the label text depends
//! on the [`MatchMode`]. A plain line holding only a label word is treated as
//! a value, never as a label.

use regex::{Regex, RegexBuilder};

use crate::types::{FieldRequirement, MatchMode};

const LINE_PREFIX: &str =
    r"^[ \t]*(?:>[ \t]*)*(?:#{1,6}[ \t]+)?(?:(?:[-+*]|\d+[.)])[ \t]+)?(?P<bold>\*\*|__)?[ \t]*";

// Punctuation inside or outside the bold span, or a bare closing bold span.
const NORMALIZED_TERMINATOR: &str =
    r"(?:[ \t]*[:?]+[ \t]*(?:\*\*|__)?[ \t]*[:?]*|[ \t]*(?:\*\*|__)[ \t]*[:?]*)[ \t]*";

// A heading made of the label alone, with no punctuation.
const HEADING_PREFIX: &str = r"^[ \t]*(?:>[ \t]*)*#{1,6}[ \t]+";
const HEADING_TERMINATOR: &str = r"[ \t]*$";

const STRICT_TERMINATOR: &str = r"(?:\*\*|__)?[ \t]*";

/// Byte range of one recognized label, from the start of its line to the
/// first byte of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LabelSpan {
    pub start: usize,
    pub end: usize,
    /// The label opened with `**` or `__`.
    pub bold: bool,
}

/// Compiled matcher for every label of one field.
#[derive(Debug, Clone)]
pub struct FieldMatcher {
    name: String,
    required: bool,
    pattern: Regex,
}

impl FieldMatcher {
    /// Compiles the labels of `field` for `mode`.
    ///
    /// # Errors
    ///
    /// Returns the regex error message if the combined pattern cannot be
    /// compiled (for example when it exceeds the size limit).
    pub fn new(field: &FieldRequirement, mode: MatchMode) -> Result<Self, String> {
        let mut labels: Vec<&str> = field
            .labels(mode == MatchMode::Normalized)
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .collect();
        // Longest first so a short alias never shadows a longer label.
        labels.sort_by_key(|label| std::cmp::Reverse(label.len()));

        let (alternatives, terminator): (Vec<String>, &str) = match mode {
            MatchMode::Normalized => (
                labels.iter().map(|label| normalized_label(label)).collect(),
                NORMALIZED_TERMINATOR,
            ),
            MatchMode::Strict => (
                labels.iter().map(|label| strict_label(label)).collect(),
                STRICT_TERMINATOR,
            ),
        };

        let labels = alternatives.join("|");
        let source = match mode {
            MatchMode::Normalized => {
                let inline = format!("{LINE_PREFIX}(?:{labels}){terminator}");
                let heading = format!("{HEADING_PREFIX}(?:{labels}){HEADING_TERMINATOR}");
                format!("(?:{inline})|(?:{heading})")
            }
            MatchMode::Strict => format!("{LINE_PREFIX}(?:{labels}){terminator}"),
        };
        let pattern = RegexBuilder::new(&source)
            .multi_line(true)
            .case_insensitive(mode == MatchMode::Normalized)
            .build()
            .map_err(|err| err.to_string())?;

        Ok(Self {
            name: field.name.clone(),
            required: field.required,
            pattern,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required(&self) -> bool {
        self.required
    }

    /// Returns every label occurrence in `text`, in document order.
    ///
    /// # Examples
    ///
    /// ```
    /// use report_sorter_core::{FieldMatcher, FieldRequirement, MatchMode};
    ///
    /// let field = FieldRequirement::required("Date of service");
    /// let matcher = FieldMatcher::new(&field, MatchMode::Normalized).unwrap();
    /// let text = "- **Date Of Service**: 3/13/2024\nbody";
    /// let spans = matcher.find(text);
    /// assert_eq!(spans.len(), 1);
    /// assert_eq!(text[spans[0].end..].lines().next(), Some("3/13/2024"));
    /// ```
    pub fn find(&self, text: &str) -> Vec<LabelSpan> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some(LabelSpan {
                    start: whole.start(),
                    end: whole.end(),
                    bold: caps.name("bold").is_some(),
                })
            })
            .collect()
    }
}

/// Label text without trailing `:`/`?`, compared case-insensitively with any
/// run of blanks between words.
fn normalized_label(label: &str) -> String {
    label_core(label)
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"[ \t]+")
}

/// Exact label text including its punctuation; labels without trailing
/// punctuation require a colon.
fn strict_label(label: &str) -> String {
    if label.ends_with([':', '?']) {
        regex::escape(label)
    } else {
        regex::escape(&format!("{label}:"))
    }
}

/// Label text with trailing punctuation and blanks removed.
pub(crate) fn label_core(label: &str) -> &str {
    label.trim().trim_end_matches([':', '?']).trim_end()
}

/// Returns `true` for lines made only of one repeated separator character
/// (`---`, `***`, `___`, `===`, optionally spaced).
pub fn is_separator_line(line: &str) -> bool {
    let mut chars = line.chars().filter(|c| !c.is_whitespace());
    let Some(first) = chars.next() else {
        return false;
    };
    if !matches!(first, '-' | '*' | '_' | '=') {
        return false;
    }
    let mut count = 1;
    for c in chars {
        if c != first {
            return false;
        }
        count += 1;
    }
    count >= 3
}
