//! Minimal CSV handling for the tabular reports and the title map.

use std::borrow::Cow;

/// Quotes `field` when it contains a comma, quote or line break.
///
/// # Examples
///
/// ```
/// use report_sorter_core::table::escape_field;
///
/// assert_eq!(escape_field("plain"), "plain");
/// assert_eq!(escape_field("a, b"), "\"a, b\"");
/// assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
/// ```
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Renders one record followed by a newline.
pub fn render_record<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = fields
        .iter()
        .map(|field| escape_field(field.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

/// Parses CSV text into records.
///
/// Quoted fields may contain commas, doubled quotes and line breaks. Blank
/// lines are skipped and CRLF line endings are accepted.
///
/// # Examples
///
/// ```
/// use report_sorter_core::table::parse_records;
///
/// let records = parse_records("a.md,\"Title, with comma\"\r\n\nb.md,Plain\n");
/// assert_eq!(records, vec![
///     vec!["a.md".to_string(), "Title, with comma".to_string()],
///     vec!["b.md".to_string(), "Plain".to_string()],
/// ]);
/// ```
pub fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => finish_record(&mut records, &mut record, &mut field),
            _ => field.push(c),
        }
    }
    finish_record(&mut records, &mut record, &mut field);

    records
}

fn finish_record(records: &mut Vec<Vec<String>>, record: &mut Vec<String>, field: &mut String) {
    if record.is_empty() && field.trim().is_empty() {
        field.clear();
        return;
    }
    record.push(std::mem::take(field));
    records.push(std::mem::take(record));
}
