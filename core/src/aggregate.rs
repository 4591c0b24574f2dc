//! Run-level statistics built from per-document results.
//!
//! [`AggregateReport::build`] reduces a full result collection once, at the
//! end of a run. Every table it produces is sorted by value and then by key,
//! so the report does not depend on the order documents were processed in.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::{Classification, InvalidReason, ValidationResult};

/// Default minimum number of documents sharing a missing-field combination
/// for it to count as a common pattern.
pub const DEFAULT_RARE_THRESHOLD: usize = 2;

/// Number of documents per classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationCounts {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub maintenance: usize,
    /// Invalid documents that could not be read or decoded.
    pub unreadable: usize,
    /// Invalid documents with no recognizable field label.
    pub unstructured: usize,
}

impl ClassificationCounts {
    pub fn get(&self, classification: Classification) -> usize {
        match classification {
            Classification::Valid => self.valid,
            Classification::Invalid => self.invalid,
            Classification::Maintenance => self.maintenance,
        }
    }

    /// Share of `classification` in percent; zero for an empty run.
    pub fn percent(&self, classification: Classification) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.get(classification) as f64 / self.total as f64 * 100.0
    }
}

/// Summary statistics over a set of word counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WordCountStats {
    pub count: usize,
    pub total: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    pub median: f64,
}

impl WordCountStats {
    /// Computes statistics; every value is zero for an empty input.
    ///
    /// # Examples
    ///
    /// ```
    /// use report_sorter_core::WordCountStats;
    ///
    /// let stats = WordCountStats::from_counts(&[10, 40, 20, 30]);
    /// assert_eq!((stats.min, stats.max, stats.total), (10, 40, 100));
    /// assert_eq!(stats.mean, 25.0);
    /// assert_eq!(stats.median, 25.0);
    /// ```
    pub fn from_counts(counts: &[usize]) -> Self {
        if counts.is_empty() {
            return Self::default();
        }

        let mut sorted = counts.to_vec();
        sorted.sort_unstable();
        let total: usize = sorted.iter().sum();
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
        } else {
            sorted[mid] as f64
        };

        Self {
            count: sorted.len(),
            total,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: total as f64 / sorted.len() as f64,
            median,
        }
    }
}

/// One row of a frequency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub key: String,
    pub count: usize,
}

/// One row of the per-document word count listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCountEntry {
    pub document: String,
    pub words: usize,
    pub classification: Classification,
}

/// An invalid document whose failure signature is uncommon in this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RareDocument {
    pub document: String,
    pub signature: String,
    pub missing_fields: Vec<String>,
    pub error_codes: Vec<String>,
    pub word_count: usize,
}

/// Aggregate statistics for one validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub counts: ClassificationCounts,
    pub word_stats: WordCountStats,
    pub word_stats_by_classification: BTreeMap<Classification, WordCountStats>,
    /// Missing-field names across invalid documents, most frequent first.
    pub missing_field_frequency: Vec<FrequencyEntry>,
    /// Issue codes across all documents, most frequent first.
    pub issue_frequency: Vec<FrequencyEntry>,
    /// Failure signatures across invalid documents, most frequent first.
    pub combination_frequency: Vec<FrequencyEntry>,
    /// Per-document word counts, longest first.
    pub word_counts: Vec<WordCountEntry>,
    pub rare: Vec<RareDocument>,
    pub rare_threshold: usize,
}

impl AggregateReport {
    /// Reduces `results` into counts, frequency tables and word statistics.
    ///
    /// A failure signature is rare when fewer than `rare_threshold` invalid
    /// documents share it.
    ///
    /// # Examples
    ///
    /// ```
    /// use report_sorter_core::*;
    ///
    /// let report = AggregateReport::build(&[], DEFAULT_RARE_THRESHOLD);
    /// assert_eq!(report.counts.total, 0);
    /// assert_eq!(report.counts.valid + report.counts.invalid + report.counts.maintenance, 0);
    /// assert!(report.missing_field_frequency.is_empty());
    /// ```
    pub fn build(results: &[ValidationResult], rare_threshold: usize) -> Self {
        let mut counts = ClassificationCounts {
            total: results.len(),
            ..ClassificationCounts::default()
        };
        let mut words_by_class: BTreeMap<Classification, Vec<usize>> = Classification::ALL
            .iter()
            .map(|classification| (*classification, Vec::new()))
            .collect();
        let mut missing: HashMap<&str, usize> = HashMap::new();
        let mut issues: HashMap<String, usize> = HashMap::new();
        let mut signatures: HashMap<String, usize> = HashMap::new();
        let mut word_counts = Vec::with_capacity(results.len());

        for result in results {
            match result.classification {
                Classification::Valid => counts.valid += 1,
                Classification::Invalid => counts.invalid += 1,
                Classification::Maintenance => counts.maintenance += 1,
            }
            if result.is_unreadable() {
                counts.unreadable += 1;
            }
            if result.is_unstructured() {
                counts.unstructured += 1;
            }

            if let Some(words) = words_by_class.get_mut(&result.classification) {
                words.push(result.word_count);
            }
            word_counts.push(WordCountEntry {
                document: result.document.clone(),
                words: result.word_count,
                classification: result.classification,
            });

            for code in result.error_codes() {
                *issues.entry(code).or_insert(0) += 1;
            }

            if result.classification == Classification::Invalid {
                for field in &result.missing_fields {
                    *missing.entry(field.as_str()).or_insert(0) += 1;
                }
                *signatures.entry(failure_signature(result)).or_insert(0) += 1;
            }
        }

        word_counts.sort_by(|a, b| {
            b.words
                .cmp(&a.words)
                .then_with(|| a.document.cmp(&b.document))
        });

        let all_words: Vec<usize> = results.iter().map(|result| result.word_count).collect();
        let word_stats_by_classification = words_by_class
            .into_iter()
            .map(|(classification, words)| (classification, WordCountStats::from_counts(&words)))
            .collect();

        let mut rare: Vec<RareDocument> = results
            .iter()
            .filter(|result| result.classification == Classification::Invalid)
            .filter_map(|result| {
                let signature = failure_signature(result);
                let shared = signatures.get(&signature).copied().unwrap_or(0);
                (shared < rare_threshold).then(|| RareDocument {
                    document: result.document.clone(),
                    signature,
                    missing_fields: result.missing_fields.iter().cloned().collect(),
                    error_codes: result.error_codes(),
                    word_count: result.word_count,
                })
            })
            .collect();
        rare.sort_by(|a, b| a.document.cmp(&b.document));

        Self {
            counts,
            word_stats: WordCountStats::from_counts(&all_words),
            word_stats_by_classification,
            missing_field_frequency: frequency_table(
                missing.into_iter().map(|(key, count)| (key.to_string(), count)),
            ),
            issue_frequency: frequency_table(issues),
            combination_frequency: frequency_table(signatures),
            word_counts,
            rare,
            rare_threshold,
        }
    }

    /// Statistics for one classification (zeroed if absent).
    pub fn word_stats_for(&self, classification: Classification) -> WordCountStats {
        self.word_stats_by_classification
            .get(&classification)
            .copied()
            .unwrap_or_default()
    }

    /// The `limit` most frequent issue codes.
    pub fn top_issues(&self, limit: usize) -> &[FrequencyEntry] {
        &self.issue_frequency[..self.issue_frequency.len().min(limit)]
    }
}

/// Groups invalid documents that failed the same way: the reason code for
/// unreadable and unstructured documents, otherwise the sorted missing fields.
pub fn failure_signature(result: &ValidationResult) -> String {
    match &result.invalid_reason {
        Some(InvalidReason::Unreadable { .. }) => "UNREADABLE".to_string(),
        Some(reason @ InvalidReason::Unstructured) => reason.code(),
        _ => result
            .missing_fields
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" + "),
    }
}

/// Sorts `(key, count)` pairs by count descending, then key ascending.
fn frequency_table(entries: impl IntoIterator<Item = (String, usize)>) -> Vec<FrequencyEntry> {
    let mut table: Vec<FrequencyEntry> = entries
        .into_iter()
        .map(|(key, count)| FrequencyEntry { key, count })
        .collect();
    table.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    table
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::types::{Issue, IssueKind};

    use super::*;

    fn result(
        document: &str,
        classification: Classification,
        missing: &[&str],
        words: usize,
    ) -> ValidationResult {
        let missing_fields: BTreeSet<String> = missing.iter().map(|m| m.to_string()).collect();
        ValidationResult {
            document: document.to_string(),
            classification,
            invalid_reason: (classification == Classification::Invalid)
                .then_some(InvalidReason::MissingFields),
            issues: missing
                .iter()
                .map(|field| Issue::new(IssueKind::Missing, *field))
                .collect(),
            missing_fields,
            word_count: words,
            fields: BTreeMap::new(),
        }
    }

    fn sample() -> Vec<ValidationResult> {
        vec![
            result("a.md", Classification::Valid, &[], 120),
            result("b.md", Classification::Invalid, &["Next steps?"], 80),
            result("c.md", Classification::Invalid, &["Next steps?"], 95),
            result("d.md", Classification::Invalid, &["Date of service", "Next steps?"], 40),
            result("e_PM.md", Classification::Maintenance, &["Date of service"], 60),
            ValidationResult::unreadable("f.md", "bad bytes"),
        ]
    }

    #[test]
    fn test_counts_per_classification() {
        let report = AggregateReport::build(&sample(), DEFAULT_RARE_THRESHOLD);
        assert_eq!(report.counts.total, 6);
        assert_eq!(report.counts.valid, 1);
        assert_eq!(report.counts.invalid, 4);
        assert_eq!(report.counts.maintenance, 1);
        assert_eq!(report.counts.unreadable, 1);
        assert_eq!(report.counts.percent(Classification::Valid), 100.0 / 6.0);
    }

    #[test]
    fn test_missing_field_frequency_counts_invalid_only_and_sorts() {
        let report = AggregateReport::build(&sample(), DEFAULT_RARE_THRESHOLD);
        assert_eq!(
            report.missing_field_frequency,
            vec![
                FrequencyEntry {
                    key: "Next steps?".to_string(),
                    count: 3
                },
                FrequencyEntry {
                    key: "Date of service".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_frequency_ties_break_by_name() {
        let results = vec![
            result("a.md", Classification::Invalid, &["Technician name"], 1),
            result("b.md", Classification::Invalid, &["Date of service"], 1),
        ];
        let report = AggregateReport::build(&results, DEFAULT_RARE_THRESHOLD);
        let keys: Vec<&str> = report
            .missing_field_frequency
            .iter()
            .map(|entry| entry.key.as_str())
            .collect();
        assert_eq!(keys, vec!["Date of service", "Technician name"]);
    }

    #[test]
    fn test_report_is_order_independent() {
        let forward = AggregateReport::build(&sample(), DEFAULT_RARE_THRESHOLD);
        let mut reversed_input = sample();
        reversed_input.reverse();
        let reversed = AggregateReport::build(&reversed_input, DEFAULT_RARE_THRESHOLD);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_word_counts_sorted_longest_first() {
        let report = AggregateReport::build(&sample(), DEFAULT_RARE_THRESHOLD);
        let words: Vec<usize> = report.word_counts.iter().map(|entry| entry.words).collect();
        assert_eq!(words, vec![120, 95, 80, 60, 40, 0]);
        assert_eq!(report.word_stats.min, 0);
        assert_eq!(report.word_stats.max, 120);
        assert_eq!(report.word_stats_for(Classification::Valid).mean, 120.0);
    }

    #[test]
    fn test_rare_documents_have_unshared_signatures() {
        let report = AggregateReport::build(&sample(), DEFAULT_RARE_THRESHOLD);
        let rare: Vec<&str> = report.rare.iter().map(|doc| doc.document.as_str()).collect();
        assert_eq!(rare, vec!["d.md", "f.md"]);
        assert_eq!(report.rare[0].signature, "Date of service + Next steps?");
        assert_eq!(report.rare[1].signature, "UNREADABLE");
        assert_eq!(report.combination_frequency[0].key, "Next steps?");
        assert_eq!(report.combination_frequency[0].count, 2);
    }

    #[test]
    fn test_top_issues_truncates() {
        let report = AggregateReport::build(&sample(), DEFAULT_RARE_THRESHOLD);
        assert_eq!(report.top_issues(1).len(), 1);
        assert_eq!(report.top_issues(1)[0].key, "MISSING_FIELD:Next steps?");
        assert_eq!(report.top_issues(100).len(), report.issue_frequency.len());
    }

    #[test]
    fn test_empty_run_has_zero_stats() {
        let report = AggregateReport::build(&[], DEFAULT_RARE_THRESHOLD);
        assert_eq!(report.counts, ClassificationCounts::default());
        assert_eq!(report.word_stats, WordCountStats::default());
        assert_eq!(report.counts.percent(Classification::Invalid), 0.0);
        assert!(report.rare.is_empty());
    }

    #[test]
    fn test_median_of_odd_count() {
        let stats = WordCountStats::from_counts(&[5, 1, 3]);
        assert_eq!(stats.median, 3.0);
    }
}
