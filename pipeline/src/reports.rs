//! Run report rendering and writing.
//!
//! Rendering is pure: each `render_*` function turns a [`ValidationReport`]
//! into the text of one report file. [`write_reports`] writes all of them.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use report_sorter_core::table::render_record;
use report_sorter_core::{
    AggregateReport, Classification, MatchMode, RunMode, ValidationResult, WordCountStats,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::router::PlacementSummary;

/// Number of issue codes listed in the summary.
pub const TOP_ISSUES: usize = 5;

/// Everything known about a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// RFC 3339 timestamp of the run.
    pub generated_at: String,
    pub input_dir: PathBuf,
    pub match_mode: MatchMode,
    pub run_mode: RunMode,
    /// Files skipped because of their extension.
    pub ignored_files: usize,
    pub results: Vec<ValidationResult>,
    pub aggregate: AggregateReport,
    pub placement: PlacementSummary,
}

/// Locations of the report files written for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPaths {
    pub summary: PathBuf,
    pub word_counts: PathBuf,
    pub error_summary: PathBuf,
    pub rare_errors: PathBuf,
    pub json: PathBuf,
}

impl ReportPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            summary: dir.join("summary.txt"),
            word_counts: dir.join("word_counts.csv"),
            error_summary: dir.join("error_summary.csv"),
            rare_errors: dir.join("rare_errors.txt"),
            json: dir.join("validation.json"),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [
            &self.summary,
            &self.word_counts,
            &self.error_summary,
            &self.rare_errors,
            &self.json,
        ]
        .into_iter()
        .map(PathBuf::as_path)
    }
}

/// Writes every report into `dir`.
///
/// # Errors
///
/// Returns [`Io`](crate::PipelineError::Io) or
/// [`Json`](crate::PipelineError::Json) on write failure.
pub fn write_reports(dir: &Path, report: &ValidationReport) -> Result<ReportPaths> {
    let paths = ReportPaths::in_dir(dir);

    write_text(&paths.summary, &render_summary(report))?;
    write_text(&paths.word_counts, &render_word_counts(&report.aggregate))?;
    write_text(&paths.error_summary, &render_error_summary(&report.aggregate))?;
    write_text(&paths.rare_errors, &render_rare_errors(&report.aggregate))?;

    let mut writer = BufWriter::new(File::create(&paths.json)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    Ok(paths)
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(text.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Plain-text run summary: counts, word statistics, top issues, placement.
pub fn render_summary(report: &ValidationReport) -> String {
    let aggregate = &report.aggregate;
    let counts = &aggregate.counts;
    let mut out = String::new();

    out.push_str("Validation Summary\n");
    out.push_str("==================\n\n");
    out.push_str(&format!("Generated: {}\n", report.generated_at));
    out.push_str(&format!("Input: {}\n", report.input_dir.display()));
    out.push_str(&format!("Matching: {}\n", match_mode_name(report.match_mode)));
    out.push_str(&format!("Placement: {}\n\n", placement_line(report)));

    out.push_str(&format!("Total documents: {}\n", counts.total));
    for classification in Classification::ALL {
        out.push_str(&format!(
            "{}: {} ({:.1}%)\n",
            classification.label(),
            counts.get(classification),
            counts.percent(classification)
        ));
        if classification == Classification::Invalid {
            out.push_str(&format!("  Unreadable: {}\n", counts.unreadable));
            out.push_str(&format!("  Unstructured: {}\n", counts.unstructured));
        }
    }
    if report.ignored_files > 0 {
        out.push_str(&format!("Ignored files: {}\n", report.ignored_files));
    }

    out.push_str("\nWord counts\n");
    out.push_str(&format!("  All: {}\n", stats_line(&aggregate.word_stats)));
    for classification in Classification::ALL {
        out.push_str(&format!(
            "  {}: {}\n",
            classification.label(),
            stats_line(&aggregate.word_stats_for(classification))
        ));
    }

    out.push_str("\nTop issues\n");
    let top = aggregate.top_issues(TOP_ISSUES);
    if top.is_empty() {
        out.push_str("  none\n");
    }
    for (i, entry) in top.iter().enumerate() {
        out.push_str(&format!("  {}. {} ({})\n", i + 1, entry.key, entry.count));
    }

    if !report.placement.skipped {
        out.push_str("\nPlacement\n");
        out.push_str(&format!("  Placed: {}\n", report.placement.placed.len()));
        out.push_str(&format!("  Failed: {}\n", report.placement.failed.len()));
        for failure in &report.placement.failed {
            out.push_str(&format!("    - {}: {}\n", failure.document, failure.error));
        }
    }

    out
}

/// `FILENAME,WORD_COUNT,CATEGORY` rows, longest document first.
pub fn render_word_counts(aggregate: &AggregateReport) -> String {
    let mut out = render_record(&["FILENAME", "WORD_COUNT", "CATEGORY"]);
    for entry in &aggregate.word_counts {
        out.push_str(&render_record(&[
            entry.document.as_str(),
            entry.words.to_string().as_str(),
            entry.classification.label(),
        ]));
    }
    out
}

/// `FIELD,MISSING_COUNT` rows, most frequently missing first.
pub fn render_error_summary(aggregate: &AggregateReport) -> String {
    let mut out = render_record(&["FIELD", "MISSING_COUNT"]);
    for entry in &aggregate.missing_field_frequency {
        out.push_str(&render_record(&[entry.key.as_str(), entry.count.to_string().as_str()]));
    }
    out
}

/// Common failure patterns followed by per-document detail for the rare
/// ones.
pub fn render_rare_errors(aggregate: &AggregateReport) -> String {
    let mut out = String::new();

    out.push_str("Rare Errors\n");
    out.push_str("===========\n\n");
    out.push_str(&format!(
        "Combinations shared by fewer than {} invalid documents.\n\n",
        aggregate.rare_threshold
    ));

    out.push_str("Failure patterns\n");
    if aggregate.combination_frequency.is_empty() {
        out.push_str("  none\n");
    }
    for entry in &aggregate.combination_frequency {
        out.push_str(&format!("  {} x {}\n", entry.count, entry.key));
    }

    out.push_str(&format!("\nRare documents: {}\n", aggregate.rare.len()));
    for doc in &aggregate.rare {
        out.push_str(&format!("\n{}\n", doc.document));
        out.push_str(&format!("  Pattern: {}\n", doc.signature));
        out.push_str(&format!("  Words: {}\n", doc.word_count));
        if !doc.missing_fields.is_empty() {
            out.push_str(&format!("  Missing: {}\n", doc.missing_fields.join(", ")));
        }
        for code in &doc.error_codes {
            out.push_str(&format!("  - {code}\n"));
        }
    }

    out
}

fn stats_line(stats: &WordCountStats) -> String {
    format!(
        "n={} total={} min={} max={} mean={:.1} median={:.1}",
        stats.count, stats.total, stats.min, stats.max, stats.mean, stats.median
    )
}

fn match_mode_name(mode: MatchMode) -> &'static str {
    match mode {
        MatchMode::Normalized => "normalized",
        MatchMode::Strict => "strict",
    }
}

fn placement_line(report: &ValidationReport) -> String {
    match report.run_mode {
        RunMode::ReportOnly => "report only (no files placed)".to_string(),
        RunMode::Apply => format!("{} (applied)", report.placement.mode),
    }
}
