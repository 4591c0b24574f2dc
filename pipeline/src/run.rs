//! End-to-end validation run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use report_sorter_core::{AggregateReport, Classification, DEFAULT_RARE_THRESHOLD, Validator};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::load::validate_scanned;
use crate::reports::{ReportPaths, ValidationReport, write_reports};
use crate::router::{Router, ValidatedDocument};
use crate::scan::{ScanOptions, collect_documents};

/// Inputs of one run besides the validator and router.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub input_dir: PathBuf,
    pub scan: ScanOptions,
    /// Log each valid document, not only invalid ones.
    pub show_valid: bool,
    pub rare_threshold: usize,
    pub generated_at: DateTime<Utc>,
}

impl RunRequest {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            scan: ScanOptions::default(),
            show_valid: false,
            rare_threshold: DEFAULT_RARE_THRESHOLD,
            generated_at: Utc::now(),
        }
    }
}

/// A finished run: the full report and where it was written.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: ValidationReport,
    pub paths: ReportPaths,
}

/// Runs prepare, scan, validate, place, aggregate and report in order.
///
/// The output tree is excluded from the scan when it lies inside the input
/// directory.
///
/// # Errors
///
/// Fails before any document is read if the output directories cannot be
/// prepared or the input directory is missing, and after placement only if
/// the reports cannot be written. Per-document failures are part of the
/// report instead.
pub fn run_validation(
    validator: &Validator,
    router: &Router,
    request: &RunRequest,
) -> Result<RunOutcome> {
    if request.rare_threshold == 0 {
        return Err(PipelineError::InvalidInput(
            "rare threshold must be at least 1".to_string(),
        ));
    }

    router.prepare()?;

    let mut scan = request.scan.clone();
    scan.excluded_paths.push(router.layout().report_dir.clone());
    let scanned = collect_documents(&request.input_dir, &scan)?;
    info!(
        input = %request.input_dir.display(),
        documents = scanned.documents.len(),
        "validating documents"
    );

    let mut validated = Vec::with_capacity(scanned.documents.len());
    for document in &scanned.documents {
        let result = validate_scanned(validator, document);
        match result.classification {
            Classification::Invalid => warn!(
                document = %result.document,
                codes = %result.error_codes().join(", "),
                "invalid document"
            ),
            Classification::Valid if request.show_valid => {
                info!(document = %result.document, "valid document")
            }
            classification => {
                debug!(document = %result.document, %classification, "classified")
            }
        }
        validated.push(ValidatedDocument {
            source: document.path.clone(),
            result,
        });
    }

    let placement = router.place(&validated);
    let results: Vec<_> = validated.into_iter().map(|doc| doc.result).collect();
    let aggregate = AggregateReport::build(&results, request.rare_threshold);

    let report = ValidationReport {
        generated_at: request.generated_at.to_rfc3339(),
        input_dir: request.input_dir.clone(),
        match_mode: validator.config().match_mode,
        run_mode: router.config().run_mode,
        ignored_files: scanned.ignored_files,
        results,
        aggregate,
        placement,
    };
    let paths = write_reports(&router.layout().report_dir, &report)?;
    info!(
        valid = report.aggregate.counts.valid,
        invalid = report.aggregate.counts.invalid,
        maintenance = report.aggregate.counts.maintenance,
        reports = %router.layout().report_dir.display(),
        "run complete"
    );

    Ok(RunOutcome { report, paths })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use report_sorter_core::{PlacementMode, ReportDocument, RunMode, ValidatorConfig};

    use super::*;
    use crate::router::{OutputLayout, RouterConfig};

    const COMPLETE: &str = "\
**Date of service:** 3/14/2024
**Technician name:** Steve Brown
**Customer point of contact:** Dana
**Description of problem:** Camera offline
**Description of work performed:** Replaced PoE injector
**Issue resolved?** Yes
**Next steps?** None
";

    const PARTIAL: &str = "\
Technician name: Steve Brown
Date of service: 3/13/2024
";

    fn router(output: &Path, placement: PlacementMode, run_mode: RunMode) -> Router {
        Router::new(RouterConfig {
            layout: OutputLayout::new(output, "validated"),
            placement,
            run_mode,
        })
    }

    fn seed(input: &Path) {
        fs::create_dir_all(input).unwrap();
        fs::write(input.join("240314_Cams.md"), COMPLETE).unwrap();
        fs::write(input.join("240313_Cams.md"), PARTIAL).unwrap();
        fs::write(input.join("240314_PM_Cams.md"), COMPLETE).unwrap();
    }

    fn validator() -> Validator {
        Validator::new(ValidatorConfig::default()).unwrap()
    }

    #[test]
    fn test_run_classifies_and_writes_reports() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reports");
        seed(&input);
        let router = router(&dir.path().join("out"), PlacementMode::Copy, RunMode::Apply);

        let outcome = run_validation(&validator(), &router, &RunRequest::new(&input)).unwrap();
        let counts = outcome.report.aggregate.counts;
        assert_eq!((counts.valid, counts.invalid, counts.maintenance), (1, 1, 1));
        assert!(outcome.paths.iter().all(Path::exists));
        assert_eq!(outcome.report.placement.placed.len(), 3);
        assert!(
            router
                .layout()
                .bucket(Classification::Maintenance)
                .join("240314_PM_Cams.md")
                .exists()
        );
    }

    #[test]
    fn test_report_only_run_leaves_inputs_alone() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reports");
        seed(&input);
        let router = router(&dir.path().join("out"), PlacementMode::Move, RunMode::ReportOnly);

        let outcome = run_validation(&validator(), &router, &RunRequest::new(&input)).unwrap();
        assert!(outcome.report.placement.skipped);
        assert_eq!(fs::read_dir(&input).unwrap().count(), 3);
        assert!(!router.layout().validated_root.exists());
    }

    #[test]
    fn test_empty_input_gives_zero_counts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reports");
        fs::create_dir_all(&input).unwrap();
        let router = router(&dir.path().join("out"), PlacementMode::Copy, RunMode::Apply);

        let outcome = run_validation(&validator(), &router, &RunRequest::new(&input)).unwrap();
        assert_eq!(outcome.report.aggregate.counts.total, 0);
        assert!(outcome.paths.summary.exists());
    }

    #[test]
    fn test_unwritable_output_aborts_before_moving_anything() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reports");
        seed(&input);
        let output = dir.path().join("out");
        fs::write(&output, "a file where the output tree should be").unwrap();
        let router = router(&output, PlacementMode::Move, RunMode::Apply);

        let err = run_validation(&validator(), &router, &RunRequest::new(&input)).unwrap_err();
        assert!(matches!(err, PipelineError::CreateDir { .. }));
        assert_eq!(fs::read_to_string(input.join("240313_Cams.md")).unwrap(), PARTIAL);
        assert_eq!(fs::read_dir(&input).unwrap().count(), 3);
    }

    #[test]
    fn test_output_inside_input_is_not_rescanned() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reports");
        seed(&input);
        let router = router(&input.join("_out"), PlacementMode::Copy, RunMode::Apply);

        run_validation(&validator(), &router, &RunRequest::new(&input)).unwrap();
        let second = run_validation(&validator(), &router, &RunRequest::new(&input)).unwrap();
        assert_eq!(second.report.aggregate.counts.total, 3);
    }

    #[test]
    fn test_copy_runs_are_idempotent_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reports");
        seed(&input);
        let router = router(&dir.path().join("out"), PlacementMode::Copy, RunMode::Apply);
        let validator = validator();

        let first = run_validation(&validator, &router, &RunRequest::new(&input)).unwrap();
        let second = run_validation(&validator, &router, &RunRequest::new(&input)).unwrap();
        assert_eq!(first.report.results, second.report.results);
        assert_eq!(first.report.placement.placed, second.report.placement.placed);

        let valid_bucket = router.layout().bucket(Classification::Valid);
        let placed = fs::read(valid_bucket.join("240314_Cams.md")).unwrap();
        let revalidated = validator.validate(&ReportDocument::new("240314_Cams.md", placed));
        assert_eq!(revalidated.classification, Classification::Valid);
    }

    #[test]
    fn test_zero_rare_threshold_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let router = router(&dir.path().join("out"), PlacementMode::Copy, RunMode::ReportOnly);
        let mut request = RunRequest::new(dir.path());
        request.rare_threshold = 0;
        assert!(matches!(
            run_validation(&validator(), &router, &request),
            Err(PipelineError::InvalidInput(_))
        ));
    }
}
