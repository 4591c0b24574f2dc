use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const COMPLETE: &str = "\
# Site visit

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

fn report_sorter(args: &[&str]) -> Output {
    report_sorter_logging(args, "warn")
}

fn report_sorter_logging(args: &[&str], filter: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_report-sorter"))
        .args(args)
        .env("RUST_LOG", filter)
        .output()
        .expect("failed to run report-sorter")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

/// Two service reports and one maintenance report.
fn seed_reports(input: &Path) {
    fs::create_dir_all(input).unwrap();
    fs::write(input.join("240314_Cams.md"), COMPLETE).unwrap();
    fs::write(input.join("240313_Cams.md"), PARTIAL).unwrap();
    fs::write(input.join("240301_PM_Doors.md"), PARTIAL).unwrap();
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_report_only_writes_reports_and_places_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    seed_reports(&input);

    let out = report_sorter(&[
        "validate",
        "--input",
        path_arg(&input),
        "--output",
        path_arg(&output),
    ]);

    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Processed 3 document(s)."), "stdout: {stdout}");
    assert!(stdout.contains("Report-only run"), "stdout: {stdout}");
    for name in [
        "summary.txt",
        "word_counts.csv",
        "error_summary.csv",
        "rare_errors.txt",
        "validation.json",
    ] {
        assert!(output.join(name).is_file(), "{name} should be written");
    }
    assert!(!output.join("validated").exists());
    assert!(input.join("240313_Cams.md").is_file());
}

#[test]
fn validate_apply_copies_into_buckets() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    seed_reports(&input);

    let out = report_sorter(&[
        "validate",
        "--input",
        path_arg(&input),
        "--output",
        path_arg(&output),
        "--apply",
    ]);

    assert!(out.status.success());
    let validated = output.join("validated");
    assert!(validated.join("valid/240314_Cams.md").is_file());
    assert!(validated.join("invalid/240313_Cams.md").is_file());
    assert!(validated.join("maintenance/240301_PM_Doors.md").is_file());
    assert!(input.join("240314_Cams.md").is_file(), "copy keeps sources");

    let error_summary = fs::read_to_string(output.join("error_summary.csv")).unwrap();
    assert!(error_summary.starts_with("FIELD,MISSING_COUNT\n"));
    assert!(error_summary.contains("Next steps?,1"));
}

#[test]
fn validate_move_removes_sources() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    seed_reports(&input);

    let out = report_sorter(&[
        "validate",
        "--input",
        path_arg(&input),
        "--output",
        path_arg(&output),
        "--apply",
        "--move",
    ]);

    assert!(out.status.success());
    assert!(!input.join("240314_Cams.md").exists());
    assert!(output.join("validated/valid/240314_Cams.md").is_file());
}

#[test]
fn validate_empty_directory_succeeds_with_zero_counts() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    fs::create_dir_all(&input).unwrap();

    let out = report_sorter(&[
        "validate",
        "--input",
        path_arg(&input),
        "--output",
        path_arg(&output),
        "--json",
    ]);

    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["counts"]["total"], 0);
    assert!(output.join("summary.txt").is_file());
}

#[test]
fn validate_fails_when_output_is_a_file_and_keeps_sources() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    seed_reports(&input);
    fs::write(&output, "not a directory").unwrap();

    let out = report_sorter(&[
        "validate",
        "--input",
        path_arg(&input),
        "--output",
        path_arg(&output),
        "--apply",
        "--move",
    ]);

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("error:"));
    for name in ["240314_Cams.md", "240313_Cams.md", "240301_PM_Doors.md"] {
        assert!(input.join(name).is_file(), "{name} must not be touched");
    }
}

#[test]
fn validate_missing_input_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = report_sorter(&[
        "validate",
        "--input",
        path_arg(&dir.path().join("absent")),
        "--output",
        path_arg(&dir.path().join("out")),
    ]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn validate_reads_settings_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    seed_reports(&input);
    let config = dir.path().join("sorter.yaml");
    fs::write(
        &config,
        format!(
            "input_dir: {}\noutput_dir: {}\nvalidated_dir: sorted\nrun_mode: apply\n",
            path_arg(&input),
            path_arg(&output)
        ),
    )
    .unwrap();

    let out = report_sorter(&["validate", "--config", path_arg(&config)]);

    assert!(out.status.success());
    assert!(output.join("sorted/valid/240314_Cams.md").is_file());
}

#[test]
fn validate_log_file_records_invalid_documents() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let log = dir.path().join("logs/run.log");
    seed_reports(&input);

    let out = report_sorter(&[
        "validate",
        "--input",
        path_arg(&input),
        "--output",
        path_arg(&dir.path().join("out")),
        "--log",
        path_arg(&log),
    ]);

    assert!(out.status.success());
    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("invalid document"), "log: {text}");
    assert!(text.contains("240313_Cams.md"), "log: {text}");
    assert!(!text.contains("\u{1b}["), "log file must not carry ANSI colors");
}

#[test]
fn validate_show_valid_logs_valid_documents() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    let quiet_log = dir.path().join("quiet.log");
    let verbose_log = dir.path().join("verbose.log");
    seed_reports(&input);
    let base = [
        "validate",
        "--input",
        path_arg(&input),
        "--output",
        path_arg(&output),
        "--log",
    ];

    let quiet = [&base[..], &[path_arg(&quiet_log)][..]].concat();
    assert!(report_sorter_logging(&quiet, "info").status.success());
    let verbose = [&base[..], &[path_arg(&verbose_log), "--show-valid"][..]].concat();
    assert!(report_sorter_logging(&verbose, "info").status.success());

    let valid_line = "valid document document=240314_Cams.md";
    let quiet_text = fs::read_to_string(&quiet_log).unwrap();
    assert!(!quiet_text.contains(valid_line), "log: {quiet_text}");
    let verbose_text = fs::read_to_string(&verbose_log).unwrap();
    assert!(verbose_text.contains(valid_line), "log: {verbose_text}");
}

#[test]
fn validate_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("sorter.yaml");
    fs::write(&config, "rare_threshold: 0\nextensions: []\n").unwrap();

    let out = report_sorter(&["validate", "--config", path_arg(&config)]);

    assert_eq!(out.status.code(), Some(1));
}

// ---------------------------------------------------------------------------
// check / print-config
// ---------------------------------------------------------------------------

#[test]
fn check_prints_result_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("240313_Cams.md");
    fs::write(&file, PARTIAL).unwrap();

    let out = report_sorter(&["check", path_arg(&file)]);

    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["document"], "240313_Cams.md");
    assert_eq!(json["classification"], "invalid");
    let missing = json["missing_fields"].as_array().unwrap();
    assert!(missing.iter().any(|f| f == "Next steps?"));
}

#[test]
fn check_strict_mode_rejects_alias_labels() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("240314_Cams.md");
    fs::write(&file, COMPLETE.replace("Technician name", "Tech name")).unwrap();

    let normalized = report_sorter(&["check", path_arg(&file)]);
    let strict = report_sorter(&["check", "--strict", path_arg(&file)]);

    let normalized: serde_json::Value = serde_json::from_slice(&normalized.stdout).unwrap();
    let strict: serde_json::Value = serde_json::from_slice(&strict.stdout).unwrap();
    assert_eq!(normalized["classification"], "valid");
    assert_eq!(strict["classification"], "invalid");
}

#[test]
fn print_config_emits_defaults_as_yaml() {
    let out = report_sorter(&["print-config"]);

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("validated_dir: validated"), "stdout: {stdout}");
    assert!(stdout.contains("maintenance_pattern: PM"), "stdout: {stdout}");
    assert!(stdout.contains("Date of service"), "stdout: {stdout}");
}

// ---------------------------------------------------------------------------
// stack
// ---------------------------------------------------------------------------

#[test]
fn stack_auto_groups_by_directory() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("reports");
    let output = dir.path().join("stacks");
    fs::create_dir_all(input.join("cams")).unwrap();
    fs::write(input.join("cams/240314_Cams.md"), "second visit").unwrap();
    fs::write(input.join("cams/240301_Cams.md"), "first visit").unwrap();
    fs::write(input.join("240305_Doors.md"), "door visit").unwrap();

    let out = report_sorter(&[
        "stack",
        "--input",
        path_arg(&input),
        "--output",
        path_arg(&output),
        "--titles",
        path_arg(&dir.path().join("no_titles.csv")),
    ]);

    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Created 2 stack(s) from 3 document(s)"), "stdout: {stdout}");

    let files: Vec<String> = fs::read_dir(&output)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(files.iter().any(|f| f.ends_with("_stack_index.md")));
    let cams = files.iter().find(|f| f.ends_with("_cams.md")).unwrap();
    let text = fs::read_to_string(output.join(cams)).unwrap();
    assert!(text.starts_with("# cams Reports\n"));
    assert!(text.find("first visit").unwrap() < text.find("second visit").unwrap());
}

#[test]
fn stack_manual_grouping_uses_listing_and_titles() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("reports");
    let output = dir.path().join("stacks");
    fs::create_dir_all(&input).unwrap();
    fs::write(input.join("a.md"), "alpha body").unwrap();
    fs::write(input.join("b.md"), "beta body").unwrap();
    let listing = dir.path().join("groups.md");
    fs::write(&listing, "### Selected\n- b.md\n- a.md\n").unwrap();
    let titles = dir.path().join("titles.csv");
    fs::write(&titles, "filename,title\na.md,Alpha Visit\n").unwrap();

    let out = report_sorter(&[
        "stack",
        "--input",
        path_arg(&input),
        "--output",
        path_arg(&output),
        "--grouping",
        path_arg(&listing),
        "--titles",
        path_arg(&titles),
    ]);

    assert!(out.status.success());
    let stack = fs::read_dir(&output)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|p| p.to_string_lossy().ends_with("_Selected.md"))
        .unwrap();
    let text = fs::read_to_string(stack).unwrap();
    assert!(text.contains("## 1. b.md"));
    assert!(text.contains("## 2. Alpha Visit"));
    assert!(text.find("beta body").unwrap() < text.find("alpha body").unwrap());
}

#[test]
fn stack_reads_titles_from_input_config_folder() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("reports");
    let output = dir.path().join("stacks");
    fs::create_dir_all(input.join("__config")).unwrap();
    fs::write(input.join("240301_Cams.md"), "camera visit").unwrap();
    fs::write(
        input.join("__config/readable_titles.csv"),
        "filename,title\n240301_Cams.md,Camera Service March 1\n",
    )
    .unwrap();

    let out = report_sorter(&[
        "stack",
        "--input",
        path_arg(&input),
        "--output",
        path_arg(&output),
    ]);

    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stack = fs::read_dir(&output)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|p| p.to_string_lossy().ends_with("_reports.md"))
        .unwrap();
    let text = fs::read_to_string(stack).unwrap();
    assert!(text.contains("## 1. Camera Service March 1"), "stack: {text}");
}

#[test]
fn stack_manual_grouping_with_missing_listing_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("reports");
    fs::create_dir_all(&input).unwrap();

    let out = report_sorter(&[
        "stack",
        "--input",
        path_arg(&input),
        "--output",
        path_arg(&dir.path().join("stacks")),
        "--grouping",
        path_arg(&dir.path().join("absent.md")),
    ]);

    assert_eq!(out.status.code(), Some(1));
}

// ---------------------------------------------------------------------------
// offload
// ---------------------------------------------------------------------------

#[test]
fn offload_moves_listed_reports() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let listing = dir.path().join("listing");
    let offload = dir.path().join("offload");
    seed_reports(&input);
    fs::create_dir_all(&listing).unwrap();
    fs::write(listing.join("240313_Cams.md"), "").unwrap();
    fs::write(listing.join("gone.md"), "").unwrap();

    let out = report_sorter(&[
        "offload",
        "--input",
        path_arg(&input),
        "--listing",
        path_arg(&listing),
        "--offload",
        path_arg(&offload),
    ]);

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Moved 1 file(s), 0 failure(s), 1 not found."), "stdout: {stdout}");
    assert!(offload.join("240313_Cams.md").is_file());
    assert!(!input.join("240313_Cams.md").exists());
    assert!(input.join("240314_Cams.md").is_file());
}
