use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand};
use report_sorter_config::{GroupingMode, SorterConfig};
use report_sorter_core::{Classification, MatchMode, PlacementMode, RunMode, Validator};
use report_sorter_pipeline::load::validate_scanned;
use report_sorter_pipeline::reports::TOP_ISSUES;
use report_sorter_pipeline::{
    OutputLayout, Router, RouterConfig, RunOutcome, RunRequest, ScanOptions, ScannedDocument,
    offload_listed, run_validation,
};
use report_sorter_stack::{Grouping, StackOptions, StackRequest, run_stacking};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_LOG_FILTER: &str =
    "warn,report_sorter=info,report_sorter_pipeline=info,report_sorter_stack=info";

#[derive(Debug, Parser)]
#[command(name = "report-sorter")]
#[command(about = "Validate, sort and stack technician service reports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a directory of reports, write run reports and optionally sort them into buckets.
    Validate(ValidateArgs),
    /// Validate a single report and print the result as JSON.
    Check(CheckArgs),
    /// Concatenate grouped reports into stack documents.
    Stack(StackArgs),
    /// Move input reports listed in another directory into an offload directory.
    Offload(OffloadArgs),
    /// Print the effective configuration as YAML.
    PrintConfig(PrintConfigArgs),
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Directory containing the reports.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Directory for run reports and validated buckets.
    #[arg(long)]
    output: Option<PathBuf>,
    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Move documents instead of copying them (requires --apply).
    #[arg(long = "move")]
    move_files: bool,
    /// Place documents into buckets; without it only reports are written.
    #[arg(long)]
    apply: bool,
    /// Require exact label text, casing and punctuation.
    #[arg(long)]
    strict: bool,
    /// Only scan the top level of the input directory.
    #[arg(long)]
    no_recursive: bool,
    /// Log valid documents as well as invalid ones.
    #[arg(long)]
    show_valid: bool,
    /// Also append log output to this file.
    #[arg(long)]
    log: Option<PathBuf>,
    /// Print the aggregate report as JSON instead of the text summary.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Report file to validate.
    file: PathBuf,
    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Require exact label text, casing and punctuation.
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Args)]
struct StackArgs {
    /// Directory containing the reports.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Directory for stack documents and the index.
    #[arg(long)]
    output: Option<PathBuf>,
    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Group listing for manual grouping; automatic grouping otherwise.
    #[arg(long)]
    grouping: Option<PathBuf>,
    /// CSV mapping file names to display titles; defaults to the configured
    /// titles file inside the input directory.
    #[arg(long)]
    titles: Option<PathBuf>,
    /// Also append log output to this file.
    #[arg(long)]
    log: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct OffloadArgs {
    /// Directory containing the reports.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Directory whose file names select the reports to offload.
    #[arg(long)]
    listing: PathBuf,
    /// Destination for offloaded reports.
    #[arg(long, default_value = "_offload")]
    offload: PathBuf,
    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Also append log output to this file.
    #[arg(long)]
    log: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct PrintConfigArgs {
    /// YAML configuration file to merge over the defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Check(args) => run_check(args),
        Command::Stack(args) => run_stack(args),
        Command::Offload(args) => run_offload(args),
        Command::PrintConfig(args) => run_print_config(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(input) = args.input {
        config.input_dir = Some(input);
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if args.move_files {
        config.placement = PlacementMode::Move;
    }
    if args.apply {
        config.run_mode = RunMode::Apply;
    }
    if args.strict {
        config.matching = MatchMode::Strict;
    }
    if args.no_recursive {
        config.recursive = false;
    }
    if args.show_valid {
        config.show_valid = true;
    }
    if args.log.is_some() {
        config.log_file = args.log;
    }
    check_config(&config)?;
    init_tracing(config.log_file.as_deref())?;

    if config.placement == PlacementMode::Move && config.run_mode == RunMode::ReportOnly {
        eprintln!("note: report-only run, --move has no effect without --apply");
    }

    let input = require_input(&config)?;
    let validator = Validator::new(config.validator_config()).map_err(|err| err.to_string())?;
    let router = Router::new(RouterConfig {
        layout: OutputLayout::new(&config.output_dir, &config.validated_dir),
        placement: config.placement,
        run_mode: config.run_mode,
    });
    info!(
        input = %input.display(),
        output = %config.output_dir.display(),
        mode = ?config.run_mode,
        "starting validation run"
    );
    let request = RunRequest {
        input_dir: input,
        scan: scan_options(&config),
        show_valid: config.show_valid,
        rare_threshold: config.rare_threshold,
        generated_at: Utc::now(),
    };

    let outcome = run_validation(&validator, &router, &request).map_err(|err| err.to_string())?;

    if args.json {
        let raw = serde_json::to_string_pretty(&outcome.report.aggregate)
            .map_err(|err| format!("Failed to serialize aggregate report: {err}"))?;
        println!("{raw}");
    } else {
        print!("{}", format_run_summary(&outcome));
    }

    if !outcome.report.placement.failed.is_empty() {
        eprintln!(
            "{} document(s) could not be placed; see {}",
            outcome.report.placement.failed.len(),
            outcome.paths.summary.display()
        );
    }
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let mut config = load_config(args.config.as_deref())?;
    if args.strict {
        config.matching = MatchMode::Strict;
    }
    check_config(&config)?;

    let validator = Validator::new(config.validator_config()).map_err(|err| err.to_string())?;
    let name = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| format!("'{}' is not a file path", args.file.display()))?;
    let result = validate_scanned(
        &validator,
        &ScannedDocument {
            path: args.file.clone(),
            name,
        },
    );

    let raw = serde_json::to_string_pretty(&result)
        .map_err(|err| format!("Failed to serialize result: {err}"))?;
    println!("{raw}");
    Ok(())
}

fn run_stack(args: StackArgs) -> Result<(), String> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(input) = args.input {
        config.input_dir = Some(input);
    }
    if let Some(output) = args.output {
        config.stacking.output_dir = output;
    }
    if let Some(grouping) = args.grouping {
        config.stacking.grouping = GroupingMode::Manual;
        config.stacking.grouping_file = Some(grouping);
    }
    if args.log.is_some() {
        config.log_file = args.log;
    }
    check_config(&config)?;
    init_tracing(config.log_file.as_deref())?;

    let input_dir = require_input(&config)?;
    // An explicit --titles path is taken as given.
    let titles_file = args
        .titles
        .unwrap_or_else(|| config.stacking.titles_path(&input_dir));

    let grouping = match (config.stacking.grouping, &config.stacking.grouping_file) {
        (GroupingMode::Manual, Some(path)) => Grouping::Manual(path.clone()),
        (GroupingMode::Manual, None) => {
            return Err("manual grouping requires --grouping <FILE>".to_string());
        }
        (GroupingMode::Auto, _) => Grouping::Auto,
    };

    let request = StackRequest {
        input_dir,
        scan: ScanOptions {
            recursive: config.recursive,
            extensions: config.normalized_extensions(),
            ignored_directories: config.stacking.ignored_directories.clone(),
            excluded_paths: Vec::new(),
        },
        grouping,
        titles_file: Some(titles_file),
        options: StackOptions {
            output_dir: config.stacking.output_dir.clone(),
            separator: config.stacking.separator.clone(),
            output_extension: config.stacking.output_extension.clone(),
            generated_at: Local::now().naive_local(),
        },
    };

    let run = run_stacking(&request).map_err(|err| err.to_string())?;
    println!(
        "Created {} stack(s) from {} document(s) in '{}'.",
        run.stacks.len(),
        run.document_count(),
        request.options.output_dir.display()
    );
    for stack in &run.stacks {
        println!(
            "  {} [{} files, {} words, est. ~{} tokens]",
            stack.group,
            stack.members.len(),
            stack.words,
            stack.estimated_tokens
        );
    }
    println!("Index: {}", run.index.display());
    if !run.warnings.is_empty() {
        eprintln!("{} warning(s) emitted during stacking.", run.warnings.len());
    }
    Ok(())
}

fn run_offload(args: OffloadArgs) -> Result<(), String> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(input) = args.input {
        config.input_dir = Some(input);
    }
    if args.log.is_some() {
        config.log_file = args.log;
    }
    check_config(&config)?;
    init_tracing(config.log_file.as_deref())?;

    let input = require_input(&config)?;
    let summary = offload_listed(
        &input,
        &args.listing,
        &args.offload,
        &config.normalized_extensions(),
    )
    .map_err(|err| err.to_string())?;

    println!(
        "Moved {} file(s), {} failure(s), {} not found.",
        summary.moved.len(),
        summary.failed.len(),
        summary.not_found.len()
    );
    for (name, error) in &summary.failed {
        eprintln!("  failed: {name}: {error}");
    }
    if summary.failed.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "{} file(s) could not be moved",
            summary.failed.len()
        ))
    }
}

fn run_print_config(args: PrintConfigArgs) -> Result<(), String> {
    let config = load_config(args.config.as_deref())?;
    let raw = serde_yaml::to_string(&config)
        .map_err(|err| format!("Failed to serialize configuration: {err}"))?;
    print!("{raw}");
    Ok(())
}

/// Built-in defaults, overlaid by `path` when given.
fn load_config(path: Option<&Path>) -> Result<SorterConfig, String> {
    match path {
        Some(path) => SorterConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display())),
        None => Ok(SorterConfig::default()),
    }
}

fn check_config(config: &SorterConfig) -> Result<(), String> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    Err(messages.join("; "))
}

fn require_input(config: &SorterConfig) -> Result<PathBuf, String> {
    config.input_dir.clone().ok_or_else(|| {
        "no input directory: pass --input or set input_dir in the config".to_string()
    })
}

fn scan_options(config: &SorterConfig) -> ScanOptions {
    ScanOptions {
        recursive: config.recursive,
        extensions: config.normalized_extensions(),
        ignored_directories: config.ignored_directories.clone(),
        excluded_paths: Vec::new(),
    }
}

fn init_tracing(log_file: Option<&Path>) -> Result<(), String> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|err| {
                    format!("Failed to create log directory '{}': {err}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| format!("Failed to open log file '{}': {err}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()
        .map_err(|err| format!("Failed to initialize logging: {err}"))
}

fn format_run_summary(outcome: &RunOutcome) -> String {
    let aggregate = &outcome.report.aggregate;
    let counts = &aggregate.counts;
    let mut out = String::new();

    out.push_str(&format!("Processed {} document(s).\n", counts.total));
    for classification in Classification::ALL {
        out.push_str(&format!(
            "  {:<12} {:>5} ({:.1}%)\n",
            classification.label(),
            counts.get(classification),
            counts.percent(classification)
        ));
    }
    if counts.unreadable > 0 || counts.unstructured > 0 {
        out.push_str(&format!(
            "  ({} unreadable, {} unstructured)\n",
            counts.unreadable, counts.unstructured
        ));
    }

    let words = &aggregate.word_stats;
    out.push_str(&format!(
        "Words: min {} / max {} / mean {:.1} / median {:.1}\n",
        words.min, words.max, words.mean, words.median
    ));

    let placement = &outcome.report.placement;
    if placement.skipped {
        out.push_str("Report-only run: no files were placed (use --apply).\n");
    } else {
        out.push_str(&format!(
            "Placed {} file(s) by {}, {} failed.\n",
            placement.placed.len(),
            placement.mode,
            placement.failed.len()
        ));
    }

    let top = aggregate.top_issues(TOP_ISSUES);
    if !top.is_empty() {
        out.push_str("Top issues:\n");
        for entry in top {
            out.push_str(&format!("  {:>4}  {}\n", entry.count, entry.key));
        }
    }

    out.push_str("Reports:\n");
    for path in outcome.paths.iter() {
        out.push_str(&format!("  {}\n", path.display()));
    }
    out
}
