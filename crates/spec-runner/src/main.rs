//! spec-runner CLI - Runs declarative YAML behavior specifications.

use clap::Parser;
use comfy_table::{Cell, Color, Table};
use serde::Serialize;
use spec_core::{
    ConfigOverrides, ReportFormat, Reporter, ReporterConfig, RunReport, RunnerConfig, Spec,
    Summary, apply_overrides, discover_spec_files, load_config, load_spec,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing_subscriber::EnvFilter;

/// Exit codes for the CLI.
mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const EXAMPLES_FAILED: u8 = 1;
    pub const CONFIG_ERROR: u8 = 2;
}

#[derive(Parser)]
#[command(name = "spec-runner")]
#[command(about = "Runs YAML behavior specifications")]
#[command(version)]
struct Cli {
    /// Spec files or directories to run (default: current directory)
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Output format: tree, json (overrides config)
    #[arg(long)]
    format: Option<String>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Only run examples whose trail contains this substring
    #[arg(long)]
    filter: Option<String>,
}

/// One run of a single spec file.
#[derive(Debug, Serialize)]
struct FileReport {
    path: String,
    report: RunReport,
}

/// Every file run in one invocation, as printed by `--format json`.
#[derive(Debug, Serialize)]
struct ExecutionReport {
    timestamp: String,
    files: Vec<FileReport>,
    summary: Summary,
}

/// Spec files to run plus the config the first directory argument supplied.
struct Discovered {
    config: RunnerConfig,
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run_command(&cli)
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "warn,spec_core=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn iso8601_now() -> String {
    OffsetDateTime::now_utc()
        .format(&format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Expand path arguments into spec files. Directories contribute their
/// `spec.config.yaml` patterns; files are taken as given.
fn discover(paths: &[PathBuf]) -> Result<Discovered, String> {
    let default_paths = [PathBuf::from(".")];
    let paths = if paths.is_empty() {
        &default_paths[..]
    } else {
        paths
    };

    let mut config = None;
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let dir_config = load_config(path).map_err(|e| e.to_string())?;
            let found = discover_spec_files(
                path,
                &dir_config.spec_patterns,
                &dir_config.exclude_patterns,
            )
            .map_err(|e| format!("Failed to discover spec files in {}: {e}", path.display()))?;
            tracing::debug!(dir = %path.display(), count = found.len(), "discovered spec files");
            files.extend(found);
            config.get_or_insert(dir_config);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(format!("Path not found: {}", path.display()));
        }
    }

    Ok(Discovered {
        config: config.unwrap_or_default(),
        files,
    })
}

fn load_all(files: &[PathBuf], filter: Option<&str>) -> Result<Vec<(PathBuf, Spec)>, String> {
    files
        .iter()
        .map(|path| {
            load_spec(path, filter)
                .map(|spec| (path.clone(), spec))
                .map_err(|e| format!("{}: {e}", path.display()))
        })
        .collect()
}

fn run_spec(spec: &mut Spec, keep_locations: bool) -> RunReport {
    let mut report = spec.run();
    if !keep_locations {
        for failure in &mut report.failures {
            failure.location = None;
        }
    }
    report
}

fn print_results_table(results: &[FileReport]) {
    let mut table = Table::new();
    table.set_header(vec!["Spec File", "Examples", "Ok", "Failed", "Errors", "Result"]);

    for file in results {
        let summary = &file.report.summary;
        let result_cell = if summary.passed() {
            Cell::new("Pass").fg(Color::Green)
        } else {
            Cell::new("Fail").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&file.path),
            Cell::new(summary.total()),
            Cell::new(summary.ok),
            Cell::new(summary.failed),
            Cell::new(summary.errors),
            result_cell,
        ]);
    }

    println!("{table}");
}

fn print_summary(reporter: &Reporter, files: usize, summary: &Summary) {
    println!("=== Summary ===");
    println!("Files: {files}");
    println!("{}", reporter.paint_summary(summary));
}

/// Format results as JSON using the `ExecutionReport` schema.
fn format_results_json(report: &ExecutionReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

fn run_command(cli: &Cli) -> ExitCode {
    let reporter = Reporter::new(ReporterConfig {
        verbose: cli.verbose,
        color: !cli.no_color,
    });

    let format = match cli.format.as_deref().map(str::parse::<ReportFormat>) {
        Some(Ok(format)) => Some(format),
        Some(Err(e)) => {
            reporter.error(&format!("Invalid format: {e}"));
            return ExitCode::from(exit_code::CONFIG_ERROR);
        }
        None => None,
    };

    let discovered = match discover(&cli.paths) {
        Ok(discovered) => discovered,
        Err(e) => {
            reporter.error(&e);
            return ExitCode::from(exit_code::CONFIG_ERROR);
        }
    };

    let overrides = ConfigOverrides {
        color: cli.no_color.then_some(false),
        verbose: cli.verbose.then_some(true),
        format,
    };
    let config = apply_overrides(discovered.config, &overrides);
    let reporter = Reporter::new(ReporterConfig {
        verbose: config.verbose,
        color: config.color,
    });

    if discovered.files.is_empty() {
        reporter.error("No spec files found");
        return ExitCode::from(exit_code::CONFIG_ERROR);
    }

    let mut specs = match load_all(&discovered.files, cli.filter.as_deref()) {
        Ok(specs) => specs,
        Err(e) => {
            reporter.error(&format!("Failed to load spec: {e}"));
            return ExitCode::from(exit_code::CONFIG_ERROR);
        }
    };

    let timestamp = iso8601_now();
    let mut total = Summary::default();
    let mut results = Vec::with_capacity(specs.len());
    for (path, spec) in &mut specs {
        let report = run_spec(spec, config.verbose);
        total += report.summary;
        let path = display_path(path);
        if config.format == ReportFormat::Tree {
            reporter.heading(&path);
            reporter.report(&report);
            println!();
        }
        results.push(FileReport { path, report });
    }

    match config.format {
        ReportFormat::Tree => {
            if config.verbose {
                print_results_table(&results);
                println!();
            }
            print_summary(&reporter, results.len(), &total);
        }
        ReportFormat::Json => {
            let report = ExecutionReport {
                timestamp,
                files: results,
                summary: total,
            };
            println!("{}", format_results_json(&report));
        }
    }

    if total.passed() {
        ExitCode::from(exit_code::SUCCESS)
    } else {
        ExitCode::from(exit_code::EXAMPLES_FAILED)
    }
}

fn display_path(path: &Path) -> String {
    let path = path.strip_prefix("./").unwrap_or(path);
    path.display().to_string()
}
