//! Command-line interface module for smartsort.
//!
//! This module handles:
//! - Argument parsing
//! - Merging command-line flags with configuration defaults
//! - Building the organizer and reporting each entry as it is processed
//! - Printing the final statistics

use crate::config::AppConfig;
use crate::file_organizer::{
    EntryOutcome, EntryReport, FileOrganizer, OrganizeOptions, RunObserver, RunReport,
    RunStatistics,
};
use crate::output::OutputFormatter;
use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use indicatif::ProgressBar;
use serde_json::{Value, json};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "smartsort",
    version,
    about = "Organize files into category and year/month folders"
)]
pub struct Cli {
    /// Directory to organize (defaults to the current directory)
    pub dir: Option<PathBuf>,

    /// Do not nest files under category folders
    #[arg(long)]
    pub no_type: bool,

    /// Do not nest files under year/month folders
    #[arg(long)]
    pub no_date: bool,

    /// Show what would be moved without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report (statistics and per-entry outcomes) as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// A fully resolved organize request.
#[derive(Debug, Clone)]
pub struct OrganizeCommand {
    pub source: PathBuf,
    pub options: OrganizeOptions,
    /// Emit a JSON report instead of per-entry lines and a table.
    pub json: bool,
}

impl OrganizeCommand {
    /// Resolves flags against configuration defaults.
    ///
    /// `--no-type` / `--no-date` switch off what the configuration enables;
    /// they never switch anything on.
    pub fn from_cli(cli: &Cli, config: &AppConfig) -> anyhow::Result<Self> {
        let source = match &cli.dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Could not determine current directory")?,
        };

        let options = OrganizeOptions {
            by_type: config.organize.by_type && !cli.no_type,
            by_date: config.organize.by_date && !cli.no_date,
            dry_run: cli.dry_run,
        };

        Ok(Self {
            source,
            options,
            json: cli.json,
        })
    }
}

/// Default `env_logger` filter for a `-v` count.
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Runs the CLI: loads configuration, then organizes the requested directory.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use smartsort::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["smartsort", "/path/to/downloads", "--dry-run"]);
/// match run_cli(&cli) {
///     Ok(stats) => println!("{} file(s) organized", stats.organized),
///     Err(e) => eprintln!("Error: {e:#}"),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> anyhow::Result<RunStatistics> {
    let config = AppConfig::load(cli.config.as_deref()).context("Error loading configuration")?;
    let command = OrganizeCommand::from_cli(cli, &config)?;
    run_cli_with_config(&command, &config)
}

/// Organizes `command.source` using an already loaded configuration.
pub fn run_cli_with_config(
    command: &OrganizeCommand,
    config: &AppConfig,
) -> anyhow::Result<RunStatistics> {
    if !command.options.by_type && !command.options.by_date {
        bail!("Nothing to do: both type and date organization are disabled");
    }

    let organizer = build_organizer(config, command.options)?;
    let report = if command.json {
        organizer.run(&command.source)?
    } else {
        organize_with_progress(&organizer, &command.source)?
    };

    if command.json {
        print_json_summary(&report)?;
    } else {
        print_summary(&report);
    }

    Ok(report.statistics)
}

/// Builds an organizer from configuration and resolved options.
pub fn build_organizer(
    config: &AppConfig,
    options: OrganizeOptions,
) -> anyhow::Result<FileOrganizer> {
    let table = config
        .category_table()
        .context("Error building category table")?;
    let filters = config
        .compile_filters()
        .context("Error compiling filters")?;
    let hidden_prefix = config.hidden_prefix()?;

    Ok(FileOrganizer::new(table)
        .with_filters(filters)
        .with_hidden_prefix(hidden_prefix)
        .with_options(options))
}

/// Writes the run header and one line per entry to `out`, keeping a progress
/// bar drawn below them.
///
/// Lines go through `ProgressBar::suspend`, which still runs the write when
/// the bar is hidden (output not a terminal).
struct ProgressObserver<'a, W: Write> {
    pb: ProgressBar,
    out: W,
    root: &'a Path,
    dry_run: bool,
}

impl<W: Write> ProgressObserver<'_, W> {
    fn write_line(&mut self, line: &str) {
        let Self { pb, out, .. } = self;
        if let Err(e) = pb.suspend(|| writeln!(out, "{line}")) {
            log::warn!("Could not write report line: {}", e);
        }
    }
}

impl<W: Write> RunObserver for ProgressObserver<'_, W> {
    fn started(&mut self, total: usize) {
        self.pb.set_length(total as u64);
        let header = OutputFormatter::run_header(self.root, self.dry_run);
        self.write_line(&header);
    }

    fn entry(&mut self, report: &EntryReport) {
        let line = OutputFormatter::entry_line(self.root, report, self.dry_run);
        self.write_line(&line);
        self.pb.inc(1);
    }
}

/// Runs the organizer with a progress bar and one line per entry.
///
/// Nothing is printed before the source directory has been listed, so a
/// fatal error is the only output of a failed run.
fn organize_with_progress(organizer: &FileOrganizer, source: &Path) -> anyhow::Result<RunReport> {
    let pb = OutputFormatter::create_progress_bar(0);
    let mut observer = ProgressObserver {
        pb: pb.clone(),
        out: io::stdout(),
        root: source,
        dry_run: organizer.options().dry_run,
    };
    let report = organizer.run_with_observer(source, &mut observer);
    pb.finish_and_clear();

    let report = report?;
    if report.statistics.total == 0 {
        OutputFormatter::warning("No files to organize");
    }
    Ok(report)
}

fn print_summary(report: &RunReport) {
    OutputFormatter::statistics(&report.statistics);

    if report.dry_run {
        OutputFormatter::dry_run_notice("No files were modified.");
    } else if report.statistics.errored > 0 {
        OutputFormatter::error(&format!(
            "{} file(s) could not be organized. Please review errors above.",
            report.statistics.errored
        ));
    } else if report.statistics.total > 0 {
        OutputFormatter::success("Organization complete!");
    }
}

/// JSON form of a run: totals plus one object per entry.
pub fn json_report(report: &RunReport) -> Value {
    let entries: Vec<Value> = report.entries.iter().map(json_entry).collect();
    json!({
        "root": report.root.to_string_lossy(),
        "dry_run": report.dry_run,
        "statistics": report.statistics,
        "success_rate": report.statistics.success_rate(),
        "entries": entries,
    })
}

fn json_entry(entry: &EntryReport) -> Value {
    let source = entry.source.to_string_lossy();
    match &entry.outcome {
        EntryOutcome::Organized {
            destination,
            category,
        } => json!({
            "source": source,
            "outcome": "organized",
            "destination": destination.to_string_lossy(),
            "category": category,
        }),
        EntryOutcome::Skipped(reason) => json!({
            "source": source,
            "outcome": "skipped",
            "reason": reason,
        }),
        EntryOutcome::Failed(error) => json!({
            "source": source,
            "outcome": "failed",
            "error": error.to_string(),
        }),
    }
}

fn print_json_summary(report: &RunReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&json_report(report))?);
    Ok(())
}
