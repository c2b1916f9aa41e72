//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: colored status lines,
//! the progress bar shown while files are moved, and the statistics summary.

use crate::file_organizer::{EntryOutcome, EntryReport, RunStatistics};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use smartsort::output::OutputFormatter;
    /// OutputFormatter::success("Moved: photo.jpg");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for `total` entries.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Formats the line that opens a run's report.
    pub fn run_header(root: &Path, dry_run: bool) -> String {
        if dry_run {
            format!("[DRY RUN] Analyzing contents of: {}", root.display())
                .yellow()
                .to_string()
        } else {
            format!("Organizing contents of: {}", root.display())
                .cyan()
                .to_string()
        }
    }

    /// Formats the per-entry line shown while a run progresses.
    ///
    /// Destinations are shown relative to `root` when possible.
    pub fn entry_line(root: &Path, report: &EntryReport, dry_run: bool) -> String {
        let name = report
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| report.source.display().to_string());

        match &report.outcome {
            EntryOutcome::Organized { destination, .. } => {
                let shown = destination.strip_prefix(root).unwrap_or(destination.as_path());
                let verb = if dry_run { "Would move" } else { "Moved" };
                format!(
                    "{} {}: {} → {}",
                    "✓".green(),
                    verb,
                    name,
                    shown.display()
                )
            }
            EntryOutcome::Skipped(reason) => {
                format!("{} Skipped: {} ({})", "⏭".yellow(), name, reason)
            }
            EntryOutcome::Failed(error) => {
                format!("{} Error processing {}: {}", "✗".red(), name, error)
            }
        }
    }

    /// Prints the run statistics table.
    ///
    /// The success rate is only shown for non-empty runs.
    pub fn statistics(stats: &RunStatistics) {
        Self::header("Organization Statistics");
        println!("{}", "-".repeat(32));
        println!("{:<16} | {}", "Total files", stats.total.to_string().bold());
        println!("{:<16} | {}", "Organized", stats.organized.to_string().green());
        println!("{:<16} | {}", "Skipped", stats.skipped.to_string().yellow());
        println!("{:<16} | {}", "Errors", stats.errored.to_string().red());
        println!("{}", "-".repeat(32));

        if stats.total > 0 {
            println!(
                "{:<16} | {}",
                "Success rate",
                format!("{:.1}%", stats.success_rate()).bold()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_organizer::{OrganizeError, SkipReason};
    use std::path::PathBuf;

    #[test]
    fn test_entry_line_organized_is_relative_to_root() {
        let report = EntryReport {
            source: PathBuf::from("/data/photo.jpg"),
            outcome: EntryOutcome::Organized {
                destination: PathBuf::from("/data/Images/photo.jpg"),
                category: "Images".to_string(),
            },
        };

        let line = OutputFormatter::entry_line(Path::new("/data"), &report, false);
        assert!(line.contains("Moved: photo.jpg"));
        assert!(line.contains("Images/photo.jpg"));
        assert!(!line.contains("/data/Images"));

        let preview = OutputFormatter::entry_line(Path::new("/data"), &report, true);
        assert!(preview.contains("Would move: photo.jpg"));
    }

    #[test]
    fn test_entry_line_skipped_and_failed() {
        let skipped = EntryReport {
            source: PathBuf::from("/data/.hidden"),
            outcome: EntryOutcome::Skipped(SkipReason::Hidden),
        };
        let failed = EntryReport {
            source: PathBuf::from("/data/bad.txt"),
            outcome: EntryOutcome::Failed(OrganizeError::InvalidFileName {
                path: PathBuf::from("/data/bad.txt"),
            }),
        };

        let skipped_line = OutputFormatter::entry_line(Path::new("/data"), &skipped, false);
        assert!(skipped_line.contains("Skipped: .hidden (hidden file)"));

        let failed_line = OutputFormatter::entry_line(Path::new("/data"), &failed, false);
        assert!(failed_line.contains("Error processing bad.txt"));
    }
}
