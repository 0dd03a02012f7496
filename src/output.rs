//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored
//! messages, the progress spinner and the summary table. The engine itself
//! never prints; the binary routes its progress lines through here.

use crate::file_organizer::DispositionMethod;
use crate::progress::ProgressSink;
use crate::run::RunSummary;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - The run spinner
/// - Summary tables with statistics
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stowaway::output::OutputFormatter;
    /// OutputFormatter::success("Files organized");
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

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Styles one progress line according to what it reports.
    pub fn style_progress_line(line: &str) -> String {
        if line.starts_with("Error: ") {
            line.red().to_string()
        } else if line.starts_with("Created archive: ") {
            line.green().to_string()
        } else if line.starts_with("Scanned file: ") {
            line.to_string()
        } else if line == "File processing complete." {
            line.bold().to_string()
        } else {
            line.cyan().to_string()
        }
    }

    /// Creates a spinner shown while a run is in progress.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stowaway::output::OutputFormatter;
    /// let pb = OutputFormatter::create_spinner("Organizing...");
    /// pb.finish_and_clear();
    /// ```
    pub fn create_spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Prints a summary table with file statistics by category.
    pub fn summary_table(summary: &RunSummary, method: DispositionMethod) {
        Self::header("SUMMARY");

        let max_category_len = summary
            .totals
            .keys()
            .map(|category| category.label().len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "{:<width$} | {:>6} | {}",
            "Category".bold(),
            method.verb().bold(),
            "Size (MB)".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 24));

        for (category, totals) in &summary.totals {
            println!(
                "{:<width$} | {:>6} | {:.2}",
                category.label(),
                totals.count.to_string().green(),
                totals.megabytes(),
                width = max_category_len
            );
        }

        println!("{}", "-".repeat(max_category_len + 24));
        let total_files = summary.total_files();
        println!(
            "{:<width$} | {:>6} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            if total_files == 1 { "file" } else { "files" },
            width = max_category_len
        );
        if summary.failed_files > 0 {
            Self::warning(&format!(
                "{} file(s) could not be processed",
                summary.failed_files
            ));
        }
    }
}

/// Prints progress lines above a running spinner.
pub struct TerminalSink {
    spinner: Option<ProgressBar>,
}

impl TerminalSink {
    /// A sink with a spinner; `quiet` drops the spinner and plain lines.
    pub fn new(quiet: bool) -> Self {
        let spinner = (!quiet).then(|| OutputFormatter::create_spinner("Organizing..."));
        Self { spinner }
    }

    /// Removes the spinner from the terminal.
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl ProgressSink for TerminalSink {
    fn emit(&mut self, line: &str) {
        let styled = OutputFormatter::style_progress_line(line);
        match &self.spinner {
            Some(spinner) => spinner.suspend(|| println!("{}", styled)),
            None if line.starts_with("Error: ") => eprintln!("{}", styled),
            None => {}
        }
    }
}

impl Drop for TerminalSink {
    fn drop(&mut self) {
        self.finish();
    }
}
