//! Command-line interface module for stowaway.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing with `clap`
//! - The application state shared by the front end's browse, clear and run actions
//! - Single-run-at-a-time enforcement
//! - Merging configuration file settings with command-line overrides

use crate::archive::ArchiveGrouping;
use crate::config::{CompiledFilters, Config, RunSettings};
use crate::error::{OrganizeError, OrganizeResult};
use crate::file_category::Category;
use crate::file_organizer::{CollisionPolicy, DispositionMethod};
use crate::output::{OutputFormatter, TerminalSink};
use crate::progress::{LineCollector, ProgressSink};
use crate::run::{self, RunOptions, RunSummary, Traversal};
use clap::Parser;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Sort a folder's documents, images, videos and audio into category folders.
#[derive(Parser, Debug, Clone)]
#[command(name = "stowaway", version, about, long_about = None)]
pub struct Cli {
    /// Directory whose files are organized
    pub source: PathBuf,

    /// Destination root [default: <SOURCE>/transported_files]
    #[arg(short, long)]
    pub destination: Option<PathBuf>,

    /// What happens to each selected file
    #[arg(short, long, value_enum, default_value_t = DispositionMethod::MoveOnly)]
    pub method: DispositionMethod,

    /// Only act on these categories (comma separated) [default: all]
    #[arg(short = 'o', long = "only", value_delimiter = ',', value_parser = parse_category)]
    pub only: Vec<Category>,

    /// Only look at files directly inside SOURCE
    #[arg(long, conflicts_with = "recursive")]
    pub shallow: bool,

    /// Look at every file below SOURCE
    #[arg(long)]
    pub recursive: bool,

    /// Archive per category or per extension
    #[arg(long, value_enum)]
    pub group_by: Option<ArchiveGrouping>,

    /// What to do when the destination name is already taken
    #[arg(long, value_enum)]
    pub on_collision: Option<CollisionPolicy>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Categories picked with `--only`, or all of them.
    pub fn categories(&self) -> BTreeSet<Category> {
        if self.only.is_empty() {
            Category::ALL.into_iter().collect()
        } else {
            self.only.iter().copied().collect()
        }
    }

    /// Applies command-line overrides on top of configured settings.
    pub fn apply_overrides(&self, mut settings: RunSettings) -> RunSettings {
        if self.shallow {
            settings.traversal = Traversal::Shallow;
        } else if self.recursive {
            settings.traversal = Traversal::Recursive;
        }
        if let Some(grouping) = self.group_by {
            settings.archive_grouping = grouping;
        }
        if let Some(collision) = self.on_collision {
            settings.on_collision = collision;
        }
        settings
    }
}

fn parse_category(value: &str) -> Result<Category, String> {
    Category::from_name(value).ok_or_else(|| {
        format!(
            "unknown category '{}' (expected documents, images, videos or audios)",
            value
        )
    })
}

/// Shared flag marking a run as in progress.
///
/// Clones observe the same flag, so a front end can grey out its run action
/// while another thread is working.
#[derive(Debug, Clone, Default)]
pub struct RunLock {
    running: Arc<AtomicBool>,
}

impl RunLock {
    /// Marks a run as started, or returns `None` if one already is.
    pub fn try_acquire(&self) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunGuard {
                running: Arc::clone(&self.running),
            })
    }

    /// Returns true while a run holds the lock.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Releases its [`RunLock`] when dropped.
#[must_use]
#[derive(Debug)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Selections and log of an interactive front end.
///
/// Holds everything the user has picked so far. The engine never sees this
/// struct; [`AppState::run`] turns it into [`RunOptions`].
#[derive(Debug, Default)]
pub struct AppState {
    source: Option<PathBuf>,
    destination: Option<PathBuf>,
    method: Option<DispositionMethod>,
    categories: BTreeSet<Category>,
    settings: RunSettings,
    filters: CompiledFilters,
    log: LineCollector,
    status: String,
    run_lock: RunLock,
}

impl AppState {
    /// An empty state with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given settings and filters for later runs.
    pub fn with_settings(mut self, settings: RunSettings, filters: CompiledFilters) -> Self {
        self.settings = settings;
        self.filters = filters;
        self
    }

    /// Selects the source directory.
    pub fn browse_source(&mut self, path: impl Into<PathBuf>) {
        self.source = Some(path.into());
        self.status = "Folder selected.".to_string();
    }

    /// Selects the destination root.
    pub fn browse_destination(&mut self, path: impl Into<PathBuf>) {
        self.destination = Some(path.into());
        self.status = "Folder selected.".to_string();
    }

    /// Selects the disposition method.
    pub fn select_method(&mut self, method: DispositionMethod) {
        self.method = Some(method);
    }

    /// Replaces the selected categories.
    pub fn select_categories(&mut self, categories: impl IntoIterator<Item = Category>) {
        self.categories = categories.into_iter().collect();
    }

    /// Resets every selection and empties the log. Settings and filters stay.
    pub fn clear(&mut self) {
        self.source = None;
        self.destination = None;
        self.method = None;
        self.categories.clear();
        self.log.clear();
        self.status = "Selections cleared.".to_string();
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn method(&self) -> Option<DispositionMethod> {
        self.method
    }

    pub fn categories(&self) -> &BTreeSet<Category> {
        &self.categories
    }

    /// Every progress line received since the last [`AppState::clear`].
    pub fn log(&self) -> &[String] {
        self.log.lines()
    }

    /// One-line status for the front end.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// The lock guarding runs started from this state.
    pub fn run_lock(&self) -> RunLock {
        self.run_lock.clone()
    }

    /// Builds the engine options from the current selections.
    ///
    /// Without a selected method, files are moved.
    pub fn options(&self) -> OrganizeResult<RunOptions> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| OrganizeError::InvalidSource {
                path: PathBuf::new(),
                reason: "no source directory selected".to_string(),
            })?;

        let mut options = RunOptions::new(source, self.method.unwrap_or(DispositionMethod::MoveOnly))
            .categories(self.categories.iter().copied())
            .traversal(self.settings.traversal)
            .grouping(self.settings.archive_grouping)
            .collision(self.settings.on_collision)
            .filters(self.filters.clone());
        if let Some(destination) = &self.destination {
            options = options.destination(destination.clone());
        }
        Ok(options)
    }

    /// Runs the engine with the current selections.
    ///
    /// Progress lines go to `sink` and are also kept in [`AppState::log`]. A
    /// fatal error is appended to the log as an `Error:` line before it is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::RunInProgress` if another run holds the lock,
    /// or whatever error aborted the run.
    pub fn run(&mut self, sink: &mut dyn ProgressSink) -> OrganizeResult<RunSummary> {
        let _guard = self
            .run_lock
            .try_acquire()
            .ok_or(OrganizeError::RunInProgress)?;

        let result = self.options().and_then(|options| {
            debug!(categories = ?options.categories, "run requested");
            let log = &mut self.log;
            let mut tee = |line: &str| {
                log.emit(line);
                sink.emit(line);
            };
            run::run(&options, &mut tee)
        });

        match &result {
            Ok(_) => self.status = "Transfer details logged successfully.".to_string(),
            Err(e) => {
                let line = format!("Error: {}", e);
                self.log.emit(&line);
                sink.emit(&line);
                self.status = "Run failed.".to_string();
            }
        }
        result
    }
}

/// Loads configuration, applies flags, runs, and prints the outcome.
///
/// Returns the run summary so callers can inspect it; the caller decides the
/// exit code.
pub fn run_cli(cli: &Cli) -> OrganizeResult<RunSummary> {
    let config = Config::load(cli.config.as_deref())?;
    let settings = cli.apply_overrides(config.run);
    let filters = config.compile_filters()?;

    let mut state = AppState::new().with_settings(settings, filters);
    state.browse_source(&cli.source);
    if let Some(destination) = &cli.destination {
        state.browse_destination(destination);
    }
    state.select_method(cli.method);
    state.select_categories(cli.categories());

    let chatty = !cli.quiet && !cli.json;
    if chatty {
        OutputFormatter::info(&format!(
            "Organizing contents of: {}",
            cli.source.display()
        ));
    }

    let mut sink = TerminalSink::new(!chatty);
    let result = state.run(&mut sink);
    sink.finish();
    let summary = result?;

    if cli.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => OutputFormatter::plain(&json),
            Err(e) => OutputFormatter::error(&format!("Could not encode summary: {}", e)),
        }
    } else if chatty {
        OutputFormatter::summary_table(&summary, cli.method);
        OutputFormatter::success(&format!(
            "Files organized into {}",
            summary.destination.display()
        ));
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["stowaway", "/tmp/in"]);
        assert_eq!(cli.method, DispositionMethod::MoveOnly);
        assert_eq!(cli.categories().len(), 4);
        assert!(cli.destination.is_none());
        assert_eq!(
            cli.apply_overrides(RunSettings::default()),
            RunSettings::default()
        );
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "stowaway",
            "/tmp/in",
            "-d",
            "/tmp/out",
            "-m",
            "archive-move",
            "-o",
            "documents,image",
            "--shallow",
            "--group-by",
            "extension",
            "--on-collision",
            "rename",
        ]);

        assert_eq!(cli.method, DispositionMethod::ArchiveThenRemoveOriginal);
        assert_eq!(cli.destination, Some(PathBuf::from("/tmp/out")));
        assert_eq!(
            cli.categories(),
            BTreeSet::from([Category::Documents, Category::Images])
        );

        let settings = cli.apply_overrides(RunSettings::default());
        assert_eq!(settings.traversal, Traversal::Shallow);
        assert_eq!(settings.archive_grouping, ArchiveGrouping::Extension);
        assert_eq!(settings.on_collision, CollisionPolicy::Rename);
    }

    #[test]
    fn test_cli_rejects_unknown_category_and_conflicts() {
        assert!(Cli::try_parse_from(["stowaway", "/tmp/in", "-o", "spreadsheets"]).is_err());
        assert!(Cli::try_parse_from(["stowaway", "/tmp/in", "--shallow", "--recursive"]).is_err());
        assert!(Cli::try_parse_from(["stowaway", "/tmp/in", "-m", "zip"]).is_err());
    }

    #[test]
    fn test_run_lock_is_exclusive() {
        let lock = RunLock::default();
        let guard = lock.try_acquire().expect("lock should be free");
        assert!(lock.is_running());
        assert!(lock.clone().try_acquire().is_none());
        drop(guard);
        assert!(!lock.is_running());
        assert!(lock.try_acquire().is_some());
    }

    #[test]
    fn test_app_state_refuses_concurrent_run() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut state = AppState::new();
        state.browse_source(temp_dir.path());

        let _held = state.run_lock().try_acquire().expect("lock should be free");
        let mut sink = LineCollector::default();
        let result = state.run(&mut sink);

        assert!(matches!(result, Err(OrganizeError::RunInProgress)));
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_app_state_run_and_clear() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("a.pdf"), b"0123456789").expect("Failed to write file");

        let mut state = AppState::new();
        state.browse_source(temp_dir.path());
        state.select_method(DispositionMethod::CopyOnly);
        state.select_categories([Category::Documents]);
        assert_eq!(state.status(), "Folder selected.");

        let mut sink = LineCollector::default();
        let summary = state.run(&mut sink).expect("run failed");

        assert_eq!(summary.totals(Category::Documents).count, 1);
        assert_eq!(state.log(), sink.lines());
        assert!(!state.run_lock().is_running());

        state.clear();
        assert!(state.log().is_empty());
        assert!(state.source().is_none());
        assert!(state.method().is_none());
        assert!(state.categories().is_empty());
        assert_eq!(state.status(), "Selections cleared.");
    }

    #[test]
    fn test_app_state_without_source_logs_error() {
        let mut state = AppState::new();
        let mut sink = LineCollector::default();

        let result = state.run(&mut sink);

        assert!(matches!(result, Err(OrganizeError::InvalidSource { .. })));
        assert_eq!(state.log().len(), 1);
        assert!(state.log()[0].starts_with("Error: "));
        assert_eq!(state.status(), "Run failed.");
    }
}
