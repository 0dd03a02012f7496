//! The run orchestrator.
//!
//! A run validates its inputs, prepares the destination layout, walks the
//! source directory, hands every selected file to the [`FileOrganizer`],
//! writes any queued archives and finally reports a per-category summary.
//! Each step runs to completion before the next file is considered.

use crate::archive::{self, ArchiveGrouping, PendingArchives};
use crate::config::CompiledFilters;
use crate::error::{FileActionError, OrganizeError, OrganizeResult};
use crate::file_category::{Category, FileMapper};
use crate::file_organizer::{CollisionPolicy, DispositionMethod, FileOrganizer, FileRecord, Outcome};
use crate::layout::{self, DestinationLayout};
use crate::naming::ArchiveNamer;
use crate::progress::ProgressSink;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Bytes per megabyte in the summary.
const BYTES_PER_MB: f64 = 1_048_576.0;

/// How much of the source directory a run looks at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Traversal {
    /// Only files directly inside the source directory.
    Shallow,
    /// Every file in the source subtree.
    #[default]
    Recursive,
}

/// Everything a run needs to know.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory whose files are organized.
    pub source: PathBuf,
    /// Destination root; `<source>/transported_files` when `None`.
    pub destination: Option<PathBuf>,
    /// What happens to each selected file.
    pub method: DispositionMethod,
    /// Categories to act on. An empty set makes the run a no-op.
    pub categories: BTreeSet<Category>,
    /// Shallow or recursive walk.
    pub traversal: Traversal,
    /// Archive per category or per extension.
    pub grouping: ArchiveGrouping,
    /// Behavior when the destination name is taken.
    pub collision: CollisionPolicy,
    /// Which files are considered at all.
    pub filters: CompiledFilters,
}

impl RunOptions {
    /// Options acting on every category with default settings.
    pub fn new(source: impl Into<PathBuf>, method: DispositionMethod) -> Self {
        Self {
            source: source.into(),
            destination: None,
            method,
            categories: Category::ALL.into_iter().collect(),
            traversal: Traversal::default(),
            grouping: ArchiveGrouping::default(),
            collision: CollisionPolicy::default(),
            filters: CompiledFilters::default(),
        }
    }

    /// Sets the destination root.
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Restricts the run to the given categories.
    pub fn categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    /// Sets the traversal mode.
    pub fn traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    /// Sets the archive grouping.
    pub fn grouping(mut self, grouping: ArchiveGrouping) -> Self {
        self.grouping = grouping;
        self
    }

    /// Sets the collision policy.
    pub fn collision(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }

    /// Sets the file filters.
    pub fn filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Files and bytes handled for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTotals {
    pub count: usize,
    pub bytes: u64,
}

impl CategoryTotals {
    /// Size in megabytes (bytes / 1,048,576).
    pub fn megabytes(&self) -> f64 {
        self.bytes as f64 / BYTES_PER_MB
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Canonical destination root.
    pub destination: PathBuf,
    /// Per-category totals; all four categories are always present.
    pub totals: BTreeMap<Category, CategoryTotals>,
    /// Files that failed and were skipped.
    pub failed_files: usize,
    /// Archives written during the run.
    pub archives: Vec<PathBuf>,
}

impl RunSummary {
    fn new(destination: PathBuf) -> Self {
        Self {
            destination,
            totals: Category::ALL
                .into_iter()
                .map(|category| (category, CategoryTotals::default()))
                .collect(),
            failed_files: 0,
            archives: Vec::new(),
        }
    }

    /// Totals for one category.
    pub fn totals(&self, category: Category) -> CategoryTotals {
        self.totals.get(&category).copied().unwrap_or_default()
    }

    /// Files handled across all categories.
    pub fn total_files(&self) -> usize {
        self.totals.values().map(|t| t.count).sum()
    }

    fn record(&mut self, category: Category, size: u64) {
        let totals = self.totals.entry(category).or_default();
        totals.count += 1;
        totals.bytes += size;
    }

    /// The closing block of the progress log.
    pub fn summary_lines(&self, method: DispositionMethod) -> Vec<String> {
        let mut lines = vec![String::new(), "File processing complete.".to_string()];
        lines.extend(self.totals.iter().map(|(category, totals)| {
            format!(
                "{} - {} {} files, Total Size: {:.2} MB",
                category.label(),
                method.verb(),
                totals.count,
                totals.megabytes()
            )
        }));
        lines
    }
}

/// Runs the organizer over `options.source`.
///
/// Progress lines are passed to `sink` in traversal order; the last lines
/// of a successful run are the summary block.
///
/// # Errors
///
/// Fails before touching the filesystem if the source is not a readable
/// directory or the destination is unusable. Fails mid-run if the layout or
/// an archive cannot be written; lines already emitted stay valid. Errors
/// on single files are reported through `sink` and do not abort the run.
///
/// # Examples
///
/// ```no_run
/// use stowaway::file_category::Category;
/// use stowaway::file_organizer::DispositionMethod;
/// use stowaway::run::{run, RunOptions};
///
/// let options = RunOptions::new("/home/me/Downloads", DispositionMethod::CopyOnly)
///     .categories([Category::Documents, Category::Images]);
/// let summary = run(&options, &mut |line: &str| println!("{}", line)).unwrap();
/// println!("{} files", summary.total_files());
/// ```
pub fn run(options: &RunOptions, sink: &mut dyn ProgressSink) -> OrganizeResult<RunSummary> {
    let source = validate_source(&options.source)?;
    let destination = options
        .destination
        .clone()
        .unwrap_or_else(|| layout::default_destination(&source));
    validate_destination(&source, &destination)?;

    let layout = DestinationLayout::prepare(&destination)?;
    let organizer = FileOrganizer::new(&layout, options.method, options.collision);
    let mut summary = RunSummary::new(layout.root().to_path_buf());
    let mut pending = PendingArchives::new(options.grouping);

    info!(
        source = %source.display(),
        destination = %layout.root().display(),
        method = ?options.method,
        "starting run"
    );
    sink.emit("Starting file processing...");

    if options.categories.is_empty() {
        debug!("no categories selected");
    } else {
        walk(options, &source, &layout, &organizer, &mut pending, &mut summary, sink);
    }

    flush_archives(pending, &layout, options.method, &mut summary, sink)?;

    for line in summary.summary_lines(options.method) {
        sink.emit(&line);
    }
    info!(
        files = summary.total_files(),
        failed = summary.failed_files,
        "run complete"
    );

    Ok(summary)
}

fn walk(
    options: &RunOptions,
    source: &Path,
    layout: &DestinationLayout,
    organizer: &FileOrganizer<'_>,
    pending: &mut PendingArchives,
    summary: &mut RunSummary,
    sink: &mut dyn ProgressSink,
) {
    let mapper = FileMapper::default();
    let max_depth = match options.traversal {
        Traversal::Shallow => 1,
        Traversal::Recursive => usize::MAX,
    };

    let walker = WalkDir::new(source)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            // Never consume our own output.
            if entry.path().starts_with(layout.root()) {
                return false;
            }
            if entry.file_type().is_dir() {
                let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
                return options.filters.should_descend(relative);
            }
            true
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(source).to_path_buf();
                report_failure(
                    summary,
                    sink,
                    FileActionError::Walk {
                        path,
                        reason: e.to_string(),
                    },
                );
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let name = entry.file_name().to_os_string();
        let display_name = name.to_string_lossy().into_owned();
        let Some(category) = mapper.classify(&display_name) else {
            continue;
        };
        if !options.categories.contains(&category) {
            continue;
        }
        let relative = path.strip_prefix(source).unwrap_or(path);
        if !options.filters.should_include(relative) {
            debug!(file = %path.display(), "excluded by filters");
            continue;
        }

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                report_failure(
                    summary,
                    sink,
                    FileActionError::Metadata {
                        path: path.to_path_buf(),
                        source: e.into(),
                    },
                );
                continue;
            }
        };

        sink.emit(&format!("Scanned file: {}", display_name));
        let record = FileRecord {
            path: path.to_path_buf(),
            name,
            category,
            size,
        };

        match organizer.dispose(record, pending) {
            // Archived files are counted once their archive is written.
            Ok(Outcome::Queued) => {}
            Ok(_) => summary.record(category, size),
            Err(e) => report_failure(summary, sink, e),
        }
    }
}

/// Writes every pending group into its own archive.
///
/// For `ArchiveThenRemoveOriginal`, originals are deleted only after their
/// archive has been finished and synced.
pub(crate) fn flush_archives(
    pending: PendingArchives,
    layout: &DestinationLayout,
    method: DispositionMethod,
    summary: &mut RunSummary,
    sink: &mut dyn ProgressSink,
) -> OrganizeResult<()> {
    if pending.is_empty() {
        return Ok(());
    }

    let namer = ArchiveNamer::new();
    for (key, records) in pending.into_groups() {
        let report = archive::write_archive(layout.dir(key.category), &key.label, records, &namer)?;

        for failure in report.failed {
            report_failure(summary, sink, failure);
        }

        let mut stored = 0;
        for record in &report.written {
            if method.removes_archived_originals()
                && let Err(e) = fs::remove_file(&record.path)
            {
                report_failure(
                    summary,
                    sink,
                    FileActionError::Remove {
                        path: record.path.clone(),
                        source: e,
                    },
                );
                continue;
            }
            summary.record(record.category, record.size);
            stored += 1;
        }

        sink.emit(&format!(
            "Created archive: {} ({} files)",
            report.path.display(),
            report.written.len()
        ));
        debug!(archive = %report.path.display(), stored, "archive flushed");
        summary.archives.push(report.path);
    }

    Ok(())
}

fn report_failure(summary: &mut RunSummary, sink: &mut dyn ProgressSink, error: FileActionError) {
    warn!(file = %error.path().display(), error = %error, "file skipped");
    summary.failed_files += 1;
    sink.emit(&format!("Error: {}", error));
}

/// Checks that the source is a readable directory and canonicalizes it.
fn validate_source(source: &Path) -> OrganizeResult<PathBuf> {
    let invalid = |reason: String| OrganizeError::InvalidSource {
        path: source.to_path_buf(),
        reason,
    };

    if source.as_os_str().is_empty() {
        return Err(invalid("no source directory given".to_string()));
    }
    let metadata = fs::metadata(source).map_err(|e| invalid(e.to_string()))?;
    if !metadata.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }
    fs::read_dir(source).map_err(|e| invalid(format!("unreadable: {}", e)))?;
    source.canonicalize().map_err(|e| invalid(e.to_string()))
}

/// Rejects destinations that are files or that coincide with the source.
fn validate_destination(source: &Path, destination: &Path) -> OrganizeResult<()> {
    let invalid = |reason: &str| OrganizeError::InvalidDestination {
        path: destination.to_path_buf(),
        reason: reason.to_string(),
    };

    if destination.as_os_str().is_empty() {
        return Err(invalid("empty path"));
    }
    if destination.exists() {
        if !destination.is_dir() {
            return Err(invalid("exists and is not a directory"));
        }
        if destination.canonicalize().is_ok_and(|d| d == source) {
            return Err(invalid("same as the source directory"));
        }
    }
    Ok(())
}
