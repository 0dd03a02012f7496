//! Zip archives for the archive-then-copy and archive-then-move methods.
//!
//! During a run, files picked for archiving are queued into groups. Once the
//! walk is over each non-empty group becomes one new `.zip` inside its
//! category directory, with every member stored under its basename.

use crate::error::{FileActionError, OrganizeError, OrganizeResult};
use crate::file_category::Category;
use crate::file_organizer::FileRecord;
use crate::naming::ArchiveNamer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// How many fresh names are tried when an archive name is already taken.
const MAX_NAME_ATTEMPTS: usize = 4;

/// How queued files are split into archives.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveGrouping {
    /// One archive per category, named after the category.
    #[default]
    Category,
    /// One archive per extension, named after the extension.
    Extension,
}

/// Identifies one pending archive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    /// Category directory the archive is written to.
    pub category: Category,
    /// Discriminator used as the archive name prefix.
    pub label: String,
}

/// Files waiting to be archived, grouped and kept in queue order.
#[derive(Debug)]
pub struct PendingArchives {
    grouping: ArchiveGrouping,
    groups: BTreeMap<GroupKey, Vec<FileRecord>>,
}

impl PendingArchives {
    /// Creates an empty queue.
    pub fn new(grouping: ArchiveGrouping) -> Self {
        Self {
            grouping,
            groups: BTreeMap::new(),
        }
    }

    /// Queues a file into the group it belongs to.
    pub fn enqueue(&mut self, record: FileRecord) {
        let label = match self.grouping {
            ArchiveGrouping::Category => record.category.dir_name().to_string(),
            ArchiveGrouping::Extension => record
                .extension()
                .unwrap_or_else(|| record.category.dir_name().to_string()),
        };
        let key = GroupKey {
            category: record.category,
            label,
        };
        self.groups.entry(key).or_default().push(record);
    }

    /// Number of queued files across all groups.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of groups, i.e. archives a flush would write.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Consumes the queue, yielding groups in category then label order.
    pub fn into_groups(self) -> impl Iterator<Item = (GroupKey, Vec<FileRecord>)> {
        self.groups.into_iter()
    }
}

/// Outcome of writing one archive.
#[derive(Debug)]
pub struct ArchiveReport {
    /// Location of the finished archive.
    pub path: PathBuf,
    /// Files stored in the archive.
    pub written: Vec<FileRecord>,
    /// Files that could not be opened and were left out.
    pub failed: Vec<FileActionError>,
}

/// Writes `records` into a new archive under `dir`.
///
/// The archive is named `<label>_<token>.zip` and is never written over an
/// existing file. Members are stored by basename; a basename seen twice is
/// renamed with [`ArchiveNamer::unique_file_name`]. The archive is finished
/// and synced to disk before this returns, so callers may delete the
/// originals listed in [`ArchiveReport::written`].
///
/// # Errors
///
/// Returns `OrganizeError::ArchiveCreateFailed` if the archive file cannot be
/// created and `OrganizeError::ArchiveWriteFailed` if streaming a member or
/// finishing the archive fails. On error the partial archive is removed.
/// A member that cannot be opened is not fatal and is reported in
/// [`ArchiveReport::failed`].
pub fn write_archive(
    dir: &Path,
    label: &str,
    records: Vec<FileRecord>,
    namer: &ArchiveNamer,
) -> OrganizeResult<ArchiveReport> {
    let (path, file) = create_archive_file(dir, label, namer)?;

    match write_entries(file, &path, records, namer) {
        Ok((written, failed)) => {
            debug!(archive = %path.display(), members = written.len(), "archive written");
            Ok(ArchiveReport {
                path,
                written,
                failed,
            })
        }
        Err(e) => {
            if let Err(remove_err) = fs::remove_file(&path) {
                warn!(archive = %path.display(), error = %remove_err, "could not remove partial archive");
            }
            Err(e)
        }
    }
}

fn create_archive_file(
    dir: &Path,
    label: &str,
    namer: &ArchiveNamer,
) -> OrganizeResult<(PathBuf, File)> {
    let mut last_path = dir.to_path_buf();
    for _ in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(namer.next_name(label));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!(archive = %path.display(), "archive name already taken, drawing another");
                last_path = path;
            }
            Err(e) => return Err(OrganizeError::ArchiveCreateFailed { path, source: e }),
        }
    }

    Err(OrganizeError::ArchiveCreateFailed {
        path: last_path,
        source: io::Error::new(io::ErrorKind::AlreadyExists, "no unused archive name found"),
    })
}

fn write_entries(
    file: File,
    path: &Path,
    records: Vec<FileRecord>,
    namer: &ArchiveNamer,
) -> OrganizeResult<(Vec<FileRecord>, Vec<FileActionError>)> {
    let write_failed = |reason: String| OrganizeError::ArchiveWriteFailed {
        path: path.to_path_buf(),
        reason,
    };

    let mut zip = ZipWriter::new(file);
    let mut used_names = HashSet::new();
    let mut written = Vec::with_capacity(records.len());
    let mut failed = Vec::new();

    for record in records {
        let mut source = match File::open(&record.path) {
            Ok(source) => source,
            Err(e) => {
                failed.push(FileActionError::ArchiveSource {
                    path: record.path.clone(),
                    source: e,
                });
                continue;
            }
        };

        let display_name = record.display_name();
        let mut entry_name = display_name.clone();
        while !used_names.insert(entry_name.clone()) {
            entry_name = namer.unique_file_name(&display_name);
        }

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(record.size >= u64::from(u32::MAX));
        zip.start_file(entry_name.as_str(), options)
            .map_err(|e| write_failed(format!("{}: {}", entry_name, e)))?;
        io::copy(&mut source, &mut zip)
            .map_err(|e| write_failed(format!("{}: {}", record.path.display(), e)))?;

        written.push(record);
    }

    let file = zip.finish().map_err(|e| write_failed(e.to_string()))?;
    file.sync_all().map_err(|e| write_failed(e.to_string()))?;

    Ok((written, failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn record(dir: &Path, name: &str, content: &[u8], category: Category) -> FileRecord {
        let path = dir.join(name);
        fs::write(&path, content).expect("Failed to write file");
        FileRecord {
            path,
            name: name.into(),
            category,
            size: content.len() as u64,
        }
    }

    fn read_members(path: &Path) -> Vec<(String, Vec<u8>)> {
        let file = File::open(path).expect("Failed to open archive");
        let mut archive = ZipArchive::new(file).expect("Failed to read archive");
        (0..archive.len())
            .map(|i| {
                let mut member = archive.by_index(i).expect("Failed to read member");
                let mut data = Vec::new();
                member.read_to_end(&mut data).expect("Failed to read data");
                (member.name().to_string(), data)
            })
            .collect()
    }

    fn zip_files_in(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .expect("Failed to read dir")
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "zip"))
            .collect()
    }

    #[test]
    fn test_grouping_by_category() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut pending = PendingArchives::new(ArchiveGrouping::Category);
        pending.enqueue(record(temp_dir.path(), "a.pdf", b"a", Category::Documents));
        pending.enqueue(record(temp_dir.path(), "b.txt", b"b", Category::Documents));
        pending.enqueue(record(temp_dir.path(), "c.png", b"c", Category::Images));

        assert_eq!(pending.len(), 3);
        assert_eq!(pending.group_count(), 2);

        let groups: Vec<_> = pending.into_groups().collect();
        assert_eq!(groups[0].0.label, "documents");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0.label, "images");
    }

    #[test]
    fn test_grouping_by_extension() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut pending = PendingArchives::new(ArchiveGrouping::Extension);
        pending.enqueue(record(temp_dir.path(), "a.pdf", b"a", Category::Documents));
        pending.enqueue(record(temp_dir.path(), "b.PDF", b"b", Category::Documents));
        pending.enqueue(record(temp_dir.path(), "c.txt", b"c", Category::Documents));

        let labels: Vec<_> = pending.into_groups().map(|(key, _)| key.label).collect();
        assert_eq!(labels, vec!["pdf", "txt"]);
    }

    #[test]
    fn test_write_archive_round_trip() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let out = temp_dir.path().join("out");
        fs::create_dir(&out).expect("Failed to create dir");

        let records = vec![
            record(temp_dir.path(), "a.pdf", b"first document", Category::Documents),
            record(temp_dir.path(), "b.txt", &[0u8, 1, 2, 255], Category::Documents),
        ];

        let report = write_archive(&out, "documents", records, &ArchiveNamer::new())
            .expect("archive failed");

        assert_eq!(report.written.len(), 2);
        assert!(report.failed.is_empty());
        assert!(report.path.starts_with(&out));
        let name = report.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("documents_") && name.ends_with(".zip"));

        let members = read_members(&report.path);
        assert_eq!(
            members,
            vec![
                ("a.pdf".to_string(), b"first document".to_vec()),
                ("b.txt".to_string(), vec![0u8, 1, 2, 255]),
            ]
        );
    }

    #[test]
    fn test_duplicate_basenames_are_renamed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let first = temp_dir.path().join("first");
        let second = temp_dir.path().join("second");
        fs::create_dir(&first).expect("Failed to create dir");
        fs::create_dir(&second).expect("Failed to create dir");

        let records = vec![
            record(&first, "same.png", b"one", Category::Images),
            record(&second, "same.png", b"two", Category::Images),
        ];

        let report = write_archive(temp_dir.path(), "images", records, &ArchiveNamer::new())
            .expect("archive failed");

        let members = read_members(&report.path);
        assert_eq!(members.len(), 2);
        assert_eq!(members[0], ("same.png".to_string(), b"one".to_vec()));
        assert!(members[1].0.starts_with("same_") && members[1].0.ends_with(".png"));
        assert_eq!(members[1].1, b"two");
    }

    #[test]
    fn test_missing_member_is_reported_not_fatal() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let kept = record(temp_dir.path(), "kept.mp3", b"kept", Category::Audios);
        let gone = record(temp_dir.path(), "gone.mp3", b"gone", Category::Audios);
        fs::remove_file(&gone.path).expect("Failed to remove file");

        let report = write_archive(temp_dir.path(), "audios", vec![gone, kept], &ArchiveNamer::new())
            .expect("archive failed");

        assert_eq!(report.written.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(read_members(&report.path)[0].0, "kept.mp3");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_failure_removes_partial_archive() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let out = temp_dir.path().join("out");
        fs::create_dir(&out).expect("Failed to create dir");

        let good = record(temp_dir.path(), "good.mp4", b"video", Category::Videos);
        // Opening a directory succeeds on unix but reading it fails.
        let unreadable_dir = temp_dir.path().join("broken.mp4");
        fs::create_dir(&unreadable_dir).expect("Failed to create dir");
        let broken = FileRecord {
            path: unreadable_dir,
            name: "broken.mp4".into(),
            category: Category::Videos,
            size: 0,
        };

        let result = write_archive(&out, "videos", vec![good, broken], &ArchiveNamer::new());

        assert!(matches!(result, Err(OrganizeError::ArchiveWriteFailed { .. })));
        assert!(zip_files_in(&out).is_empty(), "partial archive left behind");
        assert!(temp_dir.path().join("good.mp4").exists());
    }

    #[test]
    fn test_create_fails_in_missing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let missing = temp_dir.path().join("missing");
        let records = vec![record(temp_dir.path(), "a.pdf", b"a", Category::Documents)];

        let result = write_archive(&missing, "documents", records, &ArchiveNamer::new());

        assert!(matches!(result, Err(OrganizeError::ArchiveCreateFailed { .. })));
    }
}
