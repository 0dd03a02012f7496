//! Per-file disposition: copy, move, or queue for archiving.
//!
//! This module applies the chosen method to one classified file at a time.
//! Copies and moves never write over a file already present at the
//! destination; archive methods only queue the file, and the archive itself
//! is written once the walk is over.

use crate::archive::PendingArchives;
use crate::error::FileActionError;
use crate::file_category::{self, Category};
use crate::layout::DestinationLayout;
use crate::naming::ArchiveNamer;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What happens to each selected file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum DispositionMethod {
    /// Copy into the category directory, keeping the original.
    #[value(name = "copy")]
    CopyOnly,
    /// Move into the category directory.
    #[value(name = "move")]
    MoveOnly,
    /// Zip into the category directory, then delete the original.
    #[value(name = "archive-move")]
    ArchiveThenRemoveOriginal,
    /// Zip into the category directory, keeping the original.
    #[value(name = "archive-copy")]
    ArchiveThenKeepOriginal,
}

impl DispositionMethod {
    /// Returns true if originals are deleted once archived.
    pub fn removes_archived_originals(&self) -> bool {
        matches!(self, Self::ArchiveThenRemoveOriginal)
    }

    /// Past-tense verb used in the run summary.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::CopyOnly => "Copied",
            Self::MoveOnly => "Moved",
            Self::ArchiveThenRemoveOriginal | Self::ArchiveThenKeepOriginal => "Archived",
        }
    }
}

/// What to do when the destination already holds a file of the same name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Leave the existing file alone. A copy is skipped; a move deletes the
    /// incoming original as already transferred.
    #[default]
    Skip,
    /// Store the incoming file under a new, unique name.
    Rename,
}

/// A regular file picked up by the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path of the original.
    pub path: PathBuf,
    /// Basename of the original, exactly as stored on disk.
    pub name: OsString,
    /// Category derived from the extension.
    pub category: Category,
    /// Size in bytes when the file was enumerated.
    pub size: u64,
}

impl FileRecord {
    /// Basename for display and archive entries, with invalid UTF-8 replaced.
    pub fn display_name(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }

    /// Lower-cased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        file_category::extension_of(&self.display_name())
    }
}

/// Terminal state of a dispositioned file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Copied to the given path.
    Copied { to: PathBuf },
    /// Moved to the given path.
    Moved { to: PathBuf },
    /// Copy skipped because the destination name was taken.
    AlreadyPresent { existing: PathBuf },
    /// Original deleted because the destination name was taken.
    SourceRemoved { existing: PathBuf },
    /// Queued for archiving.
    Queued,
}

/// Applies a disposition method to files, one at a time.
pub struct FileOrganizer<'a> {
    layout: &'a DestinationLayout,
    method: DispositionMethod,
    collision: CollisionPolicy,
    namer: ArchiveNamer,
}

impl<'a> FileOrganizer<'a> {
    /// Creates an organizer writing into `layout`.
    pub fn new(
        layout: &'a DestinationLayout,
        method: DispositionMethod,
        collision: CollisionPolicy,
    ) -> Self {
        Self {
            layout,
            method,
            collision,
            namer: ArchiveNamer::new(),
        }
    }

    /// Dispositions one file.
    ///
    /// Archive methods push the record onto `pending` and touch nothing on
    /// disk. Copy and move act immediately.
    ///
    /// # Errors
    ///
    /// Returns a `FileActionError` if the copy, move or removal fails. The
    /// error concerns this file only.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use stowaway::archive::{ArchiveGrouping, PendingArchives};
    /// use stowaway::file_category::Category;
    /// use stowaway::file_organizer::{CollisionPolicy, DispositionMethod, FileOrganizer, FileRecord};
    /// use stowaway::layout::DestinationLayout;
    /// use std::path::{Path, PathBuf};
    ///
    /// let layout = DestinationLayout::prepare(Path::new("/tmp/out")).unwrap();
    /// let organizer = FileOrganizer::new(&layout, DispositionMethod::CopyOnly, CollisionPolicy::Skip);
    /// let mut pending = PendingArchives::new(ArchiveGrouping::Category);
    /// let record = FileRecord {
    ///     path: PathBuf::from("/tmp/in/a.pdf"),
    ///     name: "a.pdf".into(),
    ///     category: Category::Documents,
    ///     size: 10,
    /// };
    /// match organizer.dispose(record, &mut pending) {
    ///     Ok(outcome) => println!("{:?}", outcome),
    ///     Err(e) => eprintln!("{}", e),
    /// }
    /// ```
    pub fn dispose(
        &self,
        record: FileRecord,
        pending: &mut PendingArchives,
    ) -> Result<Outcome, FileActionError> {
        let dir = self.layout.dir(record.category);
        match self.method {
            DispositionMethod::CopyOnly => self.copy_into(&record, dir),
            DispositionMethod::MoveOnly => self.move_into(&record, dir),
            DispositionMethod::ArchiveThenRemoveOriginal
            | DispositionMethod::ArchiveThenKeepOriginal => {
                debug!(file = %record.path.display(), "queued for archiving");
                pending.enqueue(record);
                Ok(Outcome::Queued)
            }
        }
    }

    fn copy_into(&self, record: &FileRecord, dir: &Path) -> Result<Outcome, FileActionError> {
        let target = match self.free_target(record, dir) {
            Ok(target) => target,
            Err(existing) => {
                debug!(existing = %existing.display(), "destination taken, copy skipped");
                return Ok(Outcome::AlreadyPresent { existing });
            }
        };

        fs::copy(&record.path, &target).map_err(|e| FileActionError::Copy {
            from: record.path.clone(),
            to: target.clone(),
            source: e,
        })?;
        debug!(from = %record.path.display(), to = %target.display(), "copied");
        Ok(Outcome::Copied { to: target })
    }

    fn move_into(&self, record: &FileRecord, dir: &Path) -> Result<Outcome, FileActionError> {
        let target = match self.free_target(record, dir) {
            Ok(target) => target,
            Err(existing) => {
                fs::remove_file(&record.path).map_err(|e| FileActionError::Remove {
                    path: record.path.clone(),
                    source: e,
                })?;
                debug!(
                    file = %record.path.display(),
                    existing = %existing.display(),
                    "destination taken, original removed"
                );
                return Ok(Outcome::SourceRemoved { existing });
            }
        };

        move_file(&record.path, &target).map_err(|e| FileActionError::Move {
            from: record.path.clone(),
            to: target.clone(),
            source: e,
        })?;
        debug!(from = %record.path.display(), to = %target.display(), "moved");
        Ok(Outcome::Moved { to: target })
    }

    /// Picks the destination path for `record`.
    ///
    /// Returns `Err(existing)` when the basename is taken and the policy is
    /// to skip.
    fn free_target(&self, record: &FileRecord, dir: &Path) -> Result<PathBuf, PathBuf> {
        let target = dir.join(&record.name);
        if !is_occupied(&target) {
            return Ok(target);
        }

        match self.collision {
            CollisionPolicy::Skip => Err(target),
            CollisionPolicy::Rename => {
                let mut renamed = dir.join(self.namer.unique_os_file_name(&record.name));
                while is_occupied(&renamed) {
                    renamed = dir.join(self.namer.unique_os_file_name(&record.name));
                }
                Ok(renamed)
            }
        }
    }
}

/// True if anything, including a dangling symlink, sits at `path`.
fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Renames `from` to `to`, copying then deleting when they are on
/// different filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}
