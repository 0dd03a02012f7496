//! Error types for stowaway.
//!
//! Two families are kept apart: [`OrganizeError`] aborts a run, while
//! [`FileActionError`] concerns a single file and is reported and skipped.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type for fatal, run-level operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Errors that abort a run.
#[derive(Error, Debug)]
pub enum OrganizeError {
    /// The source directory is missing, not a directory or unreadable.
    #[error("Invalid source directory {}: {reason}", .path.display())]
    InvalidSource { path: PathBuf, reason: String },

    /// The destination cannot be used as an output root.
    #[error("Invalid destination directory {}: {reason}", .path.display())]
    InvalidDestination { path: PathBuf, reason: String },

    /// The destination root or a category subdirectory could not be created.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The archive file could not be created.
    #[error("Failed to create archive {}: {source}", .path.display())]
    ArchiveCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing an entry or finalizing the archive failed.
    #[error("Failed to write archive {}: {reason}", .path.display())]
    ArchiveWriteFailed { path: PathBuf, reason: String },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A run was requested while another one is still in progress.
    #[error("A run is already in progress")]
    RunInProgress,
}

/// Errors concerning one file. The run continues with the next file.
#[derive(Error, Debug)]
pub enum FileActionError {
    /// The file's metadata could not be read.
    #[error("Failed to read metadata of {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Copying into the destination failed.
    #[error("Failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Moving into the destination failed.
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Deleting the original failed.
    #[error("Failed to remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The queued original could not be opened when its archive was written.
    #[error("Failed to open {} for archiving: {source}", .path.display())]
    ArchiveSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Walking the source tree failed for one entry.
    #[error("Failed to read {}: {reason}", .path.display())]
    Walk { path: PathBuf, reason: String },
}

impl FileActionError {
    /// Returns the path the failure concerns.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Metadata { path, .. }
            | Self::Remove { path, .. }
            | Self::ArchiveSource { path, .. }
            | Self::Walk { path, .. } => path,
            Self::Copy { from, .. } | Self::Move { from, .. } => from,
        }
    }
}
