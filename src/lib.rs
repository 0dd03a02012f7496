//! stowaway - sort a folder's files into category folders
//!
//! This library classifies files by extension into documents, images, videos
//! and audios, and copies, moves or zips each selected file into a matching
//! subdirectory of a destination root. Runs report their progress as plain
//! text lines through a caller-supplied [`ProgressSink`] and end with a
//! per-category [`RunSummary`].

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod file_category;
pub mod file_organizer;
pub mod layout;
pub mod logging;
pub mod naming;
pub mod output;
pub mod progress;
pub mod run;

pub use archive::ArchiveGrouping;
pub use config::{CompiledFilters, Config, ConfigError};
pub use error::{FileActionError, OrganizeError, OrganizeResult};
pub use file_category::{Category, FileMapper};
pub use file_organizer::{CollisionPolicy, DispositionMethod, FileOrganizer};
pub use layout::DestinationLayout;
pub use naming::ArchiveNamer;
pub use progress::{LineCollector, ProgressSink};
pub use run::{RunOptions, RunSummary, Traversal, run};

pub use cli::{AppState, Cli, run_cli};
