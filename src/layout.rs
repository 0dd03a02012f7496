//! Destination directory layout.
//!
//! A destination root holds one subdirectory per category. Preparing the
//! layout creates whatever is missing and leaves existing directories and
//! their contents alone, so it is safe to run repeatedly.

use crate::error::{OrganizeError, OrganizeResult};
use crate::file_category::Category;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the destination folder used when none is given.
pub const DEFAULT_DESTINATION_NAME: &str = "transported_files";

/// Returns the destination used when the caller gives none.
///
/// # Examples
///
/// ```
/// use stowaway::layout::default_destination;
/// use std::path::Path;
///
/// assert_eq!(
///     default_destination(Path::new("/home/me/Downloads")),
///     Path::new("/home/me/Downloads/transported_files")
/// );
/// ```
pub fn default_destination(source: &Path) -> PathBuf {
    source.join(DEFAULT_DESTINATION_NAME)
}

/// Category to directory mapping under a destination root.
///
/// Every path in the layout exists on disk once [`DestinationLayout::prepare`]
/// has returned.
#[derive(Debug, Clone)]
pub struct DestinationLayout {
    root: PathBuf,
    dirs: BTreeMap<Category, PathBuf>,
}

impl DestinationLayout {
    /// Creates the destination root and one subdirectory per category.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::DirectoryCreationFailed` if the root or a
    /// category directory cannot be created, including when a regular file
    /// already occupies one of the paths.
    pub fn prepare(root: &Path) -> OrganizeResult<Self> {
        ensure_dir(root)?;
        // Canonical root, so that containment checks against walked paths work.
        let root = root
            .canonicalize()
            .map_err(|e| OrganizeError::DirectoryCreationFailed {
                path: root.to_path_buf(),
                source: e,
            })?;

        let mut dirs = BTreeMap::new();
        for category in Category::ALL {
            let path = root.join(category.dir_name());
            ensure_dir(&path)?;
            dirs.insert(category, path);
        }

        debug!(root = %root.display(), "destination layout ready");
        Ok(Self { root, dirs })
    }

    /// The (canonical) destination root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory for a category.
    pub fn dir(&self, category: Category) -> &Path {
        // prepare() fills every category.
        &self.dirs[&category]
    }

    /// Iterates over categories and their directories in taxonomy order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &Path)> {
        self.dirs.iter().map(|(category, path)| (*category, path.as_path()))
    }
}

fn ensure_dir(path: &Path) -> OrganizeResult<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| OrganizeError::DirectoryCreationFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(path = %path.display(), "created directory");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn subdirectories(path: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(path)
            .expect("Failed to read directory")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_prepare_creates_all_category_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("out");

        let layout = DestinationLayout::prepare(&root).expect("prepare failed");

        assert_eq!(
            subdirectories(&root),
            vec!["audios", "documents", "images", "videos"]
        );
        for (category, dir) in layout.iter() {
            assert!(dir.is_dir());
            assert!(dir.ends_with(category.dir_name()));
        }
    }

    #[test]
    fn test_prepare_is_idempotent_and_keeps_contents() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("out");

        DestinationLayout::prepare(&root).expect("first prepare failed");
        let keep = root.join("images").join("keep.png");
        fs::write(&keep, b"existing").expect("Failed to write file");

        let layout = DestinationLayout::prepare(&root).expect("second prepare failed");

        assert_eq!(
            subdirectories(&root),
            vec!["audios", "documents", "images", "videos"]
        );
        assert_eq!(fs::read(&keep).expect("Failed to read file"), b"existing");
        assert_eq!(layout.dir(Category::Images), layout.root().join("images"));
    }

    #[test]
    fn test_prepare_fails_when_category_path_is_a_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("out");
        fs::create_dir(&root).expect("Failed to create root");
        fs::write(root.join("videos"), b"not a directory").expect("Failed to write file");

        let result = DestinationLayout::prepare(&root);

        assert!(matches!(
            result,
            Err(OrganizeError::DirectoryCreationFailed { .. })
        ));
    }

    #[test]
    fn test_prepare_fails_when_root_is_a_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("out");
        fs::write(&root, b"file").expect("Failed to write file");

        assert!(DestinationLayout::prepare(&root).is_err());
    }
}
