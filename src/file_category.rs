//! File categorization by extension.
//!
//! This module holds the fixed taxonomy of categories the organizer knows
//! about and the lookup that maps a file name to one of them. Extensions are
//! compared case-insensitively, and a file whose extension is not listed
//! belongs to no category at all.
//!
//! # Examples
//!
//! ```
//! use stowaway::file_category::{Category, FileMapper};
//!
//! let mapper = FileMapper::default();
//! assert_eq!(mapper.classify("holiday.JPG"), Some(Category::Images));
//! assert_eq!(mapper.classify("notes.md"), Some(Category::Documents));
//! assert_eq!(mapper.classify("data.xyz"), None);
//! ```
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

const DOCUMENT_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".txt", ".rtf", ".odt", ".tex", ".wps", ".wpd", ".csv", ".xls",
    ".xlsx", ".ppt", ".pptx", ".log", ".md",
];

const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".tif", ".svg", ".ico", ".webp", ".heif",
    ".heic", ".raw", ".nef", ".cr2", ".orf", ".sr2",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    ".mp4", ".mov", ".avi", ".mkv", ".flv", ".wmv", ".mpeg", ".mpg", ".3gp", ".webm", ".m4v",
    ".m2ts", ".mts", ".vob", ".ogv",
];

const AUDIO_EXTENSIONS: &[&str] = &[
    ".mp3", ".wav", ".aac", ".flac", ".m4a", ".wma", ".ogg", ".opus", ".amr", ".aiff", ".aif",
    ".mid", ".midi", ".ra", ".voc",
];

/// One of the four fixed file-type buckets.
///
/// The declaration order is the taxonomy order used for directory creation
/// and for the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Text, office and PDF documents.
    Documents,
    /// Raster, vector and camera raw images.
    Images,
    /// Video containers.
    Videos,
    /// Audio files.
    Audios,
}

impl Category {
    /// Every category, in taxonomy order.
    pub const ALL: [Category; 4] = [
        Category::Documents,
        Category::Images,
        Category::Videos,
        Category::Audios,
    ];

    /// Returns the destination subdirectory name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use stowaway::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "images");
    /// assert_eq!(Category::Audios.dir_name(), "audios");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Documents => "documents",
            Category::Images => "images",
            Category::Videos => "videos",
            Category::Audios => "audios",
        }
    }

    /// Capitalized name used in the run summary.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Documents => "Documents",
            Category::Images => "Images",
            Category::Videos => "Videos",
            Category::Audios => "Audios",
        }
    }

    /// The recognized extensions for this category, each with a leading dot.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Category::Documents => DOCUMENT_EXTENSIONS,
            Category::Images => IMAGE_EXTENSIONS,
            Category::Videos => VIDEO_EXTENSIONS,
            Category::Audios => AUDIO_EXTENSIONS,
        }
    }

    /// Parses a category from its directory name, ignoring case.
    ///
    /// Singular forms (`image`, `audio`, ...) are accepted as well.
    pub fn from_name(name: &str) -> Option<Category> {
        match name.trim().to_lowercase().as_str() {
            "documents" | "document" | "docs" => Some(Category::Documents),
            "images" | "image" => Some(Category::Images),
            "videos" | "video" => Some(Category::Videos),
            "audios" | "audio" => Some(Category::Audios),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Returns the lower-cased extension of a file name, without the dot.
///
/// Dotfiles with no further extension (`.bashrc`) have no extension.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Maps file extensions to categories.
///
/// Built once from the static taxonomy and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct FileMapper {
    extension_map: HashMap<&'static str, Category>,
}

impl FileMapper {
    /// Creates a new `FileMapper` over the full taxonomy.
    pub fn new() -> Self {
        let extension_map = Category::ALL
            .iter()
            .flat_map(|category| {
                category
                    .extensions()
                    .iter()
                    .map(move |ext| (ext.trim_start_matches('.'), *category))
            })
            .collect();
        Self { extension_map }
    }

    /// Maps a bare extension (with or without the leading dot) to a category.
    ///
    /// # Examples
    ///
    /// ```
    /// use stowaway::file_category::{Category, FileMapper};
    ///
    /// let mapper = FileMapper::default();
    /// assert_eq!(mapper.extension_to_category("pdf"), Some(Category::Documents));
    /// assert_eq!(mapper.extension_to_category(".FLAC"), Some(Category::Audios));
    /// ```
    pub fn extension_to_category(&self, ext: &str) -> Option<Category> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        self.extension_map.get(ext.as_str()).copied()
    }

    /// Determines the category of a file from its name.
    ///
    /// Returns `None` for names without an extension and for extensions that
    /// are not part of the taxonomy; such files are never touched.
    pub fn classify(&self, file_name: &str) -> Option<Category> {
        extension_of(file_name).and_then(|ext| self.extension_to_category(&ext))
    }
}

impl Default for FileMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_category_dir_names() {
        assert_eq!(Category::Documents.dir_name(), "documents");
        assert_eq!(Category::Images.dir_name(), "images");
        assert_eq!(Category::Videos.dir_name(), "videos");
        assert_eq!(Category::Audios.dir_name(), "audios");
    }

    #[test]
    fn test_extension_sets_are_disjoint() {
        let mut seen = HashSet::new();
        for category in Category::ALL {
            for ext in category.extensions() {
                assert!(seen.insert(*ext), "{} listed twice", ext);
            }
        }
    }

    #[test]
    fn test_every_listed_extension_classifies_to_its_category() {
        let mapper = FileMapper::default();
        for category in Category::ALL {
            for ext in category.extensions() {
                let name = format!("file{}", ext);
                assert_eq!(mapper.classify(&name), Some(category), "{}", name);
                let upper = format!("FILE{}", ext.to_uppercase());
                assert_eq!(mapper.classify(&upper), Some(category), "{}", upper);
            }
        }
    }

    #[test]
    fn test_classify_unknown_and_missing_extensions() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.classify("c.xyz"), None);
        assert_eq!(mapper.classify("README"), None);
        assert_eq!(mapper.classify(".bashrc"), None);
        assert_eq!(mapper.classify("archive.zip"), None);
    }

    #[test]
    fn test_classify_uses_last_extension() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.classify("report.final.pdf"), Some(Category::Documents));
        assert_eq!(mapper.classify("movie.mp4.part"), None);
        assert_eq!(mapper.classify(".hidden.png"), Some(Category::Images));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.PDF"), Some("pdf".to_string()));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Category::from_name("Images"), Some(Category::Images));
        assert_eq!(Category::from_name("audio"), Some(Category::Audios));
        assert_eq!(Category::from_name(" videos "), Some(Category::Videos));
        assert_eq!(Category::from_name("fonts"), None);
    }
}
