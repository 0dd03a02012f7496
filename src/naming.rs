//! Collision-free names for archives and renamed files.
//!
//! Names carry a readable prefix followed by a short token. The token is the
//! BLAKE3 digest of a random 32-byte salt and the current unix time,
//! truncated to 16 hex characters.

use std::ffi::{OsStr, OsString};
use std::path::Path;

/// Length of the hex token embedded in generated names.
pub const TOKEN_LEN: usize = 16;

/// Generates unique names.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveNamer;

impl ArchiveNamer {
    /// Creates a namer.
    pub fn new() -> Self {
        Self
    }

    /// Returns a fresh random token of [`TOKEN_LEN`] hex characters.
    pub fn token(&self) -> String {
        let timestamp = chrono::Utc::now().timestamp();

        let mut hasher = blake3::Hasher::new();
        // Two v4 UUIDs give 244 random bits.
        hasher.update(uuid::Uuid::new_v4().as_bytes());
        hasher.update(uuid::Uuid::new_v4().as_bytes());
        hasher.update(&timestamp.to_le_bytes());
        let digest = hasher.finalize().to_hex();
        digest.as_str()[..TOKEN_LEN].to_string()
    }

    /// Returns an archive file name of the form `<discriminator>_<token>.zip`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stowaway::naming::ArchiveNamer;
    ///
    /// let name = ArchiveNamer::new().next_name("documents");
    /// assert!(name.starts_with("documents_"));
    /// assert!(name.ends_with(".zip"));
    /// ```
    pub fn next_name(&self, discriminator: &str) -> String {
        format!("{}_{}.zip", sanitize(discriminator), self.token())
    }

    /// Returns `file_name` with a token inserted before its extension.
    ///
    /// `photo.jpg` becomes `photo_<token>.jpg`; a name without an extension
    /// simply gets the suffix.
    pub fn unique_file_name(&self, file_name: &str) -> String {
        self.unique_os_file_name(OsStr::new(file_name))
            .to_string_lossy()
            .into_owned()
    }

    /// Like [`ArchiveNamer::unique_file_name`], but keeps the stem and
    /// extension byte for byte, even when they are not valid UTF-8.
    pub fn unique_os_file_name(&self, file_name: &OsStr) -> OsString {
        let path = Path::new(file_name);
        let mut renamed = path
            .file_stem()
            .map(OsStr::to_os_string)
            .unwrap_or_else(|| OsString::from("file"));
        renamed.push("_");
        renamed.push(self.token());

        if let Some(ext) = path.extension().filter(|ext| !ext.is_empty()) {
            renamed.push(".");
            renamed.push(ext);
        }
        renamed
    }
}

/// Keeps ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
fn sanitize(discriminator: &str) -> String {
    let cleaned: String = discriminator
        .trim()
        .trim_start_matches('.')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "archive".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_next_name_shape() {
        let name = ArchiveNamer::new().next_name("images");
        let token = name
            .strip_prefix("images_")
            .and_then(|rest| rest.strip_suffix(".zip"))
            .expect("unexpected name shape");
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_names_do_not_collide() {
        let namer = ArchiveNamer::new();
        let names: HashSet<String> = (0..5000).map(|_| namer.next_name("pdf")).collect();
        assert_eq!(names.len(), 5000);
    }

    #[test]
    fn test_discriminator_is_sanitized() {
        let namer = ArchiveNamer::new();
        assert!(namer.next_name(".pdf").starts_with("pdf_"));
        assert!(namer.next_name("a/b c").starts_with("a_b_c_"));
        assert!(namer.next_name("").starts_with("archive_"));
    }

    #[test]
    fn test_unique_file_name_keeps_stem_and_extension() {
        let namer = ArchiveNamer::new();

        let renamed = namer.unique_file_name("photo.jpg");
        assert!(renamed.starts_with("photo_"));
        assert!(renamed.ends_with(".jpg"));
        assert_eq!(renamed.len(), "photo_.jpg".len() + TOKEN_LEN);

        let renamed = namer.unique_file_name("Makefile");
        assert!(renamed.starts_with("Makefile_"));
        assert_ne!(namer.unique_file_name("a.pdf"), namer.unique_file_name("a.pdf"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unique_os_file_name_keeps_raw_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let namer = ArchiveNamer::new();
        let renamed = namer.unique_os_file_name(OsStr::from_bytes(b"caf\xff.pdf"));
        let bytes = renamed.as_bytes();

        assert!(bytes.starts_with(b"caf\xff_"));
        assert!(bytes.ends_with(b".pdf"));
        assert_eq!(bytes.len(), b"caf\xff_.pdf".len() + TOKEN_LEN);
    }
}
