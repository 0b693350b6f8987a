//! Build output packaging
//!
//! Packs the fixed set of build output files into an in-memory zip archive
//! ready for upload.

pub mod builder;

pub use builder::{ArchiveBuilder, DEFAULT_ENTRIES};

use std::path::Path;

use crate::error::PackagingError;

/// One file captured in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive, relative to the source directory
    pub path: String,
    /// Raw file content as read from disk
    pub content: Vec<u8>,
}

/// A compressed bundle of build output
#[derive(Debug, Clone)]
pub struct Archive {
    bytes: Vec<u8>,
    manifest: Vec<ArchiveEntry>,
}

impl Archive {
    pub(crate) fn new(bytes: Vec<u8>, manifest: Vec<ArchiveEntry>) -> Self {
        Self { bytes, manifest }
    }

    /// Compressed archive bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the compressed archive in bytes
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Entries in the order they were added
    pub fn manifest(&self) -> &[ArchiveEntry] {
        &self.manifest
    }

    pub fn entry_names(&self) -> Vec<&str> {
        self.manifest.iter().map(|e| e.path.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.is_empty()
    }

    /// BLAKE3 digest of the compressed bytes, hex encoded
    pub fn digest(&self) -> String {
        blake3::hash(&self.bytes).to_hex().to_string()
    }

    /// Write the compressed archive to a file, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<(), PackagingError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| PackagingError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, &self.bytes).map_err(|source| PackagingError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_for_same_bytes() {
        let a = Archive::new(vec![1, 2, 3], Vec::new());
        let b = Archive::new(vec![1, 2, 3], Vec::new());
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn write_to_creates_parent_directories() {
        let temp = tempfile::TempDir::new().unwrap();
        let out = temp.path().join("dist").join("bundle.zip");
        let archive = Archive::new(b"PK".to_vec(), Vec::new());

        archive.write_to(&out).unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"PK");
    }
}
