//! Zip archive construction from a build output directory.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::write::SimpleFileOptions;

use super::{Archive, ArchiveEntry};
use crate::error::PackagingError;

/// Files picked up from the build output directory, in archive order.
pub const DEFAULT_ENTRIES: &[&str] = &["index.html", "bundle.js"];

/// Maximum DEFLATE level.
const COMPRESSION_LEVEL: i64 = 9;

/// Packs a fixed manifest of build output files into a zip archive
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    source_dir: PathBuf,
    entries: Vec<String>,
}

impl ArchiveBuilder {
    /// Create a builder for the default manifest (`index.html`, `bundle.js`)
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            entries: DEFAULT_ENTRIES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the manifest with an explicit list of relative paths
    pub fn with_entries<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries = entries.into_iter().map(Into::into).collect();
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Read the manifest files that exist and compress them.
    ///
    /// Missing files are skipped; any other read failure aborts packaging.
    pub fn build(&self) -> Result<Archive, PackagingError> {
        let manifest = self.collect()?;
        let bytes = compress(&manifest)?;

        debug!(
            source = %self.source_dir.display(),
            entries = manifest.len(),
            size = bytes.len(),
            "Built archive"
        );

        Ok(Archive::new(bytes, manifest))
    }

    fn collect(&self) -> Result<Vec<ArchiveEntry>, PackagingError> {
        let mut manifest = Vec::with_capacity(self.entries.len());

        for name in &self.entries {
            let path = self.source_dir.join(name);
            match std::fs::read(&path) {
                Ok(content) => manifest.push(ArchiveEntry {
                    path: name.clone(),
                    content,
                }),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "Skipping missing build output file");
                }
                Err(source) => return Err(PackagingError::Read { path, source }),
            }
        }

        Ok(manifest)
    }
}

fn compress(manifest: &[ArchiveEntry]) -> Result<Vec<u8>, PackagingError> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    for entry in manifest {
        let zip_err = |source| PackagingError::Zip {
            name: entry.path.clone(),
            source,
        };
        zip.start_file(entry.path.as_str(), options)
            .map_err(zip_err)?;
        zip.write_all(&entry.content)
            .map_err(|e| zip_err(zip::result::ZipError::Io(e)))?;
    }

    let cursor = zip.finish().map_err(|source| PackagingError::Zip {
        name: "central directory".to_string(),
        source,
    })?;

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_back(archive: &Archive) -> Vec<(String, Vec<u8>)> {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes().to_vec()))
            .expect("archive should be a valid zip");
        let mut out = Vec::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i).expect("entry should be readable");
            let mut content = Vec::new();
            file.read_to_end(&mut content).expect("entry should decompress");
            out.push((file.name().to_string(), content));
        }
        out
    }

    #[test]
    fn builds_both_entries_in_manifest_order() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("bundle.js"), "console.log(1)").unwrap();
        std::fs::write(temp.path().join("index.html"), "<html>A</html>").unwrap();

        let archive = ArchiveBuilder::new(temp.path()).build().unwrap();

        assert_eq!(archive.entry_names(), vec!["index.html", "bundle.js"]);
        let entries = read_back(&archive);
        assert_eq!(entries[0], ("index.html".to_string(), b"<html>A</html>".to_vec()));
        assert_eq!(entries[1], ("bundle.js".to_string(), b"console.log(1)".to_vec()));
    }

    #[test]
    fn entries_are_deflated() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("index.html"), "a".repeat(4096)).unwrap();

        let archive = ArchiveBuilder::new(temp.path()).build().unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes().to_vec())).unwrap();
        let file = zip.by_index(0).unwrap();
        assert_eq!(file.compression(), zip::CompressionMethod::Deflated);
        assert!(archive.size() < 4096);
    }

    #[test]
    fn empty_directory_yields_empty_archive() {
        let temp = tempfile::TempDir::new().unwrap();

        let archive = ArchiveBuilder::new(temp.path()).build().unwrap();

        assert!(archive.is_empty());
        assert!(read_back(&archive).is_empty());
        assert!(archive.size() > 0, "an empty zip still has a central directory");
    }

    #[test]
    fn directory_in_place_of_file_is_an_error() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("index.html")).unwrap();

        let result = ArchiveBuilder::new(temp.path()).build();

        assert!(matches!(result, Err(PackagingError::Read { .. })));
    }

    #[test]
    fn custom_entries_replace_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("index.html"), "x").unwrap();
        std::fs::write(temp.path().join("bundle.js.map"), "{}").unwrap();

        let archive = ArchiveBuilder::new(temp.path())
            .with_entries(["bundle.js.map"])
            .build()
            .unwrap();

        assert_eq!(archive.entry_names(), vec!["bundle.js.map"]);
    }
}
