//! Package command: build the deployment archive without uploading it.

use std::path::PathBuf;

use serde::Serialize;

use crate::archive::ArchiveBuilder;
use crate::error::PackagingError;

/// Options for packaging build output
#[derive(Debug, Clone)]
pub struct PackageOptions {
    /// Build output directory
    pub source_dir: PathBuf,
    /// Where to write the zip file
    pub output: PathBuf,
}

impl PackageOptions {
    pub fn new(source_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output: output.into(),
        }
    }
}

/// Result of a package operation
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub output: PathBuf,
    pub size: usize,
    pub digest: String,
    pub entries: Vec<String>,
}

#[derive(Debug, Default)]
pub struct PackageCommand;

impl PackageCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, options: &PackageOptions) -> Result<PackageReport, PackagingError> {
        let archive = ArchiveBuilder::new(&options.source_dir).build()?;
        archive.write_to(&options.output)?;

        Ok(PackageReport {
            output: options.output.clone(),
            size: archive.size(),
            digest: archive.digest(),
            entries: archive
                .entry_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_archive_and_reports_entries() {
        let temp = tempfile::TempDir::new().unwrap();
        let public = temp.path().join("public");
        std::fs::create_dir_all(&public).unwrap();
        std::fs::write(public.join("index.html"), "<html></html>").unwrap();
        let out = temp.path().join("out").join("bundle.zip");

        let report = PackageCommand::new()
            .execute(&PackageOptions::new(&public, &out))
            .unwrap();

        assert_eq!(report.entries, vec!["index.html"]);
        assert_eq!(report.size as u64, std::fs::metadata(&out).unwrap().len());
    }
}
