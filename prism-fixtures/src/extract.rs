//! Fixture archive extraction

use prism_common::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Files written by an extraction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractSummary {
    /// Regular files written, in archive order
    pub files: Vec<PathBuf>,
    /// Entry names refused because they would land outside the target
    pub skipped: Vec<String>,
}

/// Extraction that stopped before the end of the archive
///
/// `partial` lists what was already written; those files stay on disk.
#[derive(Debug)]
pub struct ExtractError {
    pub cause: Error,
    pub partial: ExtractSummary,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} files written)", self.cause, self.partial.files.len())
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl From<Error> for ExtractError {
    fn from(cause: Error) -> Self {
        Self {
            cause,
            partial: ExtractSummary::default(),
        }
    }
}

/// Unpack `archive_path` into `dest` on the blocking pool
pub async fn unzip(
    archive_path: &Path,
    dest: &Path,
) -> std::result::Result<ExtractSummary, ExtractError> {
    let archive_path = archive_path.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || unzip_blocking(&archive_path, &dest))
        .await
        .map_err(|e| Error::Internal(format!("Extraction task failed: {}", e)))?
}

/// Unpack a zip archive
///
/// **Behavior:**
/// - Missing or unreadable archive: `Error::Archive`, nothing is written
/// - Existing files are overwritten
/// - Entries with absolute paths or `..` components are skipped
/// - An I/O error on one entry stops extraction; the error carries the files
///   written before it
pub fn unzip_blocking(
    archive_path: &Path,
    dest: &Path,
) -> std::result::Result<ExtractSummary, ExtractError> {
    let mut summary = ExtractSummary::default();

    match extract_entries(archive_path, dest, &mut summary) {
        Ok(()) => {
            debug!(
                archive = %archive_path.display(),
                files = summary.files.len(),
                skipped = summary.skipped.len(),
                "Archive extracted"
            );
            Ok(summary)
        }
        Err(cause) => Err(ExtractError {
            cause,
            partial: summary,
        }),
    }
}

fn extract_entries(archive_path: &Path, dest: &Path, summary: &mut ExtractSummary) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| {
        Error::Archive(format!("failed to open {}: {}", archive_path.display(), e))
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        Error::Archive(format!("failed to read {}: {}", archive_path.display(), e))
    })?;

    fs::create_dir_all(dest)?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| Error::Archive(format!("failed to read entry {}: {}", index, e)))?;

        let relative = match entry.enclosed_name() {
            Some(name) => name.to_path_buf(),
            None => {
                warn!(entry = entry.name(), "Skipping archive entry with unsafe path");
                summary.skipped.push(entry.name().to_string());
                continue;
            }
        };
        let target = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&target, fs::Permissions::from_mode((mode & 0o777) | 0o600))?;
            }
        }

        summary.files.push(target);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        fs::write(path, zip.finish().unwrap().into_inner()).unwrap();
    }

    #[test]
    fn test_extracts_nested_entries() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("fixtures.zip");
        write_zip(
            &archive,
            &[
                ("originals/2018/photo.jpg", "jpeg bytes"),
                ("import/readme.txt", "hello"),
            ],
        );

        let dest = temp_dir.path().join("testdata");
        let summary = unzip_blocking(&archive, &dest).unwrap();

        assert_eq!(summary.files.len(), 2);
        assert_eq!(fs::read(dest.join("originals/2018/photo.jpg")).unwrap(), b"jpeg bytes");
        assert_eq!(fs::read(dest.join("import/readme.txt")).unwrap(), b"hello");
        assert!(summary.skipped.is_empty());
    }

    #[test]
    fn test_skips_entries_escaping_target() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("evil.zip");
        write_zip(&archive, &[("../escaped.txt", "nope"), ("ok.txt", "fine")]);

        let dest = temp_dir.path().join("testdata");
        let summary = unzip_blocking(&archive, &dest).unwrap();

        assert_eq!(summary.files, vec![dest.join("ok.txt")]);
        assert_eq!(summary.skipped, vec!["../escaped.txt".to_string()]);
        assert!(!temp_dir.path().join("escaped.txt").exists());
    }

    #[test]
    fn test_missing_archive_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("testdata");

        let err = unzip_blocking(&temp_dir.path().join("missing.zip"), &dest).unwrap_err();

        assert!(matches!(err.cause, Error::Archive(_)));
        assert!(err.partial.files.is_empty());
        assert!(!dest.exists());
    }

    #[test]
    fn test_corrupt_archive_is_archive_error() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("corrupt.zip");
        fs::write(&archive, b"this is not a zip file").unwrap();

        let err = unzip_blocking(&archive, &temp_dir.path().join("testdata")).unwrap_err();
        assert!(matches!(err.cause, Error::Archive(_)));
    }

    #[test]
    fn test_interrupted_extraction_keeps_written_files() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("clash.zip");
        // Second entry needs "a.txt" as a directory, but it is already a file
        write_zip(&archive, &[("a.txt", "first"), ("a.txt/b.txt", "second")]);

        let dest = temp_dir.path().join("testdata");
        let err = unzip_blocking(&archive, &dest).unwrap_err();

        assert!(matches!(err.cause, Error::Io(_)));
        assert_eq!(err.partial.files, vec![dest.join("a.txt")]);
        assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"first");
        assert!(err.to_string().contains("1 files written"));
    }
}
