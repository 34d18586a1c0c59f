//! Directory Scanner (spec §4.4): walks the import directory, expanding
//! ZIP archives on the fly. Grounded on `walkdir` (used for recursive
//! filesystem walks elsewhere in the pack) and the `zip` crate for
//! archive expansion, with `tempfile::TempDir` scoping extraction
//! directories to the lifetime of a single scan (spec §9: "scope it as a
//! resource-acquiring object whose cleanup runs in the Use Case's
//! `finally` path").

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::domain::media::is_supported_extension;

/// Owns every temp directory created while expanding ZIP archives during
/// one scan. `cleanup()` must be called once the scan's files have all
/// been processed, regardless of success (spec §4.9 step 8).
#[derive(Default)]
pub struct DirectoryScanner {
    temp_dirs: Vec<tempfile::TempDir>,
}

impl DirectoryScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks `import_dir` recursively, returning every ingestible file
    /// path in a stable order. `.zip` archives are expanded into a
    /// per-archive temp directory and their contents recursed into;
    /// corrupt archives are logged and skipped without aborting the scan.
    pub fn scan(&mut self, import_dir: &Path) -> Vec<PathBuf> {
        let mut results = Vec::new();
        let mut entries: Vec<PathBuf> = WalkDir::new(import_dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        entries.sort();

        for path in entries {
            let ext = extension_of(&path);
            if ext == ".zip" {
                match self.expand_zip(&path) {
                    Ok(mut extracted) => results.append(&mut extracted),
                    Err(e) => warn!(event = "local_import.scan.zip_failed", path = %path.display(), error = %e),
                }
            } else if is_supported_extension(&ext) {
                results.push(path);
            }
        }
        results
    }

    fn expand_zip(&mut self, archive_path: &Path) -> Result<Vec<PathBuf>, ScanError> {
        let file = fs::File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        let dir = tempfile::Builder::new()
            .prefix("mediavault-scan-")
            .tempdir()?;
        let dir_path = dir.path().to_path_buf();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let Some(enclosed) = entry.enclosed_name() else {
                continue;
            };
            let out_path = dir_path.join(enclosed);
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out_file = fs::File::create(&out_path)?;
            std::io::copy(&mut entry, &mut out_file)?;
        }

        self.temp_dirs.push(dir);

        let mut nested = Self::new();
        let extracted = nested.scan(&dir_path);
        self.temp_dirs.append(&mut nested.temp_dirs);
        Ok(extracted)
    }

    /// Removes every temp directory created during this scan.
    pub fn cleanup(&mut self) {
        self.temp_dirs.clear();
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
enum ScanError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn skips_unsupported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        fs::write(dir.path().join("a.txt"), b"x").unwrap();
        let mut scanner = DirectoryScanner::new();
        let found = scanner.scan(dir.path());
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("a.jpg"));
    }

    #[test]
    fn expands_zip_archives() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("bundle.zip");
        let file = fs::File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file::<_, ()>("inner.jpg", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(b"fake-jpeg-bytes").unwrap();
        writer.finish().unwrap();

        let mut scanner = DirectoryScanner::new();
        let found = scanner.scan(dir.path());
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("inner.jpg"));
        scanner.cleanup();
    }
}
