//! File-based snapshot backend.

use crate::backend::SnapshotBackend;
use crate::error::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffix of the temporary file used for atomic replacement.
const TEMP_SUFFIX: &str = "tmp";

/// A snapshot backend storing its document in a single file.
///
/// Writes use the write-then-rename pattern:
/// 1. Write to `<path>.tmp`
/// 2. Sync the temporary file to disk
/// 3. Rename it over `<path>`
/// 4. Fsync the parent directory
///
/// A crash mid-write leaves either the old or the new document, never a mix.
///
/// # Example
///
/// ```no_run
/// use simstore_storage::{SnapshotBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::new(Path::new("storage/saved.json"));
/// backend.write(b"{}").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Creates a backend for the given path.
    ///
    /// Nothing touches the file system until the first read or write.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(TEMP_SUFFIX);
        self.path.with_file_name(name)
    }

    #[cfg(unix)]
    fn sync_parent(&self) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                File::open(parent)?.sync_all()?;
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_parent(&self) -> StorageResult<()> {
        // NTFS journaling covers rename durability
        Ok(())
    }
}

impl SnapshotBackend for FileBackend {
    fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        match fs::metadata(&self.path) {
            Ok(meta) if !meta.is_file() => Err(StorageError::NotAFile(self.path.clone())),
            Ok(_) => Ok(Some(fs::read(&self.path)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, data: &[u8]) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.temp_path();
        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        self.sync_parent()?;

        debug!(path = %self.path.display(), bytes = data.len(), "wrote document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_none() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(&dir.path().join("saved.json"));

        assert!(backend.read().unwrap().is_none());
    }

    #[test]
    fn write_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.json");

        let mut backend = FileBackend::new(&path);
        backend.write(br#"{"a":1}"#).unwrap();

        assert!(path.is_file());
        assert_eq!(backend.read().unwrap().unwrap(), br#"{"a":1}"#);
        assert!(!dir.path().join("saved.json.tmp").exists());
    }

    #[test]
    fn write_replaces_whole_document() {
        let dir = tempdir().unwrap();
        let mut backend = FileBackend::new(&dir.path().join("saved.json"));

        backend.write(b"a much longer first document").unwrap();
        backend.write(b"short").unwrap();

        assert_eq!(backend.read().unwrap().unwrap(), b"short");
    }

    #[test]
    fn write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("storage").join("saved.json");

        let mut backend = FileBackend::new(&path);
        backend.write(b"{}").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn persistence_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.json");

        {
            let mut backend = FileBackend::new(&path);
            backend.write(b"persistent").unwrap();
        }

        let backend = FileBackend::new(&path);
        assert_eq!(backend.read().unwrap().unwrap(), b"persistent");
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        assert!(matches!(backend.read(), Err(StorageError::NotAFile(_))));
    }
}
