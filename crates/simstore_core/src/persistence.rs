//! Snapshot persistence.
//!
//! The read/write switches are the only thing deciding whether I/O happens.
//! With a switch off the matching operation returns without touching the
//! backend, and no error can surface from it.

use crate::config::EngineConfig;
use crate::error::CoreResult;
use crate::sequence::SequenceAllocator;
use crate::snapshot::{LegacyRecord, Snapshot, SnapshotRef};
use crate::store::{DataStore, RecordStore, StoreSet};
use crate::types::RecordId;
use simstore_storage::{FileBackend, SnapshotBackend};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the snapshot inside the storage directory.
pub const SNAPSHOT_FILE: &str = "saved.json";

/// Loads and saves the aggregate through a [`SnapshotBackend`].
pub struct PersistenceManager {
    backend: Option<Box<dyn SnapshotBackend>>,
    storage_dir: Option<PathBuf>,
    read_enabled: bool,
    write_enabled: bool,
}

impl fmt::Debug for PersistenceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceManager")
            .field("has_backend", &self.backend.is_some())
            .field("storage_dir", &self.storage_dir)
            .field("read_enabled", &self.read_enabled)
            .field("write_enabled", &self.write_enabled)
            .finish()
    }
}

impl PersistenceManager {
    /// Creates a manager for `config`.
    ///
    /// The snapshot lives at `<storage_dir>/saved.json`; without a storage
    /// directory there is nothing to load or save.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let backend = config.storage_dir.as_ref().map(|dir| {
            Box::new(FileBackend::new(&dir.join(SNAPSHOT_FILE))) as Box<dyn SnapshotBackend>
        });
        Self {
            backend,
            storage_dir: config.storage_dir.clone(),
            read_enabled: config.read_enabled,
            write_enabled: config.write_enabled,
        }
    }

    /// Creates a manager over a custom backend.
    #[must_use]
    pub fn with_backend(config: &EngineConfig, backend: Box<dyn SnapshotBackend>) -> Self {
        Self {
            backend: Some(backend),
            storage_dir: config.storage_dir.clone(),
            read_enabled: config.read_enabled,
            write_enabled: config.write_enabled,
        }
    }

    /// Returns whether snapshots may be read.
    #[must_use]
    pub const fn read_enabled(&self) -> bool {
        self.read_enabled
    }

    /// Returns whether snapshots may be written.
    #[must_use]
    pub const fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// Returns the storage directory.
    #[must_use]
    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    /// Reads the stored snapshot.
    ///
    /// Returns `None` when reads are disabled or nothing was saved yet.
    pub fn load(&self) -> CoreResult<Option<Snapshot>> {
        if !self.read_enabled {
            debug!("reads disabled, skipping snapshot load");
            return Ok(None);
        }
        let Some(backend) = &self.backend else {
            return Ok(None);
        };
        let Some(bytes) = backend.read()? else {
            debug!("no snapshot to load");
            return Ok(None);
        };

        let snapshot = Snapshot::from_slice(&bytes)?;
        info!(
            bytes = bytes.len(),
            data_records = snapshot.data_record_sequence,
            users = snapshot.user_sequence,
            groups = snapshot.user_group_sequence,
            "loaded snapshot"
        );
        Ok(Some(snapshot))
    }

    /// Writes the whole aggregate. Returns false if writes are disabled.
    pub fn save(&mut self, sequences: &SequenceAllocator, stores: &StoreSet) -> CoreResult<bool> {
        if !self.write_enabled {
            debug!("writes disabled, skipping snapshot save");
            return Ok(false);
        }
        let Some(backend) = self.backend.as_mut() else {
            warn!("writes enabled without a storage directory, skipping snapshot save");
            return Ok(false);
        };

        let bytes = SnapshotRef::new(sequences, stores).to_vec()?;
        backend.write(&bytes)?;
        info!(bytes = bytes.len(), "saved snapshot");
        Ok(true)
    }

    fn legacy_path(dir: &Path, store_code: &str, id: &RecordId) -> PathBuf {
        dir.join(store_code).join(format!("{id}.json"))
    }

    /// Writes every record of `store` as a legacy record file.
    ///
    /// Returns the number of files written; zero when writes are disabled.
    pub fn write_legacy(&self, store: &DataStore) -> CoreResult<usize> {
        let Some(dir) = self.storage_dir.as_deref().filter(|_| self.write_enabled) else {
            return Ok(0);
        };
        let mut written = 0;
        for record in store.records() {
            let legacy = LegacyRecord::from(record);
            let path = Self::legacy_path(dir, store.code(), &legacy.id);
            FileBackend::new(&path).write(&serde_json::to_vec_pretty(&legacy)?)?;
            written += 1;
        }
        debug!(store = store.code(), written, "exported legacy records");
        Ok(written)
    }

    /// Reads one legacy record file. Returns `None` when reads are disabled
    /// or the file does not exist.
    pub fn read_legacy(&self, store_code: &str, id: &RecordId) -> CoreResult<Option<LegacyRecord>> {
        let Some(dir) = self.storage_dir.as_deref().filter(|_| self.read_enabled) else {
            return Ok(None);
        };
        let backend = FileBackend::new(&Self::legacy_path(dir, store_code, id));
        match backend.read()? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simstore_storage::InMemoryBackend;
    use tempfile::tempdir;

    fn stores() -> StoreSet {
        let mut stores = StoreSet::new();
        stores.add_data_store("acme/blog/posts");
        stores
            .data_store_mut("acme/blog/posts")
            .unwrap()
            .create(RecordId::new(1), "DataRecord", None)
            .unwrap();
        stores
    }

    #[test]
    fn disabled_switches_skip_io() {
        let backend = InMemoryBackend::new();
        let mut manager =
            PersistenceManager::with_backend(&EngineConfig::default(), Box::new(backend.clone()));

        assert!(!manager.save(&SequenceAllocator::with_values(1, 0, 0), &stores()).unwrap());
        assert!(backend.data().is_none());

        let preloaded = InMemoryBackend::with_data(b"not json".to_vec());
        let reader = PersistenceManager::with_backend(&EngineConfig::default(), Box::new(preloaded));
        assert!(reader.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let backend = InMemoryBackend::new();
        let config = EngineConfig::new().read_enabled(true).write_enabled(true);
        let mut manager = PersistenceManager::with_backend(&config, Box::new(backend.clone()));

        assert!(manager.load().unwrap().is_none());
        assert!(manager.save(&SequenceAllocator::with_values(1, 0, 0), &stores()).unwrap());

        let snapshot = manager.load().unwrap().unwrap();
        assert_eq!(snapshot.data_record_sequence, 1);
        assert_eq!(snapshot.stores, stores());
    }

    #[test]
    fn file_backend_in_storage_dir() {
        let dir = tempdir().unwrap();
        let config = EngineConfig::new()
            .write_enabled(true)
            .storage_dir(dir.path());
        let mut manager = PersistenceManager::new(&config);

        manager.save(&SequenceAllocator::new(), &stores()).unwrap();
        assert!(dir.path().join(SNAPSHOT_FILE).is_file());
    }

    #[test]
    fn legacy_records() {
        let dir = tempdir().unwrap();
        let config = EngineConfig::new()
            .read_enabled(true)
            .write_enabled(true)
            .storage_dir(dir.path());
        let manager = PersistenceManager::new(&config);
        let stores = stores();
        let posts = stores.data_store("acme/blog/posts").unwrap();

        assert_eq!(manager.write_legacy(posts).unwrap(), 1);
        assert!(dir.path().join("acme/blog/posts/1.1.json").is_file());

        let record = manager
            .read_legacy("acme/blog/posts", &RecordId::new(1))
            .unwrap()
            .unwrap();
        assert_eq!(record.type_tag, "DataRecord");
        assert!(manager
            .read_legacy("acme/blog/posts", &RecordId::new(2))
            .unwrap()
            .is_none());
    }

    #[test]
    fn legacy_export_needs_writes() {
        let dir = tempdir().unwrap();
        let manager = PersistenceManager::new(&EngineConfig::new().storage_dir(dir.path()));
        let stores = stores();
        assert_eq!(
            manager.write_legacy(stores.data_store("acme/blog/posts").unwrap()).unwrap(),
            0
        );
    }
}
