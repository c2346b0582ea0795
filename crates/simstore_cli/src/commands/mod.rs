//! CLI command implementations.

pub mod dump;
pub mod inspect;
pub mod verify;

use simstore_core::{Snapshot, SNAPSHOT_FILE};
use simstore_storage::{FileBackend, SnapshotBackend};
use std::path::Path;
use tracing::debug;

/// Reads `saved.json` from a storage directory.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, Box<dyn std::error::Error>> {
    let file = path.join(SNAPSHOT_FILE);
    let bytes = FileBackend::new(&file)
        .read()?
        .ok_or_else(|| format!("No snapshot found at {}", file.display()))?;
    debug!(file = %file.display(), bytes = bytes.len(), "read snapshot");
    Ok(Snapshot::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simstore_core::{Engine, EngineConfig};
    use tempfile::tempdir;

    #[test]
    fn reads_saved_snapshot() {
        let dir = tempdir().unwrap();
        let config = EngineConfig::new()
            .read_enabled(true)
            .write_enabled(true)
            .storage_dir(dir.path());
        let mut engine = Engine::new(config);
        let posts = engine.create_data_store("Proj", "Posts");
        engine.create_data_record(&posts, None, None).unwrap();
        assert!(engine.save().unwrap());

        let snapshot = load_snapshot(dir.path()).unwrap();
        assert_eq!(snapshot.data_record_sequence, 1);
        assert!(verify::run(dir.path()).is_ok());
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load_snapshot(dir.path()).unwrap_err();
        assert!(err.to_string().contains("No snapshot found"));
    }
}
