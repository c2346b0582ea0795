//! In-memory snapshot backend for testing.

use crate::backend::SnapshotBackend;
use crate::error::StorageResult;
use parking_lot::RwLock;
use std::sync::Arc;

/// An in-memory snapshot backend.
///
/// Clones share the same document, so a test can hand one clone to an
/// engine and keep another to inspect what was saved, or to seed a second
/// engine with the first one's snapshot.
///
/// # Example
///
/// ```rust
/// use simstore_storage::{SnapshotBackend, InMemoryBackend};
///
/// let shared = InMemoryBackend::new();
/// let mut writer = shared.clone();
/// writer.write(b"doc").unwrap();
/// assert_eq!(shared.data().as_deref(), Some(&b"doc"[..]));
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    data: Arc<RwLock<Option<Vec<u8>>>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding a pre-existing document.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(Some(data))),
        }
    }

    /// Returns a copy of the stored document.
    #[must_use]
    pub fn data(&self) -> Option<Vec<u8>> {
        self.data.read().clone()
    }
}

impl SnapshotBackend for InMemoryBackend {
    fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.read().clone())
    }

    fn write(&mut self, data: &[u8]) -> StorageResult<()> {
        *self.data.write() = Some(data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_backend() {
        let backend = InMemoryBackend::new();
        assert!(backend.read().unwrap().is_none());
        assert!(backend.data().is_none());
    }

    #[test]
    fn with_data() {
        let backend = InMemoryBackend::with_data(b"seed".to_vec());
        assert_eq!(backend.read().unwrap().unwrap(), b"seed");
    }

    #[test]
    fn clones_share_document() {
        let a = InMemoryBackend::new();
        let mut b = a.clone();

        b.write(b"shared").unwrap();
        assert_eq!(a.data().unwrap(), b"shared");
        assert_eq!(a.read().unwrap().unwrap(), b"shared");
    }

    proptest! {
        #[test]
        fn last_write_wins(docs in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..8)) {
            let mut backend = InMemoryBackend::new();
            for doc in &docs {
                backend.write(doc).unwrap();
            }
            prop_assert_eq!(backend.read().unwrap(), docs.last().cloned());
        }
    }
}
