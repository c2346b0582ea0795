//! Snapshot backend trait definition.

use crate::error::StorageResult;

/// A whole-document storage backend.
///
/// Backends are **opaque byte stores** holding a single document. They do
/// not interpret the snapshot format; the engine owns serialization.
///
/// # Invariants
///
/// - `read` returns exactly the bytes of the last successful `write`
/// - `write` replaces the whole document; a failed write leaves the
///   previous document intact
/// - Backends must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait SnapshotBackend: Send + Sync {
    /// Reads the stored document.
    ///
    /// Returns `None` if nothing has been written yet.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the stored document with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    fn write(&mut self, data: &[u8]) -> StorageResult<()>;
}
