//! # simstore storage
//!
//! Snapshot storage backends for the simstore record engine.
//!
//! A backend holds exactly one opaque document. The engine serializes its
//! whole aggregate (sequences and stores) and hands the bytes to the backend
//! in a single `write`; there is no partial or incremental persistence.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests and isolated runs
//! - [`FileBackend`] - One file on disk, replaced atomically on every write
//!
//! ## Example
//!
//! ```rust
//! use simstore_storage::{SnapshotBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! assert!(backend.read().unwrap().is_none());
//! backend.write(b"{}").unwrap();
//! assert_eq!(backend.read().unwrap().as_deref(), Some(&b"{}"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::SnapshotBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
