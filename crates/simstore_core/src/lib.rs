//! # simstore core
//!
//! Record-store engine for the simstore backend simulator.
//!
//! This crate provides:
//! - Record stores for data records, users and groups
//! - Property schemas with not-null, unique and asset-backed types
//! - Bidirectional references with 1:1, 1:M and M:M cardinality
//! - Hierarchical parent/child records with depth-bounded traversal
//! - Whole-aggregate snapshot persistence gated by read/write switches
//!
//! The [`Engine`] is an explicit context object; there is no process-wide
//! instance. It assumes a single writer.
//!
//! ## Example
//!
//! ```rust
//! use simstore_core::{Engine, EngineConfig, Record};
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! engine.create_data_store("Acme\\Blog", "Posts");
//!
//! let post = engine
//!     .create_data_record("acme/blog/posts", Some("Article"), None)
//!     .unwrap();
//! assert_eq!(post.id().to_string(), "1.1");
//! assert_eq!(post.depth(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod custom_type;
mod engine;
mod error;
pub mod integrity;
mod persistence;
pub mod project;
pub mod property;
pub mod reference;
mod sequence;
mod snapshot;
pub mod store;
mod types;

pub use config::{EngineConfig, SchemaPolicy};
pub use custom_type::{TypeInfo, TypeRegistry, BASE_DATA_TYPE, BASE_GROUP_TYPE, BASE_USER_TYPE};
pub use engine::Engine;
pub use error::{CoreError, CoreResult, ErrorKind};
pub use persistence::{PersistenceManager, SNAPSHOT_FILE};
pub use project::{ProjectInfo, ProjectRegistry, ProjectSource};
pub use property::{PropertyDefinition, PropertyRegistry, PropertyType};
pub use reference::{
    Cardinality, ObjectRef, RawReferenceDefinition, ReferenceDefinition, ReferenceRegistry,
    ReferenceTarget, ReferenceValue, Side, StoreType,
};
pub use sequence::SequenceAllocator;
pub use snapshot::{LegacyRecord, Snapshot};
pub use store::{DataRecord, Group, ParentEntry, Record, StoreSet, TreeNode, UserRecord};
pub use types::{EntityKind, ObjectKind, RecordId};

/// Crate version, as reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
