//! Error types for the simstore engine.

use crate::reference::{Cardinality, Side};
use crate::types::{ObjectKind, RecordId};
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Broad classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An unknown project, store, record, group, property, reference or type.
    NotFound,
    /// A write was rejected by a schema or cardinality rule.
    Validation,
    /// Persistence failed.
    Io,
    /// The operation is not offered by the engine.
    Unsupported,
}

/// Errors that can occur in engine operations.
///
/// Every validation error is raised before the record under change is
/// touched, so a rejected call leaves no partial mutation behind.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] simstore_storage::StorageError),

    /// I/O error outside the snapshot backend (assets, definition files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot or definition (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Project not loaded.
    #[error("project not found: {prefix}")]
    ProjectNotFound {
        /// Project prefix that was looked up.
        prefix: String,
    },

    /// Store not found.
    #[error("{kind} store not found: {code}")]
    StoreNotFound {
        /// Kind of store searched.
        kind: ObjectKind,
        /// Qualified store code.
        code: String,
    },

    /// Record not found in a store.
    #[error("record {id} not found in store {store}")]
    RecordNotFound {
        /// Qualified store code.
        store: String,
        /// The missing record.
        id: RecordId,
    },

    /// Group not found in a user store.
    #[error("group {id} not found in store {store}")]
    GroupNotFound {
        /// Qualified store code.
        store: String,
        /// The missing group.
        id: RecordId,
    },

    /// Parent record given at creation does not exist.
    #[error("parent record {parent} not found in store {store}")]
    ParentNotFound {
        /// Qualified store code.
        store: String,
        /// The missing parent.
        parent: RecordId,
    },

    /// Property code was never registered.
    #[error("property {code} does not exist")]
    PropertyNotFound {
        /// Qualified property code.
        code: String,
    },

    /// Reference definition missing under the strict schema policy.
    #[error("reference {code} does not exist")]
    ReferenceNotFound {
        /// Qualified reference code.
        code: String,
    },

    /// Custom type not declared under the strict schema policy.
    #[error("type {tag} does not exist")]
    TypeNotFound {
        /// Qualified type tag.
        tag: String,
    },

    /// Null property values are not allowed.
    #[error("property {code} value violates not-null constraint")]
    NotNull {
        /// Qualified property code.
        code: String,
    },

    /// Unique value already claimed by another record.
    #[error("unique value {value:?} for {code} is already in use by {holder}")]
    DuplicateValue {
        /// Qualified property code.
        code: String,
        /// The contested value.
        value: String,
        /// Record currently holding the value.
        holder: RecordId,
    },

    /// Reference would break its cardinality.
    #[error("reference {code}: expecting single {side} value in {cardinality} cardinality, but {given} given")]
    CardinalityViolation {
        /// Qualified reference code.
        code: String,
        /// Cardinality of the definition.
        cardinality: Cardinality,
        /// Side that holds too many (or too few) ids.
        side: Side,
        /// Comma-separated ids found on that side.
        given: String,
    },

    /// Object cannot take part in a reference.
    #[error("invalid reference: {message}")]
    InvalidReference {
        /// Description of the problem.
        message: String,
    },

    /// Malformed file/image upload value.
    #[error("invalid upload: {message}")]
    InvalidUpload {
        /// Description of the problem.
        message: String,
    },

    /// Malformed schema definition.
    #[error("invalid definition: {message}")]
    InvalidDefinition {
        /// Description of the problem.
        message: String,
    },

    /// Operation not offered by the engine.
    #[error("operation not supported: {operation}")]
    Unsupported {
        /// Name of the operation.
        operation: &'static str,
    },
}

impl CoreError {
    /// Creates an invalid reference error.
    pub fn invalid_reference(message: impl Into<String>) -> Self {
        Self::InvalidReference {
            message: message.into(),
        }
    }

    /// Creates an invalid upload error.
    pub fn invalid_upload(message: impl Into<String>) -> Self {
        Self::InvalidUpload {
            message: message.into(),
        }
    }

    /// Creates an invalid definition error.
    pub fn invalid_definition(message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            message: message.into(),
        }
    }

    /// Creates a record not found error.
    pub fn record_not_found(store: impl Into<String>, id: &RecordId) -> Self {
        Self::RecordNotFound {
            store: store.into(),
            id: *id,
        }
    }

    /// Creates a store not found error.
    pub fn store_not_found(kind: ObjectKind, code: impl Into<String>) -> Self {
        Self::StoreNotFound {
            kind,
            code: code.into(),
        }
    }

    /// Returns the broad classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage(_) | Self::Io(_) | Self::Serialization(_) => ErrorKind::Io,
            Self::ProjectNotFound { .. }
            | Self::StoreNotFound { .. }
            | Self::RecordNotFound { .. }
            | Self::GroupNotFound { .. }
            | Self::ParentNotFound { .. }
            | Self::PropertyNotFound { .. }
            | Self::ReferenceNotFound { .. }
            | Self::TypeNotFound { .. } => ErrorKind::NotFound,
            Self::NotNull { .. }
            | Self::DuplicateValue { .. }
            | Self::CardinalityViolation { .. }
            | Self::InvalidReference { .. }
            | Self::InvalidUpload { .. }
            | Self::InvalidDefinition { .. } => ErrorKind::Validation,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
        }
    }
}
