//! Bidirectional references between records.
//!
//! A reference links records on its source side with records on its target
//! side. Every link is held by both records under the same qualified code,
//! so the relationship can be read from either end.
//!
//! Mutations run in two phases: the [`ReferenceResolver`] validates a
//! request and plans the complete set of forward and inverse writes against
//! the current state, then the plan is applied in one go.

mod definition;
mod registry;
mod resolver;

pub use definition::{
    Cardinality, Endpoint, RawReferenceDefinition, ReferenceDefinition, Side, StoreType,
};
pub use registry::ReferenceRegistry;
pub use resolver::{ReferenceHost, ReferencePlan, ReferenceResolver, ReferenceWrite};

use crate::types::{ObjectKind, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Address of a record taking part in a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Kind of the record (data or user).
    pub kind: ObjectKind,
    /// Qualified store code.
    pub store: String,
    /// Record id.
    pub id: RecordId,
}

impl ObjectRef {
    /// Addresses a data record.
    pub fn data(store: impl Into<String>, id: RecordId) -> Self {
        Self {
            kind: ObjectKind::Data,
            store: store.into(),
            id,
        }
    }

    /// Addresses a user.
    pub fn user(store: impl Into<String>, id: RecordId) -> Self {
        Self {
            kind: ObjectKind::User,
            store: store.into(),
            id,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.kind, self.store, self.id)
    }
}

/// Linked ids per reference code, in link order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceMap(BTreeMap<String, Vec<RecordId>>);

impl ReferenceMap {
    /// Returns the ids linked under `code`.
    #[must_use]
    pub fn get(&self, code: &str) -> &[RecordId] {
        self.0.get(code).map_or(&[], Vec::as_slice)
    }

    /// Links `id` under `code`. Returns false if it was already linked.
    pub fn link(&mut self, code: &str, id: RecordId) -> bool {
        let ids = self.0.entry(code.to_string()).or_default();
        if ids.contains(&id) {
            return false;
        }
        ids.push(id);
        true
    }

    /// Unlinks `id` from `code`, dropping the code once empty.
    pub fn unlink(&mut self, code: &str, id: &RecordId) -> bool {
        let Some(ids) = self.0.get_mut(code) else {
            return false;
        };
        let before = ids.len();
        ids.retain(|linked| linked != id);
        let removed = ids.len() != before;
        if ids.is_empty() {
            self.0.remove(code);
        }
        removed
    }

    /// Iterates over codes and their linked ids.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<RecordId>)> {
        self.0.iter()
    }

    /// Returns true if nothing is linked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A resolved reference end, as returned by reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTarget {
    /// Kind of the linked record.
    pub kind: ObjectKind,
    /// Store holding the linked record.
    pub store: String,
    /// Linked record id.
    pub id: RecordId,
    /// Type tag of the linked record.
    pub type_tag: String,
    /// Username, for users.
    pub username: Option<String>,
    /// First name, for users.
    pub first_name: Option<String>,
    /// Last name, for users.
    pub last_name: Option<String>,
}

impl ReferenceTarget {
    /// Returns the address of the linked record.
    #[must_use]
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef {
            kind: self.kind,
            store: self.store.clone(),
            id: self.id,
        }
    }
}

/// Value of a reference read: one record or several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceValue {
    /// Exactly one record is linked.
    Single(ReferenceTarget),
    /// Two or more records are linked.
    Many(Vec<ReferenceTarget>),
}

impl ReferenceValue {
    /// Returns the linked ids in link order.
    #[must_use]
    pub fn ids(&self) -> Vec<RecordId> {
        match self {
            Self::Single(target) => vec![target.id],
            Self::Many(targets) => targets.iter().map(|t| t.id).collect(),
        }
    }
}
