//! Snapshot documents.
//!
//! The whole aggregate is one JSON document:
//!
//! ```json
//! {
//!   "dataRecordSequence": 2,
//!   "userSequence": 1,
//!   "userGroupSequence": 0,
//!   "stores": {
//!     "data":    { "<prefix>": { "<store>": { "records": {}, "uniqueMap": {} } } },
//!     "user":    { "<prefix>": { "<store>": { "records": {}, "uniqueMap": {}, "usernameMap": {}, "groups": {} } } },
//!     "project": { "<prefix>": { "<property>": "<value>" } }
//!   }
//! }
//! ```

use crate::error::CoreResult;
use crate::sequence::SequenceAllocator;
use crate::store::{DataRecord, PropertyMap, Record, StoreSet};
use crate::types::{EntityKind, RecordId};
use serde::{Deserialize, Serialize};

/// A deserialized snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Data record sequence counter.
    #[serde(default)]
    pub data_record_sequence: u64,
    /// User sequence counter.
    #[serde(default)]
    pub user_sequence: u64,
    /// Group sequence counter.
    #[serde(default)]
    pub user_group_sequence: u64,
    /// Store contents.
    #[serde(default)]
    pub stores: StoreSet,
}

impl Snapshot {
    /// Parses a snapshot document.
    pub fn from_slice(bytes: &[u8]) -> CoreResult<Self> {
        let mut snapshot: Self = serde_json::from_slice(bytes)?;
        snapshot.stores.attach_codes();
        Ok(snapshot)
    }

    /// Returns the counters as an allocator.
    #[must_use]
    pub const fn sequences(&self) -> SequenceAllocator {
        SequenceAllocator::with_values(
            self.data_record_sequence,
            self.user_sequence,
            self.user_group_sequence,
        )
    }

    /// Encodes the snapshot.
    pub fn to_vec(&self) -> CoreResult<Vec<u8>> {
        SnapshotRef::new(&self.sequences(), &self.stores).to_vec()
    }
}

/// A borrowed view of engine state, written on save.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SnapshotRef<'a> {
    data_record_sequence: u64,
    user_sequence: u64,
    user_group_sequence: u64,
    stores: &'a StoreSet,
}

impl<'a> SnapshotRef<'a> {
    pub(crate) fn new(sequences: &SequenceAllocator, stores: &'a StoreSet) -> Self {
        Self {
            data_record_sequence: sequences.current(EntityKind::DataRecord),
            user_sequence: sequences.current(EntityKind::User),
            user_group_sequence: sequences.current(EntityKind::Group),
            stores,
        }
    }

    pub(crate) fn to_vec(&self) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// The simplified per-record file: `<storage>/<store code>/<id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyRecord {
    /// Record id.
    pub id: RecordId,
    /// Type tag.
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Explicitly set property values.
    #[serde(default)]
    pub properties: PropertyMap,
}

impl From<&DataRecord> for LegacyRecord {
    fn from(record: &DataRecord) -> Self {
        Self {
            id: record.id(),
            type_tag: record.type_tag().to_string(),
            properties: record.properties().clone(),
        }
    }
}
