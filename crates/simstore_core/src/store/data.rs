//! Data stores and data records.

use crate::error::{CoreError, CoreResult};
use crate::reference::ReferenceMap;
use crate::store::{PropertyMap, Record, RecordMut, RecordStore, RecordStoreMut, UniqueIndex};
use crate::types::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A record in a data store.
///
/// Records form a forest: a root has depth 1 and every child sits one level
/// below its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRecord {
    id: RecordId,
    type_tag: String,
    depth: u32,
    #[serde(default)]
    parent: Option<RecordId>,
    #[serde(default)]
    children: Vec<RecordId>,
    #[serde(default)]
    properties: PropertyMap,
    #[serde(default)]
    references: ReferenceMap,
}

impl DataRecord {
    /// Returns the depth; roots are at depth 1.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Returns the parent id.
    #[must_use]
    pub const fn parent(&self) -> Option<RecordId> {
        self.parent
    }

    /// Returns the direct children in creation order.
    #[must_use]
    pub fn children(&self) -> &[RecordId] {
        &self.children
    }
}

impl Record for DataRecord {
    fn id(&self) -> RecordId {
        self.id
    }

    fn type_tag(&self) -> &str {
        &self.type_tag
    }

    fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    fn references(&self) -> &ReferenceMap {
        &self.references
    }
}

impl RecordMut for DataRecord {
    fn properties_mut(&mut self) -> &mut PropertyMap {
        &mut self.properties
    }

    fn references_mut(&mut self) -> &mut ReferenceMap {
        &mut self.references
    }
}

/// A data store: records plus their unique value index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStore {
    #[serde(skip)]
    code: String,
    #[serde(default)]
    records: BTreeMap<RecordId, DataRecord>,
    #[serde(default)]
    unique_map: UniqueIndex,
}

impl DataStore {
    /// Creates an empty store.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    pub(crate) fn attach(&mut self, code: &str) {
        self.code = code.to_string();
    }

    /// Inserts a new record under an id minted by the caller.
    ///
    /// The parent, if given, must already exist in this store; the new
    /// record is appended to its children.
    pub fn create(
        &mut self,
        id: RecordId,
        type_tag: impl Into<String>,
        parent: Option<&RecordId>,
    ) -> CoreResult<&DataRecord> {
        let depth = match parent {
            Some(parent_id) => {
                let parent = self.records.get_mut(parent_id).ok_or_else(|| {
                    CoreError::ParentNotFound {
                        store: self.code.clone(),
                        parent: *parent_id,
                    }
                })?;
                parent.children.push(id);
                parent.depth + 1
            }
            None => 1,
        };

        let record = DataRecord {
            id,
            type_tag: type_tag.into(),
            depth,
            parent: parent.copied(),
            children: Vec::new(),
            properties: PropertyMap::new(),
            references: ReferenceMap::default(),
        };
        debug!(store = %self.code, id = %id, depth, "created data record");
        Ok(self.records.entry(id).or_insert(record))
    }

    /// Iterates over records in id order.
    pub fn records(&self) -> impl Iterator<Item = &DataRecord> {
        self.records.values()
    }
}

impl RecordStore for DataStore {
    type Record = DataRecord;

    fn code(&self) -> &str {
        &self.code
    }

    fn get(&self, id: &RecordId) -> Option<&DataRecord> {
        self.records.get(id)
    }

    fn unique(&self) -> &UniqueIndex {
        &self.unique_map
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

impl RecordStoreMut for DataStore {
    fn record_and_index_mut(
        &mut self,
        id: &RecordId,
    ) -> Option<(&mut DataRecord, &mut UniqueIndex)> {
        let record = self.records.get_mut(id)?;
        Some((record, &mut self.unique_map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = "acme/blog/Data/Article";

    #[test]
    fn roots_and_children() {
        let mut store = DataStore::new("acme/blog/posts");
        let root = store.create(RecordId::new(1), ARTICLE, None).unwrap().id();
        let child = store
            .create(RecordId::new(2), "acme/blog/Data/Comment", Some(&root))
            .unwrap();

        assert_eq!(child.depth(), 2);
        assert_eq!(child.parent(), Some(root));
        assert_eq!(store.get(&root).unwrap().children(), &[RecordId::new(2)]);
        assert_eq!(store.get(&root).unwrap().depth(), 1);
    }

    #[test]
    fn missing_parent_rejected() {
        let mut store = DataStore::new("acme/blog/posts");
        let err = store
            .create(RecordId::new(1), ARTICLE, Some(&RecordId::new(9)))
            .unwrap_err();
        assert!(matches!(err, CoreError::ParentNotFound { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn serde_shape() {
        let mut store = DataStore::new("acme/blog/posts");
        store.create(RecordId::new(1), ARTICLE, None).unwrap();

        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["records"]["1.1"]["typeTag"], ARTICLE);
        assert_eq!(json["records"]["1.1"]["depth"], 1);
        assert!(json.get("uniqueMap").is_some());
        assert!(json.get("code").is_none());

        let mut back: DataStore = serde_json::from_value(json).unwrap();
        back.attach("acme/blog/posts");
        assert_eq!(back, store);
    }
}
