//! Record stores.
//!
//! A store is the only owner of its records. Property and reference writes
//! go through the store so that its indexes (unique values, usernames,
//! children) stay consistent with record contents.

mod data;
mod set;
mod tree;
mod unique;
mod user;

pub use data::{DataRecord, DataStore};
pub use set::StoreSet;
pub use tree::{ParentEntry, TreeNode};
pub use unique::UniqueIndex;
pub use user::{Group, UserRecord, UserStore};

use crate::error::{CoreError, CoreResult};
use crate::property::unique_key;
use crate::reference::ReferenceMap;
use crate::types::RecordId;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Property values keyed by qualified property code.
pub type PropertyMap = BTreeMap<String, Value>;

/// Read access shared by data records and users.
pub trait Record {
    /// Returns the record id.
    fn id(&self) -> RecordId;

    /// Returns the type tag chosen at creation.
    fn type_tag(&self) -> &str;

    /// Returns the explicitly set property values.
    fn properties(&self) -> &PropertyMap;

    /// Returns the reference map.
    fn references(&self) -> &ReferenceMap;
}

pub(crate) trait RecordMut: Record {
    fn properties_mut(&mut self) -> &mut PropertyMap;
    fn references_mut(&mut self) -> &mut ReferenceMap;
}

/// Read access shared by data and user stores.
pub trait RecordStore {
    /// Record type held by the store.
    type Record: Record;

    /// Returns the qualified store code.
    fn code(&self) -> &str;

    /// Looks up a record.
    fn get(&self, id: &RecordId) -> Option<&Self::Record>;

    /// Returns the unique value index.
    fn unique(&self) -> &UniqueIndex;

    /// Returns the number of records.
    fn len(&self) -> usize;

    /// Returns true if the store holds no record.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a record by a unique property value.
    fn get_by_unique(&self, code: &str, value: &Value) -> Option<&Self::Record> {
        self.unique()
            .holder(code, &unique_key(value))
            .and_then(|id| self.get(&id))
    }

    /// Looks up a record, failing with `RecordNotFound`.
    fn require(&self, id: &RecordId) -> CoreResult<&Self::Record> {
        self.get(id)
            .ok_or_else(|| CoreError::record_not_found(self.code(), id))
    }
}

pub(crate) trait RecordStoreMut: RecordStore
where
    Self::Record: RecordMut,
{
    fn record_and_index_mut(
        &mut self,
        id: &RecordId,
    ) -> Option<(&mut Self::Record, &mut UniqueIndex)>;

    fn require_mut(&mut self, id: &RecordId) -> CoreResult<&mut Self::Record> {
        let code = self.code().to_string();
        self.record_and_index_mut(id)
            .map(|(record, _)| record)
            .ok_or_else(|| CoreError::record_not_found(code, id))
    }
}

/// Stores a property value, keeping the unique index in step.
///
/// For unique properties the value must not be held by another record; the
/// value the record held before is released.
pub(crate) fn set_property<S>(
    store: &mut S,
    id: &RecordId,
    code: &str,
    value: Value,
    unique: bool,
) -> CoreResult<()>
where
    S: RecordStoreMut,
    S::Record: RecordMut,
{
    let store_code = store.code().to_string();
    let (record, index) = store
        .record_and_index_mut(id)
        .ok_or_else(|| CoreError::record_not_found(store_code, id))?;

    if unique {
        let key = unique_key(&value);
        if let Some(holder) = index.holder(code, &key).filter(|holder| holder != id) {
            return Err(CoreError::DuplicateValue {
                code: code.to_string(),
                value: key,
                holder,
            });
        }
        if let Some(old) = record.properties().get(code) {
            index.release(code, &unique_key(old), id);
        }
        index.claim(code, key, *id);
    }

    record.properties_mut().insert(code.to_string(), value);
    debug!(record = %id, code, "set property value");
    Ok(())
}

/// Removes a property value, releasing its unique claim. No-op if unset.
pub(crate) fn delete_property<S>(
    store: &mut S,
    id: &RecordId,
    code: &str,
    unique: bool,
) -> CoreResult<()>
where
    S: RecordStoreMut,
    S::Record: RecordMut,
{
    let store_code = store.code().to_string();
    let (record, index) = store
        .record_and_index_mut(id)
        .ok_or_else(|| CoreError::record_not_found(store_code, id))?;

    if let Some(old) = record.properties_mut().remove(code) {
        if unique {
            index.release(code, &unique_key(&old), id);
        }
        debug!(record = %id, code, "deleted property value");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EMAIL: &str = "acme/blog/email";

    fn store_with(n: usize) -> DataStore {
        let mut store = DataStore::new("acme/blog/posts");
        for seq in 1..=n {
            store
                .create(RecordId::new(seq as u64), "acme/blog/Data/Article", None)
                .unwrap();
        }
        store
    }

    #[test]
    fn unique_value_is_exclusive() {
        let mut store = store_with(2);
        let (a, b) = (RecordId::new(1), RecordId::new(2));

        set_property(&mut store, &a, EMAIL, json!("a@x.com"), true).unwrap();
        let err = set_property(&mut store, &b, EMAIL, json!("a@x.com"), true).unwrap_err();

        assert!(matches!(err, CoreError::DuplicateValue { holder, .. } if holder == a));
        assert!(store.get(&b).unwrap().properties().get(EMAIL).is_none());
        assert_eq!(store.get_by_unique(EMAIL, &json!("a@x.com")).unwrap().id(), a);
    }

    #[test]
    fn same_record_may_reset_its_value() {
        let mut store = store_with(1);
        let a = RecordId::new(1);
        set_property(&mut store, &a, EMAIL, json!("a@x.com"), true).unwrap();
        set_property(&mut store, &a, EMAIL, json!("a@x.com"), true).unwrap();
        assert_eq!(store.unique().len(), 1);
    }

    #[test]
    fn changing_value_releases_old_claim() {
        let mut store = store_with(2);
        let (a, b) = (RecordId::new(1), RecordId::new(2));

        set_property(&mut store, &a, EMAIL, json!("a@x.com"), true).unwrap();
        set_property(&mut store, &a, EMAIL, json!("new@x.com"), true).unwrap();
        set_property(&mut store, &b, EMAIL, json!("a@x.com"), true).unwrap();

        assert_eq!(store.get_by_unique(EMAIL, &json!("a@x.com")).unwrap().id(), b);
        assert_eq!(store.get_by_unique(EMAIL, &json!("new@x.com")).unwrap().id(), a);
    }

    #[test]
    fn delete_releases_claim() {
        let mut store = store_with(2);
        let (a, b) = (RecordId::new(1), RecordId::new(2));

        set_property(&mut store, &a, EMAIL, json!("a@x.com"), true).unwrap();
        delete_property(&mut store, &a, EMAIL, true).unwrap();
        delete_property(&mut store, &a, EMAIL, true).unwrap();
        set_property(&mut store, &b, EMAIL, json!("a@x.com"), true).unwrap();

        assert!(store.get(&a).unwrap().properties().is_empty());
    }

    #[test]
    fn missing_record() {
        let mut store = store_with(0);
        let err = set_property(&mut store, &RecordId::new(5), EMAIL, json!(1), false).unwrap_err();
        assert!(matches!(err, CoreError::RecordNotFound { .. }));
        assert!(store.require(&RecordId::new(5)).is_err());
    }
}
