//! The aggregate of every loaded store.

use crate::error::{CoreError, CoreResult};
use crate::project::prefix_of;
use crate::reference::{ObjectRef, ReferenceHost, ReferenceMap, ReferenceWrite};
use crate::store::{DataStore, Record, RecordMut, RecordStore, RecordStoreMut, UserStore};
use crate::types::{ObjectKind, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

type ByProject<T> = BTreeMap<String, BTreeMap<String, T>>;

/// All stores, keyed `kind -> project prefix -> store code`.
///
/// Project-kind property values live here too, keyed by project prefix and
/// property code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSet {
    #[serde(default)]
    data: ByProject<DataStore>,
    #[serde(default)]
    user: ByProject<UserStore>,
    #[serde(default)]
    project: ByProject<Value>,
}

impl StoreSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores store codes after deserialization.
    pub(crate) fn attach_codes(&mut self) {
        for stores in self.data.values_mut() {
            for (code, store) in stores.iter_mut() {
                store.attach(code);
            }
        }
        for stores in self.user.values_mut() {
            for (code, store) in stores.iter_mut() {
                store.attach(code);
            }
        }
    }

    /// Adds an empty data store unless it exists.
    pub fn add_data_store(&mut self, code: &str) {
        self.data
            .entry(prefix_of(code))
            .or_default()
            .entry(code.to_string())
            .or_insert_with(|| DataStore::new(code));
    }

    /// Adds an empty user store unless it exists.
    pub fn add_user_store(&mut self, code: &str) {
        self.user
            .entry(prefix_of(code))
            .or_default()
            .entry(code.to_string())
            .or_insert_with(|| UserStore::new(code));
    }

    /// Looks up a data store by qualified code.
    pub fn data_store(&self, code: &str) -> CoreResult<&DataStore> {
        self.data
            .get(&prefix_of(code))
            .and_then(|stores| stores.get(code))
            .ok_or_else(|| CoreError::store_not_found(ObjectKind::Data, code))
    }

    /// Looks up a data store for mutation.
    pub fn data_store_mut(&mut self, code: &str) -> CoreResult<&mut DataStore> {
        self.data
            .get_mut(&prefix_of(code))
            .and_then(|stores| stores.get_mut(code))
            .ok_or_else(|| CoreError::store_not_found(ObjectKind::Data, code))
    }

    /// Looks up a user store by qualified code.
    pub fn user_store(&self, code: &str) -> CoreResult<&UserStore> {
        self.user
            .get(&prefix_of(code))
            .and_then(|stores| stores.get(code))
            .ok_or_else(|| CoreError::store_not_found(ObjectKind::User, code))
    }

    /// Looks up a user store for mutation.
    pub fn user_store_mut(&mut self, code: &str) -> CoreResult<&mut UserStore> {
        self.user
            .get_mut(&prefix_of(code))
            .and_then(|stores| stores.get_mut(code))
            .ok_or_else(|| CoreError::store_not_found(ObjectKind::User, code))
    }

    /// Returns true if a store of `kind` exists under `code`.
    #[must_use]
    pub fn has_store(&self, kind: ObjectKind, code: &str) -> bool {
        match kind {
            ObjectKind::Data => self.data_store(code).is_ok(),
            ObjectKind::User => self.user_store(code).is_ok(),
            ObjectKind::Project => false,
        }
    }

    /// Returns a project-level property value.
    #[must_use]
    pub fn project_value(&self, prefix: &str, code: &str) -> Option<&Value> {
        self.project.get(prefix).and_then(|values| values.get(code))
    }

    /// Sets a project-level property value.
    pub fn set_project_value(&mut self, prefix: &str, code: &str, value: Value) {
        self.project
            .entry(prefix.to_string())
            .or_default()
            .insert(code.to_string(), value);
    }

    /// Removes a project-level property value.
    pub fn delete_project_value(&mut self, prefix: &str, code: &str) -> Option<Value> {
        let values = self.project.get_mut(prefix)?;
        let removed = values.remove(code);
        if values.is_empty() {
            self.project.remove(prefix);
        }
        removed
    }

    /// Iterates over data stores in code order.
    pub fn data_stores(&self) -> impl Iterator<Item = &DataStore> {
        self.data.values().flat_map(BTreeMap::values)
    }

    /// Iterates over user stores in code order.
    pub fn user_stores(&self) -> impl Iterator<Item = &UserStore> {
        self.user.values().flat_map(BTreeMap::values)
    }

    /// Iterates over `(prefix, code, value)` project values.
    pub fn project_values(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        self.project.iter().flat_map(|(prefix, values)| {
            values
                .iter()
                .map(move |(code, value)| (prefix.as_str(), code.as_str(), value))
        })
    }

    /// Finds the store of `kind` holding record `id`.
    ///
    /// Ids are minted from one sequence per kind, so at most one store
    /// holds a given id.
    #[must_use]
    pub fn locate(&self, kind: ObjectKind, id: &RecordId) -> Option<String> {
        match kind {
            ObjectKind::Data => self
                .data_stores()
                .find(|store| store.get(id).is_some())
                .map(|store| store.code().to_string()),
            ObjectKind::User => self
                .user_stores()
                .find(|store| store.get(id).is_some())
                .map(|store| store.code().to_string()),
            ObjectKind::Project => None,
        }
    }

    /// Merges stores loaded from elsewhere into this set.
    ///
    /// A store already present with records is kept as is; a missing or
    /// empty one is taken from `other`. Project values already set win.
    pub fn merge(&mut self, other: StoreSet) {
        for (prefix, stores) in other.data {
            let mine = self.data.entry(prefix).or_default();
            for (code, store) in stores {
                match mine.get(&code) {
                    Some(existing) if !existing.is_empty() => {
                        debug!(store = %code, "keeping already loaded data store");
                    }
                    _ => {
                        mine.insert(code, store);
                    }
                }
            }
        }
        for (prefix, stores) in other.user {
            let mine = self.user.entry(prefix).or_default();
            for (code, store) in stores {
                match mine.get(&code) {
                    Some(existing) if !existing.is_empty() || existing.groups().next().is_some() => {
                        debug!(store = %code, "keeping already loaded user store");
                    }
                    _ => {
                        mine.insert(code, store);
                    }
                }
            }
        }
        for (prefix, values) in other.project {
            let mine = self.project.entry(prefix).or_default();
            for (code, value) in values {
                mine.entry(code).or_insert(value);
            }
        }
        self.attach_codes();
    }

    fn references_mut(
        &mut self,
        owner: &ObjectRef,
    ) -> CoreResult<&mut ReferenceMap> {
        match owner.kind {
            ObjectKind::Data => Ok(self
                .data_store_mut(&owner.store)?
                .require_mut(&owner.id)?
                .references_mut()),
            ObjectKind::User => Ok(self
                .user_store_mut(&owner.store)?
                .require_mut(&owner.id)?
                .references_mut()),
            ObjectKind::Project => Err(project_reference()),
        }
    }
}

fn project_reference() -> CoreError {
    CoreError::invalid_reference("invalid object type: project")
}

impl ReferenceHost for StoreSet {
    fn linked(&self, owner: &ObjectRef, code: &str) -> CoreResult<Vec<RecordId>> {
        let ids = match owner.kind {
            ObjectKind::Data => self.data_store(&owner.store)?.require(&owner.id)?.references().get(code),
            ObjectKind::User => self.user_store(&owner.store)?.require(&owner.id)?.references().get(code),
            ObjectKind::Project => return Err(project_reference()),
        };
        Ok(ids.to_vec())
    }

    fn locate(&self, kind: ObjectKind, id: &RecordId) -> Option<String> {
        StoreSet::locate(self, kind, id)
    }

    fn write(&mut self, code: &str, write: &ReferenceWrite) -> CoreResult<()> {
        match write {
            ReferenceWrite::Link { owner, other } => {
                self.references_mut(owner)?.link(code, *other);
            }
            ReferenceWrite::Unlink { owner, other } => {
                self.references_mut(owner)?.unlink(code, other);
            }
        }
        Ok(())
    }
}
