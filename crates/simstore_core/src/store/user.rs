//! User stores: users, groups and the username index.

use crate::error::{CoreError, CoreResult};
use crate::reference::ReferenceMap;
use crate::store::{PropertyMap, Record, RecordMut, RecordStore, RecordStoreMut, UniqueIndex};
use crate::types::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    id: RecordId,
    type_tag: String,
    username: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    groups: Vec<RecordId>,
    #[serde(default)]
    properties: PropertyMap,
    #[serde(default)]
    references: ReferenceMap,
}

impl UserRecord {
    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the first name.
    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Returns the last name.
    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Returns the ids of the groups the user belongs to.
    #[must_use]
    pub fn groups(&self) -> &[RecordId] {
        &self.groups
    }
}

impl Record for UserRecord {
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

impl RecordMut for UserRecord {
    fn properties_mut(&mut self) -> &mut PropertyMap {
        &mut self.properties
    }

    fn references_mut(&mut self) -> &mut ReferenceMap {
        &mut self.references
    }
}

/// A user group. Groups may nest under parent groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    id: RecordId,
    name: String,
    type_tag: String,
    #[serde(default)]
    groups: Vec<RecordId>,
}

impl Group {
    /// Returns the group id.
    #[must_use]
    pub const fn id(&self) -> RecordId {
        self.id
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the type tag.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Returns the parent group ids.
    #[must_use]
    pub fn parents(&self) -> &[RecordId] {
        &self.groups
    }
}

/// A user store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStore {
    #[serde(skip)]
    code: String,
    #[serde(default)]
    records: BTreeMap<RecordId, UserRecord>,
    #[serde(default)]
    unique_map: UniqueIndex,
    #[serde(default)]
    username_map: BTreeMap<String, RecordId>,
    #[serde(default)]
    groups: BTreeMap<RecordId, Group>,
}

impl UserStore {
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

    fn require_group(&self, id: &RecordId) -> CoreResult<&Group> {
        self.groups.get(id).ok_or_else(|| CoreError::GroupNotFound {
            store: self.code.clone(),
            id: *id,
        })
    }

    /// Inserts a new user under an id minted by the caller.
    ///
    /// Every group must exist. The username index points at the new user;
    /// a duplicate username takes over the index entry.
    pub fn create_user(
        &mut self,
        id: RecordId,
        username: &str,
        first_name: &str,
        last_name: &str,
        type_tag: impl Into<String>,
        groups: &[RecordId],
    ) -> CoreResult<&UserRecord> {
        for group in groups {
            self.require_group(group)?;
        }

        if let Some(previous) = self.username_map.insert(username.to_string(), id) {
            warn!(store = %self.code, username, previous = %previous, "username reassigned");
        }
        let mut member_of: Vec<RecordId> = Vec::with_capacity(groups.len());
        for group in groups {
            if !member_of.contains(group) {
                member_of.push(*group);
            }
        }
        let user = UserRecord {
            id,
            type_tag: type_tag.into(),
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            groups: member_of,
            properties: PropertyMap::new(),
            references: ReferenceMap::default(),
        };
        debug!(store = %self.code, id = %id, username, "created user");
        Ok(self.records.entry(id).or_insert(user))
    }

    /// Looks up a user by username.
    #[must_use]
    pub fn get_by_username(&self, username: &str) -> Option<&UserRecord> {
        self.username_map
            .get(username)
            .and_then(|id| self.records.get(id))
    }

    /// Changes a user's username, moving its index entry.
    pub fn set_username(&mut self, id: &RecordId, username: &str) -> CoreResult<()> {
        let user = self.require_mut(id)?;
        let old = std::mem::replace(&mut user.username, username.to_string());
        if self.username_map.get(&old) == Some(id) {
            self.username_map.remove(&old);
        }
        self.username_map.insert(username.to_string(), *id);
        Ok(())
    }

    /// Changes a user's first name.
    pub fn set_first_name(&mut self, id: &RecordId, first_name: &str) -> CoreResult<()> {
        self.require_mut(id)?.first_name = first_name.to_string();
        Ok(())
    }

    /// Changes a user's last name.
    pub fn set_last_name(&mut self, id: &RecordId, last_name: &str) -> CoreResult<()> {
        self.require_mut(id)?.last_name = last_name.to_string();
        Ok(())
    }

    /// Inserts a new group. Every parent group must exist.
    pub fn create_group(
        &mut self,
        id: RecordId,
        name: &str,
        type_tag: impl Into<String>,
        parents: &[RecordId],
    ) -> CoreResult<&Group> {
        for parent in parents {
            self.require_group(parent)?;
        }
        let group = Group {
            id,
            name: name.to_string(),
            type_tag: type_tag.into(),
            groups: parents.to_vec(),
        };
        debug!(store = %self.code, id = %id, name, "created group");
        Ok(self.groups.entry(id).or_insert(group))
    }

    /// Looks up a group.
    #[must_use]
    pub fn get_group(&self, id: &RecordId) -> Option<&Group> {
        self.groups.get(id)
    }

    /// Renames a group.
    pub fn set_group_name(&mut self, id: &RecordId, name: &str) -> CoreResult<()> {
        let code = self.code.clone();
        let group = self
            .groups
            .get_mut(id)
            .ok_or(CoreError::GroupNotFound { store: code, id: *id })?;
        group.name = name.to_string();
        Ok(())
    }

    /// Returns the direct members of a group, by scanning every user.
    pub fn group_members(&self, group: &RecordId) -> CoreResult<Vec<&UserRecord>> {
        self.require_group(group)?;
        Ok(self
            .records
            .values()
            .filter(|user| user.groups.contains(group))
            .collect())
    }

    /// Returns the groups a user belongs to.
    pub fn user_groups(&self, id: &RecordId) -> CoreResult<Vec<&Group>> {
        let user = self.require(id)?;
        Ok(user
            .groups
            .iter()
            .filter_map(|group| self.groups.get(group))
            .collect())
    }

    /// Adds a user to a group. Adding an existing member is a no-op.
    pub fn add_to_group(&mut self, id: &RecordId, group: &RecordId) -> CoreResult<()> {
        self.require_group(group)?;
        let user = self.require_mut(id)?;
        if !user.groups.contains(group) {
            user.groups.push(*group);
        }
        Ok(())
    }

    /// Removes a user from a group. Removing a non-member is a no-op.
    pub fn remove_from_group(&mut self, id: &RecordId, group: &RecordId) -> CoreResult<()> {
        self.require_group(group)?;
        self.require_mut(id)?.groups.retain(|g| g != group);
        Ok(())
    }

    /// Iterates over users in id order.
    pub fn users(&self) -> impl Iterator<Item = &UserRecord> {
        self.records.values()
    }

    /// Iterates over groups in id order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Iterates over username index entries.
    pub fn usernames(&self) -> impl Iterator<Item = (&str, RecordId)> {
        self.username_map.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

impl RecordStore for UserStore {
    type Record = UserRecord;

    fn code(&self) -> &str {
        &self.code
    }

    fn get(&self, id: &RecordId) -> Option<&UserRecord> {
        self.records.get(id)
    }

    fn unique(&self) -> &UniqueIndex {
        &self.unique_map
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

impl RecordStoreMut for UserStore {
    fn record_and_index_mut(
        &mut self,
        id: &RecordId,
    ) -> Option<(&mut UserRecord, &mut UniqueIndex)> {
        let record = self.records.get_mut(id)?;
        Some((record, &mut self.unique_map))
    }
}
