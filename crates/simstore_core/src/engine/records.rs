//! Record, user and group operations.

use super::Engine;
use crate::custom_type::{BASE_DATA_TYPE, BASE_GROUP_TYPE, BASE_USER_TYPE};
use crate::error::{CoreError, CoreResult};
use crate::project::{namespace_of, qualify};
use crate::store::{DataRecord, Group, ParentEntry, RecordStore, TreeNode, UserRecord};
use crate::types::{EntityKind, ObjectKind, RecordId};
use serde_json::Value;

impl Engine {
    fn resolve_type(&self, kind: ObjectKind, store: &str, requested: Option<&str>, base: &str) -> CoreResult<String> {
        self.types
            .resolve(kind, namespace_of(store), requested, base, self.policy())
    }

    /// Creates a data record.
    ///
    /// The record is a root at depth 1, or sits one level below `parent`,
    /// which must already exist in the same store. Nothing is minted when
    /// the store, parent or type is rejected.
    pub fn create_data_record(
        &mut self,
        store: &str,
        type_tag: Option<&str>,
        parent: Option<&RecordId>,
    ) -> CoreResult<&DataRecord> {
        let code = self.store_code(store)?;
        let tag = self.resolve_type(ObjectKind::Data, &code, type_tag, BASE_DATA_TYPE)?;
        let target = self.stores.data_store(&code)?;
        if let Some(parent) = parent {
            if target.get(parent).is_none() {
                return Err(CoreError::ParentNotFound {
                    store: code,
                    parent: *parent,
                });
            }
        }

        let id = self.sequences.next_id(EntityKind::DataRecord);
        self.stores.data_store_mut(&code)?.create(id, tag, parent)
    }

    /// Returns a data record.
    pub fn get_data_record(&self, store: &str, id: &RecordId) -> CoreResult<&DataRecord> {
        let code = self.store_code(store)?;
        self.stores.data_store(&code)?.require(id)
    }

    /// Finds the data record holding a unique property value.
    pub fn get_data_record_by_value(
        &self,
        store: &str,
        property: &str,
        value: &Value,
    ) -> CoreResult<Option<&DataRecord>> {
        let code = self.store_code(store)?;
        let property = qualify(namespace_of(&code), property);
        Ok(self.stores.data_store(&code)?.get_by_unique(&property, value))
    }

    /// Returns the descendants of a record as a tree.
    ///
    /// `Some(0)` yields nothing, `None` walks to the leaves. An unknown id
    /// has no children.
    pub fn get_children(&self, store: &str, id: &RecordId, depth: Option<u32>) -> CoreResult<Vec<TreeNode>> {
        let code = self.store_code(store)?;
        Ok(self.stores.data_store(&code)?.children_of(id, depth))
    }

    /// Returns the ancestors of a record, nearest first.
    pub fn get_parents(&self, store: &str, id: &RecordId, depth: Option<u32>) -> CoreResult<Vec<ParentEntry>> {
        let code = self.store_code(store)?;
        Ok(self.stores.data_store(&code)?.parents_of(id, depth))
    }

    /// Creates a user.
    ///
    /// Every group must exist in the store. The username index points at
    /// the new user.
    pub fn create_user(
        &mut self,
        store: &str,
        username: &str,
        first_name: &str,
        last_name: &str,
        type_tag: Option<&str>,
        groups: &[RecordId],
    ) -> CoreResult<&UserRecord> {
        let code = self.store_code(store)?;
        let tag = self.resolve_type(ObjectKind::User, &code, type_tag, BASE_USER_TYPE)?;
        let target = self.stores.user_store(&code)?;
        if let Some(missing) = groups.iter().find(|g| target.get_group(g).is_none()) {
            return Err(CoreError::GroupNotFound {
                store: code,
                id: *missing,
            });
        }

        let id = self.sequences.next_id(EntityKind::User);
        self.stores
            .user_store_mut(&code)?
            .create_user(id, username, first_name, last_name, tag, groups)
    }

    /// Returns a user.
    pub fn get_user(&self, store: &str, id: &RecordId) -> CoreResult<&UserRecord> {
        let code = self.store_code(store)?;
        self.stores.user_store(&code)?.require(id)
    }

    /// Finds a user by username.
    pub fn get_user_by_username(&self, store: &str, username: &str) -> CoreResult<Option<&UserRecord>> {
        let code = self.store_code(store)?;
        Ok(self.stores.user_store(&code)?.get_by_username(username))
    }

    /// Changes a user's username, moving its index entry.
    pub fn set_username(&mut self, store: &str, id: &RecordId, username: &str) -> CoreResult<()> {
        let code = self.store_code(store)?;
        self.stores.user_store_mut(&code)?.set_username(id, username)
    }

    /// Changes a user's first name.
    pub fn set_user_first_name(&mut self, store: &str, id: &RecordId, first_name: &str) -> CoreResult<()> {
        let code = self.store_code(store)?;
        self.stores.user_store_mut(&code)?.set_first_name(id, first_name)
    }

    /// Changes a user's last name.
    pub fn set_user_last_name(&mut self, store: &str, id: &RecordId, last_name: &str) -> CoreResult<()> {
        let code = self.store_code(store)?;
        self.stores.user_store_mut(&code)?.set_last_name(id, last_name)
    }

    /// Creates a group. Every parent group must exist in the store.
    pub fn create_group(
        &mut self,
        store: &str,
        name: &str,
        type_tag: Option<&str>,
        parents: &[RecordId],
    ) -> CoreResult<&Group> {
        let code = self.store_code(store)?;
        let tag = self.resolve_type(ObjectKind::User, &code, type_tag, BASE_GROUP_TYPE)?;
        let target = self.stores.user_store(&code)?;
        if let Some(missing) = parents.iter().find(|g| target.get_group(g).is_none()) {
            return Err(CoreError::GroupNotFound {
                store: code,
                id: *missing,
            });
        }

        let id = self.sequences.next_id(EntityKind::Group);
        self.stores
            .user_store_mut(&code)?
            .create_group(id, name, tag, parents)
    }

    /// Returns a group.
    pub fn get_group(&self, store: &str, id: &RecordId) -> CoreResult<&Group> {
        let code = self.store_code(store)?;
        self.stores
            .user_store(&code)?
            .get_group(id)
            .ok_or(CoreError::GroupNotFound { store: code, id: *id })
    }

    /// Renames a group.
    pub fn set_group_name(&mut self, store: &str, id: &RecordId, name: &str) -> CoreResult<()> {
        let code = self.store_code(store)?;
        self.stores.user_store_mut(&code)?.set_group_name(id, name)
    }

    /// Returns the members of a group in id order.
    pub fn get_group_members(&self, store: &str, group: &RecordId) -> CoreResult<Vec<&UserRecord>> {
        let code = self.store_code(store)?;
        self.stores.user_store(&code)?.group_members(group)
    }

    /// Returns the groups a user belongs to.
    pub fn get_user_groups(&self, store: &str, id: &RecordId) -> CoreResult<Vec<&Group>> {
        let code = self.store_code(store)?;
        self.stores.user_store(&code)?.user_groups(id)
    }

    /// Adds a user to a group. No-op if already a member.
    pub fn add_user_to_group(&mut self, store: &str, id: &RecordId, group: &RecordId) -> CoreResult<()> {
        let code = self.store_code(store)?;
        self.stores.user_store_mut(&code)?.add_to_group(id, group)
    }

    /// Removes a user from a group. No-op if not a member.
    pub fn remove_user_from_group(&mut self, store: &str, id: &RecordId, group: &RecordId) -> CoreResult<()> {
        let code = self.store_code(store)?;
        self.stores.user_store_mut(&code)?.remove_from_group(id, group)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{EngineConfig, SchemaPolicy};
    use crate::error::{CoreError, ErrorKind};
    use crate::store::Record;
    use crate::types::{EntityKind, RecordId};
    use crate::Engine;

    fn engine() -> (Engine, String, String) {
        let mut engine = Engine::new(EngineConfig::default());
        let posts = engine.create_data_store("Proj", "Posts");
        let authors = engine.create_user_store("Proj", "Authors");
        (engine, posts, authors)
    }

    #[test]
    fn records_form_a_hierarchy() {
        let (mut engine, posts, _) = engine();
        let root = engine.create_data_record(&posts, Some("Article"), None).unwrap();
        assert_eq!(root.id().to_string(), "1.1");
        assert_eq!(root.depth(), 1);
        assert_eq!(root.type_tag(), "proj/Data/Article");

        let child = engine
            .create_data_record(&posts, Some("Comment"), Some(&RecordId::new(1)))
            .unwrap();
        assert_eq!(child.id().to_string(), "2.1");
        assert_eq!(child.depth(), 2);

        let root = engine.get_data_record(&posts, &RecordId::new(1)).unwrap();
        assert_eq!(root.children(), &[RecordId::new(2)]);
    }

    #[test]
    fn missing_parent_burns_no_id() {
        let (mut engine, posts, _) = engine();
        let err = engine
            .create_data_record(&posts, None, Some(&RecordId::new(9)))
            .unwrap_err();
        assert!(matches!(err, CoreError::ParentNotFound { .. }));
        assert_eq!(engine.sequences().current(EntityKind::DataRecord), 0);
    }

    #[test]
    fn unknown_store() {
        let (mut engine, _, _) = engine();
        let err = engine.create_data_record("Missing", None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(engine.get_user("proj/authors", &RecordId::new(1)).is_err());
    }

    #[test]
    fn strict_policy_rejects_undeclared_types() {
        let mut engine = Engine::new(EngineConfig::new().schema_policy(SchemaPolicy::Strict));
        let posts = engine.create_data_store("Proj", "Posts");
        engine.declare_type("Proj", crate::ObjectKind::Data, "Article");

        assert!(engine.create_data_record(&posts, Some("Article"), None).is_ok());
        let err = engine.create_data_record(&posts, Some("Video"), None).unwrap_err();
        assert!(matches!(err, CoreError::TypeNotFound { .. }));
    }

    #[test]
    fn tree_traversal() {
        let (mut engine, posts, _) = engine();
        let a = engine.create_data_record(&posts, None, None).unwrap().id();
        let b = engine.create_data_record(&posts, None, Some(&a)).unwrap().id();
        let c = engine.create_data_record(&posts, None, Some(&b)).unwrap().id();

        assert!(engine.get_children(&posts, &a, Some(0)).unwrap().is_empty());
        let one = engine.get_children(&posts, &a, Some(1)).unwrap();
        assert_eq!(one.len(), 1);
        assert!(one[0].children.is_empty());
        let all = engine.get_children(&posts, &a, None).unwrap();
        assert_eq!(all[0].flatten(), vec![b, c]);

        let parents: Vec<_> = engine
            .get_parents(&posts, &c, None)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(parents, vec![b, a]);
    }

    #[test]
    fn users_and_usernames() {
        let (mut engine, _, authors) = engine();
        let id = engine
            .create_user(&authors, "jdoe", "Jane", "Doe", None, &[])
            .unwrap()
            .id();
        assert_eq!(id.to_string(), "1.1");

        let found = engine.get_user_by_username(&authors, "jdoe").unwrap().unwrap();
        assert_eq!(found.id(), id);
        assert_eq!(found.type_tag(), "User");

        engine.set_username(&authors, &id, "jane").unwrap();
        assert!(engine.get_user_by_username(&authors, "jdoe").unwrap().is_none());
        engine.set_user_first_name(&authors, &id, "Janet").unwrap();
        engine.set_user_last_name(&authors, &id, "Roe").unwrap();
        let user = engine.get_user(&authors, &id).unwrap();
        assert_eq!((user.first_name(), user.last_name()), ("Janet", "Roe"));
    }

    #[test]
    fn groups_and_membership() {
        let (mut engine, _, authors) = engine();
        let staff = engine.create_group(&authors, "Staff", None, &[]).unwrap().id();
        let editors = engine
            .create_group(&authors, "Editors", None, &[staff])
            .unwrap()
            .id();
        let user = engine
            .create_user(&authors, "jdoe", "Jane", "Doe", None, &[staff])
            .unwrap()
            .id();

        engine.add_user_to_group(&authors, &user, &editors).unwrap();
        let names: Vec<_> = engine
            .get_user_groups(&authors, &user)
            .unwrap()
            .iter()
            .map(|g| g.name().to_string())
            .collect();
        assert_eq!(names, ["Staff", "Editors"]);

        engine.remove_user_from_group(&authors, &user, &staff).unwrap();
        assert!(engine.get_group_members(&authors, &staff).unwrap().is_empty());
        assert_eq!(engine.get_group_members(&authors, &editors).unwrap().len(), 1);

        engine.set_group_name(&authors, &editors, "Editorial").unwrap();
        assert_eq!(engine.get_group(&authors, &editors).unwrap().name(), "Editorial");
        assert_eq!(engine.get_group(&authors, &editors).unwrap().parents(), &[staff]);
    }

    #[test]
    fn missing_group_burns_no_id() {
        let (mut engine, _, authors) = engine();
        let err = engine
            .create_user(&authors, "jdoe", "Jane", "Doe", None, &[RecordId::new(4)])
            .unwrap_err();
        assert!(matches!(err, CoreError::GroupNotFound { .. }));
        assert_eq!(engine.sequences().current(EntityKind::User), 0);
        assert!(engine.get_group(&authors, &RecordId::new(4)).is_err());
    }
}
