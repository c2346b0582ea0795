//! Property-based test generators using proptest.
//!
//! Provides strategies for generating engine operations and the data they
//! carry.

use proptest::prelude::*;
use serde_json::{json, Value};
use simstore_core::{Engine, ObjectKind, RecordId};

/// Strategy for generating a record hierarchy.
///
/// Element `i` is the parent of record `i`, given as an index into the
/// records before it; `None` makes a root.
pub fn tree_shape_strategy(max_records: usize) -> impl Strategy<Value = Vec<Option<usize>>> {
    prop::collection::vec(prop::option::of(any::<prop::sample::Index>()), 1..max_records).prop_map(
        |slots| {
            slots
                .into_iter()
                .enumerate()
                .map(|(i, slot)| match slot {
                    Some(index) if i > 0 => Some(index.index(i)),
                    _ => None,
                })
                .collect()
        },
    )
}

/// Strategy for generating unique property values.
pub fn unique_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::string::string_regex("[a-z]{1,6}@x\\.com")
            .expect("Invalid regex")
            .prop_map(Value::from),
        (0i64..50).prop_map(|n| json!(n)),
    ]
}

/// Strategy for generating usernames.
pub fn username_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}").expect("Invalid regex")
}

/// An operation against a store pair of one data and one user store.
#[derive(Debug, Clone)]
pub enum EngineOperation {
    /// Create a data record under the record at `parent`, if any.
    CreateRecord {
        /// Index into the records created so far.
        parent: Option<prop::sample::Index>,
    },
    /// Create a user.
    CreateUser {
        /// Username
        username: String,
    },
    /// Create a group.
    CreateGroup {
        /// Group name
        name: String,
    },
    /// Set a unique property on a data record.
    SetUnique {
        /// Index into the records created so far.
        record: prop::sample::Index,
        /// Value to claim.
        value: Value,
    },
    /// Delete a unique property from a data record.
    DeleteUnique {
        /// Index into the records created so far.
        record: prop::sample::Index,
    },
}

/// Strategy for generating a single operation.
pub fn operation_strategy() -> impl Strategy<Value = EngineOperation> {
    prop_oneof![
        4 => prop::option::of(any::<prop::sample::Index>())
            .prop_map(|parent| EngineOperation::CreateRecord { parent }),
        2 => username_strategy().prop_map(|username| EngineOperation::CreateUser { username }),
        1 => "[A-Z][a-z]{0,8}".prop_map(|name| EngineOperation::CreateGroup { name }),
        3 => (any::<prop::sample::Index>(), unique_value_strategy())
            .prop_map(|(record, value)| EngineOperation::SetUnique { record, value }),
        1 => any::<prop::sample::Index>().prop_map(|record| EngineOperation::DeleteUnique { record }),
    ]
}

/// Strategy for generating a batch of operations.
pub fn operations_strategy(max_ops: usize) -> impl Strategy<Value = Vec<EngineOperation>> {
    prop::collection::vec(operation_strategy(), 1..max_ops)
}

/// Applies generated operations to `engine`.
///
/// Records are created in `data_store`, users and groups in `user_store`;
/// `unique_code` names a unique data property. Rejected operations are
/// skipped. Returns the ids of the data records created.
pub fn apply_operations(
    engine: &mut Engine,
    data_store: &str,
    user_store: &str,
    unique_code: &str,
    operations: &[EngineOperation],
) -> Vec<RecordId> {
    use simstore_core::Record;

    let mut records: Vec<RecordId> = Vec::new();
    for operation in operations {
        match operation {
            EngineOperation::CreateRecord { parent } => {
                let parent = parent
                    .filter(|_| !records.is_empty())
                    .map(|index| *index.get(&records));
                if let Ok(record) = engine.create_data_record(data_store, None, parent.as_ref()) {
                    records.push(record.id());
                }
            }
            EngineOperation::CreateUser { username } => {
                let _ = engine.create_user(user_store, username, "", "", None, &[]);
            }
            EngineOperation::CreateGroup { name } => {
                let _ = engine.create_group(user_store, name, None, &[]);
            }
            EngineOperation::SetUnique { record, value } => {
                if !records.is_empty() {
                    let id = *record.get(&records);
                    let _ = engine.set_property_value(
                        ObjectKind::Data,
                        data_store,
                        &id,
                        unique_code,
                        value.clone(),
                    );
                }
            }
            EngineOperation::DeleteUnique { record } => {
                if !records.is_empty() {
                    let id = *record.get(&records);
                    let _ = engine.delete_property_value(ObjectKind::Data, data_store, &id, unique_code);
                }
            }
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn tree_shapes_point_backwards() {
        let mut runner = TestRunner::default();
        for _ in 0..20 {
            let shape = tree_shape_strategy(30)
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert_eq!(shape[0], None);
            for (i, parent) in shape.iter().enumerate() {
                if let Some(p) = parent {
                    assert!(*p < i);
                }
            }
        }
    }

    #[test]
    fn usernames_are_valid() {
        let mut runner = TestRunner::default();
        let name = username_strategy().new_tree(&mut runner).unwrap().current();
        assert!(!name.is_empty());
    }
}
