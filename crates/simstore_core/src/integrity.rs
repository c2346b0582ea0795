//! Snapshot integrity checks.
//!
//! Verifies the cross-record invariants a snapshot must satisfy:
//!
//! - a child sits one level below its parent, a root at depth 1
//! - parent and children links agree
//! - unique and username index entries point at records holding the value
//! - no id runs ahead of its sequence counter
//! - every reference link has its inverse

use crate::property::unique_key;
use crate::reference::ReferenceMap;
use crate::snapshot::Snapshot;
use crate::store::{Record, RecordStore, StoreSet};
use crate::types::RecordId;
use std::fmt;

/// Category of an integrity problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// Depth does not follow the parent chain.
    Depth,
    /// Parent and children links disagree.
    Hierarchy,
    /// Unique index entry is stale.
    UniqueIndex,
    /// Username index entry is stale.
    UsernameIndex,
    /// Id is beyond its sequence counter.
    Sequence,
    /// A group reference points nowhere.
    Group,
    /// A reference link has no inverse.
    Reference,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Depth => "depth",
            Self::Hierarchy => "hierarchy",
            Self::UniqueIndex => "unique-index",
            Self::UsernameIndex => "username-index",
            Self::Sequence => "sequence",
            Self::Group => "group",
            Self::Reference => "reference",
        })
    }
}

/// One integrity problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityIssue {
    /// Category.
    pub kind: IssueKind,
    /// Store the problem was found in.
    pub store: String,
    /// Record involved, if any.
    pub id: Option<RecordId>,
    /// Description.
    pub message: String,
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "[{}] {}#{}: {}", self.kind, self.store, id, self.message),
            None => write!(f, "[{}] {}: {}", self.kind, self.store, self.message),
        }
    }
}

struct Report {
    issues: Vec<IntegrityIssue>,
}

impl Report {
    fn push(&mut self, kind: IssueKind, store: &str, id: Option<RecordId>, message: String) {
        self.issues.push(IntegrityIssue {
            kind,
            store: store.to_string(),
            id,
            message,
        });
    }

    fn sequence(&mut self, store: &str, id: RecordId, counter: u64, what: &str) {
        if id.seq() > counter {
            self.push(
                IssueKind::Sequence,
                store,
                Some(id),
                format!("{what} id is beyond the {what} sequence ({counter})"),
            );
        }
    }

    fn unique_index<S: RecordStore>(&mut self, store: &S) {
        for (property, value, holder) in store.unique().iter() {
            let held = store
                .get(&holder)
                .and_then(|r| r.properties().get(property))
                .map(unique_key);
            if held.as_deref() != Some(value) {
                self.push(
                    IssueKind::UniqueIndex,
                    store.code(),
                    Some(holder),
                    format!("{property} = {value:?} is indexed but not held"),
                );
            }
        }
    }

    fn references(&mut self, stores: &StoreSet, store: &str, id: RecordId, refs: &ReferenceMap) {
        for (code, linked) in refs.iter() {
            for other in linked {
                if !has_inverse(stores, code, other, store, &id) {
                    self.push(
                        IssueKind::Reference,
                        store,
                        Some(id),
                        format!("{code} links {other} which does not link back"),
                    );
                }
            }
        }
    }
}

/// Data and user ids share sequence values, so the inverse may sit in any
/// store other than the origin record itself.
fn has_inverse(
    stores: &StoreSet,
    code: &str,
    holder: &RecordId,
    origin_store: &str,
    target: &RecordId,
) -> bool {
    let is_origin = |store: &str| store == origin_store && holder == target;
    let data = stores
        .data_stores()
        .filter(|s| !is_origin(s.code()))
        .filter_map(|s| s.get(holder))
        .any(|r| r.references().get(code).contains(target));
    data || stores
        .user_stores()
        .filter(|s| !is_origin(s.code()))
        .filter_map(|s| s.get(holder))
        .any(|r| r.references().get(code).contains(target))
}

/// Checks a snapshot and returns every problem found.
#[must_use]
pub fn verify(snapshot: &Snapshot) -> Vec<IntegrityIssue> {
    let stores = &snapshot.stores;
    let mut report = Report { issues: Vec::new() };

    for store in stores.data_stores() {
        let code = store.code();
        for record in store.records() {
            let id = record.id();
            report.sequence(code, id, snapshot.data_record_sequence, "data record");

            match record.parent() {
                None if record.depth() != 1 => report.push(
                    IssueKind::Depth,
                    code,
                    Some(id),
                    format!("root record at depth {}", record.depth()),
                ),
                None => {}
                Some(parent_id) => match store.get(&parent_id) {
                    None => report.push(
                        IssueKind::Hierarchy,
                        code,
                        Some(id),
                        format!("parent {parent_id} does not exist"),
                    ),
                    Some(parent) => {
                        if record.depth() != parent.depth() + 1 {
                            report.push(
                                IssueKind::Depth,
                                code,
                                Some(id),
                                format!(
                                    "depth {} under parent at depth {}",
                                    record.depth(),
                                    parent.depth()
                                ),
                            );
                        }
                        if !parent.children().contains(&id) {
                            report.push(
                                IssueKind::Hierarchy,
                                code,
                                Some(id),
                                format!("missing from the children of {parent_id}"),
                            );
                        }
                    }
                },
            }

            for child_id in record.children() {
                if store.get(child_id).and_then(|c| c.parent()) != Some(id) {
                    report.push(
                        IssueKind::Hierarchy,
                        code,
                        Some(id),
                        format!("child {child_id} does not name this record as parent"),
                    );
                }
            }

            report.references(stores, code, id, record.references());
        }

        report.unique_index(store);
    }

    for store in stores.user_stores() {
        let code = store.code();
        for user in store.users() {
            let id = user.id();
            report.sequence(code, id, snapshot.user_sequence, "user");
            for group in user.groups() {
                if store.get_group(group).is_none() {
                    report.push(
                        IssueKind::Group,
                        code,
                        Some(id),
                        format!("member of missing group {group}"),
                    );
                }
            }
            report.references(stores, code, id, user.references());
        }

        for group in store.groups() {
            report.sequence(code, group.id(), snapshot.user_group_sequence, "group");
            for parent in group.parents() {
                if store.get_group(parent).is_none() {
                    report.push(
                        IssueKind::Group,
                        code,
                        Some(group.id()),
                        format!("parent group {parent} does not exist"),
                    );
                }
            }
        }

        for (username, id) in store.usernames() {
            if store.get(&id).map(|u| u.username()) != Some(username) {
                report.push(
                    IssueKind::UsernameIndex,
                    code,
                    Some(id),
                    format!("username {username:?} is indexed but not held"),
                );
            }
        }

        report.unique_index(store);
    }

    report.issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> Snapshot {
        Snapshot::from_slice(&serde_json::to_vec(&value).unwrap()).unwrap()
    }

    #[test]
    fn consistent_snapshot_is_clean() {
        let snap = snapshot(json!({
            "dataRecordSequence": 2,
            "stores": {"data": {"acme-blog": {"acme/blog/posts": {
                "records": {
                    "1.1": {"id": "1.1", "typeTag": "DataRecord", "depth": 1, "children": ["2.1"]},
                    "2.1": {"id": "2.1", "typeTag": "DataRecord", "depth": 2, "parent": "1.1"}
                },
                "uniqueMap": {}
            }}}}
        }));
        assert!(verify(&snap).is_empty());
    }

    #[test]
    fn detects_broken_hierarchy_and_sequence() {
        let snap = snapshot(json!({
            "dataRecordSequence": 1,
            "stores": {"data": {"acme-blog": {"acme/blog/posts": {
                "records": {
                    "1.1": {"id": "1.1", "typeTag": "DataRecord", "depth": 1},
                    "2.1": {"id": "2.1", "typeTag": "DataRecord", "depth": 3, "parent": "1.1"}
                }
            }}}}
        }));
        let kinds: Vec<_> = verify(&snap).iter().map(|i| i.kind).collect();
        assert!(kinds.contains(&IssueKind::Sequence));
        assert!(kinds.contains(&IssueKind::Depth));
        assert!(kinds.contains(&IssueKind::Hierarchy));
    }

    #[test]
    fn detects_stale_indexes() {
        let snap = snapshot(json!({
            "userSequence": 1,
            "stores": {"user": {"acme-blog": {"acme/blog/authors": {
                "records": {"1.1": {"id": "1.1", "typeTag": "User", "username": "jdoe"}},
                "uniqueMap": {"acme/blog/email": {"a@x.com": "1.1"}},
                "usernameMap": {"jane": "1.1"},
                "groups": {}
            }}}}
        }));
        let issues = verify(&snap);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|i| i.kind == IssueKind::UniqueIndex));
        assert!(issues.iter().any(|i| i.kind == IssueKind::UsernameIndex));
    }

    #[test]
    fn detects_missing_inverse() {
        let snap = snapshot(json!({
            "dataRecordSequence": 1,
            "userSequence": 1,
            "stores": {
                "data": {"acme-blog": {"acme/blog/posts": {"records": {
                    "1.1": {"id": "1.1", "typeTag": "DataRecord", "depth": 1}
                }}}},
                "user": {"acme-blog": {"acme/blog/authors": {"records": {
                    "1.1": {"id": "1.1", "typeTag": "User", "username": "jdoe", "groups": [],
                            "references": {"acme/blog/authorOf": ["1.1"]}}
                }}}}
            }
        }));
        let issues = verify(&snap);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::Reference);
        assert!(issues[0].to_string().starts_with("[reference] acme/blog/authors#1.1"));
    }
}
