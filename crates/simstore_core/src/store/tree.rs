//! Depth-bounded traversal of the data record hierarchy.

use crate::store::{DataStore, RecordStore};
use crate::types::RecordId;
use std::collections::HashSet;

/// A child record and its own descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Record id.
    pub id: RecordId,
    /// Depth of the record.
    pub depth: u32,
    /// Descendants still within the requested depth.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Returns this node's id followed by all descendant ids, depth first.
    #[must_use]
    pub fn flatten(&self) -> Vec<RecordId> {
        let mut ids = vec![self.id];
        for child in &self.children {
            ids.extend(child.flatten());
        }
        ids
    }
}

/// An ancestor of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentEntry {
    /// Ancestor id.
    pub id: RecordId,
    /// Depth of the ancestor.
    pub depth: u32,
}

impl DataStore {
    /// Returns the descendants of `id` as a tree, in creation order.
    ///
    /// `depth` bounds the number of levels: `Some(0)` yields nothing,
    /// `Some(1)` direct children only, `None` every level. An unknown id
    /// has no children.
    #[must_use]
    pub fn children_of(&self, id: &RecordId, depth: Option<u32>) -> Vec<TreeNode> {
        let mut seen = HashSet::from([*id]);
        self.subtree(id, depth, &mut seen)
    }

    fn subtree(
        &self,
        id: &RecordId,
        depth: Option<u32>,
        seen: &mut HashSet<RecordId>,
    ) -> Vec<TreeNode> {
        if depth == Some(0) {
            return Vec::new();
        }
        let Some(record) = self.get(id) else {
            return Vec::new();
        };

        let remaining = depth.map(|d| d - 1);
        let mut nodes = Vec::with_capacity(record.children().len());
        for child_id in record.children() {
            if !seen.insert(*child_id) {
                continue;
            }
            let Some(child) = self.get(child_id) else {
                continue;
            };
            nodes.push(TreeNode {
                id: *child_id,
                depth: child.depth(),
                children: self.subtree(child_id, remaining, seen),
            });
        }
        nodes
    }

    /// Returns the ancestors of `id`, nearest first.
    ///
    /// `depth` bounds the number of ancestors returned with the same
    /// meaning as in [`children_of`](Self::children_of).
    #[must_use]
    pub fn parents_of(&self, id: &RecordId, depth: Option<u32>) -> Vec<ParentEntry> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([*id]);
        let mut next = self.get(id).and_then(|record| record.parent());

        while let Some(parent_id) = next {
            if depth.is_some_and(|d| chain.len() >= d as usize) || !seen.insert(parent_id) {
                break;
            }
            let Some(parent) = self.get(&parent_id) else {
                break;
            };
            chain.push(ParentEntry {
                id: parent_id,
                depth: parent.depth(),
            });
            next = parent.parent();
        }
        chain
    }
}
