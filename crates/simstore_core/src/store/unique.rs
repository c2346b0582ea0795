//! Unique value index.

use crate::types::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maps `property code -> value -> record id` for unique properties.
///
/// Each value is held by at most one record. Values are keyed by
/// [`unique_key`](crate::property::unique_key).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueIndex {
    entries: BTreeMap<String, BTreeMap<String, RecordId>>,
}

impl UniqueIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record holding `value` for `code`.
    #[must_use]
    pub fn holder(&self, code: &str, value: &str) -> Option<RecordId> {
        self.entries.get(code).and_then(|values| values.get(value)).copied()
    }

    /// Records `id` as the holder of `value`, replacing any previous holder.
    ///
    /// Callers check [`holder`](Self::holder) first.
    pub fn claim(&mut self, code: &str, value: String, id: RecordId) {
        self.entries
            .entry(code.to_string())
            .or_default()
            .insert(value, id);
    }

    /// Releases `value` if `id` holds it. Returns true if released.
    pub fn release(&mut self, code: &str, value: &str, id: &RecordId) -> bool {
        let Some(values) = self.entries.get_mut(code) else {
            return false;
        };
        if values.get(value) != Some(id) {
            return false;
        }
        values.remove(value);
        if values.is_empty() {
            self.entries.remove(code);
        }
        true
    }

    /// Iterates over `(code, value, holder)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, RecordId)> {
        self.entries.iter().flat_map(|(code, values)| {
            values
                .iter()
                .map(move |(value, id)| (code.as_str(), value.as_str(), *id))
        })
    }

    /// Returns the number of claimed values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// Returns true if no value is claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_and_lookup() {
        let mut index = UniqueIndex::new();
        index.claim("acme/blog/email", "a@x.com".into(), RecordId::new(1));

        assert_eq!(index.holder("acme/blog/email", "a@x.com"), Some(RecordId::new(1)));
        assert_eq!(index.holder("acme/blog/email", "b@x.com"), None);
        assert_eq!(index.holder("acme/blog/slug", "a@x.com"), None);
    }

    #[test]
    fn release_only_by_holder() {
        let mut index = UniqueIndex::new();
        index.claim("acme/blog/email", "a@x.com".into(), RecordId::new(1));

        assert!(!index.release("acme/blog/email", "a@x.com", &RecordId::new(2)));
        assert!(index.release("acme/blog/email", "a@x.com", &RecordId::new(1)));
        assert!(index.is_empty());
    }

    #[test]
    fn serializes_as_nested_map() {
        let mut index = UniqueIndex::new();
        index.claim("acme/blog/email", "a@x.com".into(), RecordId::new(4));
        assert_eq!(
            serde_json::to_string(&index).unwrap(),
            r#"{"acme/blog/email":{"a@x.com":"4.1"}}"#
        );
        assert_eq!(index.iter().count(), 1);
    }
}
