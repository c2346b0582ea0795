//! Reference definition registry.

use crate::reference::{RawReferenceDefinition, ReferenceDefinition};
use std::collections::BTreeMap;
use tracing::debug;

/// Registered reference definitions keyed by qualified code.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRegistry {
    definitions: BTreeMap<String, ReferenceDefinition>,
}

impl ReferenceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition. The first registration for a code wins;
    /// returns false if the code was already registered.
    pub fn register(&mut self, code: impl Into<String>, raw: RawReferenceDefinition) -> bool {
        let code = code.into();
        if self.definitions.contains_key(&code) {
            debug!(code = %code, "reference already registered, keeping first");
            return false;
        }
        let definition = ReferenceDefinition::normalize(code.clone(), raw);
        self.definitions.insert(code, definition);
        true
    }

    /// Looks up a definition.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&ReferenceDefinition> {
        self.definitions.get(code)
    }

    /// Iterates over all definitions in code order.
    pub fn iter(&self) -> impl Iterator<Item = &ReferenceDefinition> {
        self.definitions.values()
    }

    /// Returns the number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if no definition is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{Cardinality, StoreType};

    #[test]
    fn first_registration_wins() {
        let mut registry = ReferenceRegistry::new();
        let one = RawReferenceDefinition::new(
            StoreType::UserStore,
            Some("Authors"),
            StoreType::DataStore,
            Some("Posts"),
            Cardinality::OneToOne,
        );
        let many = RawReferenceDefinition {
            cardinality: Cardinality::ManyToMany,
            ..one.clone()
        };

        assert!(registry.register("acme/blog/authorOf", one));
        assert!(!registry.register("acme/blog/authorOf", many));
        assert_eq!(
            registry.get("acme/blog/authorOf").unwrap().cardinality,
            Cardinality::OneToOne
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.get("acme/blog/other").is_none());
    }
}
