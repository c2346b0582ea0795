//! Property registry.

use crate::property::PropertyDefinition;
use crate::types::ObjectKind;
use std::collections::BTreeMap;

/// Declared properties, per object kind and project prefix.
#[derive(Debug, Clone, Default)]
pub struct PropertyRegistry {
    definitions: BTreeMap<(ObjectKind, String), BTreeMap<String, PropertyDefinition>>,
}

impl PropertyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a property. The last registration for a code wins.
    pub fn register(
        &mut self,
        prefix: &str,
        kind: ObjectKind,
        code: impl Into<String>,
        definition: PropertyDefinition,
    ) {
        self.definitions
            .entry((kind, prefix.to_string()))
            .or_default()
            .insert(code.into(), definition);
    }

    /// Looks up a property definition.
    #[must_use]
    pub fn get(&self, prefix: &str, kind: ObjectKind, code: &str) -> Option<&PropertyDefinition> {
        self.definitions
            .get(&(kind, prefix.to_string()))
            .and_then(|defs| defs.get(code))
    }

    /// Iterates over the properties of one project and kind.
    pub fn iter(
        &self,
        prefix: &str,
        kind: ObjectKind,
    ) -> impl Iterator<Item = (&String, &PropertyDefinition)> {
        self.definitions
            .get(&(kind, prefix.to_string()))
            .into_iter()
            .flat_map(|defs| defs.iter())
    }

    /// Returns the total number of declared properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.values().map(BTreeMap::len).sum()
    }

    /// Returns true if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyType;

    #[test]
    fn register_and_get() {
        let mut registry = PropertyRegistry::new();
        registry.register(
            "acme-blog",
            ObjectKind::Data,
            "acme/blog/email",
            PropertyDefinition::new(PropertyType::Unique),
        );

        let def = registry.get("acme-blog", ObjectKind::Data, "acme/blog/email").unwrap();
        assert_eq!(def.property_type, PropertyType::Unique);
        assert!(registry.get("acme-blog", ObjectKind::User, "acme/blog/email").is_none());
        assert!(registry.get("other", ObjectKind::Data, "acme/blog/email").is_none());
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = PropertyRegistry::new();
        let code = "acme/blog/title";
        registry.register("acme-blog", ObjectKind::Data, code, PropertyDefinition::new(PropertyType::Text));
        registry.register(
            "acme-blog",
            ObjectKind::Data,
            code,
            PropertyDefinition::new(PropertyType::Html).with_default("untitled"),
        );

        let def = registry.get("acme-blog", ObjectKind::Data, code).unwrap();
        assert_eq!(def.property_type, PropertyType::Html);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.iter("acme-blog", ObjectKind::Data).count(), 1);
    }
}
