//! Reference definitions.

use crate::error::{CoreError, CoreResult};
use crate::project::{namespace_of, qualify};
use crate::types::ObjectKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many records may sit on each side of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// One source, one target.
    #[serde(rename = "1:1")]
    OneToOne,
    /// One source, many targets.
    #[serde(rename = "1:M")]
    OneToMany,
    /// Many sources, one target. Normalized to `1:M` on registration.
    #[serde(rename = "M:1")]
    ManyToOne,
    /// Unconstrained.
    #[serde(rename = "M:M")]
    ManyToMany,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OneToOne => "1:1",
            Self::OneToMany => "1:M",
            Self::ManyToOne => "M:1",
            Self::ManyToMany => "M:M",
        })
    }
}

/// Store class named by a reference definition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreType {
    /// A data store.
    DataStore,
    /// A user store.
    UserStore,
}

impl StoreType {
    /// Returns the object kind held by stores of this type.
    #[must_use]
    pub const fn kind(self) -> ObjectKind {
        match self {
            Self::DataStore => ObjectKind::Data,
            Self::UserStore => ObjectKind::User,
        }
    }

    /// Returns the store type holding objects of `kind`, if any.
    #[must_use]
    pub const fn for_kind(kind: ObjectKind) -> Option<Self> {
        match kind {
            ObjectKind::Data => Some(Self::DataStore),
            ObjectKind::User => Some(Self::UserStore),
            ObjectKind::Project => None,
        }
    }
}

/// Side of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The "one" side of `1:M`, the left side otherwise.
    Source,
    /// The other side.
    Target,
}

impl Side {
    /// Returns the other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Source => Self::Target,
            Self::Target => Self::Source,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Target => "target",
        })
    }
}

/// A reference definition as stored in `Stores/<Kind>/<Store>/<code>.json`.
///
/// A missing store code means any store of the given type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReferenceDefinition {
    /// Store type on the source side.
    pub source_type: StoreType,
    /// Store name on the source side.
    #[serde(default)]
    pub source_code: Option<String>,
    /// Store type on the target side.
    pub target_type: StoreType,
    /// Store name on the target side.
    #[serde(default)]
    pub target_code: Option<String>,
    /// Declared cardinality.
    pub cardinality: Cardinality,
}

impl RawReferenceDefinition {
    /// Creates a definition between two stores.
    pub fn new(
        source_type: StoreType,
        source_code: Option<&str>,
        target_type: StoreType,
        target_code: Option<&str>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            source_type,
            source_code: source_code.map(str::to_string),
            target_type,
            target_code: target_code.map(str::to_string),
            cardinality,
        }
    }
}

/// One side of a normalized definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Store type.
    pub store_type: StoreType,
    /// Store name, unqualified as declared. `None` matches any store.
    pub store_code: Option<String>,
}

impl Endpoint {
    fn matches(&self, store_type: StoreType, store: &str) -> bool {
        self.store_type == store_type
            && self
                .store_code
                .as_deref()
                .map_or(true, |code| qualify(namespace_of(store), code) == store)
    }
}

/// A registered reference definition, with `M:1` normalized to `1:M`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDefinition {
    /// Qualified reference code.
    pub code: String,
    /// Source side.
    pub source: Endpoint,
    /// Target side.
    pub target: Endpoint,
    /// Cardinality; never `M:1`.
    pub cardinality: Cardinality,
}

impl ReferenceDefinition {
    /// Normalizes a raw definition: `M:1` becomes `1:M` with the sides swapped.
    #[must_use]
    pub fn normalize(code: impl Into<String>, raw: RawReferenceDefinition) -> Self {
        let source = Endpoint {
            store_type: raw.source_type,
            store_code: raw.source_code,
        };
        let target = Endpoint {
            store_type: raw.target_type,
            store_code: raw.target_code,
        };

        match raw.cardinality {
            Cardinality::ManyToOne => Self {
                code: code.into(),
                source: target,
                target: source,
                cardinality: Cardinality::OneToMany,
            },
            cardinality => Self {
                code: code.into(),
                source,
                target,
                cardinality,
            },
        }
    }

    /// Returns the endpoint of a side.
    #[must_use]
    pub const fn endpoint(&self, side: Side) -> &Endpoint {
        match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }

    /// Returns true if an object of `kind` in `store` may sit on `side`.
    #[must_use]
    pub fn accepts(&self, side: Side, kind: ObjectKind, store: &str) -> bool {
        StoreType::for_kind(kind)
            .is_some_and(|store_type| self.endpoint(side).matches(store_type, store))
    }

    /// Determines which side an object of `kind` in `store` sits on.
    ///
    /// Declared store names are qualified with the namespace of `store`
    /// before comparing. When both sides match (a reference within one
    /// store) the source side wins.
    pub fn resolve_side(&self, kind: ObjectKind, store: &str) -> CoreResult<Side> {
        let store_type = StoreType::for_kind(kind).ok_or_else(|| {
            CoreError::invalid_reference(format!("invalid object type: {kind}"))
        })?;

        if self.source.matches(store_type, store) {
            Ok(Side::Source)
        } else if self.target.matches(store_type, store) {
            Ok(Side::Target)
        } else {
            Err(CoreError::invalid_reference(format!(
                "{kind} store {store} takes no part in reference {}",
                self.code
            )))
        }
    }

    /// Returns the kind and, when declared, the qualified store of the side
    /// opposite to `side`, as seen from `acting_store`.
    #[must_use]
    pub fn opposite(&self, side: Side, acting_store: &str) -> (ObjectKind, Option<String>) {
        let endpoint = self.endpoint(side.opposite());
        let store = endpoint
            .store_code
            .as_deref()
            .map(|code| qualify(namespace_of(acting_store), code));
        (endpoint.store_type.kind(), store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author_of() -> ReferenceDefinition {
        ReferenceDefinition::normalize(
            "acme/blog/authorOf",
            RawReferenceDefinition::new(
                StoreType::UserStore,
                Some("Authors"),
                StoreType::DataStore,
                Some("Posts"),
                Cardinality::OneToOne,
            ),
        )
    }

    #[test]
    fn parses_definition_file() {
        let raw: RawReferenceDefinition = serde_json::from_str(
            r#"{"sourceType":"DataStore","sourceCode":null,"targetType":"UserStore","targetCode":"Authors","cardinality":"M:M"}"#,
        )
        .unwrap();
        assert_eq!(raw.source_type, StoreType::DataStore);
        assert!(raw.source_code.is_none());
        assert_eq!(raw.cardinality, Cardinality::ManyToMany);
    }

    #[test]
    fn many_to_one_is_swapped() {
        let def = ReferenceDefinition::normalize(
            "acme/blog/comments",
            RawReferenceDefinition::new(
                StoreType::DataStore,
                Some("Comments"),
                StoreType::DataStore,
                Some("Posts"),
                Cardinality::ManyToOne,
            ),
        );
        assert_eq!(def.cardinality, Cardinality::OneToMany);
        assert_eq!(def.source.store_code.as_deref(), Some("Posts"));
        assert_eq!(def.target.store_code.as_deref(), Some("Comments"));
    }

    #[test]
    fn resolves_sides() {
        let def = author_of();
        assert_eq!(def.resolve_side(ObjectKind::User, "acme/blog/authors").unwrap(), Side::Source);
        assert_eq!(def.resolve_side(ObjectKind::Data, "acme/blog/posts").unwrap(), Side::Target);
        assert!(def.resolve_side(ObjectKind::Data, "acme/blog/pages").is_err());
        assert!(def.resolve_side(ObjectKind::Project, "acme/blog/posts").is_err());
    }

    #[test]
    fn null_store_matches_any_store_of_kind() {
        let def = ReferenceDefinition::normalize(
            "acme/blog/likes",
            RawReferenceDefinition::new(
                StoreType::UserStore,
                None,
                StoreType::DataStore,
                None,
                Cardinality::ManyToMany,
            ),
        );
        assert_eq!(def.resolve_side(ObjectKind::User, "other/lib/people").unwrap(), Side::Source);
        assert_eq!(def.resolve_side(ObjectKind::Data, "acme/blog/pages").unwrap(), Side::Target);
        assert_eq!(def.opposite(Side::Source, "acme/blog/authors"), (ObjectKind::Data, None));
    }

    #[test]
    fn same_store_resolves_to_source() {
        let def = ReferenceDefinition::normalize(
            "acme/blog/related",
            RawReferenceDefinition::new(
                StoreType::DataStore,
                Some("Posts"),
                StoreType::DataStore,
                Some("Posts"),
                Cardinality::ManyToMany,
            ),
        );
        assert_eq!(def.resolve_side(ObjectKind::Data, "acme/blog/posts").unwrap(), Side::Source);
    }

    #[test]
    fn opposite_store_is_qualified() {
        let def = author_of();
        assert_eq!(
            def.opposite(Side::Source, "acme/blog/authors"),
            (ObjectKind::Data, Some("acme/blog/posts".to_string()))
        );
    }
}
