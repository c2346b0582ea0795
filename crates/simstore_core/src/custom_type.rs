//! Custom record types.
//!
//! Projects declare custom types per kind (`CustomTypes/Data/Article.*`).
//! A record created with a type records its qualified tag
//! (`acme/blog/Data/Article`); records created without one carry a base tag.

use crate::config::SchemaPolicy;
use crate::error::{CoreError, CoreResult};
use crate::types::ObjectKind;
use std::collections::BTreeMap;
use tracing::debug;

/// Tag of data records created without a custom type.
pub const BASE_DATA_TYPE: &str = "DataRecord";

/// Tag of users created without a custom type.
pub const BASE_USER_TYPE: &str = "User";

/// Tag of groups created without a custom type.
pub const BASE_GROUP_TYPE: &str = "Group";

/// A declared custom type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// Kind of record the type applies to.
    pub kind: ObjectKind,
    /// Namespace path of the declaring project.
    pub project: String,
    /// Type name as declared.
    pub code: String,
}

impl TypeInfo {
    /// Returns the qualified tag of this type.
    #[must_use]
    pub fn tag(&self) -> String {
        type_tag(&self.project, self.kind, &self.code)
    }
}

fn type_tag(project: &str, kind: ObjectKind, code: &str) -> String {
    format!("{project}/{}/{code}", kind.dir_name())
}

/// Declared custom types keyed by qualified tag.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, TypeInfo>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a type and returns its tag.
    pub fn declare(&mut self, kind: ObjectKind, project: &str, code: &str) -> String {
        let info = TypeInfo {
            kind,
            project: project.to_string(),
            code: code.to_string(),
        };
        let tag = info.tag();
        debug!(tag = %tag, "declared custom type");
        self.types.entry(tag.clone()).or_insert(info);
        tag
    }

    /// Looks up a type by tag.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&TypeInfo> {
        self.types.get(tag)
    }

    /// Resolves the tag a new record of `kind` in project `project` carries.
    ///
    /// Only the last path segment of `requested` names the type. No request
    /// yields the kind's base tag. Under the strict policy an undeclared
    /// type fails with `TypeNotFound`; otherwise its tag is used as given.
    pub fn resolve(
        &self,
        kind: ObjectKind,
        project: &str,
        requested: Option<&str>,
        base: &str,
        policy: SchemaPolicy,
    ) -> CoreResult<String> {
        let Some(requested) = requested.filter(|r| !r.is_empty()) else {
            return Ok(base.to_string());
        };
        let name = requested
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(requested);
        if name == base {
            return Ok(base.to_string());
        }

        let tag = type_tag(project, kind, name);
        if self.types.contains_key(&tag) || policy == SchemaPolicy::Permissive {
            Ok(tag)
        } else {
            Err(CoreError::TypeNotFound { tag })
        }
    }

    /// Iterates over declared types.
    pub fn iter(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.values()
    }

    /// Returns the number of declared types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no type is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
