//! Property schema.
//!
//! Properties are declared per project and object kind as `(code, type,
//! default)`. Values are stored on records only when set; reads fall back
//! to the declared default.

pub(crate) mod asset;
mod registry;

pub use asset::{UploadDescriptor, UploadTarget};
pub use registry::PropertyRegistry;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved user property routed to the user's first name.
pub const FIRST_NAME: &str = "__first-name__";

/// Reserved user property routed to the user's last name.
pub const LAST_NAME: &str = "__last-name__";

/// Declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// Free text.
    Text,
    /// Rich text.
    Html,
    /// Integer number.
    Integer,
    /// Floating point number.
    Number,
    /// Boolean flag.
    Boolean,
    /// Date/time string.
    Datetime,
    /// One of a set of options.
    Selection,
    /// Value unique within the store (or project).
    Unique,
    /// Image asset.
    Image,
    /// File asset.
    File,
}

impl PropertyType {
    /// Returns true for asset-backed types whose values are public paths.
    #[must_use]
    pub const fn is_asset(self) -> bool {
        matches!(self, Self::Image | Self::File)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Html => "html",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Selection => "selection",
            Self::Unique => "unique",
            Self::Image => "image",
            Self::File => "file",
        };
        f.write_str(name)
    }
}

/// A property definition as stored in `Properties/<Kind>/<code>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// Declared type.
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    /// Value returned when none is set.
    #[serde(default)]
    pub default: serde_json::Value,
}

impl PropertyDefinition {
    /// Creates a definition with a null default.
    #[must_use]
    pub fn new(property_type: PropertyType) -> Self {
        Self {
            property_type,
            default: serde_json::Value::Null,
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<serde_json::Value>) -> Self {
        self.default = default.into();
        self
    }
}

/// Key under which a value is tracked by a unique index.
///
/// Strings index by their content; other values by their JSON text.
#[must_use]
pub fn unique_key(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn definition_file_format() {
        let def: PropertyDefinition =
            serde_json::from_str(r#"{"type":"text","default":"hello"}"#).unwrap();
        assert_eq!(def.property_type, PropertyType::Text);
        assert_eq!(def.default, json!("hello"));

        let bare: PropertyDefinition = serde_json::from_str(r#"{"type":"image"}"#).unwrap();
        assert!(bare.default.is_null());
        assert!(bare.property_type.is_asset());
    }

    #[test]
    fn unknown_type_rejected() {
        assert!(serde_json::from_str::<PropertyDefinition>(r#"{"type":"blob"}"#).is_err());
    }

    #[test]
    fn unique_keys() {
        assert_eq!(unique_key(&json!("a@x.com")), "a@x.com");
        assert_eq!(unique_key(&json!(42)), "42");
    }
}
