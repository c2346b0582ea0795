//! Engine configuration.

use std::path::{Path, PathBuf};

/// How the engine treats codes that have no schema entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaPolicy {
    /// Undefined reference codes pass validation unchecked and undeclared
    /// custom types are accepted as given.
    #[default]
    Permissive,
    /// Undefined reference codes fail with `ReferenceNotFound` and
    /// undeclared custom types with `TypeNotFound`.
    Strict,
}

/// Configuration for an [`Engine`](crate::Engine).
///
/// The read/write switches are the only thing controlling I/O. With both
/// disabled (the default) the engine is purely in-memory.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Whether a prior snapshot may be loaded.
    pub read_enabled: bool,

    /// Whether snapshots, legacy record files and uploaded assets are written.
    pub write_enabled: bool,

    /// Directory holding `saved.json`, legacy record files and assets.
    pub storage_dir: Option<PathBuf>,

    /// Public path segment used in property asset URLs.
    pub project_path: String,

    /// Treatment of undefined references and undeclared types.
    pub schema_policy: SchemaPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            read_enabled: false,
            write_enabled: false,
            storage_dir: None,
            project_path: String::new(),
            schema_policy: SchemaPolicy::Permissive,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether snapshots may be read.
    #[must_use]
    pub const fn read_enabled(mut self, value: bool) -> Self {
        self.read_enabled = value;
        self
    }

    /// Sets whether snapshots and assets may be written.
    #[must_use]
    pub const fn write_enabled(mut self, value: bool) -> Self {
        self.write_enabled = value;
        self
    }

    /// Sets the storage directory.
    #[must_use]
    pub fn storage_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.storage_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Sets the public project path used in asset URLs.
    #[must_use]
    pub fn project_path(mut self, path: impl Into<String>) -> Self {
        self.project_path = path.into();
        self
    }

    /// Sets the schema policy.
    #[must_use]
    pub const fn schema_policy(mut self, policy: SchemaPolicy) -> Self {
        self.schema_policy = policy;
        self
    }

    /// Returns whether any persistence I/O is allowed.
    #[must_use]
    pub const fn persistence_enabled(&self) -> bool {
        self.read_enabled || self.write_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert!(!config.read_enabled);
        assert!(!config.write_enabled);
        assert!(!config.persistence_enabled());
        assert!(config.storage_dir.is_none());
        assert_eq!(config.schema_policy, SchemaPolicy::Permissive);
    }

    #[test]
    fn builder_pattern() {
        let config = EngineConfig::new()
            .read_enabled(true)
            .storage_dir("/tmp/sim")
            .project_path("acme/blog")
            .schema_policy(SchemaPolicy::Strict);

        assert!(config.read_enabled);
        assert!(!config.write_enabled);
        assert!(config.persistence_enabled());
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/sim")));
        assert_eq!(config.project_path, "acme/blog");
        assert_eq!(config.schema_policy, SchemaPolicy::Strict);
    }
}
