//! Engine facade.

mod properties;
mod records;
mod references;

use crate::config::{EngineConfig, SchemaPolicy};
use crate::custom_type::TypeRegistry;
use crate::error::{CoreError, CoreResult};
use crate::persistence::PersistenceManager;
use crate::project::{
    generate_prefix, namespace_path, qualify, qualify_reference, ProjectRegistry, ProjectSchema,
    ProjectSource,
};
use crate::property::{PropertyDefinition, PropertyRegistry, PropertyType, FIRST_NAME, LAST_NAME};
use crate::reference::{RawReferenceDefinition, ReferenceRegistry};
use crate::sequence::SequenceAllocator;
use crate::snapshot::{LegacyRecord, Snapshot};
use crate::store::StoreSet;
use crate::types::{EntityKind, ObjectKind, RecordId};
use simstore_storage::SnapshotBackend;
use std::path::Path;
use tracing::{debug, info};

/// The record-store engine.
///
/// `Engine` owns every loaded project's schema and stores, the id
/// sequences and the persistence switches. It is an explicit context:
/// collaborators hold a reference to it and there is no global instance.
///
/// # Lifecycle
///
/// ```text
/// new / open ──► load_project* ──► load ──► operations ... ──► save
/// ```
///
/// `load` restores a prior snapshot when reads are enabled; `save` writes
/// the whole aggregate when writes are enabled. With both switches off the
/// engine is purely in-memory.
///
/// # Codes
///
/// Store, property and reference codes are qualified with their project's
/// namespace path (`acme/blog/posts`). Operations accept bare codes:
/// stores qualify against the primary project, properties and references
/// against the namespace of the store they are used with.
///
/// # Example
///
/// ```rust
/// use simstore_core::{Engine, EngineConfig, ObjectKind, PropertyDefinition, PropertyType, Record};
/// use serde_json::json;
///
/// let mut engine = Engine::new(EngineConfig::default());
/// let posts = engine.create_data_store("Acme\\Blog", "Posts");
/// engine.register_property("Acme\\Blog", ObjectKind::Data, "title",
///     PropertyDefinition::new(PropertyType::Text).with_default("Untitled"));
///
/// let id = engine.create_data_record(&posts, None, None).unwrap().id();
/// let title = engine.get_property_value(ObjectKind::Data, &posts, &id, "title").unwrap();
/// assert_eq!(title, json!("Untitled"));
/// ```
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    sequences: SequenceAllocator,
    stores: StoreSet,
    projects: ProjectRegistry,
    properties: PropertyRegistry,
    references: ReferenceRegistry,
    types: TypeRegistry,
    persistence: PersistenceManager,
}

impl Engine {
    /// Creates an empty engine.
    ///
    /// With a storage directory configured the snapshot lives at
    /// `<storage_dir>/saved.json`.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let persistence = PersistenceManager::new(&config);
        Self::with_persistence(config, persistence)
    }

    /// Creates an empty engine persisting through `backend`.
    #[must_use]
    pub fn with_backend(config: EngineConfig, backend: Box<dyn SnapshotBackend>) -> Self {
        let persistence = PersistenceManager::with_backend(&config, backend);
        Self::with_persistence(config, persistence)
    }

    fn with_persistence(config: EngineConfig, persistence: PersistenceManager) -> Self {
        Self {
            config,
            sequences: SequenceAllocator::new(),
            stores: StoreSet::new(),
            projects: ProjectRegistry::new(),
            properties: PropertyRegistry::new(),
            references: ReferenceRegistry::new(),
            types: TypeRegistry::new(),
            persistence,
        }
    }

    /// Creates an engine, loads every project and then the snapshot.
    ///
    /// The first source is the primary project.
    pub fn open(config: EngineConfig, sources: &[ProjectSource]) -> CoreResult<Self> {
        let mut engine = Self::new(config);
        for source in sources {
            engine.load_project(source)?;
        }
        engine.load()?;
        Ok(engine)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the loaded projects.
    #[must_use]
    pub fn projects(&self) -> &ProjectRegistry {
        &self.projects
    }

    /// Returns the property schema.
    #[must_use]
    pub fn properties(&self) -> &PropertyRegistry {
        &self.properties
    }

    /// Returns the reference definitions.
    #[must_use]
    pub fn references(&self) -> &ReferenceRegistry {
        &self.references
    }

    /// Returns the declared custom types.
    #[must_use]
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Returns every store.
    #[must_use]
    pub fn stores(&self) -> &StoreSet {
        &self.stores
    }

    /// Returns the id sequences.
    #[must_use]
    pub fn sequences(&self) -> SequenceAllocator {
        self.sequences
    }

    fn policy(&self) -> SchemaPolicy {
        self.config.schema_policy
    }

    /// Registers a project and returns its prefix.
    ///
    /// Every project carries the user properties `__first-name__` and
    /// `__last-name__`, which read and write the user's names.
    pub fn register_project(&mut self, namespace: &str) -> String {
        self.register_project_at(namespace, None)
    }

    fn register_project_at(&mut self, namespace: &str, dir: Option<&Path>) -> String {
        let known = self.projects.get(&generate_prefix(namespace)).is_some();
        let prefix = self.projects.register(namespace, dir);
        if !known {
            let path = namespace_path(&prefix);
            for name in [FIRST_NAME, LAST_NAME] {
                self.properties.register(
                    &prefix,
                    ObjectKind::User,
                    qualify(&path, name),
                    PropertyDefinition::new(PropertyType::Text),
                );
            }
            debug!(prefix = %prefix, "registered project");
        }
        prefix
    }

    fn project_path(&mut self, namespace: &str) -> String {
        let prefix = self.register_project(namespace);
        namespace_path(&prefix)
    }

    /// Reads a project directory and registers its schema.
    ///
    /// Properties, stores, reference definitions and custom types are
    /// registered under the project; returns the project prefix.
    pub fn load_project(&mut self, source: &ProjectSource) -> CoreResult<String> {
        let prefix = self.register_project_at(&source.namespace, Some(&source.dir));
        let path = namespace_path(&prefix);
        let schema = ProjectSchema::scan(&source.dir, &path)?;

        for (kind, code, definition) in schema.properties {
            self.properties.register(&prefix, kind, code, definition);
        }
        for code in &schema.data_stores {
            self.stores.add_data_store(code);
        }
        for code in &schema.user_stores {
            self.stores.add_user_store(code);
        }
        for (code, definition) in schema.references {
            self.references.register(code, definition);
        }
        for (kind, name) in &schema.types {
            self.types.declare(*kind, &path, name);
        }

        info!(
            project = %prefix,
            data_stores = schema.data_stores.len(),
            user_stores = schema.user_stores.len(),
            types = schema.types.len(),
            "loaded project"
        );
        Ok(prefix)
    }

    /// Creates a data store in a project and returns its qualified code.
    pub fn create_data_store(&mut self, namespace: &str, name: &str) -> String {
        let code = qualify(&self.project_path(namespace), name);
        self.stores.add_data_store(&code);
        code
    }

    /// Creates a user store in a project and returns its qualified code.
    pub fn create_user_store(&mut self, namespace: &str, name: &str) -> String {
        let code = qualify(&self.project_path(namespace), name);
        self.stores.add_user_store(&code);
        code
    }

    /// Declares a property and returns its qualified code.
    ///
    /// The last declaration of a code wins.
    pub fn register_property(
        &mut self,
        namespace: &str,
        kind: ObjectKind,
        name: &str,
        definition: PropertyDefinition,
    ) -> String {
        let prefix = self.register_project(namespace);
        let code = qualify(&namespace_path(&prefix), name);
        self.properties.register(&prefix, kind, code.clone(), definition);
        code
    }

    /// Declares a reference and returns its qualified code.
    ///
    /// The first declaration of a code wins.
    pub fn register_reference(
        &mut self,
        namespace: &str,
        name: &str,
        definition: RawReferenceDefinition,
    ) -> String {
        let code = qualify_reference(&self.project_path(namespace), name);
        self.references.register(code.clone(), definition);
        code
    }

    /// Declares a custom type and returns its tag.
    pub fn declare_type(&mut self, namespace: &str, kind: ObjectKind, name: &str) -> String {
        let path = self.project_path(namespace);
        self.types.declare(kind, &path, name)
    }

    /// Qualifies a store code against the primary project if it is bare.
    pub fn store_code(&self, code: &str) -> CoreResult<String> {
        self.projects.qualify_store(code)
    }

    /// Restores the saved snapshot, if reads are enabled and one exists.
    ///
    /// Sequences only move forward. Stores already holding records are kept;
    /// the rest are filled from the snapshot. Returns true if a snapshot
    /// was found.
    pub fn load(&mut self) -> CoreResult<bool> {
        let Some(snapshot) = self.persistence.load()? else {
            return Ok(false);
        };
        for (kind, value) in [
            (EntityKind::DataRecord, snapshot.data_record_sequence),
            (EntityKind::User, snapshot.user_sequence),
            (EntityKind::Group, snapshot.user_group_sequence),
        ] {
            self.sequences.restore(kind, value);
        }
        self.stores.merge(snapshot.stores);
        Ok(true)
    }

    /// Saves the whole aggregate, if writes are enabled.
    ///
    /// Returns true if a snapshot was written.
    pub fn save(&mut self) -> CoreResult<bool> {
        self.persistence.save(&self.sequences, &self.stores)
    }

    /// Returns a copy of the current aggregate.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            data_record_sequence: self.sequences.current(EntityKind::DataRecord),
            user_sequence: self.sequences.current(EntityKind::User),
            user_group_sequence: self.sequences.current(EntityKind::Group),
            stores: self.stores.clone(),
        }
    }

    /// Writes every record of a data store as a legacy record file.
    ///
    /// Returns the number of files written; zero when writes are disabled.
    pub fn export_legacy_records(&self, store: &str) -> CoreResult<usize> {
        let code = self.store_code(store)?;
        self.persistence.write_legacy(self.stores.data_store(&code)?)
    }

    /// Reads a legacy record file, if reads are enabled and it exists.
    pub fn read_legacy_record(&self, store: &str, id: &RecordId) -> CoreResult<Option<LegacyRecord>> {
        let code = self.store_code(store)?;
        self.persistence.read_legacy(&code, id)
    }

    /// Record deletion is not offered; always fails with `Unsupported`.
    pub fn delete_record(&mut self, kind: ObjectKind, store: &str, id: &RecordId) -> CoreResult<()> {
        debug!(%kind, store, id = %id, "rejected record deletion");
        Err(CoreError::Unsupported {
            operation: "delete_record",
        })
    }
}
