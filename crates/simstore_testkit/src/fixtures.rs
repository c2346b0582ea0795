//! Test fixtures and engine helpers.
//!
//! Provides project layouts written to temporary directories and engines
//! wired to them, plus the blog scenario most tests start from.

use simstore_core::{
    Cardinality, Engine, EngineConfig, ObjectKind, ProjectSource, PropertyDefinition,
    PropertyType, RawReferenceDefinition, StoreType,
};
use simstore_storage::InMemoryBackend;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for a project directory layout.
///
/// Writes `Properties/`, `Stores/` and `CustomTypes/` the way a project
/// ships them.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    namespace: String,
    files: Vec<(PathBuf, Vec<u8>)>,
    dirs: Vec<PathBuf>,
}

impl ProjectFixture {
    /// Starts an empty project.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            files: Vec::new(),
            dirs: Vec::new(),
        }
    }

    fn file(mut self, path: PathBuf, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push((path, contents.into()));
        self
    }

    /// Declares a property.
    pub fn property(self, kind: ObjectKind, code: &str, definition: &PropertyDefinition) -> Self {
        let json = serde_json::to_vec_pretty(definition).expect("Failed to encode property");
        let path = Path::new("Properties")
            .join(kind.dir_name())
            .join(format!("{code}.json"));
        self.file(path, json)
    }

    /// Ships a default asset next to the property definitions.
    pub fn asset(self, kind: ObjectKind, file_name: &str, bytes: &[u8]) -> Self {
        let path = Path::new("Properties").join(kind.dir_name()).join(file_name);
        self.file(path, bytes)
    }

    /// Declares a data store.
    pub fn data_store(mut self, name: &str) -> Self {
        self.dirs.push(Path::new("Stores/Data").join(name));
        self
    }

    /// Declares a user store.
    pub fn user_store(mut self, name: &str) -> Self {
        self.dirs.push(Path::new("Stores/User").join(name));
        self
    }

    /// Declares a reference in the directory of the store that owns it.
    pub fn reference(
        self,
        kind: ObjectKind,
        store: &str,
        code: &str,
        definition: &RawReferenceDefinition,
    ) -> Self {
        let json = serde_json::to_vec_pretty(definition).expect("Failed to encode reference");
        let path = Path::new("Stores")
            .join(kind.dir_name())
            .join(store)
            .join(format!("{code}.json"));
        self.file(path, json)
    }

    /// Declares a custom type.
    pub fn custom_type(self, kind: ObjectKind, name: &str) -> Self {
        let path = Path::new("CustomTypes")
            .join(kind.dir_name())
            .join(format!("{name}.type"));
        self.file(path, Vec::new())
    }

    /// Writes the layout into `root`.
    pub fn write_to(&self, root: &Path) {
        for dir in &self.dirs {
            fs::create_dir_all(root.join(dir)).expect("Failed to create store directory");
        }
        for (path, contents) in &self.files {
            let path = root.join(path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("Failed to create directory");
            }
            fs::write(&path, contents).expect("Failed to write fixture file");
        }
    }

    /// Writes the layout into a new temporary directory.
    pub fn build(&self) -> ProjectLayout {
        let dir = TempDir::new().expect("Failed to create temp directory");
        self.write_to(dir.path());
        ProjectLayout {
            source: ProjectSource::new(self.namespace.clone(), dir.path()),
            _dir: dir,
        }
    }
}

/// A project written to disk, removed when dropped.
#[derive(Debug)]
pub struct ProjectLayout {
    /// The project to load.
    pub source: ProjectSource,
    _dir: TempDir,
}

impl ProjectLayout {
    /// Returns the project directory.
    pub fn path(&self) -> &Path {
        &self.source.dir
    }
}

/// A test engine with automatic cleanup.
pub struct TestEngine {
    /// The engine instance.
    pub engine: Engine,
    /// Storage directory (kept alive to prevent cleanup).
    storage: Option<TempDir>,
    /// Loaded project layouts (kept alive to prevent cleanup).
    projects: Vec<ProjectLayout>,
}

impl TestEngine {
    /// Creates a purely in-memory engine with persistence disabled.
    pub fn memory() -> Self {
        Self {
            engine: Engine::new(EngineConfig::default()),
            storage: None,
            projects: Vec::new(),
        }
    }

    /// Creates an engine persisting to a shared in-memory backend.
    ///
    /// Engines built over clones of the same backend see each other's saves.
    pub fn shared(backend: &InMemoryBackend) -> Self {
        let config = EngineConfig::new().read_enabled(true).write_enabled(true);
        Self {
            engine: Engine::with_backend(config, Box::new(backend.clone())),
            storage: None,
            projects: Vec::new(),
        }
    }

    /// Creates an engine with reads and writes enabled on a temporary
    /// storage directory.
    pub fn file() -> Self {
        let storage = TempDir::new().expect("Failed to create temp directory");
        let engine = Engine::new(Self::file_config(storage.path()));
        Self {
            engine,
            storage: Some(storage),
            projects: Vec::new(),
        }
    }

    /// Configuration used by [`file`](Self::file) engines.
    pub fn file_config(storage: &Path) -> EngineConfig {
        EngineConfig::new()
            .read_enabled(true)
            .write_enabled(true)
            .storage_dir(storage)
    }

    /// Creates an in-memory engine with the given projects loaded.
    pub fn with_projects(projects: &[ProjectFixture]) -> Self {
        let mut test = Self::memory();
        for fixture in projects {
            test.load_fixture(fixture);
        }
        test
    }

    /// Writes a project layout and loads it into the engine.
    pub fn load_fixture(&mut self, fixture: &ProjectFixture) -> String {
        let layout = fixture.build();
        let prefix = self
            .engine
            .load_project(&layout.source)
            .expect("Failed to load project");
        self.projects.push(layout);
        prefix
    }

    /// Returns the storage directory if file-based.
    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage.as_ref().map(TempDir::path)
    }
}

impl std::ops::Deref for TestEngine {
    type Target = Engine;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

impl std::ops::DerefMut for TestEngine {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.engine
    }
}

/// Runs a test with a temporary in-memory engine.
pub fn with_temp_engine<F, R>(f: F) -> R
where
    F: FnOnce(&mut Engine) -> R,
{
    let mut test = TestEngine::memory();
    f(&mut test.engine)
}

/// Runs a test with an engine persisting to a temporary directory.
pub fn with_file_engine<F, R>(f: F) -> R
where
    F: FnOnce(&mut Engine, &Path) -> R,
{
    let mut test = TestEngine::file();
    let path = test
        .storage_dir()
        .expect("File engine should have a storage directory")
        .to_path_buf();
    f(&mut test.engine, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Namespace of the blog project.
    pub const BLOG: &str = "Proj";
    /// Qualified posts store.
    pub const POSTS: &str = "proj/posts";
    /// Qualified authors store.
    pub const AUTHORS: &str = "proj/authors";

    /// The blog project: `Posts` and `Authors` stores, a unique `email`
    /// on data records, a `title` with a default, `Article`/`Comment`
    /// types and a reference `authorOf` from authors to posts.
    pub fn blog_project(cardinality: Cardinality) -> ProjectFixture {
        ProjectFixture::new(BLOG)
            .data_store("Posts")
            .user_store("Authors")
            .property(
                ObjectKind::Data,
                "email",
                &PropertyDefinition::new(PropertyType::Unique),
            )
            .property(
                ObjectKind::Data,
                "title",
                &PropertyDefinition::new(PropertyType::Text).with_default("Untitled"),
            )
            .property(
                ObjectKind::User,
                "nickname",
                &PropertyDefinition::new(PropertyType::Unique),
            )
            .custom_type(ObjectKind::Data, "Article")
            .custom_type(ObjectKind::Data, "Comment")
            .reference(
                ObjectKind::User,
                "Authors",
                "authorOf",
                &RawReferenceDefinition::new(
                    StoreType::UserStore,
                    Some("Authors"),
                    StoreType::DataStore,
                    Some("Posts"),
                    cardinality,
                ),
            )
    }

    /// An in-memory engine with the blog project loaded.
    pub fn blog(cardinality: Cardinality) -> TestEngine {
        TestEngine::with_projects(&[blog_project(cardinality)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let layout = scenarios::blog_project(Cardinality::OneToOne).build();
        let root = layout.path();
        assert!(root.join("Stores/Data/Posts").is_dir());
        assert!(root.join("Stores/User/Authors/authorOf.json").is_file());
        assert!(root.join("Properties/Data/email.json").is_file());
        assert!(root.join("CustomTypes/Data/Article.type").is_file());
    }

    #[test]
    fn test_blog_engine() {
        let engine = scenarios::blog(Cardinality::OneToOne);
        assert!(engine.stores().data_store(scenarios::POSTS).is_ok());
        assert!(engine.stores().user_store(scenarios::AUTHORS).is_ok());
        assert!(engine.references().get("proj/authorOf").is_some());
    }

    #[test]
    fn test_shared_engine_reloads_saved_state() {
        let backend = InMemoryBackend::new();
        let mut engine = TestEngine::shared(&backend);
        let prefix = engine.load_fixture(&scenarios::blog_project(Cardinality::OneToOne));
        assert_eq!(prefix, "proj");
        engine
            .create_data_record(scenarios::POSTS, Some("Article"), None)
            .unwrap();
        assert!(engine.save().unwrap());

        let mut fresh = TestEngine::shared(&backend);
        assert!(fresh.load().unwrap());
        assert_eq!(fresh.snapshot(), engine.snapshot());
    }

    #[test]
    fn test_with_temp_engine() {
        let posts = with_temp_engine(|engine| engine.create_data_store("Proj", "Posts"));
        assert_eq!(posts, "proj/posts");
    }

    #[test]
    fn test_file_engine_has_storage() {
        with_file_engine(|engine, path| {
            assert!(path.is_dir());
            assert!(engine.config().write_enabled);
        });
    }
}
