//! Projects, code qualification and schema loading.
//!
//! A project is a namespace (`Acme\Blog`) scoping stores, properties and
//! references. Internally it is addressed by its prefix (`acme-blog`) and
//! every code it owns is qualified with its namespace path (`acme/blog`):
//!
//! ```text
//! Acme\Blog  ->  prefix acme-blog  ->  store  acme/blog/posts
//!                                      prop   acme/blog/email
//!                                      ref    acme/blog/authorOf
//! ```
//!
//! Schema is read from a project directory laid out as:
//!
//! ```text
//! <project dir>/
//! ├─ Properties/{Data,User,Project}/<code>.json   {type, default}
//! ├─ Stores/{Data,User}/<Store>/<ref>.json        reference definitions
//! └─ CustomTypes/{Data,User}/<Type>.*             custom record types
//! ```

use crate::error::{CoreError, CoreResult};
use crate::property::PropertyDefinition;
use crate::reference::RawReferenceDefinition;
use crate::types::ObjectKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Generates the prefix of a project namespace.
///
/// `Acme\Blog` and `acme/blog` both become `acme-blog`.
#[must_use]
pub fn generate_prefix(namespace: &str) -> String {
    namespace
        .trim_matches(|c| c == '\\' || c == '/')
        .to_lowercase()
        .replace(['\\', '/'], "-")
}

/// Returns the namespace path (`acme/blog`) of a prefix (`acme-blog`).
#[must_use]
pub fn namespace_path(prefix: &str) -> String {
    prefix.replace('-', "/")
}

/// Qualifies a bare store or property name: `acme/blog` + `Posts` -> `acme/blog/posts`.
///
/// Names that already contain a `/` are returned lowercased but otherwise unchanged.
#[must_use]
pub fn qualify(namespace_path: &str, name: &str) -> String {
    if name.contains('/') {
        name.to_lowercase()
    } else {
        format!("{namespace_path}/{}", name.to_lowercase())
    }
}

/// Qualifies a reference code. Reference codes keep their case.
#[must_use]
pub fn qualify_reference(namespace_path: &str, code: &str) -> String {
    if code.contains('/') {
        code.to_string()
    } else {
        format!("{namespace_path}/{code}")
    }
}

/// Returns the namespace path part of a qualified code (`acme/blog/posts` -> `acme/blog`).
#[must_use]
pub fn namespace_of(code: &str) -> &str {
    code.rsplit_once('/').map_or("", |(ns, _)| ns)
}

/// Returns the prefix of the project owning a qualified code.
#[must_use]
pub fn prefix_of(code: &str) -> String {
    namespace_of(code).replace('/', "-")
}

/// Returns the unqualified tail of a code (`acme/blog/email` -> `email`).
#[must_use]
pub fn unqualified(code: &str) -> &str {
    code.rsplit_once('/').map_or(code, |(_, tail)| tail)
}

/// A project to load: its namespace and source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSource {
    /// Namespace as written by the project (`Acme\Blog`).
    pub namespace: String,
    /// Directory holding `Properties/`, `Stores/` and `CustomTypes/`.
    pub dir: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct ComposerManifest {
    #[serde(default)]
    require: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "require-dev")]
    require_dev: BTreeMap<String, serde_json::Value>,
}

impl ProjectSource {
    /// Creates a project source.
    pub fn new(namespace: impl Into<String>, dir: impl AsRef<Path>) -> Self {
        Self {
            namespace: namespace.into(),
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Returns this project followed by its dependency projects.
    ///
    /// Dependencies come from `<package_root>/composer.json` (`require` and
    /// `require-dev`); each `vendor/<package>/src` directory that exists is
    /// loaded as a project whose namespace is the package name. A missing
    /// `composer.json` means no dependencies.
    pub fn with_dependencies(self, package_root: &Path) -> CoreResult<Vec<Self>> {
        let mut sources = vec![self];
        let composer = package_root.join("composer.json");
        if !composer.is_file() {
            return Ok(sources);
        }

        let manifest: ComposerManifest = serde_json::from_slice(&fs::read(&composer)?)?;
        for package in manifest.require.keys().chain(manifest.require_dev.keys()) {
            let dir = package_root.join("vendor").join(package).join("src");
            if dir.is_dir() {
                debug!(package = %package, "found dependency project");
                sources.push(Self::new(package.replace('/', "\\"), dir));
            }
        }
        Ok(sources)
    }
}

/// A loaded project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    /// Namespace as written by the project.
    pub namespace: String,
    /// Generated prefix (`acme-blog`).
    pub prefix: String,
    /// Namespace path used to qualify codes (`acme/blog`).
    pub path: String,
    /// Source directory, if the project was loaded from disk.
    pub dir: Option<PathBuf>,
}

/// Projects known to an engine, keyed by prefix.
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    projects: BTreeMap<String, ProjectInfo>,
    primary: Option<String>,
}

impl ProjectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a project and returns its prefix.
    ///
    /// The first project registered becomes the primary project, against
    /// which bare store codes are qualified. Registering an existing
    /// project keeps the first registration, filling in a missing directory.
    pub fn register(&mut self, namespace: &str, dir: Option<&Path>) -> String {
        let prefix = generate_prefix(namespace);
        let info = self
            .projects
            .entry(prefix.clone())
            .or_insert_with(|| ProjectInfo {
                namespace: namespace.to_string(),
                prefix: prefix.clone(),
                path: namespace_path(&prefix),
                dir: None,
            });
        if info.dir.is_none() {
            info.dir = dir.map(Path::to_path_buf);
        }
        if self.primary.is_none() {
            self.primary = Some(prefix.clone());
        }
        prefix
    }

    /// Looks up a project by prefix.
    #[must_use]
    pub fn get(&self, prefix: &str) -> Option<&ProjectInfo> {
        self.projects.get(prefix)
    }

    /// Returns the primary project.
    #[must_use]
    pub fn primary(&self) -> Option<&ProjectInfo> {
        self.primary.as_deref().and_then(|p| self.projects.get(p))
    }

    /// Resolves the project a code belongs to.
    ///
    /// Accepts a namespace (`Acme\Blog`), a prefix (`acme-blog`), a
    /// namespace path (`acme/blog`) or any code qualified by the project.
    pub fn resolve(&self, code: &str) -> CoreResult<&ProjectInfo> {
        let direct = generate_prefix(code);
        if let Some(info) = self.projects.get(&direct) {
            return Ok(info);
        }
        let owner = prefix_of(code);
        self.projects
            .get(&owner)
            .ok_or(CoreError::ProjectNotFound { prefix: owner })
    }

    /// Qualifies a store code against the primary project if it is bare.
    pub fn qualify_store(&self, code: &str) -> CoreResult<String> {
        if code.contains('/') {
            return Ok(code.to_lowercase());
        }
        let primary = self.primary().ok_or_else(|| CoreError::ProjectNotFound {
            prefix: String::new(),
        })?;
        Ok(qualify(&primary.path, code))
    }

    /// Iterates over all projects.
    pub fn iter(&self) -> impl Iterator<Item = &ProjectInfo> {
        self.projects.values()
    }

    /// Returns the number of projects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Returns true if no project is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// Schema read from a project directory, with every code qualified.
#[derive(Debug, Clone, Default)]
pub struct ProjectSchema {
    /// Property definitions per object kind.
    pub properties: Vec<(ObjectKind, String, PropertyDefinition)>,
    /// Qualified data store codes.
    pub data_stores: Vec<String>,
    /// Qualified user store codes.
    pub user_stores: Vec<String>,
    /// Reference definitions keyed by qualified code.
    pub references: Vec<(String, RawReferenceDefinition)>,
    /// Declared custom types.
    pub types: Vec<(ObjectKind, String)>,
}

impl ProjectSchema {
    /// Reads the schema of the project rooted at `dir`.
    ///
    /// Missing directories are treated as empty. Hidden files and files
    /// without a `.json` extension are skipped in definition directories.
    pub fn scan(dir: &Path, namespace_path: &str) -> CoreResult<Self> {
        let mut schema = Self::default();

        for kind in [ObjectKind::Data, ObjectKind::User, ObjectKind::Project] {
            let prop_dir = dir.join("Properties").join(kind.dir_name());
            for (stem, path) in json_files(&prop_dir)? {
                let def: PropertyDefinition = read_definition(&path)?;
                schema
                    .properties
                    .push((kind, qualify(namespace_path, &stem), def));
            }
        }

        for kind in [ObjectKind::Data, ObjectKind::User] {
            let stores_dir = dir.join("Stores").join(kind.dir_name());
            for store_dir in sorted_entries(&stores_dir)?
                .into_iter()
                .filter(|p| p.is_dir())
            {
                let name = file_name(&store_dir);
                let code = qualify(namespace_path, &name);
                match kind {
                    ObjectKind::Data => schema.data_stores.push(code),
                    _ => schema.user_stores.push(code),
                }

                for (stem, path) in json_files(&store_dir)? {
                    let def: RawReferenceDefinition = read_definition(&path)?;
                    schema
                        .references
                        .push((qualify_reference(namespace_path, &stem), def));
                }
            }
        }

        for kind in [ObjectKind::Data, ObjectKind::User] {
            let types_dir = dir.join("CustomTypes").join(kind.dir_name());
            for path in sorted_entries(&types_dir)? {
                let name = file_name(&path);
                if name.starts_with('.') || !path.is_file() {
                    continue;
                }
                let stem = name.split('.').next().unwrap_or_default().to_string();
                schema.types.push((kind, stem));
            }
        }

        debug!(
            dir = %dir.display(),
            properties = schema.properties.len(),
            stores = schema.data_stores.len() + schema.user_stores.len(),
            references = schema.references.len(),
            "scanned project schema"
        );
        Ok(schema)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lists a directory sorted by name; a missing directory is empty.
pub(crate) fn sorted_entries(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();
    Ok(entries)
}

fn json_files(dir: &Path) -> CoreResult<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for path in sorted_entries(dir)? {
        let name = file_name(&path);
        if name.starts_with('.') || !path.is_file() {
            continue;
        }
        match name.strip_suffix(".json") {
            Some(stem) => files.push((stem.to_string(), path)),
            None => debug!(file = %path.display(), "skipping non-definition file"),
        }
    }
    Ok(files)
}

fn read_definition<T: serde::de::DeserializeOwned>(path: &Path) -> CoreResult<T> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        warn!(file = %path.display(), error = %e, "malformed definition file");
        CoreError::invalid_definition(format!("{}: {e}", path.display()))
    })
}
