// config.rs - Environment settings and fixture manifests
//
// `FixtureConfig` reads the process environment (after loading a `.env` file
// if one exists). `FixtureManifest` is a JSON description of data-backed
// fixtures, so a suite can declare tables and data files without writing a
// Rust type per fixture.
//
// Example manifest:
//
// {
//   "data_dir": "data",
//   "fixtures": {
//     "UserFixture": { "table": "users", "data_file": "users.json" },
//     "PostFixture": { "table": "posts", "data_file": "posts.json", "depends": ["UserFixture"] }
//   }
// }

use crate::active::{ActiveFixture, DEFAULT_PRIMARY_KEY};
use crate::declaration::{Declaration, Declarations};
use crate::error::FixtureResult;
use crate::fixture::{Fixture, FixtureId};
use crate::registry::FixtureRegistry;
use crate::source::{DataSource, JsonFileSource};
use crate::storage::Storage;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const DATA_DIR_VAR: &str = "FIXTURE_DATA_DIR";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const DEFAULT_DATA_DIR: &str = "tests/fixtures/data";

/// Settings taken from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureConfig {
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            database_url: None,
        }
    }
}

impl FixtureConfig {
    /// Load `.env` if present, then read `FIXTURE_DATA_DIR` and `DATABASE_URL`.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let data_dir = env::var(DATA_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));
        let database_url = env::var(DATABASE_URL_VAR).ok().filter(|url| !url.is_empty());

        Self {
            data_dir,
            database_url,
        }
    }

    pub fn data_source(&self) -> JsonFileSource {
        JsonFileSource::new(&self.data_dir)
    }
}

fn default_primary_key() -> String {
    DEFAULT_PRIMARY_KEY.to_string()
}

/// One data-backed fixture in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<String>,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
}

impl ManifestEntry {
    fn build(&self, id: &FixtureId, storage: Rc<dyn Storage>, source: Rc<dyn DataSource>) -> ActiveFixture {
        let mut fixture = ActiveFixture::new(id.clone(), storage, source)
            .table(&self.table)
            .primary_key(&self.primary_key);
        if let Some(data_file) = &self.data_file {
            fixture = fixture.data_file(data_file);
        }
        self.depends
            .iter()
            .fold(fixture, |fixture, dependency| fixture.depends_on(dependency.as_str()))
    }
}

/// JSON manifest of data-backed fixtures, keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub fixtures: IndexMap<String, ManifestEntry>,
}

impl FixtureManifest {
    pub fn from_json(json: &str) -> FixtureResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a manifest file. A relative `data_dir` is taken relative to the
    /// manifest's own directory.
    pub fn from_path(path: impl AsRef<Path>) -> FixtureResult<Self> {
        let path = path.as_ref();
        let mut manifest = Self::from_json(&fs::read_to_string(path)?)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        manifest.data_dir = Some(match manifest.data_dir.take() {
            Some(dir) if dir.is_relative() => base.join(dir),
            Some(dir) => dir,
            None => base.to_path_buf(),
        });
        Ok(manifest)
    }

    /// Data source rooted at the manifest's data directory, or at
    /// `fallback` when the manifest names none.
    pub fn data_source(&self, fallback: &Path) -> JsonFileSource {
        JsonFileSource::new(self.data_dir.as_deref().unwrap_or(fallback))
    }

    /// A registry with one `ActiveFixture` constructor per entry.
    pub fn registry(&self, storage: Rc<dyn Storage>, source: Rc<dyn DataSource>) -> FixtureRegistry {
        let mut registry = FixtureRegistry::new();
        for (name, entry) in &self.fixtures {
            let id = FixtureId::new(name);
            let entry = entry.clone();
            let storage = Rc::clone(&storage);
            let source = Rc::clone(&source);
            let key = id.clone();
            registry.register_with(key, move || {
                Ok(Box::new(entry.build(&id, Rc::clone(&storage), Rc::clone(&source))) as Box<dyn Fixture>)
            });
        }
        registry
    }

    /// Request every fixture in the manifest, in manifest order.
    pub fn declarations(&self) -> Declarations {
        self.fixtures.keys().map(|name| Declaration::id(name.as_str())).collect()
    }
}
