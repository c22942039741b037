// lib.rs - Root module for the pg_fixtures library
//
// Test fixtures with declared dependencies. A test lists the fixtures it
// needs; the resolver expands their dependencies into a load order, and the
// manager loads, unloads and looks them up.
//
// Data-backed fixtures (`ActiveFixture`) fill a table from a JSON data file
// and keep the inserted rows, with their generated keys, for the test to use.

pub mod active;
pub mod config;
pub mod declaration;
pub mod error;
pub mod fixture;
pub mod manager;
pub mod registry;
pub mod resolver;
pub mod set;
pub mod source;
pub mod storage;

pub use active::ActiveFixture;
pub use config::{FixtureConfig, FixtureManifest, ManifestEntry};
pub use declaration::{Declaration, Declarations, Overrides};
pub use error::{ErrorKind, FixtureError, FixtureResult};
pub use fixture::{Fixture, FixtureId, FixtureState};
pub use manager::{with_fixtures, FixtureManager};
pub use registry::{FixtureFactory, FixtureRegistry};
pub use resolver::FixtureResolver;
pub use set::FixtureSet;
pub use source::{DataSource, JsonFileSource, MemorySource, Rows};
pub use storage::{MemoryStorage, Row, Storage};

#[cfg(feature = "db-tools")]
pub use storage::PgStorage;
