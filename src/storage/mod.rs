// storage/mod.rs - Where data-backed fixtures put their rows
//
// A data-backed fixture never talks to a database directly. It is handed a
// `Storage` at construction and uses four operations:
// - table_exists: checked before every load/unload
// - clear: remove every row of a table
// - insert: add one row and hand back its generated key
// - count: used by tests to assert on the store
//
// Implementations:
// - memory.rs: in-process tables with auto-increment keys
// - postgres.rs: a PostgreSQL connection (feature `db-tools`)

use crate::error::FixtureResult;
use serde_json::Value;

pub mod memory;

#[cfg(feature = "db-tools")]
pub mod postgres;

pub use memory::MemoryStorage;

#[cfg(feature = "db-tools")]
pub use self::postgres::PgStorage;

/// One row: column name -> value.
pub type Row = serde_json::Map<String, Value>;

/// Storage collaborator used by data-backed fixtures.
///
/// Methods take `&self`; backends keep their own interior mutability so one
/// store can be shared by every fixture of a test context.
pub trait Storage {
    fn table_exists(&self, table: &str) -> FixtureResult<bool>;

    fn clear(&self, table: &str) -> FixtureResult<()>;

    /// Insert `row` and return the generated value of `primary_key`.
    fn insert(&self, table: &str, primary_key: &str, row: &Row) -> FixtureResult<Value>;

    fn count(&self, table: &str) -> FixtureResult<usize>;
}
