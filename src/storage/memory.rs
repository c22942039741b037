// storage/memory.rs - In-process storage for tests and examples
//
// Tables must be created before use, mirroring a real schema. Keys come from a
// per-table counter that keeps counting after rows are cleared, like a SERIAL
// column does.

use super::{Row, Storage};
use crate::error::{FixtureError, FixtureResult};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Row>,
    next_key: i64,
}

/// Storage backed by in-memory tables.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RefCell<BTreeMap<String, Table>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table; existing tables are left alone.
    pub fn create_table(&self, table: &str) {
        self.tables.borrow_mut().entry(table.to_string()).or_default();
    }

    pub fn with_table(self, table: &str) -> Self {
        self.create_table(table);
        self
    }

    pub fn drop_table(&self, table: &str) {
        self.tables.borrow_mut().remove(table);
    }

    /// Snapshot of a table's rows, including generated keys.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .borrow()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Whether any row of `table` has `column` equal to `value`.
    pub fn has_row(&self, table: &str, column: &str, value: &Value) -> bool {
        self.tables
            .borrow()
            .get(table)
            .map(|t| t.rows.iter().any(|row| row.get(column) == Some(value)))
            .unwrap_or(false)
    }
}

impl Storage for MemoryStorage {
    fn table_exists(&self, table: &str) -> FixtureResult<bool> {
        Ok(self.tables.borrow().contains_key(table))
    }

    fn clear(&self, table: &str) -> FixtureResult<()> {
        let mut tables = self.tables.borrow_mut();
        let t = tables.get_mut(table).ok_or_else(|| FixtureError::TableNotFound {
            table: table.to_string(),
        })?;
        t.rows.clear();
        Ok(())
    }

    fn insert(&self, table: &str, primary_key: &str, row: &Row) -> FixtureResult<Value> {
        let mut tables = self.tables.borrow_mut();
        let t = tables.get_mut(table).ok_or_else(|| FixtureError::TableNotFound {
            table: table.to_string(),
        })?;

        let key = match row.get(primary_key) {
            Some(explicit) if !explicit.is_null() => explicit.clone(),
            _ => {
                t.next_key += 1;
                Value::from(t.next_key)
            }
        };

        let mut stored = row.clone();
        stored.insert(primary_key.to_string(), key.clone());
        t.rows.push(stored);
        Ok(key)
    }

    fn count(&self, table: &str) -> FixtureResult<usize> {
        self.tables
            .borrow()
            .get(table)
            .map(|t| t.rows.len())
            .ok_or_else(|| FixtureError::TableNotFound {
                table: table.to_string(),
            })
    }
}
