// source.rs - Where a data-backed fixture gets its rows
//
// A `DataSource` turns a reference (usually a file name) into an ordered
// alias -> row mapping, or reports that the reference does not exist.
//
// JSON data files hold either an object (alias -> row) or an array of rows,
// in which case the aliases are the array indices.

use crate::error::{FixtureError, FixtureResult};
use crate::storage::Row;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Alias -> row, in file order.
pub type Rows = IndexMap<String, Row>;

/// Data-source collaborator used by data-backed fixtures.
pub trait DataSource {
    /// Rows for `reference`, or `None` if there is no such reference.
    fn fetch(&self, reference: &str) -> FixtureResult<Option<Rows>>;
}

impl<F> DataSource for F
where
    F: Fn(&str) -> FixtureResult<Option<Rows>>,
{
    fn fetch(&self, reference: &str) -> FixtureResult<Option<Rows>> {
        self(reference)
    }
}

/// Reads JSON data files relative to a root directory.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    root: PathBuf,
}

impl JsonFileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute references are used as-is; relative ones are joined to the root.
    pub fn resolve_path(&self, reference: &str) -> PathBuf {
        let path = Path::new(reference);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl DataSource for JsonFileSource {
    fn fetch(&self, reference: &str) -> FixtureResult<Option<Rows>> {
        let path = self.resolve_path(reference);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "fixture data file not found");
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&contents)?;
        rows_from_value(reference, value).map(Some)
    }
}

/// Named row sets held in memory, handy for generated data.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sets: HashMap<String, Rows>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, reference: impl Into<String>, rows: Rows) -> Self {
        self.sets.insert(reference.into(), rows);
        self
    }

    /// Add a row set from a JSON object or array, as in a data file.
    pub fn with_json(self, reference: impl Into<String>, value: Value) -> FixtureResult<Self> {
        let reference = reference.into();
        let rows = rows_from_value(&reference, value)?;
        Ok(self.with_rows(reference, rows))
    }
}

impl DataSource for MemorySource {
    fn fetch(&self, reference: &str) -> FixtureResult<Option<Rows>> {
        Ok(self.sets.get(reference).cloned())
    }
}

/// Interpret a JSON document as fixture rows.
pub fn rows_from_value(reference: &str, value: Value) -> FixtureResult<Rows> {
    let entries: Vec<(String, Value)> = match value {
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, row)| (index.to_string(), row))
            .collect(),
        other => {
            return Err(FixtureError::InvalidData {
                reference: reference.to_string(),
                reason: format!("expected an object or an array, found {}", other),
            })
        }
    };

    entries
        .into_iter()
        .map(|(alias, row)| match row {
            Value::Object(columns) => Ok((alias, columns)),
            other => Err(FixtureError::InvalidData {
                reference: reference.to_string(),
                reason: format!("row '{}' must be an object, found {}", alias, other),
            }),
        })
        .collect()
}
