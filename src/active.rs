// active.rs - A fixture backed by rows in a table
//
// `ActiveFixture` owns an ordered alias -> row mapping. On load it clears its
// table, inserts every row from its data source and keeps each row together
// with its generated primary key. On unload it clears the table and forgets
// the rows.
//
// The table and the data source are collaborators handed in at construction;
// the fixture checks the table exists before touching it.

use crate::error::{FixtureError, FixtureResult};
use crate::fixture::{Fixture, FixtureId};
use crate::source::{DataSource, Rows};
use crate::storage::{Row, Storage};
use serde_json::Value;
use std::fmt;
use std::ops::Index;
use std::rc::Rc;

/// Default primary key column merged into every loaded row.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Data-backed fixture.
pub struct ActiveFixture {
    id: FixtureId,
    table: Option<String>,
    data_file: Option<String>,
    primary_key: String,
    depends: Vec<FixtureId>,
    storage: Rc<dyn Storage>,
    source: Rc<dyn DataSource>,
    data: Rows,
}

impl ActiveFixture {
    pub fn new(id: impl Into<FixtureId>, storage: Rc<dyn Storage>, source: Rc<dyn DataSource>) -> Self {
        Self {
            id: id.into(),
            table: None,
            data_file: None,
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            depends: Vec::new(),
            storage,
            source,
            data: Rows::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn data_file(mut self, reference: impl Into<String>) -> Self {
        self.data_file = Some(reference.into());
        self
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    pub fn depends_on(mut self, fixture: impl Into<FixtureId>) -> Self {
        self.depends.push(fixture.into());
        self
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn data_file_name(&self) -> Option<&str> {
        self.data_file.as_deref()
    }

    pub fn primary_key_column(&self) -> &str {
        &self.primary_key
    }

    /// Rows currently loaded, each carrying its generated key.
    pub fn data(&self) -> &Rows {
        &self.data
    }

    pub fn row(&self, alias: &str) -> Option<&Row> {
        self.data.get(alias)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Row> {
        self.data.iter()
    }

    /// Rows to insert. No data file means no rows; a data file the source
    /// does not know is a configuration error.
    pub fn fetch_data(&self) -> FixtureResult<Rows> {
        let Some(reference) = self.data_file.as_deref() else {
            return Ok(Rows::new());
        };

        self.source
            .fetch(reference)?
            .ok_or_else(|| FixtureError::MissingDataFile {
                reference: reference.to_string(),
            })
    }

    /// The configured table, verified to exist in storage.
    pub fn checked_table(&self) -> FixtureResult<&str> {
        let table = self.table.as_deref().ok_or_else(|| FixtureError::MissingTable {
            fixture: self.id.to_string(),
        })?;

        if !self.storage.table_exists(table)? {
            return Err(FixtureError::TableNotFound {
                table: table.to_string(),
            });
        }
        Ok(table)
    }

    /// Remove every row from the fixture's table.
    pub fn reset_table(&self) -> FixtureResult<()> {
        let table = self.checked_table()?;
        self.storage.clear(table)
    }
}

fn expect_string(fixture: &FixtureId, field: &str, value: &Value) -> FixtureResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| FixtureError::invalid_field(fixture, field, format!("expected a string, found {}", value)))
}

impl Fixture for ActiveFixture {
    fn identifier(&self) -> FixtureId {
        self.id.clone()
    }

    fn depends(&self) -> Vec<FixtureId> {
        self.depends.clone()
    }

    fn configure(&mut self, field: &str, value: &Value) -> FixtureResult<()> {
        match field {
            "table" => {
                self.table = match value {
                    Value::Null => None,
                    other => Some(expect_string(&self.id, field, other)?),
                };
            }
            "data_file" => {
                self.data_file = match value {
                    Value::Null | Value::Bool(false) => None,
                    other => Some(expect_string(&self.id, field, other)?),
                };
            }
            "primary_key" => {
                self.primary_key = expect_string(&self.id, field, value)?;
            }
            "depends" => {
                let items = value.as_array().ok_or_else(|| {
                    FixtureError::invalid_field(&self.id, field, "expected an array of identifiers")
                })?;
                self.depends = items
                    .iter()
                    .map(|item| expect_string(&self.id, field, item).map(FixtureId::new))
                    .collect::<FixtureResult<_>>()?;
            }
            _ => {
                return Err(FixtureError::UnknownField {
                    fixture: self.id.to_string(),
                    field: field.to_string(),
                })
            }
        }
        Ok(())
    }

    fn load(&mut self) -> FixtureResult<()> {
        self.data.clear();
        let rows = self.fetch_data()?;
        let table = self.checked_table()?.to_string();
        self.storage.clear(&table)?;

        for (alias, mut row) in rows {
            let key = self.storage.insert(&table, &self.primary_key, &row)?;
            row.insert(self.primary_key.clone(), key);
            self.data.insert(alias, row);
        }

        tracing::debug!(fixture = %self.id, table = %table, rows = self.data.len(), "fixture rows inserted");
        Ok(())
    }

    fn unload(&mut self) -> FixtureResult<()> {
        self.reset_table()?;
        self.data.clear();
        Ok(())
    }
}

impl fmt::Debug for ActiveFixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveFixture")
            .field("id", &self.id)
            .field("table", &self.table)
            .field("data_file", &self.data_file)
            .field("primary_key", &self.primary_key)
            .field("depends", &self.depends)
            .field("data", &self.data)
            .finish()
    }
}

impl Index<&str> for ActiveFixture {
    type Output = Row;

    fn index(&self, alias: &str) -> &Row {
        &self.data[alias]
    }
}

impl<'a> IntoIterator for &'a ActiveFixture {
    type Item = (&'a String, &'a Row);
    type IntoIter = indexmap::map::Iter<'a, String, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn users(storage: &Rc<MemoryStorage>) -> ActiveFixture {
        let source = MemorySource::new()
            .with_json("users.json", json!([{"email": "a@x.com"}, {"email": "b@x.com"}]))
            .unwrap();
        ActiveFixture::new("UserFixture", storage.clone(), Rc::new(source))
            .table("users")
            .data_file("users.json")
    }

    #[test]
    fn test_load_merges_generated_keys() {
        let storage = Rc::new(MemoryStorage::new().with_table("users"));
        let mut fixture = users(&storage);
        fixture.load().unwrap();

        assert_eq!(fixture.len(), 2);
        assert_eq!(fixture["0"], *json!({"email": "a@x.com", "id": 1}).as_object().unwrap());
        assert_eq!(fixture.row("1").unwrap().get("id"), Some(&json!(2)));
        assert_eq!(storage.count("users").unwrap(), 2);
    }

    #[test]
    fn test_unload_empties_data_and_table() {
        let storage = Rc::new(MemoryStorage::new().with_table("users"));
        let mut fixture = users(&storage);
        fixture.load().unwrap();
        fixture.unload().unwrap();

        assert!(fixture.is_empty());
        assert_eq!(storage.count("users").unwrap(), 0);
    }

    #[test]
    fn test_reload_does_not_duplicate_rows() {
        let storage = Rc::new(MemoryStorage::new().with_table("users"));
        let mut fixture = users(&storage);
        fixture.load().unwrap();
        fixture.load().unwrap();
        assert_eq!(storage.count("users").unwrap(), 2);
        assert_eq!(fixture.len(), 2);
    }

    #[test]
    fn test_missing_table_is_config_error() {
        let storage = Rc::new(MemoryStorage::new());
        let err = users(&storage).load().unwrap_err();
        assert!(matches!(err, FixtureError::TableNotFound { ref table } if table == "users"));

        let mut fixture = ActiveFixture::new("Bare", storage, Rc::new(MemorySource::new()));
        assert!(matches!(fixture.load(), Err(FixtureError::MissingTable { .. })));
    }

    #[test]
    fn test_missing_data_file_is_config_error() {
        let storage = Rc::new(MemoryStorage::new().with_table("users"));
        let mut fixture = users(&storage).data_file("user.json");
        let err = fixture.load().unwrap_err();
        assert!(matches!(err, FixtureError::MissingDataFile { ref reference } if reference == "user.json"));
    }

    #[test]
    fn test_disabled_data_file_loads_nothing() {
        let storage = Rc::new(MemoryStorage::new().with_table("users"));
        let mut fixture = users(&storage);
        fixture.configure("data_file", &json!(false)).unwrap();
        fixture.load().unwrap();
        assert!(fixture.is_empty());
    }

    #[test]
    fn test_configure_fields() {
        let storage = Rc::new(MemoryStorage::new());
        let mut fixture = ActiveFixture::new("Posts", storage, Rc::new(MemorySource::new()));

        fixture.configure("table", &json!("posts")).unwrap();
        fixture.configure("primary_key", &json!("post_id")).unwrap();
        fixture.configure("depends", &json!(["::UserFixture"])).unwrap();

        assert_eq!(fixture.table_name(), Some("posts"));
        assert_eq!(fixture.primary_key_column(), "post_id");
        assert_eq!(fixture.depends(), vec![FixtureId::new("UserFixture")]);

        assert!(matches!(
            fixture.configure("table", &json!(3)),
            Err(FixtureError::InvalidField { .. })
        ));
        assert!(matches!(
            fixture.configure("colour", &json!("red")),
            Err(FixtureError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_iteration_follows_data_order() {
        let storage = Rc::new(MemoryStorage::new().with_table("users"));
        let mut fixture = users(&storage);
        fixture.load().unwrap();

        let emails: Vec<_> = (&fixture)
            .into_iter()
            .map(|(_, row)| row["email"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(emails, vec!["a@x.com", "b@x.com"]);
    }
}
