// storage/postgres.rs - PostgreSQL storage backend
//
// Uses the synchronous `postgres` client: fixture loading is a blocking,
// single-threaded operation, so there is no runtime to spin up.
//
// Rows arrive as JSON values. Each insert is prepared first so the server
// tells us the column types, and every value is converted to the matching
// Rust type before binding.

use super::{Row, Storage};
use crate::error::{FixtureError, FixtureResult};
use postgres::types::{ToSql, Type};
use postgres::{Client, NoTls};
use serde_json::Value;
use std::cell::RefCell;
use std::str::FromStr;

type Param = Box<dyn ToSql + Sync>;

/// Storage backed by a single PostgreSQL connection.
pub struct PgStorage {
    client: RefCell<Client>,
}

impl PgStorage {
    /// Connect using a `postgres://` URL.
    pub fn connect(database_url: &str) -> FixtureResult<Self> {
        let client = Client::connect(database_url, NoTls)?;
        tracing::info!("Connected to fixture database");
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client: RefCell::new(client),
        }
    }

    /// Run raw SQL, e.g. schema setup in tests.
    pub fn execute_batch(&self, sql: &str) -> FixtureResult<()> {
        self.client.borrow_mut().batch_execute(sql)?;
        Ok(())
    }

    pub fn into_client(self) -> Client {
        self.client.into_inner()
    }
}

impl Storage for PgStorage {
    fn table_exists(&self, table: &str) -> FixtureResult<bool> {
        let mut client = self.client.borrow_mut();
        let row = match table.split_once('.') {
            Some((schema, name)) => client.query_one(
                "SELECT EXISTS (
                    SELECT 1 FROM information_schema.tables
                    WHERE table_schema = $1 AND table_name = $2
                )",
                &[&schema, &name],
            )?,
            None => client.query_one(
                "SELECT EXISTS (
                    SELECT 1 FROM information_schema.tables
                    WHERE table_schema::text = ANY(current_schemas(false)::text[])
                      AND table_name = $1
                )",
                &[&table],
            )?,
        };
        Ok(row.try_get(0)?)
    }

    fn clear(&self, table: &str) -> FixtureResult<()> {
        let sql = format!("DELETE FROM {}", quote_ident(table));
        let deleted = self.client.borrow_mut().execute(sql.as_str(), &[])?;
        tracing::debug!(table, deleted, "cleared table");
        Ok(())
    }

    fn insert(&self, table: &str, primary_key: &str, row: &Row) -> FixtureResult<Value> {
        let sql = insert_sql(table, primary_key, row);
        let mut client = self.client.borrow_mut();
        let statement = client.prepare(&sql)?;

        let params = row
            .iter()
            .zip(statement.params())
            .map(|((column, value), ty)| {
                bind(value, ty).map_err(|reason| FixtureError::invalid_field(table, column.as_str(), reason))
            })
            .collect::<FixtureResult<Vec<Param>>>()?;
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref()).collect();

        let inserted = client.query_one(&statement, &refs)?;
        generated_key(&inserted)
    }

    fn count(&self, table: &str) -> FixtureResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let row = self.client.borrow_mut().query_one(sql.as_str(), &[])?;
        let count: i64 = row.try_get(0)?;
        Ok(count.max(0) as usize)
    }
}

/// Quote a possibly schema-qualified identifier.
fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

fn insert_sql(table: &str, primary_key: &str, row: &Row) -> String {
    if row.is_empty() {
        return format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quote_ident(table),
            quote_ident(primary_key)
        );
    }

    let columns = row
        .keys()
        .map(|column| quote_ident(column))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=row.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quote_ident(table),
        columns,
        placeholders,
        quote_ident(primary_key)
    )
}

/// NULL for any JSON null, otherwise whatever `extract` makes of the value.
fn nullable<T>(value: &Value, expected: &str, extract: impl Fn(&Value) -> Option<T>) -> Result<Option<T>, String> {
    if value.is_null() {
        return Ok(None);
    }
    extract(value)
        .map(Some)
        .ok_or_else(|| format!("expected {}, found {}", expected, value))
}

fn int<T: TryFrom<i64>>(value: &Value) -> Option<T> {
    value.as_i64().and_then(|n| T::try_from(n).ok())
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Convert a JSON value into a parameter of the column's type.
fn bind(value: &Value, ty: &Type) -> Result<Param, String> {
    let param: Param = match ty.name() {
        "bool" => Box::new(nullable(value, "a boolean", Value::as_bool)?),
        "int2" => Box::new(nullable(value, "a 16-bit integer", int::<i16>)?),
        "int4" => Box::new(nullable(value, "a 32-bit integer", int::<i32>)?),
        "int8" => Box::new(nullable(value, "a 64-bit integer", int::<i64>)?),
        "float4" => Box::new(nullable(value, "a number", |v| v.as_f64().map(|f| f as f32))?),
        "float8" => Box::new(nullable(value, "a number", Value::as_f64)?),
        "numeric" => Box::new(nullable(value, "a decimal", |v| {
            text(v).and_then(|s| rust_decimal::Decimal::from_str(&s).ok())
        })?),
        "text" | "varchar" | "bpchar" | "name" => Box::new(nullable(value, "a string", text)?),
        "json" | "jsonb" => Box::new(nullable(value, "JSON", |v| Some(v.clone()))?),
        "uuid" => Box::new(nullable(value, "a UUID", |v| {
            v.as_str().and_then(|s| uuid::Uuid::parse_str(s).ok())
        })?),
        "date" => Box::new(nullable(value, "a date (YYYY-MM-DD)", |v| {
            v.as_str()
                .and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        })?),
        "timestamp" => Box::new(nullable(value, "a timestamp", |v| {
            v.as_str().and_then(parse_timestamp)
        })?),
        "timestamptz" => Box::new(nullable(value, "an RFC 3339 timestamp", |v| {
            v.as_str()
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&chrono::Utc))
        })?),
        other => return Err(format!("unsupported column type '{}'", other)),
    };
    Ok(param)
}

fn parse_timestamp(s: &str) -> Option<chrono::NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| chrono::NaiveDateTime::parse_from_str(s, format).ok())
}

/// Read the RETURNING column as JSON.
fn generated_key(row: &postgres::Row) -> FixtureResult<Value> {
    let key = match row.columns()[0].type_().name() {
        "int2" => row.try_get::<_, Option<i16>>(0)?.map(Value::from),
        "int4" => row.try_get::<_, Option<i32>>(0)?.map(Value::from),
        "int8" => row.try_get::<_, Option<i64>>(0)?.map(Value::from),
        "uuid" => row
            .try_get::<_, Option<uuid::Uuid>>(0)?
            .map(|u| Value::from(u.to_string())),
        _ => row.try_get::<_, Option<String>>(0)?.map(Value::from),
    };
    Ok(key.unwrap_or(Value::Null))
}
