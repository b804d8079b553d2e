use std::path::Path;

use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
use serde_json::{Number, Value};

use super::{Connection, Row, StoreError};
use crate::sql_builder::{CompiledSql, SqlValue};

const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS "account" (
    id INTEGER PRIMARY KEY,
    login TEXT NOT NULL UNIQUE,
    full_name TEXT,
    email TEXT,
    created_at TEXT,
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS "project" (
    id INTEGER PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    label TEXT,
    private INTEGER NOT NULL DEFAULT 0,
    author_id INTEGER REFERENCES "account" (id),
    created_at TEXT,
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS "schema" (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    label TEXT,
    obj TEXT,
    project_id INTEGER REFERENCES "project" (id),
    created_at TEXT,
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS "entity" (
    id TEXT PRIMARY KEY,
    status INTEGER,
    project_id INTEGER REFERENCES "project" (id),
    author_id INTEGER REFERENCES "account" (id),
    created_at TEXT,
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS "entity_schema" (
    entity_id TEXT NOT NULL REFERENCES "entity" (id),
    schema_id INTEGER NOT NULL REFERENCES "schema" (id),
    PRIMARY KEY (entity_id, schema_id)
);

CREATE TABLE IF NOT EXISTS "relation" (
    id TEXT PRIMARY KEY,
    project_id INTEGER REFERENCES "project" (id),
    author_id INTEGER REFERENCES "account" (id),
    schema_id INTEGER REFERENCES "schema" (id),
    source_id TEXT REFERENCES "entity" (id),
    target_id TEXT REFERENCES "entity" (id),
    created_at TEXT,
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS "property" (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    entity_id TEXT REFERENCES "entity" (id),
    relation_id TEXT REFERENCES "relation" (id),
    value_string TEXT,
    value_datetime TEXT,
    value_integer INTEGER,
    value_float REAL,
    value_boolean INTEGER,
    source_url TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_relation_source ON "relation" (source_id);
CREATE INDEX IF NOT EXISTS idx_relation_target ON "relation" (target_id);
CREATE INDEX IF NOT EXISTS idx_property_entity ON "property" (entity_id, name);
CREATE INDEX IF NOT EXISTS idx_property_relation ON "property" (relation_id, name);
"#;

/// Open a database file, or an in-memory database for `:memory:`.
pub fn open<P: AsRef<Path>>(path: P) -> Result<rusqlite::Connection, StoreError> {
    let path = path.as_ref();
    let conn = if path.as_os_str() == ":memory:" {
        rusqlite::Connection::open_in_memory()?
    } else {
        rusqlite::Connection::open(path)?
    };
    log::debug!("Opened graph store at {}", path.display());
    Ok(conn)
}

/// Create the graph tables if they do not exist yet.
pub fn migrate(conn: &rusqlite::Connection) -> Result<(), StoreError> {
    conn.execute_batch(SCHEMA_DDL)?;
    Ok(())
}

impl rusqlite::ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Integer(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            SqlValue::Float(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Boolean(b) => ToSqlOutput::Owned(SqliteValue::Integer(i64::from(*b))),
        })
    }
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        // no column of the graph schema holds binary data
        ValueRef::Blob(_) => Value::Null,
    }
}

impl Connection for rusqlite::Connection {
    fn fetch_rows(&self, query: &CompiledSql) -> Result<Vec<Row>, StoreError> {
        log::debug!("Executing SQL: {} -- params: {:?}", query.sql, query.params);

        let mut stmt = self.prepare(&query.sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(rusqlite::params_from_iter(query.params.iter()))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (idx, column) in columns.iter().enumerate() {
                record.insert(column.clone(), value_to_json(row.get_ref(idx)?));
            }
            out.push(record);
        }
        log::debug!("Fetched {} rows", out.len());
        Ok(out)
    }
}
