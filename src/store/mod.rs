//! Graph store access
//!
//! The query engine only needs one thing from persistence: run a compiled
//! SELECT and hand back its rows keyed by column label. [`Connection`] is
//! that seam; [`sqlite`] implements it for `rusqlite` and owns the table
//! layout.

use serde_json::{Map, Value};

use crate::sql_builder::CompiledSql;

pub mod errors;
pub mod sqlite;

pub use errors::StoreError;
pub use sqlite::{migrate, open};

/// One result row, keyed by the column label from the SELECT list.
pub type Row = Map<String, Value>;

pub trait Connection {
    fn fetch_rows(&self, query: &CompiledSql) -> Result<Vec<Row>, StoreError>;
}
