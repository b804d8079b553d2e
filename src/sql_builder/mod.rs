//! Relational query building
//!
//! A small query-building API over the graph store: aliased tables, inner
//! joins, equality/IN filters, column projection, `DISTINCT` and
//! limit/offset. Queries render to SQL with numbered positional parameters,
//! so literal values never end up in the SQL text.

pub mod errors;
pub mod expr;
pub mod select;

pub use errors::SqlBuildError;
pub use expr::{ColumnRef, Operator, SqlExpr, SqlValue};
pub use select::{CompiledSql, Join, SelectItem, SelectQuery, TableRef};

pub trait ToSql {
    /// Render this item, appending any bound values to `params`.
    fn to_sql(&self, params: &mut Vec<SqlValue>) -> String;
}
