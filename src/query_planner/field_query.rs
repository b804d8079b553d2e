use serde_json::Value;

use super::errors::QueryError;
use super::query_node::{Literal, QueryNode, QueryValue};
use crate::graph_catalog::ColumnType;
use crate::sql_builder::{ColumnRef, SelectQuery, SqlExpr, SqlValue};

/// Query a simple column, as opposed to a nested object. The column lives
/// on the parent level's aliased table; the field either filters it
/// (literal value) or projects it (`null`).
#[derive(Debug, Clone)]
pub struct FieldQuery {
    name: String,
    column: ColumnRef,
    column_type: ColumnType,
    filter_value: Option<Literal>,
}

impl FieldQuery {
    pub fn new(
        table_alias: &str,
        column_type: ColumnType,
        node: &QueryNode,
    ) -> Result<Self, QueryError> {
        let name = node.name().unwrap_or_default().to_string();
        let filter_value = match node.query_value()? {
            QueryValue::Absent => None,
            QueryValue::Scalar(literal) => Some(literal),
            QueryValue::Fields(_) => {
                return Err(QueryError::MalformedQuery(format!(
                    "field `{}` takes a literal or null, not an object",
                    name
                )))
            }
        };
        Ok(Self {
            column: ColumnRef::new(table_alias, name.as_str()),
            name,
            column_type,
            filter_value,
        })
    }

    /// Requested for output rather than used as a filter.
    pub fn is_projected(&self) -> bool {
        self.filter_value.is_none()
    }

    pub fn filter(&self, q: &mut SelectQuery) {
        if let Some(literal) = &self.filter_value {
            q.filter(SqlExpr::eq(
                SqlExpr::Column(self.column.clone()),
                SqlExpr::Value(SqlValue::from(literal)),
            ));
        }
    }

    pub fn project(&self, q: &mut SelectQuery) {
        q.add_column(SqlExpr::Column(self.column.clone()), Some(&self.name));
    }

    /// The reported value for one row: the filter literal when filtered,
    /// otherwise the typed column value.
    pub fn read(&self, row_value: Option<&Value>) -> Value {
        match &self.filter_value {
            Some(literal) => literal.to_json(),
            None => self
                .column_type
                .read(row_value.cloned().unwrap_or(Value::Null)),
        }
    }
}
