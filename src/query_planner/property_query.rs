//! Property blocks
//!
//! Properties are stored one row per value, with the value spread over one
//! typed column per literal type. A `properties` block in a query is keyed by
//! property name (or `*` for every property); each key becomes its own
//! property-level [`ObjectQuery`], and the [`PropertyAggregator`] merges their
//! results into one `{name: property}` mapping per parent.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::errors::QueryError;
use super::object_query::{
    take_key, CompileContext, Correlated, ObjectQuery, ParentScope, WILDCARD,
};
use super::query_node::{Literal, LiteralKind, QueryNode, QueryValue};
use crate::graph_catalog::{QueryKind, VALUE_COLUMNS};
use crate::sql_builder::SelectQuery;
use crate::store::Connection;

/// Literal type → typed value column. Strings are checked last.
const TYPE_DISPATCH: [(LiteralKind, &str); 5] = [
    (LiteralKind::DateTime, "value_datetime"),
    (LiteralKind::Integer, "value_integer"),
    (LiteralKind::Float, "value_float"),
    (LiteralKind::Boolean, "value_boolean"),
    (LiteralKind::String, "value_string"),
];

/// The typed column a literal is stored in.
pub fn value_column(literal: &Literal) -> &'static str {
    let kind = literal.kind();
    TYPE_DISPATCH
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, column)| *column)
        .unwrap_or("value_string")
}

/// Rewrite a property level's fields before wildcard expansion:
///
/// - a literal `value` filters its typed column;
/// - `value: null` requests every typed column;
/// - `name` is the block key, or projected for `*`;
/// - only active properties are ever returned.
pub(crate) fn patch_property(
    fields: &mut Map<String, Value>,
    property_name: Option<&str>,
) -> Result<(), QueryError> {
    if let Some(value) = take_key(fields, "value") {
        match Literal::from_json(&value)? {
            Some(literal) => {
                fields.insert(value_column(&literal).to_string(), value);
            }
            None if value.is_null() => {
                for (column, _) in VALUE_COLUMNS {
                    fields.entry(column).or_insert(Value::Null);
                }
            }
            None => {
                return Err(QueryError::MalformedQuery(format!(
                    "property value must be a literal or null, got {}",
                    value
                )))
            }
        }
    }

    let name = match property_name {
        None | Some(WILDCARD) => Value::Null,
        Some(name) => Value::String(name.to_string()),
    };
    fields.insert("name".to_string(), name);
    fields.insert("active".to_string(), Value::Bool(true));
    Ok(())
}

/// Fold the typed value columns of a property result into a single `value`
/// and drop the `active` flag.
pub(crate) fn collapse_value(fields: &mut Map<String, Value>) {
    take_key(fields, "active");
    let mut requested = false;
    let mut value = Value::Null;
    for (column, _) in VALUE_COLUMNS {
        if let Some(column_value) = take_key(fields, column) {
            requested = true;
            if !column_value.is_null() {
                value = column_value;
            }
        }
    }
    if requested {
        fields.insert("value".to_string(), value);
    }
}

#[derive(Debug)]
pub struct PropertyAggregator {
    queries: Vec<ObjectQuery>,
}

impl PropertyAggregator {
    pub(crate) fn new(
        ctx: &mut CompileContext,
        kind: QueryKind,
        scope: ParentScope<'_>,
        node: &QueryNode,
    ) -> Result<Self, QueryError> {
        let requested = match node.query_value()? {
            QueryValue::Fields(map) if !map.is_empty() => map,
            QueryValue::Absent | QueryValue::Fields(_) => {
                let mut map = Map::new();
                map.insert(WILDCARD.to_string(), Value::Null);
                map
            }
            QueryValue::Scalar(_) => {
                return Err(QueryError::MalformedQuery(format!(
                    "`{}` expects an object keyed by property name",
                    node.name().unwrap_or("properties")
                )))
            }
        };

        let mut queries = Vec::with_capacity(requested.len());
        for (name, value) in requested {
            // a parent may carry several values under one name
            let raw = match value {
                Value::Array(_) => value,
                other => Value::Array(vec![other]),
            };
            queries.push(ObjectQuery::new(ctx, kind, Some(scope), QueryNode::new(name, raw))?);
        }
        Ok(Self { queries })
    }

    pub fn filter(&self, q: &mut SelectQuery) -> Result<(), QueryError> {
        for query in &self.queries {
            query.filter(q)?;
        }
        Ok(())
    }

    /// Merge every property query's rows into `{name: property}` per parent.
    /// When a name repeats for one parent the later row wins.
    pub(crate) fn execute(
        &self,
        conn: &dyn Connection,
        root: &ObjectQuery,
        parent_ids: &[Value],
    ) -> Result<Correlated, QueryError> {
        let mut merged: Vec<(String, Map<String, Value>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for query in &self.queries {
            for (lineage, values) in query.execute(conn, root, Some(parent_ids))? {
                let (Some(lineage), Value::Array(values)) = (lineage, values) else {
                    continue;
                };
                let slot = *index.entry(lineage.clone()).or_insert_with(|| {
                    merged.push((lineage, Map::new()));
                    merged.len() - 1
                });
                for value in values {
                    let Value::Object(mut property) = value else {
                        continue;
                    };
                    let name = match take_key(&mut property, "name") {
                        Some(Value::String(name)) => name,
                        _ => continue,
                    };
                    merged[slot].1.insert(name, Value::Object(property));
                }
            }
        }

        Ok(merged
            .into_iter()
            .map(|(lineage, properties)| (Some(lineage), Value::Object(properties)))
            .collect())
    }
}
