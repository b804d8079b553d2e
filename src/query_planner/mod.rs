//! Object query engine
//!
//! Turns a JSON query document into nested JSON results. The document's
//! shape is the result's shape: `null` leaves are filled in, literal leaves
//! filter, sequences ask for lists and mappings descend into related objects.
//!
//! [`run`] compiles a document into a [`GraphQuery`], which can then be
//! executed or counted against any [`Connection`].

use serde_json::{json, Value};

use crate::graph_catalog::{registry, QueryKind, Table};
use crate::sql_builder::{CompiledSql, SelectQuery, SqlExpr, SqlValue, TableRef};
use crate::store::{Connection, StoreError};

pub mod errors;
pub mod field_query;
pub mod object_query;
pub mod property_query;
pub mod query_node;

pub use errors::QueryError;
pub use object_query::{ObjectQuery, DEFAULT_LIMIT};
pub use query_node::{Literal, QueryNode, QueryValue};

use object_query::{int_directive, CompileContext};

pub const MAX_LIMIT: u64 = 1000;

/// A compiled query document, ready to run.
#[derive(Debug)]
pub struct GraphQuery {
    root: ObjectQuery,
}

impl GraphQuery {
    /// The normalized root node: defaults expanded, `id` forced, pagination
    /// filled in.
    pub fn node(&self) -> &QueryNode {
        self.root.node()
    }

    /// SQL of the root level.
    pub fn to_sql(&self) -> Result<CompiledSql, QueryError> {
        Ok(self.root.compile(&self.root, None)?.build()?)
    }

    /// Run every level and assemble the nested result.
    pub fn execute(&self, conn: &dyn Connection) -> Result<Value, QueryError> {
        let results = self.root.execute(conn, &self.root, None)?;
        // the root level has no parent and forms a single group
        Ok(results
            .into_iter()
            .next()
            .map(|(_, value)| value)
            .unwrap_or(Value::Null))
    }

    /// Number of distinct root results, ignoring limit and offset.
    pub fn count(&self, conn: &dyn Connection) -> Result<u64, QueryError> {
        let compiled = self.root.compile(&self.root, None)?.build_count()?;
        let rows = conn.fetch_rows(&compiled)?;
        rows.first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_u64)
            .ok_or_else(|| StoreError::MissingCount("count".to_string()).into())
    }
}

/// Compile a query document rooted at entities.
pub fn run(raw: Value) -> Result<GraphQuery, QueryError> {
    let raw = clamp_pagination(raw)?;
    let mut ctx = CompileContext::new(registry()?);
    let root = ObjectQuery::new(&mut ctx, QueryKind::Entity, None, QueryNode::root(raw))?;
    log::debug!("Compiled query: {}", root.node().raw());
    Ok(GraphQuery { root })
}

/// Compile a query document restricted to the entities of one project.
pub fn run_in_project(raw: Value, slug: &str) -> Result<GraphQuery, QueryError> {
    run(scope_to_project(raw, slug)?)
}

/// Fail with [`QueryError::ObjectNotFound`] unless a project with `slug`
/// exists.
pub fn ensure_project(conn: &dyn Connection, slug: &str) -> Result<(), QueryError> {
    let mut q = SelectQuery::new();
    q.from_table(TableRef::new(Table::Project.name(), "project"));
    q.filter(SqlExpr::eq(
        SqlExpr::column("project", "slug"),
        SqlExpr::Value(SqlValue::Text(slug.to_string())),
    ));
    q.add_column(SqlExpr::column("project", "id"), Some("id"));
    q.set_limit(Some(1));

    if conn.fetch_rows(&q.build()?)?.is_empty() {
        return Err(QueryError::ObjectNotFound(format!("project `{}`", slug)));
    }
    Ok(())
}

/// Clamp the root's `limit` to `1..=MAX_LIMIT` (default [`DEFAULT_LIMIT`])
/// and its `offset` to `>= 0` (default 0).
fn clamp_pagination(mut raw: Value) -> Result<Value, QueryError> {
    let shape = match &mut raw {
        Value::Array(items) => items.first_mut(),
        other => Some(other),
    };
    if let Some(Value::Object(map)) = shape {
        let limit = match map.get("limit") {
            Some(value) => int_directive("limit", value)?,
            None => None,
        }
        .map_or(DEFAULT_LIMIT, |limit| limit.clamp(1, MAX_LIMIT as i64) as u64);
        let offset = match map.get("offset") {
            Some(value) => int_directive("offset", value)?,
            None => None,
        }
        .map_or(0, |offset| offset.max(0) as u64);

        map.insert("limit".to_string(), Value::from(limit));
        map.insert("offset".to_string(), Value::from(offset));
    }
    Ok(raw)
}

/// Force the root `project` filter to `slug`, keeping whatever else the
/// document asks of the project.
fn scope_to_project(mut raw: Value, slug: &str) -> Result<Value, QueryError> {
    let shape = match &mut raw {
        Value::Array(items) => {
            if items.is_empty() {
                items.push(Value::Null);
            }
            items.first_mut()
        }
        other => Some(other),
    };
    let Some(shape) = shape else {
        return Ok(raw);
    };
    if shape.is_null() {
        *shape = json!({ "*": null });
    }
    let map = match shape {
        Value::Object(map) => map,
        other => {
            return Err(QueryError::MalformedQuery(format!(
                "query root must be an object, got {}",
                other
            )))
        }
    };

    let project = match map.get("project").cloned() {
        None | Some(Value::Null) => json!({ "*": null, "slug": slug }),
        Some(Value::String(_)) => json!({ "slug": slug }),
        Some(Value::Object(mut fields)) => {
            fields.insert("slug".to_string(), Value::from(slug));
            Value::Object(fields)
        }
        Some(other) => {
            return Err(QueryError::MalformedQuery(format!(
                "`project` expects an object, got {}",
                other
            )))
        }
    };
    map.insert("project".to_string(), project);
    Ok(raw)
}
