//! Object queries
//!
//! An [`ObjectQuery`] is one nesting level of a query document compiled
//! against one entity type. Building it normalizes the level's node
//! (shorthand, wildcard expansion, forced `id`) and instantiates one child
//! per requested field: a [`FieldQuery`] for columns, a nested
//! [`ObjectQuery`] for related objects, a [`PropertyAggregator`] for property
//! blocks.
//!
//! Every level runs its own SELECT. That SELECT always starts from the root's
//! full join/filter chain, so filters anywhere in the document constrain
//! every level, and is then scoped to the ids of the rows its parent level
//! produced. Child results are grouped by lineage (parent id plus
//! grandparent id) and spliced into the parent rows with the same lineage.
//! A level reached through an undirected relation depends on the entity the
//! relation was reached from, so the parent id alone cannot tell its rows
//! apart.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use super::errors::QueryError;
use super::field_query::FieldQuery;
use super::property_query::{collapse_value, patch_property, PropertyAggregator};
use super::query_node::{Literal, QueryNode, QueryValue};
use crate::graph_catalog::{EntityDescriptor, FieldKind, JoinRule, QueryKind, Registry, Table};
use crate::sql_builder::{Join, SelectQuery, SqlExpr, TableRef};
use crate::store::{Connection, Row};

/// Column label carrying the parent level's id through a child level's rows.
pub const PARENT_ID: &str = "__parent_id";

/// Column label carrying the grandparent level's id, selected from the third
/// level down.
pub const GRANDPARENT_ID: &str = "__grandparent_id";

/// Label of the constant selected when a level projects no column at all.
const ROW_MARKER: &str = "__row";

pub const WILDCARD: &str = "*";

/// Keys accepted at any level that are not fields.
pub const DIRECTIVES: [&str; 4] = ["limit", "offset", "sort", "optional"];

pub const DEFAULT_LIMIT: u64 = 25;

pub fn is_directive(name: &str) -> bool {
    DIRECTIVES.contains(&name)
}

/// Per-parent results of one level: `(lineage key, object or list)`.
pub(crate) type Correlated = Vec<(Option<String>, Value)>;

/// Hands out table aliases that are unique within one compiled query.
pub(crate) struct CompileContext {
    registry: &'static Registry,
    next_alias: usize,
}

impl CompileContext {
    pub fn new(registry: &'static Registry) -> Self {
        Self {
            registry,
            next_alias: 0,
        }
    }

    fn alias_for(&mut self, table: Table) -> String {
        let alias = format!("{}_{}", table.name(), self.next_alias);
        self.next_alias += 1;
        alias
    }
}

/// The aliases a nested level joins against.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParentScope<'a> {
    pub alias: &'a str,
    pub parent_alias: Option<&'a str>,
}

#[derive(Debug)]
pub(crate) enum ChildQuery {
    Field(FieldQuery),
    Object(Box<ObjectQuery>),
    Properties(PropertyAggregator),
}

struct ResultRow {
    parent_id: Option<Value>,
    grandparent_id: Option<Value>,
    fields: Map<String, Value>,
}

impl ResultRow {
    /// Key this row was reached under.
    fn lineage(&self) -> Option<String> {
        self.parent_id
            .as_ref()
            .map(|parent| lineage_key(parent, self.grandparent_id.as_ref()))
    }

    /// Key its own children are grouped under.
    fn child_lineage(&self) -> Option<String> {
        self.fields
            .get("id")
            .filter(|id| !id.is_null())
            .map(|id| lineage_key(id, self.parent_id.as_ref()))
    }
}

#[derive(Debug)]
pub struct ObjectQuery {
    descriptor: &'static EntityDescriptor,
    node: QueryNode,
    alias: String,
    parent_alias: Option<String>,
    grandparent_alias: Option<String>,
    children: Vec<(String, ChildQuery)>,
    limit: Option<u64>,
    offset: u64,
}

impl ObjectQuery {
    pub(crate) fn new(
        ctx: &mut CompileContext,
        kind: QueryKind,
        parent: Option<ParentScope<'_>>,
        node: QueryNode,
    ) -> Result<Self, QueryError> {
        let descriptor = ctx.registry.get(kind)?;
        let node = expand_query(descriptor, node)?;
        let (limit, offset) = read_pagination(&node)?;
        let alias = ctx.alias_for(descriptor.table);

        let scope = ParentScope {
            alias: &alias,
            parent_alias: parent.map(|p| p.alias),
        };
        let mut children = Vec::new();
        for child in node.children() {
            let Some(name) = child.name().map(str::to_string) else {
                continue;
            };
            if is_directive(&name) {
                continue;
            }
            let child_query = match descriptor.field(&name) {
                None => {
                    return Err(QueryError::UnknownField {
                        entity: descriptor.label.to_string(),
                        field: name,
                    })
                }
                Some(FieldKind::Column(column_type)) => {
                    ChildQuery::Field(FieldQuery::new(&alias, column_type, &child)?)
                }
                Some(FieldKind::Object(kind)) => {
                    ChildQuery::Object(Box::new(ObjectQuery::new(ctx, kind, Some(scope), child)?))
                }
                Some(FieldKind::Properties(kind)) => {
                    ChildQuery::Properties(PropertyAggregator::new(ctx, kind, scope, &child)?)
                }
            };
            children.push((name, child_query));
        }

        Ok(Self {
            descriptor,
            parent_alias: parent.map(|p| p.alias.to_string()),
            grandparent_alias: parent.and_then(|p| p.parent_alias).map(str::to_string),
            node,
            alias,
            children,
            limit,
            offset,
        })
    }

    /// The normalized node this level was built from.
    pub fn node(&self) -> &QueryNode {
        &self.node
    }

    pub fn is_root(&self) -> bool {
        self.parent_alias.is_none()
    }

    fn join_parent(&self, q: &mut SelectQuery) -> Result<(), QueryError> {
        let table = TableRef::new(self.descriptor.table.name(), self.alias.as_str());
        let (parent_alias, rule) = match (self.parent_alias.as_deref(), self.descriptor.join) {
            (None, _) => {
                q.from_table(table);
                return Ok(());
            }
            (Some(parent_alias), Some(rule)) => (parent_alias, rule),
            (Some(_), None) => {
                return Err(QueryError::MalformedQuery(format!(
                    "`{}` cannot be queried as a nested object",
                    self.descriptor.label
                )))
            }
        };

        let this = |column: &str| SqlExpr::column(self.alias.as_str(), column);
        let parent = |column: &str| SqlExpr::column(parent_alias, column);

        let joining_on = match rule {
            JoinRule::ParentKey { parent_column } => {
                vec![SqlExpr::eq(this("id"), parent(parent_column))]
            }
            JoinRule::ChildKey { column } => vec![SqlExpr::eq(this(column), parent("id"))],
            JoinRule::EitherChildKey { columns: [a, b] } => vec![SqlExpr::Or(vec![
                SqlExpr::eq(this(a), parent("id")),
                SqlExpr::eq(this(b), parent("id")),
            ])],
            JoinRule::EitherParentKey {
                parent_columns: [a, b],
            } => {
                let mut on = vec![SqlExpr::Or(vec![
                    SqlExpr::eq(this("id"), parent(a)),
                    SqlExpr::eq(this("id"), parent(b)),
                ])];
                // never walk back to the entity the relation was reached from
                if let Some(grandparent) = &self.grandparent_alias {
                    on.push(SqlExpr::not_eq(
                        this("id"),
                        SqlExpr::column(grandparent.as_str(), "id"),
                    ));
                }
                on
            }
            JoinRule::Link {
                table: link_table,
                parent_column,
                own_column,
            } => {
                let link_alias = format!("{}_link", self.alias);
                q.join(Join {
                    table: TableRef::new(link_table.name(), link_alias.as_str()),
                    joining_on: vec![SqlExpr::eq(
                        SqlExpr::column(link_alias.as_str(), parent_column),
                        parent("id"),
                    )],
                });
                vec![SqlExpr::eq(
                    this("id"),
                    SqlExpr::column(link_alias.as_str(), own_column),
                )]
            }
        };
        q.join(Join { table, joining_on });
        Ok(())
    }

    /// Apply the joins and filters of this level and everything below it.
    pub fn filter(&self, q: &mut SelectQuery) -> Result<(), QueryError> {
        self.join_parent(q)?;
        for (_, child) in &self.children {
            match child {
                ChildQuery::Field(field) => field.filter(q),
                ChildQuery::Object(object) => object.filter(q)?,
                ChildQuery::Properties(properties) => properties.filter(q)?,
            }
        }
        Ok(())
    }

    /// Columns retrieved when this is the active level.
    pub fn project(&self, q: &mut SelectQuery) {
        for (_, child) in &self.children {
            if let ChildQuery::Field(field) = child {
                if field.is_projected() {
                    field.project(q);
                }
            }
        }
    }

    /// Build the SELECT for this level. `parent_ids` scopes a nested level to
    /// the rows its parent level produced.
    pub fn compile(
        &self,
        root: &ObjectQuery,
        parent_ids: Option<&[Value]>,
    ) -> Result<SelectQuery, QueryError> {
        let mut q = SelectQuery::new();
        root.filter(&mut q)?;
        self.project(&mut q);

        if let Some(parent_alias) = &self.parent_alias {
            let parent_id = SqlExpr::column(parent_alias.as_str(), "id");
            if let Some(ids) = parent_ids {
                q.filter(SqlExpr::in_array(parent_id.clone(), ids.to_vec()));
            }
            q.add_column(parent_id, Some(PARENT_ID));
        }
        if let Some(grandparent_alias) = &self.grandparent_alias {
            q.add_column(
                SqlExpr::column(grandparent_alias.as_str(), "id"),
                Some(GRANDPARENT_ID),
            );
        }
        if !q.has_columns() {
            q.add_column(SqlExpr::Raw("1"), Some(ROW_MARKER));
        }

        q.set_offset(self.offset);
        if !self.node.is_list() {
            // nested singular levels collapse per parent when grouping
            if self.is_root() || parent_ids.is_none() {
                q.set_limit(Some(1));
            }
        } else if self.is_root() {
            q.set_limit(Some(self.limit.unwrap_or(DEFAULT_LIMIT)));
        }
        q.set_distinct(true);
        Ok(q)
    }

    /// Run this level and every requested level below it.
    pub(crate) fn execute(
        &self,
        conn: &dyn Connection,
        root: &ObjectQuery,
        parent_ids: Option<&[Value]>,
    ) -> Result<Correlated, QueryError> {
        let query = self.compile(root, parent_ids)?.build()?;
        let rows = conn.fetch_rows(&query)?;
        log::debug!(
            "Level `{}` ({}) returned {} rows",
            self.node.name().unwrap_or("<root>"),
            self.descriptor.label,
            rows.len()
        );

        let mut results: Vec<ResultRow> = rows.into_iter().map(|row| self.make_object(row)).collect();
        if results.is_empty() {
            let empty = if self.node.is_list() {
                Value::Array(vec![])
            } else {
                Value::Object(self.placeholder())
            };
            return Ok(vec![(None, empty)]);
        }

        let ids = collect_ids(&results);
        for (name, child) in &self.children {
            let nested = match child {
                ChildQuery::Field(_) => continue,
                ChildQuery::Object(object) => object.execute(conn, root, Some(ids.as_slice()))?,
                ChildQuery::Properties(properties) => properties.execute(conn, root, &ids)?,
            };
            let by_lineage: HashMap<String, Value> = nested
                .into_iter()
                .filter_map(|(lineage, value)| Some((lineage?, value)))
                .collect();
            for result in &mut results {
                let nested_value = result
                    .child_lineage()
                    .and_then(|lineage| by_lineage.get(&lineage));
                if let Some(value) = nested_value {
                    let value = value.clone();
                    result.fields.insert(name.clone(), value);
                }
            }
        }

        Ok(self.group_by_parent(results))
    }

    fn make_object(&self, mut row: Row) -> ResultRow {
        let parent_id = row.remove(PARENT_ID);
        let grandparent_id = row.remove(GRANDPARENT_ID);
        let mut fields = Map::new();
        for (name, child) in &self.children {
            let value = match child {
                ChildQuery::Field(field) => field.read(row.get(name.as_str())),
                ChildQuery::Object(object) => object.empty_value(),
                ChildQuery::Properties(_) => Value::Object(Map::new()),
            };
            fields.insert(name.clone(), value);
        }
        if self.descriptor.is_property() {
            collapse_value(&mut fields);
        }
        ResultRow {
            parent_id,
            grandparent_id,
            fields,
        }
    }

    /// What a parent reports when this level has nothing for it.
    fn empty_value(&self) -> Value {
        if self.node.is_list() {
            Value::Array(vec![])
        } else {
            Value::Null
        }
    }

    /// The shape reported when a singular level matched nothing.
    fn placeholder(&self) -> Map<String, Value> {
        let mut fields: Map<String, Value> = self
            .children
            .iter()
            .map(|(name, _)| (name.clone(), Value::Null))
            .collect();
        if self.descriptor.is_property() {
            collapse_value(&mut fields);
        }
        fields
    }

    fn group_by_parent(&self, results: Vec<ResultRow>) -> Correlated {
        let mut groups: Vec<(Option<String>, Vec<Value>)> = Vec::new();
        let mut index: HashMap<Option<String>, usize> = HashMap::new();
        for row in results {
            let lineage = row.lineage();
            let slot = *index.entry(lineage.clone()).or_insert_with(|| {
                groups.push((lineage, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(Value::Object(row.fields));
        }

        groups
            .into_iter()
            .map(|(lineage, items)| {
                let value = if self.node.is_list() {
                    Value::Array(items)
                } else {
                    items.into_iter().next().unwrap_or(Value::Null)
                };
                (lineage, value)
            })
            .collect()
    }
}

/// Normalize a level's node: shorthand patch, property patch, wildcard
/// expansion and the forced `id` field.
fn expand_query(
    descriptor: &EntityDescriptor,
    node: QueryNode,
) -> Result<QueryNode, QueryError> {
    let mut fields = match node.query_value()? {
        QueryValue::Absent => wildcard(),
        QueryValue::Fields(map) => map,
        QueryValue::Scalar(literal) => match descriptor.shorthand {
            Some(field) if descriptor.is_property() || matches!(literal, Literal::String(_)) => {
                let mut map = Map::new();
                map.insert(field.to_string(), node.value().cloned().unwrap_or(Value::Null));
                map
            }
            _ => {
                return Err(QueryError::MalformedQuery(format!(
                    "`{}` expects an object, got {}",
                    node.name().unwrap_or(descriptor.label),
                    literal.to_json()
                )))
            }
        },
    };

    if descriptor.is_property() {
        patch_property(&mut fields, node.name())?;
    }

    if let Some(star) = take_key(&mut fields, WILDCARD) {
        if star.is_null() {
            for field in descriptor.default_fields {
                fields.entry(*field).or_insert(Value::Null);
            }
        }
    }
    fields.entry("id").or_insert(Value::Null);

    Ok(node.with_value(Value::Object(fields)))
}

fn wildcard() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(WILDCARD.to_string(), Value::Null);
    map
}

/// Remove a key while keeping the order of the remaining entries.
pub(crate) fn take_key(map: &mut Map<String, Value>, key: &str) -> Option<Value> {
    let value = map.get(key).cloned()?;
    let rest = std::mem::take(map);
    *map = rest.into_iter().filter(|(k, _)| k != key).collect();
    Some(value)
}

/// Read an integer directive. Negative values clamp to zero.
pub(crate) fn int_directive(name: &str, value: &Value) -> Result<Option<i64>, QueryError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .map(Some)
            .ok_or_else(|| {
                QueryError::MalformedQuery(format!("`{}` must be an integer, got {}", name, n))
            }),
        other => Err(QueryError::MalformedQuery(format!(
            "`{}` must be an integer, got {}",
            name, other
        ))),
    }
}

fn read_pagination(node: &QueryNode) -> Result<(Option<u64>, u64), QueryError> {
    let Some(Value::Object(map)) = node.value() else {
        return Ok((None, 0));
    };
    let limit = match map.get("limit") {
        Some(value) => int_directive("limit", value)?.map(|l| l.max(1) as u64),
        None => None,
    };
    let offset = match map.get("offset") {
        Some(value) => int_directive("offset", value)?.map_or(0, |o| o.max(0) as u64),
        None => 0,
    };
    Ok((limit, offset))
}

/// Key under which child results are matched to parent rows. Strings map to
/// themselves so text ids and numeric filter literals line up.
fn correlation_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parent id plus, below the second level, the grandparent id.
fn lineage_key(parent: &Value, grandparent: Option<&Value>) -> String {
    match grandparent {
        Some(grandparent) => format!(
            "{}\u{1f}{}",
            correlation_key(parent),
            correlation_key(grandparent)
        ),
        None => correlation_key(parent),
    }
}

fn collect_ids(results: &[ResultRow]) -> Vec<Value> {
    let mut seen = HashSet::new();
    results
        .iter()
        .filter_map(|row| row.fields.get("id"))
        .filter(|id| !id.is_null())
        .filter(|id| seen.insert(correlation_key(id)))
        .cloned()
        .collect()
}
