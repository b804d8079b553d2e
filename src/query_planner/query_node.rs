//! Query document nodes
//!
//! A query document is plain JSON. Each position in it is wrapped in a
//! [`QueryNode`], which answers three questions about the raw value:
//!
//! - cardinality: a sequence (`[{...}]`) asks for many results, anything
//!   else for at most one;
//! - shape: the first element of a sequence, otherwise the value itself;
//! - leaf or not: mappings have children, everything else is a leaf.
//!
//! Leaf values are classified once into a [`QueryValue`]: `null` projects the
//! field, a [`Literal`] filters it.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{json, Map, Value};

use super::errors::QueryError;
use crate::sql_builder::SqlValue;

/// Key of the tagged datetime literal, `{"$datetime": "2014-05-01T12:00:00"}`.
pub const DATETIME_TAG: &str = "$datetime";

/// Storage and output format of datetime values.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    String,
    DateTime,
    Integer,
    Float,
    Boolean,
}

impl Literal {
    /// Classify a JSON value. `Ok(None)` for anything that is not a literal.
    pub fn from_json(value: &Value) -> Result<Option<Literal>, QueryError> {
        let literal = match value {
            Value::String(s) => Literal::String(s.clone()),
            Value::Bool(b) => Literal::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Literal::Integer(i),
                None => match n.as_f64() {
                    Some(f) => Literal::Float(f),
                    None => return Ok(None),
                },
            },
            Value::Object(map) if is_datetime_tagged(map) => {
                let text = map.get(DATETIME_TAG).and_then(Value::as_str).ok_or_else(|| {
                    QueryError::MalformedQuery(format!("{} expects a string", DATETIME_TAG))
                })?;
                Literal::DateTime(parse_datetime(text)?)
            }
            Value::Null | Value::Array(_) | Value::Object(_) => return Ok(None),
        };
        Ok(Some(literal))
    }

    pub fn kind(&self) -> LiteralKind {
        match self {
            Literal::String(_) => LiteralKind::String,
            Literal::Integer(_) => LiteralKind::Integer,
            Literal::Float(_) => LiteralKind::Float,
            Literal::Boolean(_) => LiteralKind::Boolean,
            Literal::DateTime(_) => LiteralKind::DateTime,
        }
    }

    /// The value as it is reported back in results.
    pub fn to_json(&self) -> Value {
        match self {
            Literal::String(s) => Value::String(s.clone()),
            Literal::Integer(i) => Value::from(*i),
            Literal::Float(f) => json!(f),
            Literal::Boolean(b) => Value::Bool(*b),
            Literal::DateTime(dt) => Value::String(dt.format(DATETIME_FORMAT).to_string()),
        }
    }
}

impl From<&Literal> for SqlValue {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::String(s) => SqlValue::Text(s.clone()),
            Literal::Integer(i) => SqlValue::Integer(*i),
            Literal::Float(f) => SqlValue::Float(*f),
            Literal::Boolean(b) => SqlValue::Boolean(*b),
            Literal::DateTime(dt) => SqlValue::Text(dt.format(DATETIME_FORMAT).to_string()),
        }
    }
}

fn is_datetime_tagged(map: &Map<String, Value>) -> bool {
    map.len() == 1 && map.contains_key(DATETIME_TAG)
}

/// Accepts `YYYY-MM-DDTHH:MM:SS[.fff]`, the same with a space separator,
/// a bare date (midnight), or an RFC 3339 timestamp (converted to UTC).
fn parse_datetime(text: &str) -> Result<NaiveDateTime, QueryError> {
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.naive_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }
    Err(QueryError::MalformedQuery(format!(
        "invalid datetime literal: {}",
        text
    )))
}

/// A classified node value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// `null`, an empty sequence, or an unusable value: project, don't filter.
    Absent,
    Scalar(Literal),
    Fields(Map<String, Value>),
}

impl QueryValue {
    pub fn from_json(value: Option<&Value>) -> Result<QueryValue, QueryError> {
        let Some(value) = value else {
            return Ok(QueryValue::Absent);
        };
        if let Some(literal) = Literal::from_json(value)? {
            return Ok(QueryValue::Scalar(literal));
        }
        Ok(match value {
            Value::Object(map) => QueryValue::Fields(map.clone()),
            _ => QueryValue::Absent,
        })
    }

    pub fn literal(&self) -> Option<&Literal> {
        match self {
            QueryValue::Scalar(literal) => Some(literal),
            _ => None,
        }
    }
}

/// One position in the query document.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryNode {
    name: Option<String>,
    raw: Value,
}

impl QueryNode {
    pub fn new(name: impl Into<String>, raw: Value) -> Self {
        Self {
            name: Some(name.into()),
            raw,
        }
    }

    pub fn root(raw: Value) -> Self {
        Self { name: None, raw }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn is_list(&self) -> bool {
        self.raw.is_array()
    }

    /// The query shape at this position. Never a sequence.
    pub fn value(&self) -> Option<&Value> {
        let value = match &self.raw {
            Value::Array(items) => items.first()?,
            value => value,
        };
        match value {
            Value::Null | Value::Array(_) => None,
            value => Some(value),
        }
    }

    pub fn query_value(&self) -> Result<QueryValue, QueryError> {
        QueryValue::from_json(self.value())
    }

    fn fields(&self) -> Option<&Map<String, Value>> {
        match self.value() {
            Some(Value::Object(map)) if !is_datetime_tagged(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.fields().is_none()
    }

    /// One child per key of a mapping value, in document order.
    pub fn children(&self) -> impl Iterator<Item = QueryNode> + '_ {
        self.fields()
            .into_iter()
            .flat_map(|map| map.iter())
            .map(|(key, value)| QueryNode::new(key.clone(), value.clone()))
    }

    /// A node with the same name and cardinality wrapping a new shape.
    pub fn with_value(&self, value: Value) -> QueryNode {
        let raw = if self.is_list() {
            Value::Array(vec![value])
        } else {
            value
        };
        QueryNode {
            name: self.name.clone(),
            raw,
        }
    }

    /// Diagnostic rendering of the node tree.
    pub fn to_json(&self) -> Value {
        let children: Vec<Value> = self.children().map(|child| child.to_json()).collect();
        json!({
            "name": self.name,
            "value": self.value(),
            "as_list": self.is_list(),
            "children": children,
        })
    }
}
