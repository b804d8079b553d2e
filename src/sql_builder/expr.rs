use serde_json::Value;

use super::ToSql;

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

/// `alias.column`
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table_alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table_alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table_alias: table_alias.into(),
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
}

impl Operator {
    fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    Column(ColumnRef),
    Value(SqlValue),
    /// A constant rendered inline, never bound.
    Raw(&'static str),
    Binary {
        operator: Operator,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    And(Vec<SqlExpr>),
    Or(Vec<SqlExpr>),
    /// Membership in a set bound as one JSON array parameter, so the set
    /// size is not bounded by the parameter cap.
    InArray {
        expr: Box<SqlExpr>,
        values: Vec<Value>,
    },
}

impl SqlExpr {
    pub fn column(table_alias: impl Into<String>, column: impl Into<String>) -> Self {
        SqlExpr::Column(ColumnRef::new(table_alias, column))
    }

    pub fn eq(left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::Binary {
            operator: Operator::Equal,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not_eq(left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::Binary {
            operator: Operator::NotEqual,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn in_array(expr: SqlExpr, values: Vec<Value>) -> Self {
        SqlExpr::InArray {
            expr: Box::new(expr),
            values,
        }
    }

    /// Table aliases this expression reads from.
    pub fn aliases(&self) -> Vec<&str> {
        match self {
            SqlExpr::Column(col) => vec![col.table_alias.as_str()],
            SqlExpr::Binary { left, right, .. } => {
                let mut out = left.aliases();
                out.extend(right.aliases());
                out
            }
            SqlExpr::And(items) | SqlExpr::Or(items) => {
                items.iter().flat_map(|item| item.aliases()).collect()
            }
            SqlExpr::InArray { expr, .. } => expr.aliases(),
            SqlExpr::Value(_) | SqlExpr::Raw(_) => vec![],
        }
    }
}

pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

impl ToSql for ColumnRef {
    fn to_sql(&self, _params: &mut Vec<SqlValue>) -> String {
        format!(
            "{}.{}",
            quote_ident(&self.table_alias),
            quote_ident(&self.column)
        )
    }
}

impl ToSql for SqlExpr {
    fn to_sql(&self, params: &mut Vec<SqlValue>) -> String {
        match self {
            SqlExpr::Column(col) => col.to_sql(params),
            SqlExpr::Value(value) => {
                params.push(value.clone());
                format!("?{}", params.len())
            }
            SqlExpr::Raw(raw) => raw.to_string(),
            SqlExpr::Binary {
                operator,
                left,
                right,
            } => {
                let left = left.to_sql(params);
                let right = right.to_sql(params);
                format!("{} {} {}", left, operator.symbol(), right)
            }
            SqlExpr::And(items) => join_items(items, " AND ", "1 = 1", params),
            SqlExpr::Or(items) => join_items(items, " OR ", "1 = 0", params),
            SqlExpr::InArray { expr, values } => {
                if values.is_empty() {
                    return "1 = 0".to_string();
                }
                let expr = expr.to_sql(params);
                params.push(SqlValue::Text(Value::Array(values.clone()).to_string()));
                format!("{} IN (SELECT value FROM json_each(?{}))", expr, params.len())
            }
        }
    }
}

fn join_items(
    items: &[SqlExpr],
    separator: &str,
    empty: &str,
    params: &mut Vec<SqlValue>,
) -> String {
    match items {
        [] => empty.to_string(),
        [single] => single.to_sql(params),
        _ => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| format!("({})", item.to_sql(params)))
                .collect();
            parts.join(separator)
        }
    }
}
