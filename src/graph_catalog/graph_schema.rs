use serde_json::Value;
use std::fmt;

/// Physical tables of the graph store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Account,
    Project,
    Schema,
    Entity,
    EntitySchema,
    Relation,
    Property,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Account => "account",
            Table::Project => "project",
            Table::Schema => "schema",
            Table::Entity => "entity",
            Table::EntitySchema => "entity_schema",
            Table::Relation => "relation",
            Table::Property => "property",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared storage type of a leaf column.
///
/// The store hands back loosely typed values (SQLite keeps booleans as 0/1),
/// so every projected value is passed through [`ColumnType::read`] before it
/// lands in a result object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
}

impl ColumnType {
    /// Convert a raw store value into its reported JSON form.
    pub fn read(&self, value: Value) -> Value {
        match (self, value) {
            (ColumnType::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(i) => Value::Bool(i != 0),
                None => Value::Null,
            },
            (ColumnType::Float, Value::Number(n)) => n
                .as_f64()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            (_, value) => value,
        }
    }
}
