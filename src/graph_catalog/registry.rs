//! Entity type registry
//!
//! Every queryable entity type is described once by an [`EntityDescriptor`]:
//! its table, the join that connects it to its parent level, its default
//! fields, its string shorthand and its `model` (the closed set of fields a
//! query may request on it).
//!
//! Entity and relation types reference each other (an entity's `inbound`
//! relations have a `source` entity, which has `inbound` relations, ...), so
//! the registry is built in two phases:
//!
//! 1. [`Registry::declare`] registers every type with its own columns and
//!    non-cyclic references.
//! 2. [`Registry::link`] adds the entity ↔ relation cross references, after
//!    which [`Registry::validate`] checks that every [`QueryKind`] referenced
//!    by a field resolves to a registered descriptor.
//!
//! The result is stored in a process-wide immutable [`REGISTRY`].

use std::collections::HashMap;
use std::fmt;

use super::errors::GraphCatalogError;
use super::graph_schema::{ColumnType, Table};

/// Identifies one registered entity type variant.
///
/// Variants of the same table differ only in how they join their parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Entity,
    SourceEntity,
    TargetEntity,
    OtherEntity,
    InboundRelation,
    OutboundRelation,
    Relations,
    Project,
    Author,
    Schema,
    Schemata,
    EntityProperty,
    RelationProperty,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a requested field turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A column of the owning table.
    Column(ColumnType),
    /// A nested object level.
    Object(QueryKind),
    /// A property block, one property query per requested name.
    Properties(QueryKind),
}

/// How a nested level's table joins the table of its parent level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRule {
    /// `this.id = parent.<parent_column>`
    ParentKey { parent_column: &'static str },
    /// `this.<column> = parent.id`
    ChildKey { column: &'static str },
    /// `this.<a> = parent.id OR this.<b> = parent.id`
    EitherChildKey { columns: [&'static str; 2] },
    /// `(this.id = parent.<a> OR this.id = parent.<b>) AND this.id <> grandparent.id`
    EitherParentKey { parent_columns: [&'static str; 2] },
    /// `link.<parent_column> = parent.id` then `this.id = link.<own_column>`
    Link {
        table: Table,
        parent_column: &'static str,
        own_column: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub kind: QueryKind,
    /// Name used in error messages.
    pub label: &'static str,
    pub table: Table,
    /// `None` only for the root entity.
    pub join: Option<JoinRule>,
    /// Field a bare string value expands to (`"x"` → `{field: "x"}`).
    pub shorthand: Option<&'static str>,
    pub default_fields: &'static [&'static str],
    pub model: Vec<(&'static str, FieldKind)>,
}

impl EntityDescriptor {
    pub fn field(&self, name: &str) -> Option<FieldKind> {
        self.model
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, kind)| *kind)
    }

    pub fn is_property(&self) -> bool {
        self.table == Table::Property
    }
}

/// Typed property value columns, in type-dispatch order.
pub const VALUE_COLUMNS: [(&str, ColumnType); 5] = [
    ("value_string", ColumnType::Text),
    ("value_datetime", ColumnType::DateTime),
    ("value_integer", ColumnType::Integer),
    ("value_float", ColumnType::Float),
    ("value_boolean", ColumnType::Boolean),
];

const ENTITY_DEFAULTS: &[&str] = &["id", "status", "properties", "project"];
const RELATION_DEFAULTS: &[&str] = &["id", "project"];
const PROPERTY_DEFAULTS: &[&str] = &[
    "value_string",
    "value_datetime",
    "value_integer",
    "value_float",
    "value_boolean",
    "source_url",
];

fn timestamps() -> [(&'static str, FieldKind); 2] {
    [
        ("created_at", FieldKind::Column(ColumnType::DateTime)),
        ("updated_at", FieldKind::Column(ColumnType::DateTime)),
    ]
}

#[derive(Debug)]
pub struct Registry {
    descriptors: HashMap<QueryKind, EntityDescriptor>,
}

impl Registry {
    /// Build, link and validate the full registry.
    pub fn build() -> Result<Self, GraphCatalogError> {
        let mut registry = Self::declare();
        registry.link();
        registry.validate()?;
        Ok(registry)
    }

    pub fn get(&self, kind: QueryKind) -> Result<&EntityDescriptor, GraphCatalogError> {
        self.descriptors
            .get(&kind)
            .ok_or_else(|| GraphCatalogError::UnknownKind {
                kind: kind.to_string(),
            })
    }

    /// Phase one: every type with its own columns and the references that do
    /// not form a cycle.
    fn declare() -> Self {
        let mut descriptors = HashMap::new();

        let project = EntityDescriptor {
            kind: QueryKind::Project,
            label: "project",
            table: Table::Project,
            join: Some(JoinRule::ParentKey {
                parent_column: "project_id",
            }),
            shorthand: Some("slug"),
            default_fields: &["slug", "label"],
            model: [
                ("id", FieldKind::Column(ColumnType::Integer)),
                ("slug", FieldKind::Column(ColumnType::Text)),
                ("label", FieldKind::Column(ColumnType::Text)),
                ("private", FieldKind::Column(ColumnType::Boolean)),
            ]
            .into_iter()
            .chain(timestamps())
            .collect(),
        };

        let author = EntityDescriptor {
            kind: QueryKind::Author,
            label: "account",
            table: Table::Account,
            join: Some(JoinRule::ParentKey {
                parent_column: "author_id",
            }),
            shorthand: Some("login"),
            default_fields: &["login", "full_name"],
            model: [
                ("id", FieldKind::Column(ColumnType::Integer)),
                ("login", FieldKind::Column(ColumnType::Text)),
                ("full_name", FieldKind::Column(ColumnType::Text)),
            ]
            .into_iter()
            .chain(timestamps())
            .collect(),
        };

        let schema_model: Vec<(&'static str, FieldKind)> = [
            ("id", FieldKind::Column(ColumnType::Integer)),
            ("name", FieldKind::Column(ColumnType::Text)),
            ("label", FieldKind::Column(ColumnType::Text)),
            ("obj", FieldKind::Column(ColumnType::Text)),
        ]
        .into_iter()
        .chain(timestamps())
        .collect();

        let schema = EntityDescriptor {
            kind: QueryKind::Schema,
            label: "schema",
            table: Table::Schema,
            join: Some(JoinRule::ParentKey {
                parent_column: "schema_id",
            }),
            shorthand: Some("name"),
            default_fields: &["name", "label"],
            model: schema_model.clone(),
        };
        let schemata = EntityDescriptor {
            kind: QueryKind::Schemata,
            join: Some(JoinRule::Link {
                table: Table::EntitySchema,
                parent_column: "entity_id",
                own_column: "schema_id",
            }),
            model: schema_model,
            ..schema.clone()
        };

        let property_model: Vec<(&'static str, FieldKind)> = [
            ("id", FieldKind::Column(ColumnType::Integer)),
            ("name", FieldKind::Column(ColumnType::Text)),
        ]
        .into_iter()
        .chain(
            VALUE_COLUMNS
                .iter()
                .map(|(column, ty)| (*column, FieldKind::Column(*ty))),
        )
        .chain([
            ("source_url", FieldKind::Column(ColumnType::Text)),
            ("active", FieldKind::Column(ColumnType::Boolean)),
        ])
        .collect();

        let entity_property = EntityDescriptor {
            kind: QueryKind::EntityProperty,
            label: "property",
            table: Table::Property,
            join: Some(JoinRule::ChildKey {
                column: "entity_id",
            }),
            shorthand: Some("value"),
            default_fields: PROPERTY_DEFAULTS,
            model: property_model,
        };
        let relation_property = EntityDescriptor {
            kind: QueryKind::RelationProperty,
            join: Some(JoinRule::ChildKey {
                column: "relation_id",
            }),
            ..entity_property.clone()
        };

        let relation = EntityDescriptor {
            kind: QueryKind::Relations,
            label: "relation",
            table: Table::Relation,
            join: Some(JoinRule::EitherChildKey {
                columns: ["source_id", "target_id"],
            }),
            shorthand: None,
            default_fields: RELATION_DEFAULTS,
            model: [
                ("id", FieldKind::Column(ColumnType::Text)),
                ("project", FieldKind::Object(QueryKind::Project)),
                ("author", FieldKind::Object(QueryKind::Author)),
                ("schema", FieldKind::Object(QueryKind::Schema)),
                (
                    "properties",
                    FieldKind::Properties(QueryKind::RelationProperty),
                ),
            ]
            .into_iter()
            .chain(timestamps())
            .collect(),
        };
        let inbound = EntityDescriptor {
            kind: QueryKind::InboundRelation,
            join: Some(JoinRule::ChildKey {
                column: "target_id",
            }),
            ..relation.clone()
        };
        let outbound = EntityDescriptor {
            kind: QueryKind::OutboundRelation,
            join: Some(JoinRule::ChildKey {
                column: "source_id",
            }),
            ..relation.clone()
        };

        let entity = EntityDescriptor {
            kind: QueryKind::Entity,
            label: "entity",
            table: Table::Entity,
            join: None,
            shorthand: None,
            default_fields: ENTITY_DEFAULTS,
            model: [
                ("id", FieldKind::Column(ColumnType::Text)),
                ("status", FieldKind::Column(ColumnType::Integer)),
                ("project", FieldKind::Object(QueryKind::Project)),
                ("author", FieldKind::Object(QueryKind::Author)),
                ("schemata", FieldKind::Object(QueryKind::Schemata)),
                (
                    "properties",
                    FieldKind::Properties(QueryKind::EntityProperty),
                ),
            ]
            .into_iter()
            .chain(timestamps())
            .collect(),
        };
        let source = EntityDescriptor {
            kind: QueryKind::SourceEntity,
            join: Some(JoinRule::ParentKey {
                parent_column: "source_id",
            }),
            ..entity.clone()
        };
        let target = EntityDescriptor {
            kind: QueryKind::TargetEntity,
            join: Some(JoinRule::ParentKey {
                parent_column: "target_id",
            }),
            ..entity.clone()
        };
        let other = EntityDescriptor {
            kind: QueryKind::OtherEntity,
            join: Some(JoinRule::EitherParentKey {
                parent_columns: ["source_id", "target_id"],
            }),
            ..entity.clone()
        };

        for descriptor in [
            project,
            author,
            schema,
            schemata,
            entity_property,
            relation_property,
            relation,
            inbound,
            outbound,
            entity,
            source,
            target,
            other,
        ] {
            descriptors.insert(descriptor.kind, descriptor);
        }

        Registry { descriptors }
    }

    /// Phase two: entity ↔ relation cross references.
    fn link(&mut self) {
        const ENTITY_KINDS: [QueryKind; 4] = [
            QueryKind::Entity,
            QueryKind::SourceEntity,
            QueryKind::TargetEntity,
            QueryKind::OtherEntity,
        ];
        let relation_fields = [
            ("inbound", FieldKind::Object(QueryKind::InboundRelation)),
            ("outbound", FieldKind::Object(QueryKind::OutboundRelation)),
            ("relations", FieldKind::Object(QueryKind::Relations)),
        ];
        for kind in ENTITY_KINDS {
            if let Some(descriptor) = self.descriptors.get_mut(&kind) {
                descriptor.model.extend(relation_fields);
            }
        }

        let endpoint_fields = [
            (
                QueryKind::InboundRelation,
                ("source", FieldKind::Object(QueryKind::SourceEntity)),
            ),
            (
                QueryKind::OutboundRelation,
                ("target", FieldKind::Object(QueryKind::TargetEntity)),
            ),
            (
                QueryKind::Relations,
                ("other", FieldKind::Object(QueryKind::OtherEntity)),
            ),
        ];
        for (kind, field) in endpoint_fields {
            if let Some(descriptor) = self.descriptors.get_mut(&kind) {
                descriptor.model.push(field);
            }
        }
    }

    fn validate(&self) -> Result<(), GraphCatalogError> {
        for descriptor in self.descriptors.values() {
            let kind = descriptor.kind.to_string();
            for (idx, (field, field_kind)) in descriptor.model.iter().enumerate() {
                if descriptor.model[..idx].iter().any(|(f, _)| f == field) {
                    return Err(GraphCatalogError::DuplicateField {
                        kind,
                        field: field.to_string(),
                    });
                }
                if let FieldKind::Object(target) | FieldKind::Properties(target) = field_kind {
                    if !self.descriptors.contains_key(target) {
                        return Err(GraphCatalogError::UnresolvedReference {
                            kind,
                            field: field.to_string(),
                            target: target.to_string(),
                        });
                    }
                }
            }
            for field in descriptor.default_fields {
                if descriptor.field(field).is_none() {
                    return Err(GraphCatalogError::UnknownDefaultField {
                        kind,
                        field: field.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

lazy_static::lazy_static! {
    /// Process-wide registry, built on first access and never mutated.
    pub static ref REGISTRY: Result<Registry, GraphCatalogError> = Registry::build();
}

/// Access the shared registry.
pub fn registry() -> Result<&'static Registry, GraphCatalogError> {
    REGISTRY.as_ref().map_err(Clone::clone)
}
