use grano_ql::graph_catalog::{registry, ColumnType, FieldKind, JoinRule, QueryKind, Table};
use test_case::test_case;

#[test_case(QueryKind::Project, "slug" ; "project")]
#[test_case(QueryKind::Author, "login" ; "author")]
#[test_case(QueryKind::Schema, "name" ; "schema")]
#[test_case(QueryKind::Schemata, "name" ; "schemata")]
#[test_case(QueryKind::EntityProperty, "value" ; "entity property")]
fn test_shorthand_fields(kind: QueryKind, field: &str) {
    let descriptor = registry().unwrap().get(kind).unwrap();
    assert_eq!(descriptor.shorthand, Some(field));
}

#[test_case(QueryKind::Entity)]
#[test_case(QueryKind::SourceEntity)]
#[test_case(QueryKind::TargetEntity)]
#[test_case(QueryKind::OtherEntity)]
fn test_entity_variants_share_model(kind: QueryKind) {
    let descriptor = registry().unwrap().get(kind).unwrap();
    assert_eq!(descriptor.table, Table::Entity);
    assert_eq!(
        descriptor.default_fields,
        &["id", "status", "properties", "project"]
    );
    for field in ["inbound", "outbound", "relations", "schemata", "author"] {
        assert!(descriptor.field(field).is_some(), "{kind} lacks {field}");
    }
    assert_eq!(
        descriptor.field("properties"),
        Some(FieldKind::Properties(QueryKind::EntityProperty))
    );
}

#[test]
fn test_every_default_field_is_in_the_model() {
    let registry = registry().unwrap();
    for kind in [
        QueryKind::Entity,
        QueryKind::InboundRelation,
        QueryKind::OutboundRelation,
        QueryKind::Relations,
        QueryKind::Project,
        QueryKind::Author,
        QueryKind::Schema,
        QueryKind::Schemata,
        QueryKind::EntityProperty,
        QueryKind::RelationProperty,
    ] {
        let descriptor = registry.get(kind).unwrap();
        for field in descriptor.default_fields {
            assert!(descriptor.field(field).is_some(), "{kind}.{field}");
        }
    }
}

#[test]
fn test_join_rules() {
    let registry = registry().unwrap();
    assert_eq!(
        registry.get(QueryKind::Relations).unwrap().join,
        Some(JoinRule::EitherChildKey {
            columns: ["source_id", "target_id"]
        })
    );
    assert_eq!(
        registry.get(QueryKind::InboundRelation).unwrap().join,
        Some(JoinRule::ChildKey {
            column: "target_id"
        })
    );
    assert!(matches!(
        registry.get(QueryKind::Schemata).unwrap().join,
        Some(JoinRule::Link {
            table: Table::EntitySchema,
            ..
        })
    ));
}

#[test]
fn test_property_model_has_typed_columns() {
    let descriptor = registry().unwrap().get(QueryKind::EntityProperty).unwrap();
    assert_eq!(
        descriptor.field("value_datetime"),
        Some(FieldKind::Column(ColumnType::DateTime))
    );
    assert_eq!(
        descriptor.field("active"),
        Some(FieldKind::Column(ColumnType::Boolean))
    );
    // the unified value is a query-time alias, not a column
    assert_eq!(descriptor.field("value"), None);
}
