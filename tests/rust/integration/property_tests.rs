use grano_ql::query_planner::{self, QueryError};
use serde_json::{json, Value};
use test_case::test_case;

use super::fixtures::{ids, seeded_store};

fn execute(raw: Value) -> Value {
    let conn = seeded_store();
    query_planner::run(raw)
        .expect("query should compile")
        .execute(&conn)
        .expect("query should execute")
}

#[test]
fn test_integer_literal_reads_back_as_single_value() {
    let result = execute(json!({"id": "e1", "properties": {"age": 34}}));
    let age = &result["properties"]["age"];
    assert_eq!(age, &json!({"id": 4, "value": 34}));
    assert!(age.get("active").is_none());
    assert!(age.get("value_integer").is_none());
}

#[test]
fn test_integer_literal_filters_integer_column() {
    let query = query_planner::run(json!([{"properties": {"age": 34}}])).unwrap();
    let compiled = query.to_sql().unwrap();
    assert!(compiled.sql.contains(".\"value_integer\" = ?"), "{}", compiled.sql);
    assert!(!compiled.sql.contains("\"value_string\" = ?"));
}

#[test_case(json!({"age": 41}), vec!["e2"] ; "integer")]
#[test_case(json!({"age": 99}), vec![] ; "integer without match")]
#[test_case(json!({"name": "Bob"}), vec!["e2"] ; "string shorthand")]
#[test_case(json!({"name": {"value": "Zed"}}), vec!["e4"] ; "explicit value")]
#[test_case(json!({"score": 4.5}), vec!["e3"] ; "float")]
#[test_case(json!({"verified": true}), vec!["e2"] ; "boolean")]
#[test_case(json!({"born": {"$datetime": "1980-02-01"}}), vec!["e1"] ; "datetime")]
#[test_case(json!({"name": "Alicia"}), vec![] ; "inactive value")]
fn test_property_filters_root(properties: Value, expected: Vec<&str>) {
    let results = execute(json!([{"id": null, "properties": properties}]));
    assert_eq!(ids(&results), expected);
}

#[test]
fn test_datetime_property_value() {
    let result = execute(json!({"id": "e1", "properties": {"born": null}}));
    assert_eq!(
        result["properties"]["born"]["value"],
        json!("1980-02-01T00:00:00")
    );
}

#[test]
fn test_typed_values_read_back() {
    let result = execute(json!({"id": "e3", "properties": {"score": null}}));
    assert_eq!(result["properties"]["score"]["value"], json!(4.5));

    let result = execute(json!({"id": "e2", "properties": {"verified": {"value": null}}}));
    assert_eq!(result["properties"]["verified"]["value"], json!(true));
}

#[test_case(Value::Null ; "null block")]
#[test_case(json!({}) ; "empty block")]
#[test_case(json!({"*": null}) ; "wildcard")]
fn test_all_active_properties(properties: Value) {
    let result = execute(json!({"id": "e1", "properties": properties}));
    let props = result["properties"].as_object().expect("properties mapping");
    let mut names: Vec<&String> = props.keys().collect();
    names.sort();
    assert_eq!(names, vec!["age", "born", "name"]);

    // the inactive `Alicia` never shows up
    assert_eq!(props["name"]["value"], json!("Alice"));
    assert_eq!(props["name"]["source_url"], json!("http://example.org/alice"));
    assert_eq!(props["age"]["value"], json!(34));
    for prop in props.values() {
        assert!(prop.get("active").is_none());
        assert!(prop.get("name").is_none());
        assert!(prop["id"].is_number());
    }
}

#[test]
fn test_named_properties_only() {
    let result = execute(json!({"id": "e2", "properties": {"name": null, "age": null}}));
    let props = result["properties"].as_object().unwrap();
    assert_eq!(props.len(), 2);
    assert_eq!(props["name"]["value"], json!("Bob"));
    assert_eq!(props["age"]["value"], json!(41));
}

#[test]
fn test_relation_properties() {
    let result = execute(json!({"id": "e1", "outbound": {"properties": {"role": null}}}));
    assert_eq!(
        result["outbound"]["properties"]["role"]["value"],
        json!("engineer")
    );
}

#[test]
fn test_properties_per_parent_in_lists() {
    let results = execute(json!([{"id": null, "properties": {"name": null}}]));
    let mut names: Vec<(String, String)> = results
        .as_array()
        .unwrap()
        .iter()
        .map(|item| {
            (
                item["id"].as_str().unwrap().to_string(),
                item["properties"]["name"]["value"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            ("e1".to_string(), "Alice".to_string()),
            ("e2".to_string(), "Bob".to_string()),
            ("e3".to_string(), "Acme Widgets".to_string()),
            ("e4".to_string(), "Zed".to_string()),
        ]
    );
}

#[test]
fn test_property_value_mapping_is_malformed() {
    let err = query_planner::run(json!({"properties": {"age": {"value": {"a": 1}}}})).unwrap_err();
    assert!(matches!(err, QueryError::MalformedQuery(_)));
}

#[test]
fn test_properties_block_must_be_mapping() {
    let err = query_planner::run(json!({"properties": "name"})).unwrap_err();
    assert!(matches!(err, QueryError::MalformedQuery(_)));
}
