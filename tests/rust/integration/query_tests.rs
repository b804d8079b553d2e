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
fn test_root_sequence_returns_list() {
    let results = execute(json!([{"id": null}]));
    let mut found = ids(&results);
    found.sort();
    assert_eq!(found, vec!["e1", "e2", "e3", "e4"]);
}

#[test]
fn test_root_sequence_without_matches_is_empty_list() {
    assert_eq!(execute(json!([{"id": "missing"}])), json!([]));
}

#[test]
fn test_root_mapping_returns_object() {
    let result = execute(json!({"id": "e2", "status": null}));
    assert_eq!(result, json!({"id": "e2", "status": 5}));
}

#[test]
fn test_root_null_returns_object_with_defaults() {
    let result = execute(Value::Null);
    assert!(result.is_object());
    assert!(result["id"].is_string());
    assert_eq!(result["status"], json!(5));
    assert!(result["properties"].is_object());
    assert!(result["project"]["slug"].is_string());
}

#[test]
fn test_wildcard_fills_id_and_status() {
    let result = execute(json!({"*": null}));
    assert!(result["id"].is_string());
    assert!(!result["status"].is_null());
}

#[test]
fn test_singular_root_without_match_reports_nulls() {
    let result = execute(json!({"id": "missing", "status": null}));
    assert_eq!(result, json!({"id": null, "status": null}));
}

#[test]
fn test_author_projection() {
    let result = execute(json!({"id": "e1", "author": null}));
    assert_eq!(result["author"]["login"], json!("_system"));
    assert_eq!(result["author"]["full_name"], json!("System"));
    assert!(result["author"]["id"].is_number());
}

#[test_case(json!({"login": "_system"}) ; "explicit mapping")]
#[test_case(json!("_system") ; "string shorthand")]
fn test_author_filter(author: Value) {
    let results = execute(json!([{"id": null, "author": author}]));
    let mut found = ids(&results);
    found.sort();
    assert_eq!(found, vec!["e1", "e3", "e4"]);
    for item in results.as_array().unwrap() {
        assert_eq!(item["author"]["login"], json!("_system"));
    }
}

#[test]
fn test_project_has_no_correlation_key() {
    let result = execute(json!({"id": "e1", "project": null}));
    assert_eq!(result["project"]["slug"], json!("acme"));
    assert_eq!(result["project"]["label"], json!("ACME Corp"));
    assert!(!result.to_string().contains("__parent_id"));
    assert!(result["project"].get("__parent_id").is_none());
}

#[test]
fn test_inbound_with_source() {
    let result = execute(json!({"id": "e3", "inbound": {"id": null, "source": null}}));
    assert!(result["inbound"]["id"].is_string());
    assert!(result["inbound"]["source"]["id"].is_string());
}

#[test]
fn test_inbound_list_groups_per_parent() {
    let result = execute(json!({"id": "e3", "inbound": [{"id": null, "source": {"id": null}}]}));
    let inbound = result["inbound"].as_array().expect("inbound should be a list");
    let mut pairs: Vec<(String, String)> = inbound
        .iter()
        .map(|rel| {
            (
                rel["id"].as_str().unwrap().to_string(),
                rel["source"]["id"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    pairs.sort();
    assert_eq!(
        pairs,
        vec![
            ("r1".to_string(), "e1".to_string()),
            ("r2".to_string(), "e2".to_string())
        ]
    );
}

#[test]
fn test_outbound_target() {
    let result = execute(json!({"id": "e1", "outbound": [{"target": {"id": null}}]}));
    assert_eq!(result["outbound"], json!([{"target": {"id": "e3"}, "id": "r1"}]));
}

#[test]
fn test_other_excludes_origin_entity() {
    let result = execute(json!({"id": "e3", "relations": [{"other": {"id": null}}]}));
    let mut others: Vec<&str> = result["relations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|rel| rel["other"]["id"].as_str().unwrap())
        .collect();
    others.sort();
    assert_eq!(others, vec!["e1", "e2"]);
}

#[test]
fn test_other_points_away_from_each_root() {
    let results = execute(json!([{"id": null, "relations": [{"id": null, "other": {"id": null}}]}]));
    let mut walks: Vec<(String, String, String)> = Vec::new();
    for root in results.as_array().unwrap() {
        for rel in root["relations"].as_array().unwrap() {
            walks.push((
                root["id"].as_str().unwrap().to_string(),
                rel["id"].as_str().unwrap().to_string(),
                rel["other"]["id"].as_str().unwrap().to_string(),
            ));
        }
    }
    walks.sort();
    let expected: Vec<(String, String, String)> = [
        ("e1", "r1", "e3"),
        ("e2", "r2", "e3"),
        ("e3", "r1", "e1"),
        ("e3", "r2", "e2"),
    ]
    .iter()
    .map(|(a, b, c)| (a.to_string(), b.to_string(), c.to_string()))
    .collect();
    assert_eq!(walks, expected);
}

#[test]
fn test_other_properties_follow_each_root() {
    let results = execute(json!([{
        "id": null,
        "relations": [{"id": "r1", "other": {"id": null, "properties": {"name": null}}}]
    }]));
    let names: Vec<(&str, &str)> = results
        .as_array()
        .unwrap()
        .iter()
        .map(|root| {
            let other = &root["relations"][0]["other"];
            (
                root["id"].as_str().unwrap(),
                other["properties"]["name"]["value"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&("e1", "Acme Widgets")));
    assert!(names.contains(&("e3", "Alice")));
}

#[test]
fn test_nested_level_with_more_parents_than_sqlite_parameters() {
    let conn = seeded_store();
    // SQLite binds at most 32766 parameters per statement
    let bulk = 33_000;
    conn.execute_batch(&format!(
        "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < {bulk}) \
         INSERT INTO relation (id, project_id, author_id, schema_id, source_id, target_id) \
         SELECT 'bulk' || i, 1, 1, 3, 'e1', 'e2' FROM n;"
    ))
    .expect("bulk relations should load");

    let result = query_planner::run(json!({"id": "e1", "outbound": [{"id": null, "target": {"id": null}}]}))
        .expect("query should compile")
        .execute(&conn)
        .expect("query should execute");

    let outbound = result["outbound"].as_array().unwrap();
    assert_eq!(outbound.len(), bulk + 1);
    for rel in outbound {
        let expected = if rel["id"] == json!("r1") { "e3" } else { "e2" };
        assert_eq!(rel["target"]["id"], json!(expected), "{}", rel["id"]);
    }
}

#[test]
fn test_nested_request_constrains_root() {
    // only e3 has inbound relations
    let results = execute(json!([{"id": null, "inbound": [{"id": null}]}]));
    assert_eq!(ids(&results), vec!["e3"]);
}

#[test]
fn test_schemata_through_link_table() {
    let result = execute(json!({"id": "e3", "schemata": [{"name": null}]}));
    assert_eq!(result["schemata"], json!([{"name": "company", "id": 2}]));
}

#[test]
fn test_relation_schema_and_author() {
    let result = execute(json!({
        "id": "e2",
        "outbound": {"schema": "employment", "author": {"login": null}}
    }));
    assert_eq!(result["outbound"]["schema"]["name"], json!("employment"));
    assert_eq!(result["outbound"]["author"]["login"], json!("alice"));
}

#[test]
fn test_filter_literals_are_echoed() {
    let results = execute(json!([{"status": 5, "project": "acme"}]));
    let items = results.as_array().unwrap();
    assert_eq!(items.len(), 3);
    for item in items {
        assert_eq!(item["status"], json!(5));
        assert_eq!(item["project"]["slug"], json!("acme"));
    }
}

#[test]
fn test_directives_are_not_echoed() {
    let results = execute(json!([{"id": null, "limit": 1, "sort": "id", "optional": true}]));
    let item = &results[0];
    assert!(item.get("limit").is_none());
    assert!(item.get("sort").is_none());
    assert!(item.get("optional").is_none());
}

#[test]
fn test_results_keep_query_key_order() {
    let result = execute(json!({"status": null, "project": {"label": null}, "id": "e1"}));
    let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["status", "project", "id"]);
}

#[test]
fn test_datetime_column_filter() {
    let result = execute(json!({
        "created_at": {"$datetime": "2014-05-02T12:00:00"},
        "id": null
    }));
    assert_eq!(result["id"], json!("e2"));
    assert_eq!(result["created_at"], json!("2014-05-02T12:00:00"));
}

#[test_case(json!({"nickname": null}) ; "root field")]
#[test_case(json!({"author": {"nickname": null}}) ; "nested field")]
#[test_case(json!([{"inbound": [{"source": {"bogus": 1}}]}]) ; "deeply nested field")]
#[test_case(json!({"properties": {"age": {"colour": null}}}) ; "property field")]
fn test_unknown_field_is_rejected(raw: Value) {
    let err = query_planner::run(raw).unwrap_err();
    assert!(matches!(err, QueryError::UnknownField { .. }), "{err:?}");
    assert!(err.is_malformed());
}

#[test_case(json!({"inbound": "r1"}) ; "shorthand without shorthand field")]
#[test_case(json!({"status": {"gt": 3}}) ; "mapping on a column")]
#[test_case(json!([{"limit": "ten"}]) ; "non integer limit")]
#[test_case(json!({"created_at": {"$datetime": "soon"}}) ; "bad datetime")]
fn test_malformed_queries(raw: Value) {
    let err = query_planner::run(raw).unwrap_err();
    assert!(matches!(err, QueryError::MalformedQuery(_)), "{err:?}");
}

#[test]
fn test_run_in_project() {
    let conn = seeded_store();
    let query = query_planner::run_in_project(json!([{"id": null}]), "beta").unwrap();
    let results = query.execute(&conn).unwrap();
    assert_eq!(ids(&results), vec!["e4"]);
    assert_eq!(results[0]["project"]["slug"], json!("beta"));

    let query = query_planner::run_in_project(json!([]), "acme").unwrap();
    assert_eq!(query.count(&conn).unwrap(), 3);
}

#[test]
fn test_ensure_project() {
    let conn = seeded_store();
    assert!(query_planner::ensure_project(&conn, "acme").is_ok());
    let err = query_planner::ensure_project(&conn, "nope").unwrap_err();
    assert!(matches!(err, QueryError::ObjectNotFound(_)));
}
