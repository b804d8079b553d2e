//! In-memory graph used by the integration tests.
//!
//! Projects: `acme` (e1, e2, e3) and `beta` (e4).
//! Relations: r1 e1 → e3, r2 e2 → e3 (both `employment`).
//! Every entity carries at least one active property; e1 also has an
//! inactive `name`.

use grano_ql::store;

const SEED: &str = r#"
INSERT INTO account (id, login, full_name, email) VALUES
    (1, '_system', 'System', NULL),
    (2, 'alice', 'Alice Example', 'alice@example.org');

INSERT INTO project (id, slug, label, private, author_id) VALUES
    (1, 'acme', 'ACME Corp', 0, 1),
    (2, 'beta', 'Beta Inc', 1, 2);

INSERT INTO schema (id, name, label, obj, project_id) VALUES
    (1, 'person', 'Person', 'entity', 1),
    (2, 'company', 'Company', 'entity', 1),
    (3, 'employment', 'Employment', 'relation', 1);

INSERT INTO entity (id, status, project_id, author_id, created_at) VALUES
    ('e1', 5, 1, 1, '2014-05-01T12:00:00'),
    ('e2', 5, 1, 2, '2014-05-02T12:00:00'),
    ('e3', 5, 1, 1, '2014-05-03T12:00:00'),
    ('e4', 5, 2, 1, '2014-05-04T12:00:00');

INSERT INTO entity_schema (entity_id, schema_id) VALUES
    ('e1', 1), ('e2', 1), ('e3', 2), ('e4', 1);

INSERT INTO relation (id, project_id, author_id, schema_id, source_id, target_id) VALUES
    ('r1', 1, 1, 3, 'e1', 'e3'),
    ('r2', 1, 2, 3, 'e2', 'e3');

INSERT INTO property (id, name, entity_id, relation_id, value_string, value_datetime,
                      value_integer, value_float, value_boolean, source_url, active) VALUES
    (1, 'name', 'e1', NULL, 'Alice', NULL, NULL, NULL, NULL, 'http://example.org/alice', 1),
    (2, 'name', 'e2', NULL, 'Bob', NULL, NULL, NULL, NULL, NULL, 1),
    (3, 'name', 'e3', NULL, 'Acme Widgets', NULL, NULL, NULL, NULL, NULL, 1),
    (4, 'age', 'e1', NULL, NULL, NULL, 34, NULL, NULL, NULL, 1),
    (5, 'age', 'e2', NULL, NULL, NULL, 41, NULL, NULL, NULL, 1),
    (6, 'born', 'e1', NULL, NULL, '1980-02-01T00:00:00', NULL, NULL, NULL, NULL, 1),
    (7, 'name', 'e4', NULL, 'Zed', NULL, NULL, NULL, NULL, NULL, 1),
    (8, 'name', 'e1', NULL, 'Alicia', NULL, NULL, NULL, NULL, NULL, 0),
    (9, 'role', NULL, 'r1', 'engineer', NULL, NULL, NULL, NULL, NULL, 1),
    (10, 'role', NULL, 'r2', 'manager', NULL, NULL, NULL, NULL, NULL, 1),
    (11, 'score', 'e3', NULL, NULL, NULL, NULL, 4.5, NULL, NULL, 1),
    (12, 'verified', 'e2', NULL, NULL, NULL, NULL, NULL, 1, NULL, 1);
"#;

pub fn seeded_store() -> rusqlite::Connection {
    let conn = store::open(":memory:").expect("in-memory store should open");
    store::migrate(&conn).expect("schema should apply");
    conn.execute_batch(SEED).expect("seed data should load");
    conn
}

/// Ids of a list result, in result order.
pub fn ids(results: &serde_json::Value) -> Vec<String> {
    results
        .as_array()
        .expect("expected a list result")
        .iter()
        .map(|item| item["id"].as_str().unwrap_or_default().to_string())
        .collect()
}
