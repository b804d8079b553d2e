use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query string of `GET .../query`.
#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    /// The query document, JSON-encoded.
    pub q: Option<String>,
}

/// Successful query response.
#[derive(Debug, Serialize)]
pub struct QueryEnvelope {
    pub status: &'static str,
    /// The query document as received
    pub query: Value,
    /// Diagnostic tree of the normalized query
    pub node: Value,
    pub results: Value,
    /// Matching root results regardless of limit and offset
    pub total: u64,
}

impl QueryEnvelope {
    pub fn ok(query: Value, node: Value, results: Value, total: u64) -> Self {
        Self {
            status: "ok",
            query,
            node,
            results,
            total,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}
