use std::{sync::Arc, time::Instant};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use thiserror::Error;

use crate::query_planner::{self, QueryError};

use super::{
    models::{ErrorResponse, QueryEnvelope, QueryParams},
    AppState,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Query task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Query(e) if e.is_malformed() => StatusCode::BAD_REQUEST,
            ApiError::Query(QueryError::ObjectNotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Query failed: {}", self);
        } else {
            log::warn!("Rejected query ({}): {}", status, self);
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Simple health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "grano-ql",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn query_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryEnvelope>, ApiError> {
    let raw = parse_document(params.q.as_deref().map(str::as_bytes))?;
    answer(state, raw, None).await
}

pub async fn query_post(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<QueryEnvelope>, ApiError> {
    let raw = parse_document(Some(body.as_ref()))?;
    answer(state, raw, None).await
}

pub async fn project_query_get(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryEnvelope>, ApiError> {
    let raw = parse_document(params.q.as_deref().map(str::as_bytes))?;
    answer(state, raw, Some(slug)).await
}

pub async fn project_query_post(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    body: Bytes,
) -> Result<Json<QueryEnvelope>, ApiError> {
    let raw = parse_document(Some(body.as_ref()))?;
    answer(state, raw, Some(slug)).await
}

fn parse_document(input: Option<&[u8]>) -> Result<Value, QueryError> {
    match input {
        Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => serde_json::from_slice(bytes)
            .map_err(|e| QueryError::MalformedQuery(format!("invalid JSON: {}", e))),
        _ => Err(QueryError::MalformedQuery("no query given".to_string())),
    }
}

/// Compile, run and count one query document on the blocking pool.
async fn answer(
    state: Arc<AppState>,
    raw: Value,
    project: Option<String>,
) -> Result<Json<QueryEnvelope>, ApiError> {
    let started = Instant::now();
    let db = state.db.clone();

    let envelope = tokio::task::spawn_blocking(move || -> Result<QueryEnvelope, QueryError> {
        let conn = db.blocking_lock();
        let query = match &project {
            Some(slug) => {
                query_planner::ensure_project(&*conn, slug)?;
                query_planner::run_in_project(raw.clone(), slug)?
            }
            None => query_planner::run(raw.clone())?,
        };
        let results = query.execute(&*conn)?;
        let total = query.count(&*conn)?;
        Ok(QueryEnvelope::ok(raw, query.node().to_json(), results, total))
    })
    .await??;

    log::info!(
        "Query answered in {:.3}ms, {} matching results",
        started.elapsed().as_secs_f64() * 1000.0,
        envelope.total
    );
    Ok(Json(envelope))
}
