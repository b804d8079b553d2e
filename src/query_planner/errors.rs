use thiserror::Error;

use crate::graph_catalog::GraphCatalogError;
use crate::sql_builder::SqlBuildError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Unknown field: {field} (not queryable on {entity})")]
    UnknownField { entity: String, field: String },

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Entity registry error: {0}")]
    Catalog(#[from] GraphCatalogError),

    #[error("Failed to build SQL: {0}")]
    SqlBuild(#[from] SqlBuildError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    /// True when the caller sent something the engine cannot compile.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            QueryError::MalformedQuery(_) | QueryError::UnknownField { .. }
        )
    }
}
