//! # Graph Catalog Error Types
//!
//! Errors raised while building the entity registry. The registry is static,
//! so any of these indicates a broken declaration rather than a bad request.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphCatalogError {
    #[error("No entity type registered for `{kind}`")]
    UnknownKind { kind: String },
    #[error("Field `{field}` of `{kind}` references unregistered type `{target}`")]
    UnresolvedReference {
        kind: String,
        field: String,
        target: String,
    },
    #[error("Default field `{field}` of `{kind}` is not declared in its model")]
    UnknownDefaultField { kind: String, field: String },
    #[error("Field `{field}` is declared twice on `{kind}`")]
    DuplicateField { kind: String, field: String },
}
