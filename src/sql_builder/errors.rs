use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SqlBuildError {
    #[error("No From Table.")]
    MissingFromTable,

    #[error("No Select items.")]
    MissingSelectItems,

    #[error("Join references unknown table alias: {0}")]
    UnknownAlias(String),
}
