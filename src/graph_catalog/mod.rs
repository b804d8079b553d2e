pub mod errors;
pub mod graph_schema;
pub mod registry;

pub use errors::GraphCatalogError;
pub use graph_schema::{ColumnType, Table};
pub use registry::{
    registry, EntityDescriptor, FieldKind, JoinRule, QueryKind, Registry, VALUE_COLUMNS,
};
