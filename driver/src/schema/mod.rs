//! Column mapping and schema reconciliation.

mod mapping;
mod reconcile;
mod types;

pub use mapping::ColumnMappingResolver;
pub(crate) use mapping::missing_columns_detail;
pub use reconcile::{SYSTEM_TIMESTAMP_COLUMN, SchemaReconciler};
pub use types::normalize_type;
