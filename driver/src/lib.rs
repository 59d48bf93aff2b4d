//! Table import engine of the BigQuery driver.
//!
//! An [`import::ImportOrchestrator`] copies one table into another as a full load, an
//! incremental append, a view or a clone. The engine reaches the warehouse only through the
//! collaborator traits in [`warehouse`], backends implement them and hand a
//! [`warehouse::WarehouseConnector`] to [`import::TableImportHandler`].

mod macros;

pub mod error;
pub mod import;
pub mod schema;
pub mod source;
pub mod sql;
pub mod staging;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod warehouse;
