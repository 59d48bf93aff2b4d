//! Configuration types shared by the driver crates.

mod base;
mod bigquery;
mod driver;
mod import;

pub use base::ValidationError;
pub use bigquery::BigQueryConfig;
pub use driver::DriverConfig;
pub use import::ImportConfig;
