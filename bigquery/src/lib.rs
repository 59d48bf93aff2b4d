//! BigQuery backend of the table import driver.
//!
//! [`BigQueryClient`] implements every warehouse collaborator on top of `gcp-bigquery-client`:
//! statements run as query jobs, schemas are reflected from `INFORMATION_SCHEMA` and loading and
//! merging reuse the SQL implementations of the driver. [`BigQueryConnector`] opens one client
//! per import from [`BigQueryCredentials`].

mod client;
mod connector;
pub mod encryption;
mod error;
mod reflect;

pub use client::BigQueryClient;
pub use connector::{BigQueryConnector, BigQueryCredentials};
