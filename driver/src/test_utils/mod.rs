//! Utilities for testing table imports without a BigQuery project.
//!
//! - [`memory_warehouse`] provides [`memory_warehouse::MemoryWarehouse`], a warehouse that keeps
//!   tables in memory, records executed statements and supports injected failures.
//! - [`schema`] provides builders for columns, tables and import commands together with
//!   assertions on created tables.

pub mod memory_warehouse;
pub mod schema;
