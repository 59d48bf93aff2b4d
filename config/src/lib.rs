//! Configuration of the BigQuery table import driver.

extern crate rust_cli_config as config;

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config, load_config_from};
