use serde::Deserialize;

use crate::load::Config;
use crate::shared::{BigQueryConfig, ImportConfig, ValidationError};

/// Top level configuration of the driver.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DriverConfig {
    pub bigquery: BigQueryConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

impl Config for DriverConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        self.bigquery.validate()?;
        self.import.validate()
    }
}
