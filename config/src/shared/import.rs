use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Settings of the table import engine.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ImportConfig {
    /// Prefix of generated staging table names.
    #[serde(default = "default_staging_table_prefix")]
    pub staging_table_prefix: String,
    /// Whether CLONE imports try a native table clone before copying with CTAS.
    #[serde(default = "default_native_clone_enabled")]
    pub native_clone_enabled: bool,
}

impl ImportConfig {
    pub const DEFAULT_STAGING_TABLE_PREFIX: &'static str = "__temp_";

    /// Validates import settings.
    ///
    /// Staging names are generated from the prefix, so it must be a valid table name start.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let prefix_is_valid = self
            .staging_table_prefix
            .chars()
            .next()
            .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_')
            && self
                .staging_table_prefix
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        if !prefix_is_valid {
            return Err(ValidationError::InvalidFieldValue {
                field: "import.staging_table_prefix".to_string(),
                constraint: "must start with a letter or underscore and contain only letters, digits and underscores".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            staging_table_prefix: default_staging_table_prefix(),
            native_clone_enabled: default_native_clone_enabled(),
        }
    }
}

fn default_staging_table_prefix() -> String {
    ImportConfig::DEFAULT_STAGING_TABLE_PREFIX.to_string()
}

fn default_native_clone_enabled() -> bool {
    true
}
