use secrecy::SecretString;
use serde::Deserialize;

use crate::shared::ValidationError;

/// Connection settings of the BigQuery project imports run in.
///
/// This intentionally does not implement [`serde::Serialize`] to avoid leaking the service
/// account key.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BigQueryConfig {
    /// Google Cloud project identifier.
    pub project_id: String,
    /// Location jobs run in, e.g. `US` or `europe-west1`. The project default is used when unset.
    #[serde(default)]
    pub location: Option<String>,
    /// Service account key in JSON format.
    pub service_account_key: SecretString,
}

impl BigQueryConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_id.trim().is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "bigquery.project_id".to_string(),
                constraint: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
