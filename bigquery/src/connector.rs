use config::shared::BigQueryConfig;
use driver::error::DriverResult;
use driver::types::RuntimeOptions;
use driver::warehouse::WarehouseConnector;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::BigQueryClient;
use crate::encryption::install_crypto_provider;

/// Credentials of the BigQuery project an import runs in.
#[derive(Debug, Clone)]
pub struct BigQueryCredentials {
    pub project_id: String,
    /// Service account key in JSON format.
    pub service_account_key: SecretString,
}

impl From<&BigQueryConfig> for BigQueryCredentials {
    fn from(config: &BigQueryConfig) -> BigQueryCredentials {
        BigQueryCredentials {
            project_id: config.project_id.clone(),
            service_account_key: config.service_account_key.clone(),
        }
    }
}

/// Opens a [`BigQueryClient`] per import invocation.
#[derive(Debug, Clone, Default)]
pub struct BigQueryConnector {
    location: Option<String>,
}

impl BigQueryConnector {
    pub fn new(location: Option<String>) -> BigQueryConnector {
        Self { location }
    }

    pub fn from_config(config: &BigQueryConfig) -> BigQueryConnector {
        Self::new(config.location.clone())
    }
}

impl WarehouseConnector for BigQueryConnector {
    type Credentials = BigQueryCredentials;
    type Warehouse = BigQueryClient;

    async fn connect(
        &self,
        credentials: &BigQueryCredentials,
        runtime_options: &RuntimeOptions,
    ) -> DriverResult<BigQueryClient> {
        install_crypto_provider();

        debug!(project_id = %credentials.project_id, "connecting to bigquery");

        let client = BigQueryClient::new_with_key(
            credentials.project_id.clone(),
            credentials.service_account_key.expose_secret(),
            self.location.clone(),
        )
        .await?;

        Ok(client.with_labels(runtime_options.query_tags.clone()))
    }
}
