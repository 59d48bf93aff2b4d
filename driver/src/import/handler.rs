use config::shared::ImportConfig;
use tracing::{Instrument, info, info_span};

use crate::error::DriverResult;
use crate::import::orchestrator::ImportOrchestrator;
use crate::types::{ImportCommand, ImportResponse, RuntimeOptions};
use crate::warehouse::{SchemaReflector, WarehouseConnector};

/// Entry point of the table import operation.
///
/// Every invocation connects to the warehouse with the caller's credentials, runs the import and
/// reports the destination statistics afterwards.
#[derive(Debug, Clone)]
pub struct TableImportHandler<C> {
    connector: C,
    config: ImportConfig,
}

impl<C> TableImportHandler<C>
where
    C: WarehouseConnector,
{
    pub fn new(connector: C, config: ImportConfig) -> TableImportHandler<C> {
        Self { connector, config }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub async fn handle(
        &self,
        credentials: &C::Credentials,
        command: ImportCommand,
        features: &[String],
        runtime_options: Option<RuntimeOptions>,
    ) -> DriverResult<ImportResponse> {
        let runtime_options = runtime_options.unwrap_or_default();
        let span = info_span!(
            "table_import",
            run_id = runtime_options.run_id.as_deref().unwrap_or_default(),
            source = %command.source.table,
            destination = %command.destination,
        );

        self.handle_inner(credentials, command, features, runtime_options)
            .instrument(span)
            .await
    }

    async fn handle_inner(
        &self,
        credentials: &C::Credentials,
        command: ImportCommand,
        features: &[String],
        runtime_options: RuntimeOptions,
    ) -> DriverResult<ImportResponse> {
        info!(?features, "handling table import");

        let warehouse = self
            .connector
            .connect(credentials, &runtime_options)
            .await?;

        let result = ImportOrchestrator::new(&warehouse, &self.config)
            .import(&command)
            .await?;
        let stats = warehouse.table_stats(&command.destination).await?;

        info!(
            imported_rows = result.imported_rows_count,
            table_rows = stats.row_count,
            "table import finished"
        );

        Ok(ImportResponse {
            imported_rows_count: result.imported_rows_count,
            table_rows_count: stats.row_count,
            table_size_bytes: stats.size_bytes,
            imported_columns: result.imported_columns,
            timers: result.timers,
        })
    }
}
