use std::time::Instant;

use config::shared::ImportConfig;
use tracing::{debug, info, warn};

use crate::error::{DriverResult, ErrorKind};
use crate::schema::{ColumnMappingResolver, SchemaReconciler, missing_columns_detail};
use crate::source::{SourceDescriptor, SourceSelector};
use crate::sql::Statement;
use crate::staging::StagingTableSynthesizer;
use crate::types::{
    Column, ColumnSet, CreateMode, DedupType, ImportCommand, ImportOptions, ImportResult,
    ImportStrategy, ImportType, TableIdent, TableKind, TableSchema, Timer, names_eq,
};
use crate::warehouse::{LoadOptions, Warehouse};
use crate::{bail, driver_error};

/// Type of the timestamp column added to destinations created by an import.
const TIMESTAMP_TYPE: &str = "TIMESTAMP";

/// Runs one table import against a [`Warehouse`].
///
/// The import type and create mode select the strategy:
///
/// - An existing destination is only ever replaced by VIEW and CLONE imports in REPLACE mode.
///   In every other combination it fails the import with [`ErrorKind::ObjectAlreadyExists`]
///   before anything is changed.
/// - VIEW creates a wildcard view over the source.
/// - CLONE clones the source natively and copies it with CTAS when cloning is rejected.
/// - FULL and INCREMENTAL create the destination from the resolved columns and load the source
///   into it, either directly or through a staging table that is always dropped afterwards.
#[derive(Debug)]
pub struct ImportOrchestrator<'a, W> {
    warehouse: &'a W,
    config: &'a ImportConfig,
}

impl<'a, W> ImportOrchestrator<'a, W>
where
    W: Warehouse,
{
    pub fn new(warehouse: &'a W, config: &'a ImportConfig) -> ImportOrchestrator<'a, W> {
        Self { warehouse, config }
    }

    pub async fn import(&self, command: &ImportCommand) -> DriverResult<ImportResult> {
        let options = &command.import_options;

        if options.is_incremental() && options.dedup_type == DedupType::UpdateDuplicates {
            bail!(
                ErrorKind::NotImplemented,
                "Incremental import with updating duplicates is not implemented",
                format!(
                    "Importing \"{}\" into \"{}\" requires a merge of existing rows",
                    command.source.table, command.destination
                )
            );
        }

        info!(
            source = %command.source.table,
            destination = %command.destination,
            import_type = ?options.import_type,
            create_mode = ?options.create_mode,
            "starting table import"
        );

        match options.import_type {
            ImportType::View => self.import_view(command).await,
            ImportType::Clone => self.import_clone(command).await,
            ImportType::Full | ImportType::Incremental => self.import_rows(command).await,
        }
    }

    /// Applies the create mode to an existing destination.
    ///
    /// Must only run once every other check of the import passed, REPLACE drops the destination.
    async fn prepare_destination(&self, command: &ImportCommand) -> DriverResult<()> {
        let options = &command.import_options;
        let Some(existing) = self
            .warehouse
            .table_definition(&command.destination)
            .await?
        else {
            return Ok(());
        };

        let replaces = options.create_mode == CreateMode::Replace
            && matches!(options.import_type, ImportType::View | ImportType::Clone);
        if !replaces {
            bail!(
                ErrorKind::ObjectAlreadyExists,
                "Destination table already exists",
                format!(
                    "Table \"{}\" already exists and {:?} import in {:?} mode does not replace it",
                    command.destination, options.import_type, options.create_mode
                )
            );
        }

        info!(destination = %existing.ident, kind = ?existing.kind, "dropping destination to replace it");

        let drop = match existing.kind {
            TableKind::View => Statement::DropView {
                view: existing.ident,
            },
            TableKind::Table => Statement::DropTable {
                table: existing.ident,
            },
        };
        self.warehouse.execute(&drop).await?;

        Ok(())
    }

    async fn import_view(&self, command: &ImportCommand) -> DriverResult<ImportResult> {
        self.require_source(&command.source.table).await?;
        self.prepare_destination(command).await?;

        let started = Instant::now();
        self.warehouse
            .execute(&Statement::CreateView {
                view: command.destination.clone(),
                source: command.source.table.clone(),
            })
            .await?;

        Ok(ImportResult {
            imported_rows_count: 0,
            imported_columns: Vec::new(),
            timers: vec![Timer::new("createView", started.elapsed())],
        })
    }

    async fn import_clone(&self, command: &ImportCommand) -> DriverResult<ImportResult> {
        let source = self.require_source(&command.source.table).await?;
        self.prepare_destination(command).await?;

        if self.config.native_clone_enabled {
            let started = Instant::now();
            let clone = Statement::CloneTable {
                source: source.ident.clone(),
                destination: command.destination.clone(),
            };

            match self.warehouse.execute(&clone).await {
                Ok(_) => {
                    return Ok(ImportResult {
                        imported_rows_count: 0,
                        imported_columns: Vec::new(),
                        timers: vec![Timer::new("cloneTable", started.elapsed())],
                    });
                }
                Err(err) if err.kind() == ErrorKind::CloneNotSupported => {
                    warn!(
                        source = %source.ident,
                        destination = %command.destination,
                        error = %err.description(),
                        "native clone rejected, copying with create table as select"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        let started = Instant::now();
        let outcome = self
            .warehouse
            .execute(&Statement::CreateTableAsSelect {
                destination: command.destination.clone(),
                source: source.ident.clone(),
            })
            .await?;
        let imported_rows_count = match outcome.affected_rows {
            Some(rows) => rows,
            None => {
                self.warehouse
                    .table_stats(&command.destination)
                    .await?
                    .row_count
            }
        };

        Ok(ImportResult {
            imported_rows_count,
            imported_columns: source.column_names(),
            timers: vec![Timer::new("createTableAsSelect", started.elapsed())],
        })
    }

    async fn import_rows(&self, command: &ImportCommand) -> DriverResult<ImportResult> {
        let options = &command.import_options;
        let mappings = &command.source.column_mappings;

        self.prepare_destination(command).await?;

        let source = SourceSelector::select(self.warehouse, &command.source).await?;
        let expected = ColumnMappingResolver::resolve(&source.full_schema, mappings)?;

        let appended_timestamp = options
            .timestamp_column_name
            .as_deref()
            .filter(|timestamp| !expected.contains(timestamp));
        let definition = self.destination_definition(command, &expected, appended_timestamp)?;
        SchemaReconciler::validate_incremental(
            &without_column(&definition, appended_timestamp)?,
            &expected,
            source.table(),
        )?;

        debug!(destination = %definition.ident, columns = definition.columns.len(), "creating destination");
        self.warehouse
            .execute(&Statement::CreateTable { schema: definition })
            .await?;

        let Some(destination) = self
            .warehouse
            .table_definition(&command.destination)
            .await?
        else {
            bail!(
                ErrorKind::InvalidState,
                "Destination table disappeared after creation",
                format!("Table \"{}\" was created but cannot be reflected", command.destination)
            );
        };

        let load_options = LoadOptions {
            mappings: mappings.clone(),
            cast_to_string: options.import_strategy == ImportStrategy::StringTable,
        };

        if is_direct_load(options) {
            let started = Instant::now();
            let state = self
                .warehouse
                .load(&source, &destination, &load_options)
                .await?;

            info!(destination = %destination.ident, rows = state.rows, "loaded source directly into destination");

            return Ok(ImportResult {
                imported_rows_count: 0,
                imported_columns: Vec::new(),
                timers: vec![Timer::new("loadToDestination", started.elapsed())],
            });
        }

        self.import_through_staging(&source, &destination, options, &load_options)
            .await
    }

    async fn import_through_staging(
        &self,
        source: &SourceDescriptor,
        destination: &TableSchema,
        options: &ImportOptions,
        load_options: &LoadOptions,
    ) -> DriverResult<ImportResult> {
        let synthesizer = StagingTableSynthesizer::new(&self.config.staging_table_prefix);
        let staging = if load_options.mappings.is_empty() {
            synthesizer.from_source_column_names(destination, &source.selected_columns)?
        } else {
            synthesizer.from_column_mappings(destination, &load_options.mappings)?
        };

        info!(staging = %staging.ident, destination = %destination.ident, "creating staging table");
        self.warehouse
            .execute(&Statement::CreateTable {
                schema: staging.clone(),
            })
            .await?;

        let result: DriverResult<ImportResult> = async {
            let started = Instant::now();
            let state = self.warehouse.load(source, &staging, load_options).await?;
            let load_timer = Timer::new("loadToStaging", started.elapsed());

            let mut result = self
                .warehouse
                .merge_to_final(&staging, destination, options, &state)
                .await?;
            result.timers.insert(0, load_timer);

            Ok(result)
        }
        .await;

        self.drop_staging(&staging.ident).await;

        result
    }

    /// Drops a staging table, logging instead of failing when the drop does not succeed.
    async fn drop_staging(&self, staging: &TableIdent) {
        let drop = Statement::DropTable {
            table: staging.clone(),
        };

        match self.warehouse.execute(&drop).await {
            Ok(_) => debug!(staging = %staging, "dropped staging table"),
            Err(err) => warn!(staging = %staging, error = %err, "failed to drop staging table"),
        }
    }

    /// Returns the source definition, failing when the source does not exist.
    async fn require_source(&self, source: &TableIdent) -> DriverResult<TableSchema> {
        self.warehouse
            .table_definition(source)
            .await?
            .ok_or_else(|| {
                driver_error!(
                    ErrorKind::ObjectNotFound,
                    "Source table not found",
                    format!("Table \"{source}\" does not exist")
                )
            })
    }

    /// Builds the definition of a destination created by the import.
    ///
    /// Dedup columns become the primary key. `appended_timestamp` is added as a nullable timestamp
    /// column after the resolved columns.
    fn destination_definition(
        &self,
        command: &ImportCommand,
        expected: &ColumnSet,
        appended_timestamp: Option<&str>,
    ) -> DriverResult<TableSchema> {
        let options = &command.import_options;

        let missing: Vec<&str> = options
            .dedup_columns
            .iter()
            .filter(|name| !expected.contains(name))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            bail!(
                ErrorKind::ColumnsMismatch,
                "Dedup columns are missing in the imported columns",
                missing_columns_detail(&missing, &command.destination.to_string())
            );
        }

        let mut columns: Vec<Column> = match options.import_strategy {
            ImportStrategy::UserDefinedTable => expected.iter().cloned().collect(),
            ImportStrategy::StringTable => expected
                .iter()
                .map(|column| Column::string(&column.name))
                .collect(),
        };

        if let Some(timestamp) = appended_timestamp {
            columns.push(Column::new(timestamp, TIMESTAMP_TYPE, None, true, None));
        }

        let primary_keys = options
            .dedup_columns
            .iter()
            .filter_map(|name| expected.get(name).map(|column| column.name.clone()))
            .collect();

        Ok(
            TableSchema::new(command.destination.clone(), ColumnSet::new(columns)?)
                .with_primary_keys(primary_keys),
        )
    }
}

/// Returns `schema` without the column named `name`.
fn without_column(schema: &TableSchema, name: Option<&str>) -> DriverResult<TableSchema> {
    let Some(name) = name else {
        return Ok(schema.clone());
    };

    let columns = schema
        .columns
        .iter()
        .filter(|column| !names_eq(&column.name, name))
        .cloned()
        .collect();

    Ok(TableSchema {
        columns: ColumnSet::new(columns)?,
        ..schema.clone()
    })
}

/// Returns whether rows can be loaded straight into the destination without staging.
fn is_direct_load(options: &ImportOptions) -> bool {
    options.import_type == ImportType::Full
        && !options.deduplicates()
        && options.timestamp_column_name.is_none()
}
