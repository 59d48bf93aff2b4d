use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{DriverResult, ErrorKind, maximum_length_overflow};
use crate::source::SourceDescriptor;
use crate::sql::Statement;
use crate::types::{
    ColumnMapping, ColumnSet, DedupType, ImportOptions, ImportResult, ImportType, LoadState,
    RuntimeOptions, TableIdent, TableKind, TableSchema, TableStats, Timer, WhereFilter,
    WhereOperator, names_eq,
};
use crate::warehouse::{
    BulkLoader, FinalTableMerger, LoadOptions, QueryExecutor, QueryOutcome, SchemaReflector,
    WarehouseConnector, imported_columns,
};
use crate::{bail, driver_error};

/// Row of an in-memory table, one optional string value per column.
pub type MemoryRow = Vec<Option<String>>;

/// Name of the failure point of [`BulkLoader::load`].
pub const LOAD_OPERATION: &str = "load";

/// Name of the failure point of [`FinalTableMerger::merge_to_final`].
pub const MERGE_OPERATION: &str = "merge_to_final";

#[derive(Debug, Clone)]
struct MemoryTable {
    schema: TableSchema,
    rows: Vec<MemoryRow>,
    /// Table a view selects from.
    view_source: Option<TableIdent>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: BTreeMap<TableIdent, MemoryTable>,
    statements: Vec<Statement>,
    failures: HashSet<String>,
}

impl Inner {
    fn check_failure(&self, operation: &str) -> DriverResult<()> {
        if self.failures.contains(operation) {
            bail!(
                ErrorKind::DestinationQueryFailed,
                "Injected warehouse failure",
                format!("Operation '{operation}' was configured to fail")
            );
        }

        Ok(())
    }

    fn table(&self, ident: &TableIdent) -> DriverResult<&MemoryTable> {
        self.tables.get(ident).ok_or_else(|| {
            driver_error!(
                ErrorKind::ObjectNotFound,
                "Table not found",
                format!("Not found: Table {ident}")
            )
        })
    }

    fn table_mut(&mut self, ident: &TableIdent) -> DriverResult<&mut MemoryTable> {
        self.tables.get_mut(ident).ok_or_else(|| {
            driver_error!(
                ErrorKind::ObjectNotFound,
                "Table not found",
                format!("Not found: Table {ident}")
            )
        })
    }

    fn ensure_absent(&self, ident: &TableIdent) -> DriverResult<()> {
        if self.tables.contains_key(ident) {
            bail!(
                ErrorKind::ObjectAlreadyExists,
                "Table already exists",
                format!("Already Exists: Table {ident}")
            );
        }

        Ok(())
    }

    /// Returns the rows visible through `ident`, reading through views.
    fn visible_rows(&self, ident: &TableIdent) -> DriverResult<Vec<MemoryRow>> {
        let table = self.table(ident)?;
        let Some(source) = &table.view_source else {
            return Ok(table.rows.clone());
        };

        let source_table = self.table(source)?;
        let source_rows = self.visible_rows(source)?;
        let positions: Vec<Option<usize>> = table
            .schema
            .columns
            .iter()
            .map(|column| position(&source_table.schema.columns, &column.name))
            .collect();

        Ok(source_rows
            .iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|position| position.and_then(|position| row[position].clone()))
                    .collect()
            })
            .collect())
    }

    fn apply(&mut self, statement: &Statement) -> DriverResult<QueryOutcome> {
        match statement {
            Statement::CreateTable { schema } => {
                self.ensure_absent(&schema.ident)?;
                self.tables.insert(
                    schema.ident.clone(),
                    MemoryTable {
                        schema: schema.clone(),
                        rows: Vec::new(),
                        view_source: None,
                    },
                );
            }
            Statement::DropTable { table } => {
                if let Some(existing) = self.tables.get(table) {
                    if existing.schema.kind == TableKind::View {
                        bail!(
                            ErrorKind::DestinationQueryFailed,
                            "Cannot drop a view with drop table",
                            format!("{table} is a view")
                        );
                    }
                    self.tables.remove(table);
                }
            }
            Statement::DropView { view } => {
                if let Some(existing) = self.tables.get(view) {
                    if existing.schema.kind != TableKind::View {
                        bail!(
                            ErrorKind::DestinationQueryFailed,
                            "Cannot drop a table with drop view",
                            format!("{view} is not a view")
                        );
                    }
                    self.tables.remove(view);
                }
            }
            Statement::TruncateTable { table } => {
                let affected = self.table(table)?.rows.len() as u64;
                self.table_mut(table)?.rows.clear();
                return Ok(QueryOutcome {
                    affected_rows: Some(affected),
                });
            }
            Statement::CreateView { view, source } => {
                self.ensure_absent(view)?;
                let source_schema = self.table(source)?.schema.clone();
                let schema = TableSchema::new(view.clone(), source_schema.columns)
                    .with_kind(TableKind::View);
                self.tables.insert(
                    view.clone(),
                    MemoryTable {
                        schema,
                        rows: Vec::new(),
                        view_source: Some(source.clone()),
                    },
                );
            }
            Statement::CloneTable {
                source,
                destination,
            } => {
                self.ensure_absent(destination)?;
                let source_table = self.table(source)?;
                if source.schema != destination.schema
                    || source_table.schema.kind == TableKind::View
                {
                    bail!(
                        ErrorKind::CloneNotSupported,
                        "Table clone is not supported for this source",
                        format!("Cannot clone {source} into {destination}")
                    );
                }

                let mut schema = source_table.schema.clone();
                schema.ident = destination.clone();
                let rows = source_table.rows.clone();
                self.tables.insert(
                    destination.clone(),
                    MemoryTable {
                        schema,
                        rows,
                        view_source: None,
                    },
                );
            }
            Statement::CreateTableAsSelect {
                destination,
                source,
            } => {
                self.ensure_absent(destination)?;
                let columns = self.table(source)?.schema.columns.clone();
                let rows = self.visible_rows(source)?;
                let affected = rows.len() as u64;
                self.tables.insert(
                    destination.clone(),
                    MemoryTable {
                        schema: TableSchema::new(destination.clone(), columns),
                        rows,
                        view_source: None,
                    },
                );
                return Ok(QueryOutcome {
                    affected_rows: Some(affected),
                });
            }
            Statement::InsertSelect { .. } | Statement::Transaction { .. } | Statement::Raw { .. } => {
                bail!(
                    ErrorKind::NotImplemented,
                    "The in-memory warehouse does not interpret SQL",
                    format!("Statement '{}' is not supported", statement.name())
                );
            }
        }

        Ok(QueryOutcome::default())
    }
}

/// In-memory warehouse for tests.
///
/// [`MemoryWarehouse`] interprets the DDL [`Statement`]s issued by the import engine and
/// implements loading and merging natively, so imports can be exercised end to end without
/// BigQuery. Values are stored as optional strings. Time travel is not modelled, sources are
/// always read in their current state. Cloning is only possible within one dataset, clones
/// across datasets fail with [`ErrorKind::CloneNotSupported`] like they do in BigQuery for
/// some table types.
///
/// Every executed statement is recorded and any operation can be configured to fail with
/// [`MemoryWarehouse::fail_on`].
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table holding `rows`.
    pub async fn insert_table(&self, schema: TableSchema, rows: Vec<MemoryRow>) {
        let mut inner = self.inner.lock().await;
        inner.tables.insert(
            schema.ident.clone(),
            MemoryTable {
                schema,
                rows,
                view_source: None,
            },
        );
    }

    /// Returns the definition of a table or view.
    pub async fn table(&self, ident: &TableIdent) -> Option<TableSchema> {
        let inner = self.inner.lock().await;
        inner.tables.get(ident).map(|table| table.schema.clone())
    }

    /// Returns the rows of a table, or the rows a view currently selects.
    pub async fn rows(&self, ident: &TableIdent) -> Option<Vec<MemoryRow>> {
        let inner = self.inner.lock().await;
        inner.visible_rows(ident).ok()
    }

    /// Returns the identities of all tables and views.
    pub async fn table_idents(&self) -> Vec<TableIdent> {
        let inner = self.inner.lock().await;
        inner.tables.keys().cloned().collect()
    }

    /// Returns every statement executed so far, including failed ones.
    pub async fn statements(&self) -> Vec<Statement> {
        let inner = self.inner.lock().await;
        inner.statements.clone()
    }

    /// Makes `operation` fail until [`MemoryWarehouse::clear_failures`] is called.
    ///
    /// Operations are statement names (see [`Statement::name`]), [`LOAD_OPERATION`] and
    /// [`MERGE_OPERATION`].
    pub async fn fail_on(&self, operation: &str) {
        let mut inner = self.inner.lock().await;
        inner.failures.insert(operation.to_string());
    }

    pub async fn clear_failures(&self) {
        let mut inner = self.inner.lock().await;
        inner.failures.clear();
    }
}

impl SchemaReflector for MemoryWarehouse {
    async fn table_definition(&self, ident: &TableIdent) -> DriverResult<Option<TableSchema>> {
        let inner = self.inner.lock().await;
        Ok(inner.tables.get(ident).map(|table| table.schema.clone()))
    }

    async fn table_stats(&self, ident: &TableIdent) -> DriverResult<TableStats> {
        let inner = self.inner.lock().await;
        let table = inner.table(ident)?;
        if table.view_source.is_some() {
            return Ok(TableStats::default());
        }

        let size_bytes = table
            .rows
            .iter()
            .flatten()
            .map(|value| value.as_ref().map_or(0, |value| value.len() as u64))
            .sum();

        Ok(TableStats {
            row_count: table.rows.len() as u64,
            size_bytes,
        })
    }
}

impl QueryExecutor for MemoryWarehouse {
    async fn execute(&self, statement: &Statement) -> DriverResult<QueryOutcome> {
        let mut inner = self.inner.lock().await;
        inner.statements.push(statement.clone());
        inner.check_failure(statement.name())?;

        info!(statement = statement.name(), "executing statement in memory");

        inner.apply(statement)
    }
}

impl BulkLoader for MemoryWarehouse {
    async fn load(
        &self,
        source: &SourceDescriptor,
        target: &TableSchema,
        options: &LoadOptions,
    ) -> DriverResult<LoadState> {
        let mut inner = self.inner.lock().await;
        inner.check_failure(LOAD_OPERATION)?;

        let source_columns = inner.table(source.table())?.schema.columns.clone();
        let mut rows = inner.visible_rows(source.table())?;
        rows.retain(|row| {
            source
                .where_filters
                .iter()
                .all(|filter| matches_filter(filter, &source_columns, row))
        });
        if source.limit > 0 {
            rows.truncate(source.limit as usize);
        }

        let mappings: Vec<ColumnMapping> = if options.mappings.is_empty() {
            source
                .selected_columns
                .iter()
                .map(|name| ColumnMapping::new(name, name))
                .collect()
        } else {
            options.mappings.clone()
        };

        let target_table = inner.table(&target.ident)?;
        let target_columns = target_table.schema.columns.clone();
        let mut projection = Vec::with_capacity(mappings.len());
        for mapping in &mappings {
            let Some(from) = position(&source_columns, &mapping.source_column_name) else {
                bail!(
                    ErrorKind::DestinationQueryFailed,
                    "Unrecognized source column",
                    format!(
                        "Unrecognized name: {} in {}",
                        mapping.source_column_name,
                        source.table()
                    )
                );
            };
            let Some(to) = position(&target_columns, &mapping.destination_column_name) else {
                bail!(
                    ErrorKind::DestinationQueryFailed,
                    "Unrecognized target column",
                    format!(
                        "Column {} is not present in table {}",
                        mapping.destination_column_name, target.ident
                    )
                );
            };
            projection.push((from, to));
        }

        let mut loaded = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut target_row: MemoryRow = vec![None; target_columns.len()];
            for (from, to) in &projection {
                let value = row[*from].clone();
                check_length(&target_columns, *to, value.as_deref())?;
                target_row[*to] = value;
            }
            loaded.push(target_row);
        }

        let count = loaded.len() as u64;
        inner.table_mut(&target.ident)?.rows.extend(loaded);

        Ok(LoadState {
            rows: count,
            columns: mappings
                .into_iter()
                .map(|mapping| mapping.destination_column_name)
                .collect(),
        })
    }
}

impl FinalTableMerger for MemoryWarehouse {
    async fn merge_to_final(
        &self,
        staging: &TableSchema,
        destination: &TableSchema,
        options: &ImportOptions,
        load_state: &LoadState,
    ) -> DriverResult<ImportResult> {
        let mut inner = self.inner.lock().await;
        inner.check_failure(MERGE_OPERATION)?;

        if options.is_incremental() && options.dedup_type == DedupType::UpdateDuplicates {
            bail!(
                ErrorKind::NotImplemented,
                "Incremental import with updating duplicates is not implemented",
                format!("Cannot merge into \"{}\"", destination.ident)
            );
        }

        let staging_table = inner.table(&staging.ident)?;
        let staging_columns = staging_table.schema.columns.clone();
        let mut staged_rows = staging_table.rows.clone();
        let mut timers = Vec::new();

        if !options.dedup_columns.is_empty() {
            let started = Instant::now();
            let key_positions: Vec<usize> = options
                .dedup_columns
                .iter()
                .filter_map(|name| position(&staging_columns, name))
                .collect();
            let mut seen = HashSet::new();
            staged_rows.retain(|row| {
                let key: Vec<Option<String>> =
                    key_positions.iter().map(|p| row[*p].clone()).collect();
                seen.insert(key)
            });
            timers.push(Timer::new("dedup", started.elapsed()));
        }

        let started = Instant::now();
        let columns = imported_columns(destination, load_state, options);
        let destination_columns = inner.table(&destination.ident)?.schema.columns.clone();
        let timestamp_position = options
            .timestamp_column_name
            .as_deref()
            .and_then(|name| position(&destination_columns, name));
        let now = Utc::now().to_rfc3339();

        let mut merged = Vec::with_capacity(staged_rows.len());
        for row in &staged_rows {
            let mut target_row: MemoryRow = vec![None; destination_columns.len()];
            for name in &columns {
                let (Some(from), Some(to)) = (
                    position(&staging_columns, name),
                    position(&destination_columns, name),
                ) else {
                    continue;
                };
                let converts_empty = options
                    .convert_empty_to_null_columns
                    .iter()
                    .any(|convert| names_eq(convert, name));
                target_row[to] = match &row[from] {
                    Some(value) if converts_empty && value.is_empty() => None,
                    value => value.clone(),
                };
            }
            if let Some(position) = timestamp_position {
                target_row[position] = Some(now.clone());
            }
            merged.push(target_row);
        }

        let imported_rows_count = merged.len() as u64;
        let table = inner.table_mut(&destination.ident)?;
        match options.import_type {
            ImportType::Incremental => table.rows.extend(merged),
            _ => table.rows = merged,
        }
        timers.push(Timer::new("insertIntoTargetFromStaging", started.elapsed()));

        Ok(ImportResult {
            imported_rows_count,
            imported_columns: columns,
            timers,
        })
    }
}

/// Connecting hands out a handle sharing the state of this warehouse.
impl WarehouseConnector for MemoryWarehouse {
    type Credentials = ();
    type Warehouse = MemoryWarehouse;

    async fn connect(
        &self,
        _credentials: &(),
        _runtime_options: &RuntimeOptions,
    ) -> DriverResult<MemoryWarehouse> {
        Ok(self.clone())
    }
}

fn position(columns: &ColumnSet, name: &str) -> Option<usize> {
    columns
        .iter()
        .position(|column| names_eq(&column.name, name))
}

/// Evaluates a filter with SQL semantics, NULL never matches.
fn matches_filter(filter: &WhereFilter, columns: &ColumnSet, row: &MemoryRow) -> bool {
    let Some(value) = position(columns, &filter.column).and_then(|p| row[p].as_deref()) else {
        return false;
    };
    let numeric = filter.data_type.is_some();

    match (filter.operator, filter.values.as_slice()) {
        (WhereOperator::Eq, values) => values.iter().any(|v| compare(value, v, numeric).is_eq()),
        (WhereOperator::Ne, values) => values.iter().all(|v| compare(value, v, numeric).is_ne()),
        (operator, [v]) => {
            let ordering = compare(value, v, numeric);
            match operator {
                WhereOperator::Gt => ordering.is_gt(),
                WhereOperator::Ge => ordering.is_ge(),
                WhereOperator::Lt => ordering.is_lt(),
                _ => ordering.is_le(),
            }
        }
        _ => false,
    }
}

fn compare(value: &str, other: &str, numeric: bool) -> std::cmp::Ordering {
    if numeric && let (Ok(a), Ok(b)) = (value.parse::<f64>(), other.parse::<f64>()) {
        return a.total_cmp(&b);
    }

    value.cmp(other)
}

/// Fails like BigQuery when a value exceeds the declared string length of its column.
fn check_length(columns: &ColumnSet, position: usize, value: Option<&str>) -> DriverResult<()> {
    let column = &columns.as_slice()[position];
    let (Some(value), Some(length)) = (value, column.length.as_deref()) else {
        return Ok(());
    };
    if !column.is_string() {
        return Ok(());
    }
    let Ok(max) = length.parse::<usize>() else {
        return Ok(());
    };

    let actual = value.chars().count();
    if actual > max {
        let message = format!(
            "Field {name}: STRING({length}) has maximum length {max} but got a value with length {actual} on field {name}.",
            name = column.name
        );
        return Err(maximum_length_overflow(&message).unwrap_or_else(|| {
            driver_error!(
                ErrorKind::DestinationQueryFailed,
                "Value exceeds column length",
                message
            )
        }));
    }

    Ok(())
}
