use std::time::Instant;

use tracing::{debug, info};

use crate::bail;
use crate::error::{DriverResult, ErrorKind};
use crate::sql::{QueryBindings, SqlQuery, Statement, quote_column, quote_columns, quote_table};
use crate::types::{
    DedupType, ImportOptions, ImportResult, ImportType, LoadState, TableSchema, Timer, names_eq,
};
use crate::warehouse::{FinalTableMerger, QueryExecutor, SchemaReflector};

/// Name of the helper column ranking duplicates during deduplication.
const ROW_NUMBER_COLUMN: &str = "_row_number";

/// Moves staged rows into the destination with SQL statements.
///
/// Deduplication rewrites the staging table to one row per dedup key. A FULL import then replaces
/// the destination contents in a single transaction, an INCREMENTAL import appends to them.
///
/// Transactions report no affected rows, the imported row count of a FULL import is then read
/// from the destination statistics. An INCREMENTAL import without reported affected rows falls
/// back to the number of loaded rows.
#[derive(Debug, Clone)]
pub struct SqlFinalTableMerger<E> {
    executor: E,
}

impl<E> SqlFinalTableMerger<E> {
    pub fn new(executor: E) -> SqlFinalTableMerger<E> {
        Self { executor }
    }
}

impl<E> FinalTableMerger for SqlFinalTableMerger<E>
where
    E: QueryExecutor + SchemaReflector + Sync,
{
    async fn merge_to_final(
        &self,
        staging: &TableSchema,
        destination: &TableSchema,
        options: &ImportOptions,
        load_state: &LoadState,
    ) -> DriverResult<ImportResult> {
        if options.is_incremental() && options.dedup_type == DedupType::UpdateDuplicates {
            bail!(
                ErrorKind::NotImplemented,
                "Incremental import with updating duplicates is not implemented",
                format!("Cannot merge into \"{}\"", destination.ident)
            );
        }

        let mut timers = Vec::new();

        if !options.dedup_columns.is_empty() {
            let started = Instant::now();
            self.executor
                .execute(&dedup_statement(staging, &options.dedup_columns)?)
                .await?;
            timers.push(Timer::new("dedup", started.elapsed()));
        }

        let imported_columns = imported_columns(destination, load_state, options);
        let insert = insert_statement(staging, destination, &imported_columns, options)?;
        let statement = match options.import_type {
            ImportType::Incremental => insert,
            _ => Statement::Transaction {
                statements: vec![
                    Statement::TruncateTable {
                        table: destination.ident.clone(),
                    },
                    insert,
                ],
            },
        };

        let started = Instant::now();
        let outcome = self.executor.execute(&statement).await?;
        timers.push(Timer::new("insertIntoTargetFromStaging", started.elapsed()));

        let imported_rows_count = match outcome.affected_rows {
            Some(rows) => rows,
            None if options.is_incremental() => load_state.rows,
            None => {
                self.executor
                    .table_stats(&destination.ident)
                    .await?
                    .row_count
            }
        };

        info!(
            destination = %destination.ident,
            rows = imported_rows_count,
            import_type = ?options.import_type,
            "moved staged rows into destination"
        );

        Ok(ImportResult {
            imported_rows_count,
            imported_columns,
            timers,
        })
    }
}

/// Loaded columns that exist in the destination, excluding the timestamp column.
pub(crate) fn imported_columns(
    destination: &TableSchema,
    load_state: &LoadState,
    options: &ImportOptions,
) -> Vec<String> {
    load_state
        .columns
        .iter()
        .filter(|name| destination.column(name).is_some())
        .filter(|name| {
            options
                .timestamp_column_name
                .as_deref()
                .is_none_or(|timestamp| !names_eq(name, timestamp))
        })
        .cloned()
        .collect()
}

/// Rewrites the staging table keeping one row per dedup key.
fn dedup_statement(staging: &TableSchema, dedup_columns: &[String]) -> DriverResult<Statement> {
    let table = quote_table(&staging.ident)?;
    let row_number = quote_column(ROW_NUMBER_COLUMN)?;
    let sql = format!(
        "create or replace table {table} as select * except({row_number}) from \
         (select *, row_number() over (partition by {}) as {row_number} from {table}) \
         where {row_number} = 1",
        quote_columns(dedup_columns)?
    );

    debug!(staging = %staging.ident, ?dedup_columns, "deduplicating staging table");

    Ok(Statement::Raw {
        query: SqlQuery::new(sql, QueryBindings::new()),
    })
}

/// Builds the insert of staged rows into the destination.
fn insert_statement(
    staging: &TableSchema,
    destination: &TableSchema,
    columns: &[String],
    options: &ImportOptions,
) -> DriverResult<Statement> {
    let mut target_columns = columns.to_vec();
    let mut projection = columns
        .iter()
        .map(|name| {
            let column = quote_column(name)?;
            let converts_empty = options
                .convert_empty_to_null_columns
                .iter()
                .any(|convert| names_eq(convert, name));
            Ok(if converts_empty {
                format!("nullif({column}, '')")
            } else {
                column
            })
        })
        .collect::<DriverResult<Vec<_>>>()?;

    if let Some(timestamp) = &options.timestamp_column_name
        && destination.column(timestamp).is_some()
    {
        target_columns.push(timestamp.clone());
        projection.push("current_timestamp()".to_string());
    }

    let query = SqlQuery::new(
        format!(
            "select {} from {}",
            projection.join(", "),
            quote_table(&staging.ident)?
        ),
        QueryBindings::new(),
    );

    Ok(Statement::InsertSelect {
        target: destination.ident.clone(),
        columns: target_columns,
        query,
    })
}
