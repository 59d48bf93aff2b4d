//! Collaborators the import engine runs against.
//!
//! The engine never talks to BigQuery directly. It reflects schemas through a
//! [`SchemaReflector`], issues typed [`Statement`]s through a [`QueryExecutor`], moves rows with a
//! [`BulkLoader`] and finishes staged imports with a [`FinalTableMerger`].

use std::future::Future;

use crate::error::DriverResult;
use crate::source::SourceDescriptor;
use crate::sql::Statement;
use crate::types::{
    ColumnMapping, ImportOptions, ImportResult, LoadState, RuntimeOptions, TableIdent,
    TableSchema, TableStats,
};

mod sql_loader;
mod sql_merger;

pub use sql_loader::SqlBulkLoader;
pub use sql_merger::SqlFinalTableMerger;
pub(crate) use sql_merger::imported_columns;

/// Reads table definitions and statistics from the warehouse.
///
/// Definitions are read fresh on every call, implementations must not cache them since tables
/// can be changed concurrently by other clients.
pub trait SchemaReflector {
    /// Returns the definition of a table or view, [`None`] when it does not exist.
    fn table_definition(
        &self,
        ident: &TableIdent,
    ) -> impl Future<Output = DriverResult<Option<TableSchema>>> + Send;

    /// Returns the row count and size of a table.
    fn table_stats(&self, ident: &TableIdent) -> impl Future<Output = DriverResult<TableStats>> + Send;
}

impl<R> SchemaReflector for &R
where
    R: SchemaReflector + Sync,
{
    fn table_definition(
        &self,
        ident: &TableIdent,
    ) -> impl Future<Output = DriverResult<Option<TableSchema>>> + Send {
        (**self).table_definition(ident)
    }

    fn table_stats(&self, ident: &TableIdent) -> impl Future<Output = DriverResult<TableStats>> + Send {
        (**self).table_stats(ident)
    }
}

/// Outcome of a single executed statement.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct QueryOutcome {
    /// Number of rows inserted, updated or deleted, when the statement modified data.
    pub affected_rows: Option<u64>,
}

/// Executes DDL and DML statements.
pub trait QueryExecutor {
    fn execute(&self, statement: &Statement)
    -> impl Future<Output = DriverResult<QueryOutcome>> + Send;
}

impl<E> QueryExecutor for &E
where
    E: QueryExecutor + Sync,
{
    fn execute(&self, statement: &Statement)
    -> impl Future<Output = DriverResult<QueryOutcome>> + Send {
        (**self).execute(statement)
    }
}

/// Options of a bulk load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    /// Mapping from selected source columns to target columns. Empty loads every source column
    /// into the same named target column.
    pub mappings: Vec<ColumnMapping>,
    /// Whether every loaded value is cast to the generic string type.
    pub cast_to_string: bool,
}

/// Copies the rows described by a [`SourceDescriptor`] into a target table.
pub trait BulkLoader {
    fn load(
        &self,
        source: &SourceDescriptor,
        target: &TableSchema,
        options: &LoadOptions,
    ) -> impl Future<Output = DriverResult<LoadState>> + Send;
}

/// Moves staged rows into the final destination table.
pub trait FinalTableMerger {
    fn merge_to_final(
        &self,
        staging: &TableSchema,
        destination: &TableSchema,
        options: &ImportOptions,
        load_state: &LoadState,
    ) -> impl Future<Output = DriverResult<ImportResult>> + Send;
}

/// Everything an import needs from the warehouse.
pub trait Warehouse: SchemaReflector + QueryExecutor + BulkLoader + FinalTableMerger + Sync {}

impl<T> Warehouse for T where T: SchemaReflector + QueryExecutor + BulkLoader + FinalTableMerger + Sync {}

/// Opens a [`Warehouse`] for one invocation from caller supplied credentials.
pub trait WarehouseConnector {
    type Credentials;
    type Warehouse: Warehouse;

    fn connect(
        &self,
        credentials: &Self::Credentials,
        runtime_options: &RuntimeOptions,
    ) -> impl Future<Output = DriverResult<Self::Warehouse>> + Send;
}
