//! Staging table synthesis.
//!
//! A staging table receives the raw rows of one import before they are moved into the
//! destination. It lives in the destination dataset under a unique generated name and is dropped
//! once the import finishes.

use uuid::Uuid;

use crate::error::DriverResult;
use crate::types::{Column, ColumnMapping, ColumnSet, TableIdent, TableSchema};

/// Derives staging table schemas from a destination schema.
#[derive(Debug, Clone)]
pub struct StagingTableSynthesizer {
    prefix: String,
}

impl StagingTableSynthesizer {
    pub fn new(prefix: impl Into<String>) -> StagingTableSynthesizer {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Synthesizes a staging table with one column per source column name, in the given order.
    ///
    /// Columns known to the destination keep their type, length and default. Unknown columns are
    /// generic strings. Every column is nullable and the table has no primary key.
    pub fn from_source_column_names<S: AsRef<str>>(
        &self,
        destination: &TableSchema,
        source_column_names: &[S],
    ) -> DriverResult<TableSchema> {
        let columns = source_column_names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                match destination.column(name) {
                    Some(column) => column.renamed(name).with_nullable(true),
                    None => Column::string(name),
                }
            })
            .collect();

        Ok(TableSchema::new(self.next_ident(destination), ColumnSet::new(columns)?).temporary())
    }

    /// Synthesizes a staging table with one column per mapping, in mapping order.
    ///
    /// Columns known to the destination keep their type, length and default and stay non-nullable
    /// when they are part of the destination primary key. Unknown columns are nullable generic
    /// strings. The destination primary key is carried over for the mapped key columns.
    pub fn from_column_mappings(
        &self,
        destination: &TableSchema,
        mappings: &[ColumnMapping],
    ) -> DriverResult<TableSchema> {
        let columns = mappings
            .iter()
            .map(|mapping| {
                let name = &mapping.destination_column_name;
                match destination.column(name) {
                    Some(column) => column
                        .renamed(name)
                        .with_nullable(!destination.is_primary_key(name)),
                    None => Column::string(name),
                }
            })
            .collect();
        let columns = ColumnSet::new(columns)?;

        let primary_keys = destination
            .primary_keys
            .iter()
            .filter(|pk| columns.contains(pk))
            .cloned()
            .collect();

        Ok(
            TableSchema::new(self.next_ident(destination), columns)
                .with_primary_keys(primary_keys)
                .temporary(),
        )
    }

    fn next_ident(&self, destination: &TableSchema) -> TableIdent {
        TableIdent::new(
            destination.ident.schema.clone(),
            format!("{}{}", self.prefix, Uuid::new_v4().simple()),
        )
    }
}
