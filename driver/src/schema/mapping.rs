use tracing::debug;

use crate::bail;
use crate::error::{DriverResult, ErrorKind};
use crate::types::{ColumnMapping, ColumnSet, TableSchema};

/// Derives destination columns from a source schema and a column mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct ColumnMappingResolver;

impl ColumnMappingResolver {
    /// Resolves the destination columns.
    ///
    /// An empty mapping is the identity: every source column in source order. Otherwise one column
    /// per mapping in mapping order, carrying the definition of the matched source column under the
    /// destination name. All unknown source names are reported in a single error.
    pub fn resolve(source: &TableSchema, mappings: &[ColumnMapping]) -> DriverResult<ColumnSet> {
        if mappings.is_empty() {
            return Ok(source.columns.clone());
        }

        let mut columns = Vec::with_capacity(mappings.len());
        let mut missing = Vec::new();

        for mapping in mappings {
            match source.column(&mapping.source_column_name) {
                Some(column) => columns.push(column.renamed(&mapping.destination_column_name)),
                None => missing.push(mapping.source_column_name.as_str()),
            }
        }

        if !missing.is_empty() {
            bail!(
                ErrorKind::ColumnsMismatch,
                "Mapped columns are missing in the source table",
                missing_columns_detail(&missing, &source.ident.to_string())
            );
        }

        debug!(source = %source.ident, columns = columns.len(), "resolved column mapping");

        ColumnSet::new(columns)
    }
}

/// Renders the detail listing every missing column of a table.
pub(crate) fn missing_columns_detail(missing: &[&str], table: &str) -> String {
    let names = missing
        .iter()
        .map(|name| format!("\"{name}\""))
        .collect::<Vec<_>>()
        .join(", ");

    format!("Columns {names} not found in table \"{table}\"")
}
