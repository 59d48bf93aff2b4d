use tracing::debug;

use crate::driver_error;
use crate::error::{DriverError, DriverResult, ErrorKind};
use crate::schema::mapping::missing_columns_detail;
use crate::schema::types::normalize_type;
use crate::sql::column_definition_sql;
use crate::types::{Column, ColumnSet, TableIdent, TableSchema, names_eq};

/// Driver managed column that is never expected from the source.
pub const SYSTEM_TIMESTAMP_COLUMN: &str = "_timestamp";

/// Validates that an existing destination can receive an expected column set.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaReconciler;

impl SchemaReconciler {
    /// Checks `expected` against the columns of `destination`.
    ///
    /// Runs the missing-in-source, missing-in-destination and per-column definition checks to
    /// completion and fails with every discrepancy at once. Nullability is not compared.
    pub fn validate_incremental(
        destination: &TableSchema,
        expected: &ColumnSet,
        source: &TableIdent,
    ) -> DriverResult<()> {
        let destination_columns = without_system_columns(destination.columns.iter());
        let expected_columns = without_system_columns(expected.iter());

        let mut errors: Vec<DriverError> = Vec::new();

        let missing_in_source: Vec<&str> = destination_columns
            .iter()
            .filter(|column| find(&expected_columns, &column.name).is_none())
            .map(|column| column.name.as_str())
            .collect();
        if !missing_in_source.is_empty() {
            errors.push(driver_error!(
                ErrorKind::ColumnsMismatch,
                "Destination columns are missing in the source",
                missing_columns_detail(&missing_in_source, &source.to_string())
            ));
        }

        let missing_in_destination: Vec<&str> = expected_columns
            .iter()
            .filter(|column| find(&destination_columns, &column.name).is_none())
            .map(|column| column.name.as_str())
            .collect();
        if !missing_in_destination.is_empty() {
            errors.push(driver_error!(
                ErrorKind::ColumnsMismatch,
                "Source columns are missing in the destination",
                missing_columns_detail(&missing_in_destination, &destination.ident.to_string())
            ));
        }

        let mut mismatches = Vec::new();
        for column in &expected_columns {
            let Some(actual) = find(&destination_columns, &column.name) else {
                continue;
            };

            if !Self::columns_match(column, actual) {
                mismatches.push(format!(
                    "Column \"{}\": source \"{}\", destination \"{}\"",
                    actual.name,
                    column_definition_sql(column)?,
                    column_definition_sql(actual)?
                ));
            }
        }
        if !mismatches.is_empty() {
            errors.push(driver_error!(
                ErrorKind::ColumnsMismatch,
                "Column definitions do not match",
                format!(
                    "Table \"{}\" cannot receive \"{source}\":\n{}",
                    destination.ident,
                    mismatches.join("\n")
                )
            ));
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }

        debug!(
            destination = %destination.ident,
            columns = expected.len(),
            "destination schema matches the source"
        );

        Ok(())
    }

    /// Returns whether a destination column can store the values of an expected column.
    ///
    /// A destination typed as the generic string type accepts any column. Otherwise the normalized
    /// types and the lengths must be equal.
    pub fn columns_match(expected: &Column, actual: &Column) -> bool {
        if actual.is_string() {
            return true;
        }

        normalize_type(&expected.typ) == normalize_type(&actual.typ)
            && expected.length.as_deref().unwrap_or("") == actual.length.as_deref().unwrap_or("")
    }
}

/// Drops the driver managed timestamp column, it is never compared between source and destination.
fn without_system_columns<'a>(columns: impl Iterator<Item = &'a Column>) -> Vec<&'a Column> {
    columns
        .filter(|column| !names_eq(&column.name, SYSTEM_TIMESTAMP_COLUMN))
        .collect()
}

fn find<'a>(columns: &[&'a Column], name: &str) -> Option<&'a Column> {
    columns
        .iter()
        .find(|column| names_eq(&column.name, name))
        .copied()
}
