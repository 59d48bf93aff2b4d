use crate::driver_error;
use crate::error::{DriverResult, ErrorKind};
use crate::types::TableIdent;

/// Sanitizes a BigQuery identifier for safe backtick quoting.
///
/// Rejects empty identifiers and identifiers containing control characters. Internal backticks
/// and backslashes are escaped so the resulting value can be wrapped in backticks without
/// altering the identifier or allowing statement breaks.
fn sanitize_identifier(identifier: &str, context: &str) -> DriverResult<String> {
    if identifier.is_empty() {
        return Err(driver_error!(
            ErrorKind::ValidationError,
            "Invalid BigQuery identifier",
            format!("{context} cannot be empty")
        ));
    }

    if identifier.chars().any(char::is_control) {
        return Err(driver_error!(
            ErrorKind::ValidationError,
            "Invalid BigQuery identifier",
            format!("{context} contains control characters")
        ));
    }

    let mut escaped = String::with_capacity(identifier.len());

    for ch in identifier.chars() {
        match ch {
            '`' => escaped.push_str("\\`"),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(ch),
        }
    }

    Ok(escaped)
}

/// Quotes a column name, e.g. `` `my col` ``.
pub fn quote_column(name: &str) -> DriverResult<String> {
    Ok(format!(
        "`{}`",
        sanitize_identifier(name, "BigQuery column name")?
    ))
}

/// Quotes a table identifier as `` `dataset`.`table` ``.
pub fn quote_table(ident: &TableIdent) -> DriverResult<String> {
    let schema = sanitize_identifier(&ident.schema, "BigQuery dataset id")?;
    let table = sanitize_identifier(&ident.table, "BigQuery table id")?;

    Ok(format!("`{schema}`.`{table}`"))
}

/// Quotes a list of column names and joins them with commas.
pub fn quote_columns<S: AsRef<str>>(names: &[S]) -> DriverResult<String> {
    Ok(names
        .iter()
        .map(|name| quote_column(name.as_ref()))
        .collect::<DriverResult<Vec<_>>>()?
        .join(", "))
}
