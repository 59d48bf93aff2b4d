use crate::test_utils::memory_warehouse::MemoryRow;
use crate::types::{
    Column, ColumnMapping, ColumnSet, ImportCommand, ImportOptions, SourceTableMapping,
    TableIdent, TableSchema, Timer,
};

/// Creates a nullable column without length or default.
pub fn test_column(name: &str, typ: &str) -> Column {
    Column::new(name, typ, None, true, None)
}

/// Creates a table schema from columns.
///
/// # Panics
///
/// Panics if two columns share a name.
pub fn test_table(ident: TableIdent, columns: Vec<Column>) -> TableSchema {
    TableSchema::new(
        ident,
        ColumnSet::new(columns).expect("Test table columns must have unique names"),
    )
}

/// Creates a table schema with nullable string columns.
pub fn string_table(ident: TableIdent, names: &[&str]) -> TableSchema {
    test_table(ident, names.iter().map(|name| Column::string(*name)).collect())
}

/// Builds memory warehouse rows where every value is present.
pub fn test_rows(rows: &[&[&str]]) -> Vec<MemoryRow> {
    rows.iter()
        .map(|row| row.iter().map(|value| Some(value.to_string())).collect())
        .collect()
}

/// Builds column mappings from `(source, destination)` pairs.
pub fn test_mappings(pairs: &[(&str, &str)]) -> Vec<ColumnMapping> {
    pairs
        .iter()
        .map(|(source, destination)| ColumnMapping::new(*source, *destination))
        .collect()
}

/// Builds a command importing the whole `source` into `destination`.
pub fn import_command(
    source: TableIdent,
    destination: TableIdent,
    import_options: ImportOptions,
) -> ImportCommand {
    ImportCommand {
        source: SourceTableMapping::new(source),
        destination,
        import_options,
    }
}

/// Asserts that a table has exactly the expected column names in order.
pub fn assert_column_names(schema: &TableSchema, expected: &[&str]) {
    let actual = schema.column_names();
    assert_eq!(
        actual, expected,
        "column names of {} do not match",
        schema.ident
    );
}

/// Asserts that a table has exactly the expected `(name, type)` columns in order.
pub fn assert_column_types(schema: &TableSchema, expected: &[(&str, &str)]) {
    let actual: Vec<(&str, &str)> = schema
        .columns
        .iter()
        .map(|column| (column.name.as_str(), column.typ.as_str()))
        .collect();
    assert_eq!(
        actual, expected,
        "column types of {} do not match",
        schema.ident
    );
}

/// Asserts the names of reported timers in order.
pub fn assert_timer_names(timers: &[Timer], expected: &[&str]) {
    let actual: Vec<&str> = timers.iter().map(|timer| timer.name.as_str()).collect();
    assert_eq!(actual, expected, "timer names do not match");
}
