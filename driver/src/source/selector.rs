use tracing::debug;

use crate::bail;
use crate::error::{DriverResult, ErrorKind};
use crate::schema::missing_columns_detail;
use crate::source::descriptor::{SourceDescriptor, SourceKind};
use crate::sql::ExportQueryBuilder;
use crate::types::{ColumnSet, NameIndex, SourceTableMapping, TableSchema, names_eq};
use crate::warehouse::SchemaReflector;

/// Decides how the rows of an import source are read.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceSelector;

impl SourceSelector {
    /// Reflects the source and builds its [`SourceDescriptor`].
    ///
    /// The source is read directly only when all of its columns are selected in their original
    /// order and no filter, limit or time travel applies. Otherwise a select is generated that
    /// projects only the selected columns.
    pub async fn select<R>(reflector: &R, mapping: &SourceTableMapping) -> DriverResult<SourceDescriptor>
    where
        R: SchemaReflector,
    {
        let Some(full_schema) = reflector.table_definition(&mapping.table).await? else {
            bail!(
                ErrorKind::ObjectNotFound,
                "Source table not found",
                format!("Table \"{}\" does not exist", mapping.table)
            );
        };

        let selected_columns = selected_columns(&full_schema, mapping);
        let filter_columns: Vec<String> = mapping
            .where_filters
            .iter()
            .map(|filter| filter.column.clone())
            .collect();

        let mut missing: Vec<&str> = Vec::new();
        for name in selected_columns.iter().chain(filter_columns.iter()) {
            if !full_schema.columns.contains(name) && !missing.iter().any(|m| names_eq(m, name)) {
                missing.push(name);
            }
        }
        if !missing.is_empty() {
            bail!(
                ErrorKind::ColumnsMismatch,
                "Selected columns are missing in the source table",
                missing_columns_detail(&missing, &full_schema.ident.to_string())
            );
        }

        let effective_schema = restrict_schema(&full_schema, &selected_columns)?;

        let requires_query = !is_full_column_set(&selected_columns, &full_schema)
            || mapping.limit > 0
            || mapping.seconds > 0
            || !mapping.where_filters.is_empty();

        let kind = if requires_query {
            let query = ExportQueryBuilder::new().build(
                &full_schema,
                &selected_columns,
                &mapping.where_filters,
                mapping.limit,
                mapping.seconds,
            )?;
            SourceKind::GeneratedQuery { query }
        } else {
            SourceKind::DirectTable {
                table: full_schema.ident.clone(),
                primary_keys: full_schema.primary_keys.clone(),
            }
        };

        debug!(
            source = %full_schema.ident,
            direct = !requires_query,
            columns = selected_columns.len(),
            "selected import source"
        );

        Ok(SourceDescriptor {
            kind,
            selected_columns,
            effective_schema,
            full_schema,
            where_filters: mapping.where_filters.clone(),
            limit: mapping.limit,
            seconds: mapping.seconds,
        })
    }
}

/// Returns whether `columns` names every column of `schema` in the same order.
pub fn is_full_column_set(columns: &[String], schema: &TableSchema) -> bool {
    columns.len() == schema.columns.len()
        && columns
            .iter()
            .zip(schema.columns.iter())
            .all(|(name, column)| names_eq(name, &column.name))
}

/// Source side names of the mapping, or every source column when there is no mapping.
///
/// A source column mapped several times is selected once.
fn selected_columns(schema: &TableSchema, mapping: &SourceTableMapping) -> Vec<String> {
    if mapping.column_mappings.is_empty() {
        return schema.column_names();
    }

    let mut selected: Vec<String> = Vec::with_capacity(mapping.column_mappings.len());
    for column_mapping in &mapping.column_mappings {
        let name = &column_mapping.source_column_name;
        if !selected.iter().any(|selected| names_eq(selected, name)) {
            selected.push(name.clone());
        }
    }

    selected
}

/// Restricts `schema` to `columns`, in the order of `columns`.
fn restrict_schema(schema: &TableSchema, columns: &[String]) -> DriverResult<TableSchema> {
    let selected = columns
        .iter()
        .filter_map(|name| schema.column(name).cloned())
        .collect::<Vec<_>>();

    let index = NameIndex::new(columns.iter().map(String::as_str)).unwrap_or_default();
    let primary_keys = schema
        .primary_keys
        .iter()
        .filter(|pk| index.contains(pk))
        .cloned()
        .collect();

    Ok(TableSchema::new(schema.ident.clone(), ColumnSet::new(selected)?)
        .with_kind(schema.kind)
        .with_primary_keys(primary_keys))
}
