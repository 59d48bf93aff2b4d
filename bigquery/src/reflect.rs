use std::sync::LazyLock;

use driver::bail;
use driver::error::{DriverResult, ErrorKind};
use driver::sql::{QueryBindings, QueryParameter, SqlQuery, quote_column};
use driver::types::{Column, ColumnSet, TableIdent, TableKind, TableSchema, TableStats};
use driver::warehouse::SchemaReflector;
use regex::Regex;
use tracing::debug;

use crate::client::BigQueryClient;
use crate::error::bq_error_to_driver_error;

/// Name of the parameter holding the reflected table name.
const TABLE_NAME_PARAMETER: &str = "table_name";

/// Suffix BigQuery gives the name of primary key constraints.
const PRIMARY_KEY_CONSTRAINT_SUFFIX: &str = "pk$";

/// Splits a parameterized type such as `STRING(10)` or `NUMERIC(10, 2)`.
static PARAMETERIZED_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[A-Za-z0-9_]+)\s*\((?P<length>[0-9,\s]+)\)$")
        .expect("parameterized type pattern is valid")
});

impl BigQueryClient {
    /// Returns the quoted `project.dataset.INFORMATION_SCHEMA.<view>` path.
    fn information_schema(&self, dataset: &str, view: &str) -> DriverResult<String> {
        Ok(format!(
            "{}.{}.INFORMATION_SCHEMA.{view}",
            quote_column(self.project_id())?,
            quote_column(dataset)?
        ))
    }

    fn table_name_query(&self, sql: String, ident: &TableIdent) -> DriverResult<SqlQuery> {
        let mut bindings = QueryBindings::new();
        bindings.insert(
            TABLE_NAME_PARAMETER,
            QueryParameter::String(ident.table.clone()),
        )?;

        Ok(SqlQuery::new(sql, bindings))
    }

    async fn table_kind(&self, ident: &TableIdent) -> DriverResult<Option<TableKind>> {
        let sql = format!(
            "select table_type from {} where table_name = @{TABLE_NAME_PARAMETER}",
            self.information_schema(&ident.schema, "TABLES")?
        );
        let mut result = self.query(&self.table_name_query(sql, ident)?).await?;

        if !result.rows.next_row() {
            return Ok(None);
        }
        let table_type = result
            .rows
            .get_string_by_name("table_type")
            .map_err(bq_error_to_driver_error)?
            .unwrap_or_default();

        Ok(Some(match table_type.as_str() {
            "VIEW" | "MATERIALIZED VIEW" => TableKind::View,
            _ => TableKind::Table,
        }))
    }

    async fn table_columns(&self, ident: &TableIdent) -> DriverResult<Vec<Column>> {
        let sql = format!(
            "select column_name, data_type, is_nullable, column_default from {} \
             where table_name = @{TABLE_NAME_PARAMETER} order by ordinal_position",
            self.information_schema(&ident.schema, "COLUMNS")?
        );
        let mut result = self.query(&self.table_name_query(sql, ident)?).await?;

        let mut columns = Vec::new();
        while result.rows.next_row() {
            let name = result
                .rows
                .get_string_by_name("column_name")
                .map_err(bq_error_to_driver_error)?
                .unwrap_or_default();
            let data_type = result
                .rows
                .get_string_by_name("data_type")
                .map_err(bq_error_to_driver_error)?
                .unwrap_or_default();
            let nullable = result
                .rows
                .get_string_by_name("is_nullable")
                .map_err(bq_error_to_driver_error)?
                .is_none_or(|nullable| nullable == "YES");
            let default = result
                .rows
                .get_string_by_name("column_default")
                .map_err(bq_error_to_driver_error)?
                .filter(|default| default != "NULL");

            let (typ, length) = parse_data_type(&data_type);
            columns.push(Column::new(name, typ, length, nullable, default));
        }

        Ok(columns)
    }

    async fn primary_keys(&self, ident: &TableIdent) -> DriverResult<Vec<String>> {
        let sql = format!(
            "select column_name from {} where table_name = @{TABLE_NAME_PARAMETER} \
             and ends_with(constraint_name, '{PRIMARY_KEY_CONSTRAINT_SUFFIX}') \
             order by ordinal_position",
            self.information_schema(&ident.schema, "KEY_COLUMN_USAGE")?
        );
        let mut result = self.query(&self.table_name_query(sql, ident)?).await?;

        let mut primary_keys = Vec::new();
        while result.rows.next_row() {
            if let Some(name) = result
                .rows
                .get_string_by_name("column_name")
                .map_err(bq_error_to_driver_error)?
            {
                primary_keys.push(name);
            }
        }

        Ok(primary_keys)
    }
}

impl SchemaReflector for BigQueryClient {
    async fn table_definition(&self, ident: &TableIdent) -> DriverResult<Option<TableSchema>> {
        let Some(kind) = self.table_kind(ident).await? else {
            debug!(table = %ident, "table does not exist");
            return Ok(None);
        };

        let columns = ColumnSet::new(self.table_columns(ident).await?)?;
        let primary_keys = match kind {
            TableKind::Table => self.primary_keys(ident).await?,
            TableKind::View => Vec::new(),
        };

        Ok(Some(
            TableSchema::new(ident.clone(), columns)
                .with_kind(kind)
                .with_primary_keys(primary_keys),
        ))
    }

    async fn table_stats(&self, ident: &TableIdent) -> DriverResult<TableStats> {
        let sql = format!(
            "select row_count, size_bytes from {}.{}.__TABLES__ where table_id = @{TABLE_NAME_PARAMETER}",
            quote_column(self.project_id())?,
            quote_column(&ident.schema)?
        );
        let mut result = self.query(&self.table_name_query(sql, ident)?).await?;

        if !result.rows.next_row() {
            bail!(
                ErrorKind::ObjectNotFound,
                "Table not found",
                format!("Table \"{ident}\" does not exist")
            );
        }

        let row_count = result
            .rows
            .get_i64_by_name("row_count")
            .map_err(bq_error_to_driver_error)?
            .unwrap_or_default();
        let size_bytes = result
            .rows
            .get_i64_by_name("size_bytes")
            .map_err(bq_error_to_driver_error)?
            .unwrap_or_default();

        Ok(TableStats {
            row_count: u64::try_from(row_count).unwrap_or_default(),
            size_bytes: u64::try_from(size_bytes).unwrap_or_default(),
        })
    }
}

/// Splits an `INFORMATION_SCHEMA` data type into its base type and length.
///
/// Spaces inside the length are removed, `NUMERIC(10, 2)` becomes `("NUMERIC", Some("10,2"))`.
/// Types without parameters, including `ARRAY<...>` and `STRUCT<...>`, are kept whole.
fn parse_data_type(data_type: &str) -> (String, Option<String>) {
    let data_type = data_type.trim();

    match PARAMETERIZED_TYPE.captures(data_type) {
        Some(captures) => {
            let typ = captures["type"].to_string();
            let length: String = captures["length"]
                .chars()
                .filter(|ch| !ch.is_whitespace())
                .collect();
            (typ, Some(length))
        }
        None => (data_type.to_string(), None),
    }
}
