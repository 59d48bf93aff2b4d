use crate::bail;
use crate::error::{DriverResult, ErrorKind};
use crate::sql::bindings::{QueryBindings, QueryParameter};
use crate::sql::ident::{quote_column, quote_columns, quote_table};
use crate::sql::statement::SqlQuery;
use crate::types::{TableSchema, WhereFilter, WhereOperator};

/// Prefix of the named bindings holding filter values.
const FILTER_BINDING_PREFIX: &str = "dcValue";

/// Types a bound string value cannot be cast to.
const NON_CASTABLE_TYPES: [&str; 2] = ["GEOGRAPHY", "JSON"];

/// Builds the SELECT used to export a subset of a source table.
///
/// The query projects the requested columns (all when empty) and applies row filters, a row
/// limit and time travel. Filter values are always passed as named string bindings and cast to
/// the filter data type, or to the type of a non string source column, inside the query.
#[derive(Debug, Default)]
pub struct ExportQueryBuilder;

impl ExportQueryBuilder {
    pub fn new() -> ExportQueryBuilder {
        Self
    }

    pub fn build(
        &self,
        source: &TableSchema,
        columns: &[String],
        filters: &[WhereFilter],
        limit: u64,
        seconds: u64,
    ) -> DriverResult<SqlQuery> {
        let projection = if columns.is_empty() {
            "*".to_string()
        } else {
            quote_columns(columns)?
        };

        let mut sql = format!("select {projection} from {}", quote_table(&source.ident)?);

        if seconds > 0 {
            sql.push_str(&format!(
                " for system_time as of timestamp_sub(current_timestamp(), interval {seconds} second)"
            ));
        }

        let mut bindings = QueryBindings::new();
        if !filters.is_empty() {
            let conditions = filters
                .iter()
                .enumerate()
                .map(|(index, filter)| {
                    let name = format!("{FILTER_BINDING_PREFIX}{}", index + 1);
                    filter_condition(filter, source, &name, &mut bindings)
                })
                .collect::<DriverResult<Vec<_>>>()?;

            sql.push_str(" where ");
            sql.push_str(&conditions.join(" and "));
        }

        if limit > 0 {
            sql.push_str(&format!(" limit {limit}"));
        }

        Ok(SqlQuery::new(sql, bindings))
    }
}

/// Renders one filter condition and binds its values under `name`.
fn filter_condition(
    filter: &WhereFilter,
    source: &TableSchema,
    name: &str,
    bindings: &mut QueryBindings,
) -> DriverResult<String> {
    let column = quote_column(&filter.column)?;
    let (column, value_type) = match &filter.data_type {
        Some(data_type) => {
            let data_type = cast_type(data_type)?;
            (format!("safe_cast({column} as {data_type})"), Some(data_type))
        }
        None => (column, column_value_type(source, &filter.column)),
    };

    match filter.values.as_slice() {
        [] => bail!(
            ErrorKind::ValidationError,
            "Where filter has no values",
            format!("Filter on column '{}' must have at least one value", filter.column)
        ),
        [value] => {
            bindings.insert(name, QueryParameter::String(value.clone()))?;
            let value = match &value_type {
                Some(value_type) => format!("safe_cast(@{name} as {value_type})"),
                None => format!("@{name}"),
            };
            Ok(format!("{column} {} {value}", filter.operator))
        }
        values => {
            let membership = match filter.operator {
                WhereOperator::Eq => "in",
                WhereOperator::Ne => "not in",
                operator => bail!(
                    ErrorKind::ValidationError,
                    "Where filter operator does not support multiple values",
                    format!(
                        "Filter on column '{}' uses '{operator}' with {} values, only '=' and '<>' accept several values",
                        filter.column,
                        values.len()
                    )
                ),
            };
            bindings.insert(name, QueryParameter::StringArray(values.to_vec()))?;
            let values = match &value_type {
                Some(value_type) => format!(
                    "(select safe_cast(value as {value_type}) from unnest(@{name}) as value)"
                ),
                None => format!("unnest(@{name})"),
            };
            Ok(format!("{column} {membership} {values}"))
        }
    }
}

/// Type of a source column that bound string values must be cast to before comparing.
fn column_value_type(source: &TableSchema, name: &str) -> Option<String> {
    let column = source.column(name)?;
    if column.is_string() {
        return None;
    }

    let typ = column.typ.to_uppercase();
    let castable = typ.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        && !NON_CASTABLE_TYPES.contains(&typ.as_str());

    castable.then_some(typ)
}

/// Validates a cast target type, e.g. `INT64` or `NUMERIC(10,2)`.
fn cast_type(data_type: &str) -> DriverResult<String> {
    let valid = !data_type.is_empty()
        && data_type
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '(' | ')' | ',' | ' '));

    if !valid {
        bail!(
            ErrorKind::ValidationError,
            "Invalid where filter data type",
            format!("'{data_type}' is not a valid type name")
        );
    }

    Ok(data_type.to_uppercase())
}
