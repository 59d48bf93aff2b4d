use crate::error::DriverResult;
use crate::sql::ident::quote_column;
use crate::types::Column;

const ARRAY_TYPE: &str = "ARRAY";
const STRUCT_TYPE: &str = "STRUCT";

/// Renders the type of a column, e.g. `STRING(10)`, `NUMERIC(10,2)` or `ARRAY<INT64>`.
pub fn column_type_sql(column: &Column) -> DriverResult<String> {
    let typ = column.typ.as_str();

    if let Some(fields) = &column.fields {
        let fields = fields
            .iter()
            .map(|field| Ok(format!("{} {}", quote_column(&field.name)?, column_type_sql(field)?)))
            .collect::<DriverResult<Vec<_>>>()?
            .join(", ");

        return Ok(match typ {
            ARRAY_TYPE => format!("ARRAY<STRUCT<{fields}>>"),
            _ => format!("STRUCT<{fields}>"),
        });
    }

    Ok(match (typ, column.length.as_deref()) {
        (_, None) | (_, Some("")) => typ.to_string(),
        (ARRAY_TYPE | STRUCT_TYPE, Some(inner)) => format!("{typ}<{inner}>"),
        (_, Some(length)) => format!("{typ}({length})"),
    })
}

/// Renders the full definition of a column without its name, e.g. `STRING(10) not null`.
pub fn column_definition_sql(column: &Column) -> DriverResult<String> {
    let mut definition = column_type_sql(column)?;

    if let Some(default) = &column.default {
        definition.push_str(" default ");
        definition.push_str(default);
    }

    // Arrays cannot be declared NOT NULL, an absent array is stored as empty.
    if !column.nullable && column.typ != ARRAY_TYPE {
        definition.push_str(" not null");
    }

    Ok(definition)
}

/// Renders the column specification used in CREATE TABLE statements.
pub fn column_spec(column: &Column) -> DriverResult<String> {
    Ok(format!(
        "{} {}",
        quote_column(&column.name)?,
        column_definition_sql(column)?
    ))
}
