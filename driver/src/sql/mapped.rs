use crate::bail;
use crate::error::{DriverResult, ErrorKind};
use crate::sql::ident::{quote_column, quote_table};
use crate::sql::statement::SqlQuery;
use crate::types::{ColumnMapping, STRING_TYPE, TableIdent};

/// Alias of the base relation in mapped selects.
const SOURCE_ALIAS: &str = "src";

/// Relation a mapped select reads from.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlSourceBase {
    Table(TableIdent),
    Query(SqlQuery),
}

/// Renders a SELECT that projects a base relation through a column mapping.
///
/// Without mappings the base is selected as is. With mappings every source column is projected
/// under its destination name, optionally cast to the generic string type.
#[derive(Debug, Clone)]
pub struct MappedSqlSourceBuilder {
    mappings: Vec<ColumnMapping>,
    cast_to_string: bool,
    base: SqlSourceBase,
}

impl MappedSqlSourceBuilder {
    /// Creates a builder, failing when the base names no table and carries no query.
    pub fn new(
        mappings: Vec<ColumnMapping>,
        cast_to_string: bool,
        base: SqlSourceBase,
    ) -> DriverResult<MappedSqlSourceBuilder> {
        match &base {
            SqlSourceBase::Table(ident) if ident.schema.is_empty() || ident.table.is_empty() => {
                bail!(
                    ErrorKind::ValidationError,
                    "Mapped source requires a base query or a schema and table name",
                    format!("Got schema '{}' and table '{}'", ident.schema, ident.table)
                );
            }
            SqlSourceBase::Query(query) if query.sql.trim().is_empty() => {
                bail!(
                    ErrorKind::ValidationError,
                    "Mapped source requires a base query or a schema and table name",
                    "The base query is empty"
                );
            }
            _ => {}
        }

        Ok(Self {
            mappings,
            cast_to_string,
            base,
        })
    }

    /// Renders the select together with the bindings of the base query.
    pub fn render(&self) -> DriverResult<SqlQuery> {
        if self.mappings.is_empty() {
            return match &self.base {
                SqlSourceBase::Table(ident) => Ok(SqlQuery::new(
                    format!("select * from {}", quote_table(ident)?),
                    Default::default(),
                )),
                SqlSourceBase::Query(query) => Ok(query.clone()),
            };
        }

        let alias = quote_column(SOURCE_ALIAS)?;
        let projection = self
            .mappings
            .iter()
            .map(|mapping| {
                let source = format!("{alias}.{}", quote_column(&mapping.source_column_name)?);
                let destination = quote_column(&mapping.destination_column_name)?;
                Ok(if self.cast_to_string {
                    format!("cast({source} as {STRING_TYPE}) as {destination}")
                } else {
                    format!("{source} as {destination}")
                })
            })
            .collect::<DriverResult<Vec<_>>>()?
            .join(", ");

        let (relation, bindings) = match &self.base {
            SqlSourceBase::Table(ident) => (quote_table(ident)?, Default::default()),
            SqlSourceBase::Query(query) => (format!("({})", query.sql), query.bindings.clone()),
        };

        Ok(SqlQuery::new(
            format!("select {projection} from {relation} as {alias}"),
            bindings,
        ))
    }
}
