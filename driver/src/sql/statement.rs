use crate::error::DriverResult;
use crate::sql::bindings::QueryBindings;
use crate::sql::ident::{quote_column, quote_columns, quote_table};
use crate::sql::types::column_spec;
use crate::types::{TableIdent, TableSchema};

/// SQL text together with its named bindings.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct SqlQuery {
    pub sql: String,
    pub bindings: QueryBindings,
}

impl SqlQuery {
    pub fn new(sql: impl Into<String>, bindings: QueryBindings) -> SqlQuery {
        Self {
            sql: sql.into(),
            bindings,
        }
    }
}

/// Statement issued against the warehouse.
///
/// Statements are typed so that a backend can either render them with [`Statement::to_sql`] or
/// interpret them directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable {
        schema: TableSchema,
    },
    DropTable {
        table: TableIdent,
    },
    DropView {
        view: TableIdent,
    },
    TruncateTable {
        table: TableIdent,
    },
    CreateView {
        view: TableIdent,
        source: TableIdent,
    },
    CloneTable {
        source: TableIdent,
        destination: TableIdent,
    },
    CreateTableAsSelect {
        destination: TableIdent,
        source: TableIdent,
    },
    InsertSelect {
        target: TableIdent,
        columns: Vec<String>,
        query: SqlQuery,
    },
    /// Statements executed atomically in one multi-statement transaction.
    Transaction {
        statements: Vec<Statement>,
    },
    Raw {
        query: SqlQuery,
    },
}

impl Statement {
    /// Short name of the statement used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Statement::CreateTable { .. } => "create_table",
            Statement::DropTable { .. } => "drop_table",
            Statement::DropView { .. } => "drop_view",
            Statement::TruncateTable { .. } => "truncate_table",
            Statement::CreateView { .. } => "create_view",
            Statement::CloneTable { .. } => "clone_table",
            Statement::CreateTableAsSelect { .. } => "create_table_as_select",
            Statement::InsertSelect { .. } => "insert_select",
            Statement::Transaction { .. } => "transaction",
            Statement::Raw { .. } => "raw",
        }
    }

    /// Renders the statement as GoogleSQL.
    pub fn to_sql(&self) -> DriverResult<String> {
        let sql = match self {
            Statement::CreateTable { schema } => {
                format!(
                    "create table {} {}",
                    quote_table(&schema.ident)?,
                    create_columns_spec(schema)?
                )
            }
            Statement::DropTable { table } => {
                format!("drop table if exists {}", quote_table(table)?)
            }
            Statement::DropView { view } => {
                format!("drop view if exists {}", quote_table(view)?)
            }
            Statement::TruncateTable { table } => {
                format!("truncate table {}", quote_table(table)?)
            }
            Statement::CreateView { view, source } => format!(
                "create view {} as select * from {}",
                quote_table(view)?,
                quote_table(source)?
            ),
            Statement::CloneTable {
                source,
                destination,
            } => format!(
                "create table {} clone {}",
                quote_table(destination)?,
                quote_table(source)?
            ),
            Statement::CreateTableAsSelect {
                destination,
                source,
            } => format!(
                "create table {} as select * from {}",
                quote_table(destination)?,
                quote_table(source)?
            ),
            Statement::InsertSelect {
                target,
                columns,
                query,
            } => format!(
                "insert into {} ({}) {}",
                quote_table(target)?,
                quote_columns(columns)?,
                query.sql
            ),
            Statement::Transaction { statements } => {
                let mut sql = String::from("begin transaction;\n");
                for statement in statements {
                    sql.push_str(&statement.to_sql()?);
                    sql.push_str(";\n");
                }
                sql.push_str("commit transaction;");
                sql
            }
            Statement::Raw { query } => query.sql.clone(),
        };

        Ok(sql)
    }

    /// Returns the named bindings referenced by the statement.
    pub fn bindings(&self) -> QueryBindings {
        match self {
            Statement::InsertSelect { query, .. } | Statement::Raw { query } => {
                query.bindings.clone()
            }
            Statement::Transaction { statements } => {
                let mut bindings = QueryBindings::new();
                for statement in statements {
                    bindings.extend(&statement.bindings());
                }
                bindings
            }
            _ => QueryBindings::new(),
        }
    }
}

/// Creates a primary key clause for table creation.
fn primary_key_clause(primary_keys: &[String]) -> DriverResult<String> {
    if primary_keys.is_empty() {
        return Ok("".to_string());
    }

    let columns = primary_keys
        .iter()
        .map(|name| quote_column(name))
        .collect::<DriverResult<Vec<_>>>()?;

    Ok(format!(
        ", primary key ({}) not enforced",
        columns.join(",")
    ))
}

/// Builds complete column specifications for CREATE TABLE statements.
fn create_columns_spec(schema: &TableSchema) -> DriverResult<String> {
    let mut s = schema
        .columns
        .iter()
        .map(column_spec)
        .collect::<DriverResult<Vec<_>>>()?
        .join(",");

    s.push_str(&primary_key_clause(&schema.primary_keys)?);

    Ok(format!("({s})"))
}
