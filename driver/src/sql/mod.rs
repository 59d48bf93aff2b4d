//! GoogleSQL rendering.
//!
//! Every identifier that ends up in SQL text is quoted through [`ident`]. Values are never
//! inlined, they travel as named [`QueryBindings`].

mod bindings;
mod ident;
mod mapped;
mod query;
mod statement;
mod types;

pub use bindings::{QueryBindings, QueryParameter};
pub use ident::{quote_column, quote_columns, quote_table};
pub use mapped::{MappedSqlSourceBuilder, SqlSourceBase};
pub use query::ExportQueryBuilder;
pub use statement::{SqlQuery, Statement};
pub use types::{column_definition_sql, column_spec, column_type_sql};
