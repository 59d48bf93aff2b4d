use crate::sql::{SqlQuery, SqlSourceBase};
use crate::types::{TableIdent, TableSchema, WhereFilter};

/// How the rows of a source are read.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// The source table is read as is.
    DirectTable {
        table: TableIdent,
        primary_keys: Vec<String>,
    },
    /// The source is read through a generated select applying projection, filters, limit or
    /// time travel.
    GeneratedQuery { query: SqlQuery },
}

/// Resolved import source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    /// Source column names selected by the import, in projection order.
    pub selected_columns: Vec<String>,
    /// Source schema restricted to the selected columns.
    pub effective_schema: TableSchema,
    pub full_schema: TableSchema,
    pub where_filters: Vec<WhereFilter>,
    pub limit: u64,
    pub seconds: u64,
}

impl SourceDescriptor {
    /// Returns the source table identity.
    pub fn table(&self) -> &TableIdent {
        &self.full_schema.ident
    }

    /// Returns the relation a select over this source reads from.
    pub fn sql_base(&self) -> SqlSourceBase {
        match &self.kind {
            SourceKind::DirectTable { table, .. } => SqlSourceBase::Table(table.clone()),
            SourceKind::GeneratedQuery { query } => SqlSourceBase::Query(query.clone()),
        }
    }
}
