use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::options::ImportOptions;
use crate::types::table::TableIdent;

/// Maps a source column to a destination column.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source_column_name: String,
    pub destination_column_name: String,
}

impl ColumnMapping {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> ColumnMapping {
        Self {
            source_column_name: source.into(),
            destination_column_name: destination.into(),
        }
    }
}

/// Comparison operator of a [`WhereFilter`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhereOperator {
    #[default]
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl WhereOperator {
    /// Returns the SQL comparison operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            WhereOperator::Eq => "=",
            WhereOperator::Ne => "<>",
            WhereOperator::Gt => ">",
            WhereOperator::Ge => ">=",
            WhereOperator::Lt => "<",
            WhereOperator::Le => "<=",
        }
    }
}

impl fmt::Display for WhereOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Row filter applied to the import source.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct WhereFilter {
    pub column: String,
    #[serde(default)]
    pub operator: WhereOperator,
    pub values: Vec<String>,
    /// Type the column is cast to before comparison.
    #[serde(default)]
    pub data_type: Option<String>,
}

impl WhereFilter {
    pub fn new(
        column: impl Into<String>,
        operator: WhereOperator,
        values: Vec<String>,
    ) -> WhereFilter {
        Self {
            column: column.into(),
            operator,
            values,
            data_type: None,
        }
    }
}

/// Source of an import with its column selection and row filtering.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SourceTableMapping {
    pub table: TableIdent,
    /// Explicit column mapping. Empty means every source column under its own name.
    #[serde(default)]
    pub column_mappings: Vec<ColumnMapping>,
    #[serde(default)]
    pub where_filters: Vec<WhereFilter>,
    /// Maximum number of rows to import, `0` for no limit.
    #[serde(default)]
    pub limit: u64,
    /// Time travel offset in seconds, `0` for the current table state.
    #[serde(default)]
    pub seconds: u64,
}

impl SourceTableMapping {
    pub fn new(table: TableIdent) -> SourceTableMapping {
        Self {
            table,
            column_mappings: Vec::new(),
            where_filters: Vec::new(),
            limit: 0,
            seconds: 0,
        }
    }
}

/// Command importing one table into another.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ImportCommand {
    pub source: SourceTableMapping,
    pub destination: TableIdent,
    #[serde(default)]
    pub import_options: ImportOptions,
}

/// Per invocation options supplied by the dispatch layer.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeOptions {
    pub run_id: Option<String>,
    /// Labels attached to every query issued on behalf of the invocation.
    pub query_tags: BTreeMap<String, String>,
}
