use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::column::{Column, ColumnSet, names_eq};

/// Fully qualified table name consisting of a dataset (schema) and a table name.
#[derive(Debug, Clone, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableIdent {
    /// The dataset containing the table.
    pub schema: String,
    /// The name of the table within the dataset.
    pub table: String,
}

impl TableIdent {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> TableIdent {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Kind of warehouse object a [`TableSchema`] describes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum TableKind {
    #[default]
    Table,
    View,
}

/// Schema of a table, either reflected from the warehouse or synthesized before creation.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub ident: TableIdent,
    pub kind: TableKind,
    pub is_temporary: bool,
    pub columns: ColumnSet,
    /// Names of the primary key columns in key order.
    pub primary_keys: Vec<String>,
}

impl TableSchema {
    /// Creates a schema of a regular, non-temporary table without primary keys.
    pub fn new(ident: TableIdent, columns: ColumnSet) -> TableSchema {
        Self {
            ident,
            kind: TableKind::Table,
            is_temporary: false,
            columns,
            primary_keys: Vec::new(),
        }
    }

    pub fn with_primary_keys(mut self, primary_keys: Vec<String>) -> TableSchema {
        self.primary_keys = primary_keys;
        self
    }

    pub fn with_kind(mut self, kind: TableKind) -> TableSchema {
        self.kind = kind;
        self
    }

    /// Marks the schema as a temporary (staging) table.
    pub fn temporary(mut self) -> TableSchema {
        self.is_temporary = true;
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.names()
    }

    /// Returns whether `name` is one of the primary key columns, compared case-insensitively.
    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_keys.iter().any(|pk| names_eq(pk, name))
    }
}

/// Size statistics of a warehouse table.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct TableStats {
    pub row_count: u64,
    pub size_bytes: u64,
}
