use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::{Deserialize, Serialize};

use crate::bail;
use crate::error::{DriverResult, ErrorKind};

/// Generic wide string type of the warehouse.
///
/// BigQuery strings are unbounded, so the widest string column is a `STRING` without a length.
pub const STRING_TYPE: &str = "STRING";

/// Definition of a single warehouse column.
///
/// The type is kept as the warehouse type name, uppercased. The length is opaque and type
/// dependent, e.g. `10` for `STRING(10)`, `10,2` for `NUMERIC(10,2)` or `INT64` for
/// `ARRAY<INT64>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// The name of the column.
    pub name: String,
    /// Warehouse type name, e.g. `INT64`, `STRING`, `STRUCT`.
    pub typ: String,
    /// Type-specific length or precision.
    pub length: Option<String>,
    /// Whether the column can contain NULL values.
    pub nullable: bool,
    /// Default value expression of the column.
    pub default: Option<String>,
    /// Fields of a `STRUCT` column (or of the element struct of an `ARRAY`), when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Column>>,
}

impl Column {
    /// Creates a new [`Column`] with all scalar attributes specified.
    pub fn new(
        name: impl Into<String>,
        typ: impl AsRef<str>,
        length: Option<String>,
        nullable: bool,
        default: Option<String>,
    ) -> Column {
        Self {
            name: name.into(),
            typ: typ.as_ref().to_uppercase(),
            length,
            nullable,
            default,
            fields: None,
        }
    }

    /// Creates a nullable column of the generic wide string type.
    pub fn string(name: impl Into<String>) -> Column {
        Self::new(name, STRING_TYPE, None, true, None)
    }

    /// Attaches struct fields to this column.
    pub fn with_fields(mut self, fields: Vec<Column>) -> Column {
        self.fields = Some(fields);
        self
    }

    /// Returns a copy of this column with another name and the same definition.
    pub fn renamed(&self, name: impl Into<String>) -> Column {
        Column {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Returns a copy of this column with the given nullability.
    pub fn with_nullable(&self, nullable: bool) -> Column {
        Column {
            nullable,
            ..self.clone()
        }
    }

    /// Returns whether this column has the generic wide string type.
    pub fn is_string(&self) -> bool {
        self.typ.eq_ignore_ascii_case(STRING_TYPE)
    }
}

/// Case-insensitive index from column names to their position.
///
/// Every component that looks up columns by name goes through this index so that
/// `Id`, `ID` and `id` always resolve to the same column.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    positions: HashMap<String, usize>,
}

impl NameIndex {
    /// Builds an index over `names`, failing with every duplicated name when names collide.
    pub fn new<'a, I>(names: I) -> Result<NameIndex, Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut index = NameIndex::default();
        let mut duplicates = Vec::new();

        for (position, name) in names.into_iter().enumerate() {
            match index.positions.entry(Self::key(name)) {
                Entry::Occupied(_) => duplicates.push(name.to_string()),
                Entry::Vacant(entry) => {
                    entry.insert(position);
                }
            }
        }

        if duplicates.is_empty() {
            Ok(index)
        } else {
            Err(duplicates)
        }
    }

    /// Returns the position of `name`, if indexed.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(&Self::key(name)).copied()
    }

    /// Returns whether `name` is indexed.
    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(&Self::key(name))
    }

    fn key(name: &str) -> String {
        name.to_lowercase()
    }
}

/// Compares two column names case-insensitively.
pub fn names_eq(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Ordered collection of columns with case-insensitively unique names.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<Column>,
    index: NameIndex,
}

impl ColumnSet {
    /// Creates a [`ColumnSet`], failing when two columns share a name case-insensitively.
    pub fn new(columns: Vec<Column>) -> DriverResult<ColumnSet> {
        let index = match NameIndex::new(columns.iter().map(|c| c.name.as_str())) {
            Ok(index) => index,
            Err(duplicates) => {
                bail!(
                    ErrorKind::ValidationError,
                    "Column names must be unique",
                    format!("Duplicate column names: {}", duplicates.join(", "))
                );
            }
        };

        Ok(ColumnSet { columns, index })
    }

    /// Returns the column named `name`, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.index.position(name).map(|position| &self.columns[position])
    }

    /// Returns whether a column named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// Returns the names of all columns in order.
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Column> {
        self.columns.iter()
    }

    pub fn as_slice(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl PartialEq for ColumnSet {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl<'a> IntoIterator for &'a ColumnSet {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}
