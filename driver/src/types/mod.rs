//! Value types shared by every driver component.

mod column;
mod command;
mod options;
mod result;
mod table;

pub use column::{Column, ColumnSet, NameIndex, STRING_TYPE, names_eq};
pub use command::{
    ColumnMapping, ImportCommand, RuntimeOptions, SourceTableMapping, WhereFilter, WhereOperator,
};
pub use options::{CreateMode, DedupType, ImportOptions, ImportStrategy, ImportType};
pub use result::{ImportResponse, ImportResult, LoadState, Timer};
pub use table::{TableIdent, TableKind, TableSchema, TableStats};
