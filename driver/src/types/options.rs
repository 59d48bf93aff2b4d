use serde::{Deserialize, Serialize};

/// How the imported data is applied to the destination.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportType {
    /// Replaces the destination contents.
    #[default]
    Full,
    /// Appends to the destination contents.
    Incremental,
    /// Creates a view over the source.
    View,
    /// Clones the source table, falling back to a copy when cloning is rejected.
    Clone,
}

/// How rows sharing the same dedup key are handled.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DedupType {
    #[default]
    InsertDuplicates,
    UpdateDuplicates,
}

/// Behavior when the destination already exists.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreateMode {
    #[default]
    Create,
    Replace,
}

/// Typing strategy of destinations created by an import.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStrategy {
    /// Destination columns keep the source types.
    #[default]
    UserDefinedTable,
    /// Destination columns are all generic strings.
    StringTable,
}

/// Options driving the import strategy.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub import_type: ImportType,
    pub dedup_type: DedupType,
    /// Columns defining row uniqueness during deduplication.
    pub dedup_columns: Vec<String>,
    pub create_mode: CreateMode,
    pub import_strategy: ImportStrategy,
    /// Column set to the import time on every imported row.
    pub timestamp_column_name: Option<String>,
    /// Columns whose empty string values are stored as NULL.
    pub convert_empty_to_null_columns: Vec<String>,
}

impl ImportOptions {
    /// Returns whether rows sharing a dedup key must be collapsed.
    pub fn deduplicates(&self) -> bool {
        !self.dedup_columns.is_empty() || self.dedup_type == DedupType::UpdateDuplicates
    }

    pub fn is_incremental(&self) -> bool {
        self.import_type == ImportType::Incremental
    }
}
