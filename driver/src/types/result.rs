use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Named duration of one import step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    pub name: String,
    pub duration_seconds: f64,
}

impl Timer {
    pub fn new(name: impl Into<String>, duration: Duration) -> Timer {
        Self {
            name: name.into(),
            duration_seconds: duration.as_secs_f64(),
        }
    }
}

/// Outcome of loading source rows into a table.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct LoadState {
    pub rows: u64,
    /// Names of the loaded target columns.
    pub columns: Vec<String>,
}

/// Outcome of moving staged rows into the destination.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportResult {
    pub imported_rows_count: u64,
    pub imported_columns: Vec<String>,
    pub timers: Vec<Timer>,
}

/// Response returned to the caller of an import.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportResponse {
    pub imported_rows_count: u64,
    /// Number of rows in the destination after the import.
    pub table_rows_count: u64,
    pub table_size_bytes: u64,
    pub imported_columns: Vec<String>,
    pub timers: Vec<Timer>,
}
