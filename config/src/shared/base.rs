use thiserror::Error;

/// Errors raised when configuration values violate their constraints.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("`{field}` {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
}
