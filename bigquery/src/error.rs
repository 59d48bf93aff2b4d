use driver::driver_error;
use driver::error::{DriverError, ErrorKind, maximum_length_overflow};
use gcp_bigquery_client::error::BQError;

/// Converts BigQuery errors to driver errors with appropriate classification.
///
/// Value-too-long failures become [`ErrorKind::MaximumLengthOverflow`] and rejected table clones
/// become [`ErrorKind::CloneNotSupported`]. Every other error keeps its message as detail.
pub(crate) fn bq_error_to_driver_error(err: BQError) -> DriverError {
    if let BQError::ResponseError { error } = &err {
        let status = error.error.code;
        let message = error.error.message.as_str();

        if let Some(overflow) = maximum_length_overflow(message) {
            return overflow;
        }

        let (kind, description) = match status {
            404 => (ErrorKind::ObjectNotFound, "BigQuery object not found"),
            409 => (ErrorKind::ObjectAlreadyExists, "BigQuery object already exists"),
            _ if is_clone_rejection(message) => (
                ErrorKind::CloneNotSupported,
                "BigQuery rejected the table clone",
            ),
            401 | 403 => (ErrorKind::AuthenticationError, "BigQuery access denied"),
            _ => (ErrorKind::DestinationQueryFailed, "BigQuery query failed"),
        };

        return driver_error!(kind, description, format!("{status}: {message}"));
    }

    let (kind, description) = match &err {
        BQError::InvalidServiceAccountKey(_) => (
            ErrorKind::AuthenticationError,
            "Invalid BigQuery service account key",
        ),
        BQError::InvalidServiceAccountAuthenticator(_) => (
            ErrorKind::AuthenticationError,
            "Invalid BigQuery service account authenticator",
        ),
        BQError::AuthError(_) => (
            ErrorKind::AuthenticationError,
            "BigQuery authentication error",
        ),
        BQError::YupAuthError(_) => (
            ErrorKind::AuthenticationError,
            "BigQuery OAuth authentication error",
        ),
        BQError::NoToken => (
            ErrorKind::AuthenticationError,
            "BigQuery authentication token missing",
        ),

        BQError::RequestError(_) => (ErrorKind::DestinationIoError, "BigQuery request failed"),

        BQError::NoDataAvailable => (
            ErrorKind::InvalidState,
            "BigQuery result set positioning error",
        ),
        BQError::InvalidColumnIndex { .. } | BQError::InvalidColumnName { .. } => (
            ErrorKind::InvalidState,
            "BigQuery result set column lookup failed",
        ),
        BQError::InvalidColumnType { .. } => (
            ErrorKind::DeserializationError,
            "BigQuery column type mismatch",
        ),
        BQError::SerializationError(_) => (
            ErrorKind::SerializationError,
            "BigQuery JSON serialization error",
        ),

        _ => (ErrorKind::Unknown, "BigQuery error"),
    };

    driver_error!(kind, description, err.to_string())
}

/// Returns whether a BigQuery error message rejects a `create table ... clone` statement.
///
/// BigQuery refuses clones across projects or regions and clones of views or external tables.
fn is_clone_rejection(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("clone")
        && ["not supported", "cannot", "not allowed", "invalid"]
            .iter()
            .any(|pattern| message.contains(pattern))
}
