//! Error types and result definitions for driver operations.
//!
//! Provides a classified error system for table import operations. The [`DriverError`] type
//! supports single errors, errors with additional detail, and multiple aggregated errors. Every
//! [`ErrorKind`] carries a stable numeric code that is surfaced to callers of the driver.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;
use std::sync::{Arc, LazyLock};

use regex::Regex;

/// Convenient result type for driver operations using [`DriverError`] as the error type.
pub type DriverResult<T> = Result<T, DriverError>;

/// Pattern of the BigQuery error raised when a value exceeds the declared column length.
///
/// Example: `Field col1: STRING(2) has maximum length 2 but got a value with length 5 on field col1.`
static MAXIMUM_LENGTH_OVERFLOW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Field (?<field>[^:]+): (?<type>[A-Za-z0-9_]+)\((?<length>[^)]*)\) has maximum length (?<max>\d+)",
    )
    .expect("maximum length overflow pattern is valid")
});

/// Detailed payload stored for single [`DriverError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for driver operations.
///
/// [`DriverError`] can represent a single classified error, optionally with a dynamic detail
/// and a chained source, or multiple aggregated errors.
#[derive(Debug, Clone)]
pub struct DriverError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Single error payload holding rich metadata.
    Single(ErrorPayload),
    /// Multiple aggregated errors.
    Many {
        errors: Vec<DriverError>,
        location: &'static Location<'static>,
    },
}

/// Categories of errors raised by the driver.
///
/// Each kind maps to a stable numeric code (see [`ErrorKind::code`]) which callers can rely on
/// across releases.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Validation Errors
    ValidationError,
    ColumnsMismatch,
    ObjectAlreadyExists,
    ObjectNotFound,
    MaximumLengthOverflow,

    // Capability Errors
    NotImplemented,
    CloneNotSupported,

    // Backend Errors
    DestinationQueryFailed,
    DestinationIoError,
    AuthenticationError,

    // Configuration & State Errors
    ConfigError,
    InvalidState,

    // IO & Serialization Errors
    IoError,
    SerializationError,
    DeserializationError,

    // Unknown / Uncategorized
    Unknown,
}

impl ErrorKind {
    /// Returns the stable numeric code exposed to callers for this kind.
    pub fn code(&self) -> u32 {
        match self {
            ErrorKind::Unknown => 2001,
            ErrorKind::ValidationError => 2002,
            ErrorKind::ObjectNotFound => 2004,
            ErrorKind::ColumnsMismatch => 2005,
            ErrorKind::ObjectAlreadyExists => 2006,
            ErrorKind::MaximumLengthOverflow => 2007,
            ErrorKind::NotImplemented => 2010,
            ErrorKind::DestinationQueryFailed => 2011,
            ErrorKind::DestinationIoError | ErrorKind::IoError => 2012,
            ErrorKind::AuthenticationError => 2013,
            ErrorKind::ConfigError => 2014,
            ErrorKind::InvalidState => 2015,
            ErrorKind::CloneNotSupported => 2016,
            ErrorKind::SerializationError | ErrorKind::DeserializationError => 2017,
        }
    }

    /// Returns whether a caller may retry an operation that failed with this kind.
    ///
    /// The driver itself never retries. Only transport level failures are reported as
    /// retryable, validation failures never are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::DestinationIoError | ErrorKind::IoError)
    }
}

impl DriverError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the stable numeric code of this error.
    pub fn code(&self) -> u32 {
        self.kind().code()
    }

    /// Returns the static description of this error.
    ///
    /// For multiple errors, returns the description of the first error.
    pub fn description(&self) -> &str {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.description.as_ref(),
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.description())
                .unwrap_or("multiple errors"),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For multiple errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    ///
    /// Has no effect when called on aggregated errors because aggregates forward the first
    /// contained error as their source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }

        self
    }

    /// Creates a [`DriverError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        DriverError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

impl PartialEq for DriverError {
    fn eq(&self, other: &DriverError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (
                ErrorRepr::Many {
                    errors: errors_a, ..
                },
                ErrorRepr::Many {
                    errors: errors_b, ..
                },
            ) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl Hash for DriverError {
    /// Hashes the error using only its kind and static description.
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                std::mem::discriminant(&self.repr).hash(state);
                payload.kind.hash(state);
                payload.description.hash(state);
            }
            ErrorRepr::Many { errors, .. } => {
                std::mem::discriminant(&self.repr).hash(state);
                errors.len().hash(state);
                for error in errors {
                    error.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}:{}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.kind.code(),
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                write_detail(payload.detail.as_deref(), f, 1)?;
                write_backtrace(payload.backtrace.as_ref(), f, 1)?;

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if errors.is_empty() {
                    write!(f, "\n  (no inner errors provided)")?;
                } else {
                    for (index, error) in errors.iter().enumerate() {
                        let rendered = format!("{error}");
                        let mut lines = rendered.lines();
                        if let Some(first_line) = lines.next() {
                            write!(f, "\n  {}. {}", index + 1, first_line)?;
                        } else {
                            write!(f, "\n  {}.", index + 1)?;
                        }

                        for line in lines {
                            if line.is_empty() {
                                write!(f, "\n     ")?;
                            } else {
                                write!(f, "\n     {line}")?;
                            }
                        }
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for DriverError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

/// Writes the captured backtrace with indentation.
fn write_backtrace(
    backtrace: &Backtrace,
    f: &mut fmt::Formatter<'_>,
    indent: usize,
) -> fmt::Result {
    let indent_str = "  ".repeat(indent);

    let rendered_backtrace = format!("{backtrace}");
    if !rendered_backtrace.trim().is_empty() {
        write!(f, "\n{indent_str}Backtrace:")?;
        for line in rendered_backtrace.lines() {
            if line.trim().is_empty() {
                write!(f, "\n{indent_str}  ")?;
            } else {
                write!(f, "\n{indent_str}  {line}")?;
            }
        }
    }

    Ok(())
}

/// Writes the detail block with indentation.
fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    if let Some(detail) = detail {
        let indent_str = "  ".repeat(indent);
        if detail.trim().is_empty() {
            write!(f, "\n{indent_str}Detail: <empty>")?;
        } else {
            write!(f, "\n{indent_str}Detail:")?;
            for line in detail.lines() {
                if line.trim().is_empty() {
                    write!(f, "\n{indent_str}  ")?;
                } else {
                    write!(f, "\n{indent_str}  {line}")?;
                }
            }
        }
    }

    Ok(())
}

/// Translates a raw backend error message into a [`ErrorKind::MaximumLengthOverflow`] error.
///
/// Returns [`None`] when the message does not describe a value-too-long failure, in which case
/// the caller keeps the original error unchanged.
#[track_caller]
pub fn maximum_length_overflow(message: &str) -> Option<DriverError> {
    let captures = MAXIMUM_LENGTH_OVERFLOW_PATTERN.captures(message)?;

    let field = captures.name("field")?.as_str().trim();
    let typ = captures.name("type")?.as_str();
    let length = captures.name("length")?.as_str();

    Some(DriverError::from_components(
        ErrorKind::MaximumLengthOverflow,
        Cow::Borrowed("Value is longer than the column allows"),
        Some(Cow::Owned(format!(
            "Field '{field}' with type '{typ}' and length '{length}' received a longer value. Raw error: {message}"
        ))),
        None,
    ))
}

/// Creates a [`DriverError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for DriverError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> DriverError {
        DriverError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`DriverError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for DriverError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> DriverError {
        DriverError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Creates a [`DriverError`] from a vector of errors for aggregation.
///
/// If the vector contains exactly one error, returns that error directly without wrapping
/// it in the [`ErrorRepr::Many`] variant.
impl<E> From<Vec<E>> for DriverError
where
    E: Into<DriverError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> DriverError {
        let location = Location::caller();

        let mut errors: Vec<DriverError> = errors.into_iter().map(Into::into).collect();

        if errors.len() == 1 {
            return errors.pop().expect("just checked length is 1");
        }

        DriverError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

/// Converts [`std::io::Error`] to [`DriverError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for DriverError {
    #[track_caller]
    fn from(err: std::io::Error) -> DriverError {
        let detail = err.to_string();
        DriverError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`serde_json::Error`] to [`DriverError`] with the appropriate error kind.
impl From<serde_json::Error> for DriverError {
    #[track_caller]
    fn from(err: serde_json::Error) -> DriverError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        DriverError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}
