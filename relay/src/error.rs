//! Error types and result definitions for relay operations.
//!
//! Provides a single error type with classification, aggregation, and captured
//! diagnostic metadata. [`RelayError`] represents either a single error or
//! multiple aggregated errors, the latter being used when several relay
//! workers fail independently.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use mysql::replication::checksum::ChecksumError;
use mysql::replication::schema::SchemaError;

/// Convenient result type for relay operations using [`RelayError`] as the
/// error type.
pub type RelayResult<T> = Result<T, RelayError>;

/// Detailed payload stored for single [`RelayError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for relay operations.
///
/// [`RelayError`] can represent a single error with rich metadata or multiple
/// aggregated errors. Errors are cheap to clone so they can be fanned out to
/// every observer of a failed phase.
#[derive(Debug, Clone)]
pub struct RelayError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Single error payload holding rich metadata.
    Single(ErrorPayload),
    /// Multiple aggregated errors.
    ///
    /// This variant is mainly useful to capture multiple worker failures.
    Many {
        errors: Vec<RelayError>,
        location: &'static Location<'static>,
    },
}

/// Specific categories of errors that can occur during relay operations.
///
/// Error kinds are organized by functional area and failure mode, enabling
/// callers to distinguish recoverable conditions (only
/// [`ErrorKind::UnknownSystemVariable`]) from fatal ones.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Connection Errors
    SourceConnectionFailed,

    // Query & Execution Errors
    SourceQueryFailed,

    // Capability Negotiation Errors
    UnknownSystemVariable,
    ChecksumAlignmentFailed,

    // Schema & Metadata Errors
    SourceSchemaError,
    MissingTableSchema,

    // Stream Errors
    MalformedEvent,

    // Data Errors
    ConversionError,
    InvalidData,

    // Configuration Errors
    ConfigError,

    // IO Errors
    IoError,

    // State & Workflow Errors
    InvalidState,
    RelayWorkerPanic,

    // General Errors
    SourceError,

    // Unknown / Uncategorized
    Unknown,
}

impl RelayError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For aggregated errors, returns the kind of the first error or
    /// [`ErrorKind::Unknown`] if the error list is empty.
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
    ///
    /// For single errors, returns a vector with one element. For aggregated
    /// errors, returns a flattened vector of all error kinds.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the detailed error information if available.
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

    /// Attaches an originating [`error::Error`] to this error and returns the
    /// modified instance.
    ///
    /// Has no effect when called on aggregated errors because aggregates
    /// forward the first contained error as their source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }
        self
    }

    /// Creates a [`RelayError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        let location = Location::caller();
        let backtrace = Arc::new(Backtrace::capture());

        RelayError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location,
                backtrace,
            }),
        }
    }
}

impl PartialEq for RelayError {
    fn eq(&self, other: &RelayError) -> bool {
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

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if let Some(detail) = payload.detail.as_deref() {
                    write!(f, "\n  Detail: {detail}")?;
                }

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

                for (index, error) in errors.iter().enumerate() {
                    let rendered = format!("{error}");
                    for (line_index, line) in rendered.lines().enumerate() {
                        if line_index == 0 {
                            write!(f, "\n  {}. {}", index + 1, line)?;
                        } else {
                            write!(f, "\n     {line}")?;
                        }
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for RelayError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source as &(dyn error::Error + 'static)),
            // For aggregated errors, we forward the first contained error as the source.
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

/// Creates a [`RelayError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for RelayError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> RelayError {
        RelayError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`RelayError`] from an error kind, static description, and
/// dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for RelayError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> RelayError {
        RelayError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Creates a [`RelayError`] from a vector of errors for aggregation.
///
/// If the vector contains exactly one error, returns that error directly
/// without wrapping it in the aggregated variant.
impl<E> From<Vec<E>> for RelayError
where
    E: Into<RelayError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> RelayError {
        let location = Location::caller();

        let mut errors: Vec<RelayError> = errors.into_iter().map(Into::into).collect();

        if errors.len() == 1 {
            return errors.pop().expect("just checked length is 1");
        }

        RelayError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

/// Converts [`std::io::Error`] to [`RelayError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for RelayError {
    #[track_caller]
    fn from(err: std::io::Error) -> RelayError {
        let detail = err.to_string();
        let source = Arc::new(err);
        RelayError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`sqlx::Error`] to [`RelayError`] with the appropriate error kind.
///
/// Maps database errors to [`ErrorKind::SourceQueryFailed`], I/O errors to
/// [`ErrorKind::IoError`], and connection pool errors to
/// [`ErrorKind::SourceConnectionFailed`].
impl From<sqlx::Error> for RelayError {
    #[track_caller]
    fn from(err: sqlx::Error) -> RelayError {
        let kind = match &err {
            sqlx::Error::Database(_) => ErrorKind::SourceQueryFailed,
            sqlx::Error::Io(_) => ErrorKind::IoError,
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
                ErrorKind::SourceConnectionFailed
            }
            _ => ErrorKind::SourceQueryFailed,
        };

        let detail = err.to_string();
        let source = Arc::new(err);
        RelayError::from_components(
            kind,
            Cow::Borrowed("Database operation failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`SchemaError`] to [`RelayError`] with the appropriate error kind.
impl From<SchemaError> for RelayError {
    #[track_caller]
    fn from(err: SchemaError) -> RelayError {
        match err {
            SchemaError::Database(err) => {
                let detail = err.to_string();
                let source = Arc::new(err);
                RelayError::from_components(
                    ErrorKind::SourceQueryFailed,
                    Cow::Borrowed("Catalog query failed"),
                    Some(Cow::Owned(detail)),
                    Some(source),
                )
            }
            SchemaError::TableNotFound(table_name) => RelayError::from_components(
                ErrorKind::SourceSchemaError,
                Cow::Borrowed("Table not found in catalog"),
                Some(Cow::Owned(table_name)),
                None,
            ),
        }
    }
}

/// Converts [`ChecksumError`] to [`RelayError`] with the appropriate error
/// kind.
///
/// The unknown system variable case maps to
/// [`ErrorKind::UnknownSystemVariable`] so the negotiator can recognize it as
/// a capability-absent signal rather than a failure.
impl From<ChecksumError> for RelayError {
    #[track_caller]
    fn from(err: ChecksumError) -> RelayError {
        match err {
            ChecksumError::UnknownSystemVariable => RelayError::from_components(
                ErrorKind::UnknownSystemVariable,
                Cow::Borrowed("The binlog checksum setting is not known to the server"),
                None,
                None,
            ),
            ChecksumError::Database(err) => {
                let detail = err.to_string();
                let source = Arc::new(err);
                RelayError::from_components(
                    ErrorKind::SourceQueryFailed,
                    Cow::Borrowed("Checksum setting query failed"),
                    Some(Cow::Owned(detail)),
                    Some(source),
                )
            }
        }
    }
}
