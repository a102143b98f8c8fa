//! Error types and result definitions for bulk merge operations.
//!
//! Provides an error system with classification and captured diagnostic metadata for
//! every stage of a bulk operation. The [`BulkError`] type carries an [`ErrorKind`],
//! an optional detail string, the callsite location, and a backtrace, so a failed
//! staging load or merge execution can be attributed to the stage that raised it.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for bulk operations using [`BulkError`] as the error type.
pub type BulkResult<T> = Result<T, BulkError>;

/// Detailed payload stored for a [`BulkError`] instance.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for bulk merge operations.
///
/// [`BulkError`] classifies failures by [`ErrorKind`] so callers can distinguish
/// staging faults, statement execution faults, correlation contract violations,
/// and cancellation without parsing messages.
#[derive(Debug, Clone)]
pub struct BulkError {
    payload: ErrorPayload,
}

/// Specific categories of errors that can occur during a bulk operation.
///
/// Error kinds are organized by the stage that raises them so callers can tell
/// which part of the operation failed.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Connection errors
    ConnectionFailed,
    AuthenticationError,

    // Staging errors
    StagingTableCreationFailed,
    StagingCopyFailed,

    // Statement execution errors
    QueryFailed,
    CommandFailed,
    ConstraintViolation,
    TransactionAborted,

    // Reconciliation errors
    CorrelationMiss,
    MalformedOutputRow,

    // Data and mapping errors
    ConversionError,
    InvalidData,
    MissingTableMapping,
    UnknownColumn,

    // Configuration errors
    ConfigError,

    // IO and serialization errors
    IoError,
    SerializationError,
    DeserializationError,

    // Lifecycle errors
    OperationCanceled,
    InvalidState,

    // Unknown / uncategorized
    Unknown,
}

impl BulkError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.payload.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.payload.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        self.payload.backtrace.as_ref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.payload.location
    }

    /// Returns whether this error represents a cancellation rather than a failure.
    ///
    /// Callers use this to distinguish a deliberate abort from an execution fault.
    pub fn is_canceled(&self) -> bool {
        self.payload.kind == ErrorKind::OperationCanceled
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    ///
    /// The stored source is preserved across clones and exposed via [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.payload.source = Some(Arc::new(source));
        self
    }

    /// Creates a [`BulkError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        BulkError {
            payload: ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            },
        }
    }
}

impl PartialEq for BulkError {
    fn eq(&self, other: &BulkError) -> bool {
        self.payload.kind == other.payload.kind
    }
}

impl fmt::Display for BulkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let location = self.payload.location;
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.payload.kind,
            self.payload.description,
            location.file(),
            location.line(),
            location.column()
        )?;

        if let Some(detail) = self.payload.detail.as_deref() {
            write!(f, "\n  Detail: {detail}")?;
        }

        Ok(())
    }
}

impl error::Error for BulkError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.payload
            .source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates a [`BulkError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for BulkError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> BulkError {
        BulkError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`BulkError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for BulkError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> BulkError {
        BulkError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`BulkError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for BulkError {
    #[track_caller]
    fn from(err: std::io::Error) -> BulkError {
        let detail = err.to_string();
        let source = Arc::new(err);
        BulkError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`postgres::schema::SchemaError`] to [`BulkError`].
impl From<postgres::schema::SchemaError> for BulkError {
    #[track_caller]
    fn from(err: postgres::schema::SchemaError) -> BulkError {
        let detail = err.to_string();
        let source = Arc::new(err);
        BulkError::from_components(
            ErrorKind::UnknownColumn,
            Cow::Borrowed("Schema metadata lookup failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`serde_json::Error`] to [`BulkError`] with the appropriate error kind.
impl From<serde_json::Error> for BulkError {
    #[track_caller]
    fn from(err: serde_json::Error) -> BulkError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            _ => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        let source = Arc::new(err);
        BulkError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`tokio_postgres::Error`] to [`BulkError`] with the appropriate error kind.
///
/// Maps errors based on Postgres SQLSTATE codes so the caller can tell constraint
/// violations and deadlocks apart from connection loss or a canceled statement.
impl From<tokio_postgres::Error> for BulkError {
    #[track_caller]
    fn from(err: tokio_postgres::Error) -> BulkError {
        let (kind, description) = match err.code() {
            Some(sqlstate) => {
                use tokio_postgres::error::SqlState;

                match *sqlstate {
                    // Connection errors (08xxx)
                    SqlState::CONNECTION_EXCEPTION
                    | SqlState::CONNECTION_DOES_NOT_EXIST
                    | SqlState::CONNECTION_FAILURE
                    | SqlState::SQLCLIENT_UNABLE_TO_ESTABLISH_SQLCONNECTION
                    | SqlState::SQLSERVER_REJECTED_ESTABLISHMENT_OF_SQLCONNECTION => {
                        (ErrorKind::ConnectionFailed, "PostgreSQL connection failed")
                    }

                    // Authentication errors (28xxx)
                    SqlState::INVALID_AUTHORIZATION_SPECIFICATION | SqlState::INVALID_PASSWORD => (
                        ErrorKind::AuthenticationError,
                        "PostgreSQL authentication failed",
                    ),

                    // Data integrity violations (23xxx)
                    SqlState::INTEGRITY_CONSTRAINT_VIOLATION
                    | SqlState::NOT_NULL_VIOLATION
                    | SqlState::FOREIGN_KEY_VIOLATION
                    | SqlState::UNIQUE_VIOLATION
                    | SqlState::CHECK_VIOLATION => (
                        ErrorKind::ConstraintViolation,
                        "PostgreSQL constraint violation",
                    ),

                    // Data conversion errors (22xxx)
                    SqlState::DATA_EXCEPTION
                    | SqlState::INVALID_TEXT_REPRESENTATION
                    | SqlState::INVALID_DATETIME_FORMAT
                    | SqlState::NUMERIC_VALUE_OUT_OF_RANGE
                    | SqlState::DIVISION_BY_ZERO => (
                        ErrorKind::ConversionError,
                        "PostgreSQL data conversion failed",
                    ),

                    // Schema/object not found errors (42xxx)
                    SqlState::UNDEFINED_TABLE
                    | SqlState::UNDEFINED_COLUMN
                    | SqlState::UNDEFINED_FUNCTION
                    | SqlState::UNDEFINED_SCHEMA => (
                        ErrorKind::UnknownColumn,
                        "PostgreSQL schema object not found",
                    ),

                    // Syntax and access errors (42xxx)
                    SqlState::SYNTAX_ERROR
                    | SqlState::SYNTAX_ERROR_OR_ACCESS_RULE_VIOLATION
                    | SqlState::INSUFFICIENT_PRIVILEGE => {
                        (ErrorKind::QueryFailed, "PostgreSQL syntax or access error")
                    }

                    // Transaction errors (40xxx, 25xxx)
                    SqlState::TRANSACTION_ROLLBACK
                    | SqlState::T_R_SERIALIZATION_FAILURE
                    | SqlState::T_R_DEADLOCK_DETECTED
                    | SqlState::INVALID_TRANSACTION_STATE => (
                        ErrorKind::TransactionAborted,
                        "PostgreSQL transaction failed",
                    ),

                    // Operator intervention errors (57xxx)
                    SqlState::OPERATOR_INTERVENTION | SqlState::QUERY_CANCELED => (
                        ErrorKind::OperationCanceled,
                        "PostgreSQL statement canceled",
                    ),

                    _ => (ErrorKind::QueryFailed, "PostgreSQL operation failed"),
                }
            }
            None => (ErrorKind::QueryFailed, "PostgreSQL operation failed"),
        };

        let detail = err.to_string();
        let source = Arc::new(err);
        BulkError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}
