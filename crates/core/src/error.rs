//! Error types for stow-core
//!
//! Failures move through three shapes:
//! - [`RawError`]: what a backend hands back, before any interpretation
//! - [`ErrorKind`]: the closed taxonomy every raw error is classified into
//! - [`StorageError`] / [`Error`]: what callers receive when a failure propagates

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Classified failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Resource absent
    NotFound,
    /// Resource already exists or a precondition failed
    Conflict,
    /// Credential or permission failure
    Unauthorized,
    /// Rate-limit signal from the service
    Throttled,
    /// Network failure, timeout or 5xx response
    Transient,
    /// Anything that matched no known signal
    Fatal,
}

impl ErrorKind {
    /// Whether the retry policy may attempt the call again
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Throttled | ErrorKind::Transient)
    }

    /// Whether a single-item call surfaces this kind as an error rather than an outcome
    pub fn propagates(self) -> bool {
        matches!(self, ErrorKind::Unauthorized | ErrorKind::Fatal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Throttled => "throttled",
            ErrorKind::Transient => "transient",
            ErrorKind::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a request failed below the service layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    Timeout,
    Connection,
    Io,
    /// A response arrived but could not be read
    Response,
    /// The request could not be built
    Construction,
    Other,
}

/// Unclassified error returned by an [`ObjectStore`](crate::ObjectStore) backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawError {
    /// Provider error code (e.g. `NoSuchKey`, `SlowDown`)
    pub code: Option<String>,
    /// HTTP status of the response, when one was received
    pub status: Option<u16>,
    /// Set when the request never produced a service response
    pub transport: Option<TransportFailure>,
    pub message: String,
}

impl RawError {
    /// Error carried in a service response
    pub fn service(code: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            status: Some(status),
            transport: None,
            message: message.into(),
        }
    }

    /// Service response with a status but no parseable error code
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            code: None,
            status: Some(status),
            transport: None,
            message: message.into(),
        }
    }

    pub fn transport(failure: TransportFailure, message: impl Into<String>) -> Self {
        Self {
            code: None,
            status: None,
            transport: Some(failure),
            message: message.into(),
        }
    }

    /// Error with no code, status or transport signal
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            code: None,
            status: None,
            transport: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for RawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        match (&self.code, self.status) {
            (Some(code), Some(status)) => write!(f, " (code: {code}, status: {status})"),
            (Some(code), None) => write!(f, " (code: {code})"),
            (None, Some(status)) => write!(f, " (status: {status})"),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for RawError {}

/// Primitive operation against the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ListBuckets,
    CreateBucket,
    DeleteBucket,
    PutObject,
    GetObject,
    DeleteObject,
    ListObjects,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::ListBuckets => "list_buckets",
            Operation::CreateBucket => "create_bucket",
            Operation::DeleteBucket => "delete_bucket",
            Operation::PutObject => "put_object",
            Operation::GetObject => "get_object",
            Operation::DeleteObject => "delete_object",
            Operation::ListObjects => "list_objects",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure of one primitive call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} on '{target}' failed ({kind}) after {attempts} attempt(s): {message}")]
pub struct StorageError {
    pub kind: ErrorKind,
    pub operation: Operation,
    /// Display form of the bucket or object the call addressed
    pub target: String,
    pub message: String,
    /// Backend calls made; zero when the failure happened locally
    pub attempts: u32,
}

impl StorageError {
    pub fn new(
        kind: ErrorKind,
        operation: Operation,
        target: impl fmt::Display,
        message: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            kind,
            operation,
            target: target.to_string(),
            message: message.into(),
            attempts,
        }
    }

    /// Failure reading an upload source or writing a download destination
    pub fn local(operation: Operation, target: impl fmt::Display, error: &std::io::Error) -> Self {
        Self::new(
            crate::classify::classify_io(error),
            operation,
            target,
            format!("local I/O: {error}"),
            0,
        )
    }
}

/// Error type for stow-core
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid bucket name '{name}': {reason}")]
    InvalidBucketName { name: String, reason: &'static str },

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    /// Classified kind, for errors that came from the backend
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Storage(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidBucketName { .. } | Error::InvalidKey(_) | Error::Config(_) => 2,
            Error::Io(_) => 1,
            Error::Storage(e) => match e.kind {
                ErrorKind::Transient | ErrorKind::Throttled => 3,
                ErrorKind::Unauthorized => 4,
                ErrorKind::NotFound => 5,
                ErrorKind::Conflict => 6,
                ErrorKind::Fatal => 1,
            },
        }
    }
}

/// Result type alias for stow-core
pub type Result<T> = std::result::Result<T, Error>;
