//! Error types for S3 operations
//!
//! Transport failures enter this module as [`TransportError`] and are folded
//! into a small set of domain kinds by [`normalize_error`]. Callers compare
//! against [`ErrorKind`] rather than matching on messages.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for S3 operations
pub type S3Result<T> = Result<T, S3Error>;

/// Error reported by an [`ObjectTransport`](crate::transport::ObjectTransport)
///
/// `code` is the provider's error code (`NoSuchKey`, `AccessDenied`, ...) when
/// the service returned one; `status` is the HTTP status of the raw response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub code: Option<String>,
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    /// Transport failure without a service code (dispatch, timeout, build errors)
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            status: None,
            message: message.into(),
        }
    }

    /// Service error carrying a provider error code
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// The object (or, for HEAD requests, the resource) does not exist
    pub fn is_not_found(&self) -> bool {
        match self.code.as_deref() {
            Some("NoSuchKey") | Some("NotFound") => true,
            Some(_) => false,
            None => self.status == Some(404),
        }
    }

    pub fn is_no_such_bucket(&self) -> bool {
        self.code.as_deref() == Some("NoSuchBucket")
    }

    pub fn is_access_denied(&self) -> bool {
        match self.code.as_deref() {
            Some("AccessDenied") => true,
            Some(_) => false,
            None => self.status == Some(403),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, self.status) {
            (Some(code), Some(status)) => write!(f, "{} (HTTP {}): {}", code, status, self.message),
            (Some(code), None) => write!(f, "{}: {}", code, self.message),
            (None, Some(status)) => write!(f, "HTTP {}: {}", status, self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for TransportError {}

/// Errors that can occur during S3 operations
#[derive(Error, Debug)]
pub enum S3Error {
    /// Object not found in bucket; carries the original failure as context
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// Bucket not found or not accessible
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("object key cannot be empty")]
    EmptyKey,

    #[error("bucket name cannot be empty")]
    EmptyBucketName,

    /// Bulk delete reported per-key failures. Keys not listed here may or
    /// may not have been deleted.
    #[error("failed to delete some objects: {}", .keys.join(", "))]
    DeleteFailed { keys: Vec<String> },

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// Local stream read/write failure
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Unclassified transport failure, passed through as-is
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: TransportError,
    },
}

/// Discriminant of [`S3Error`] for kind checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ObjectNotFound,
    BucketNotFound,
    AccessDenied,
    InvalidConfig,
    EmptyKey,
    EmptyBucketName,
    DeleteFailed,
    Cancelled,
    DeadlineExceeded,
    Io,
    Transport,
}

impl S3Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            S3Error::ObjectNotFound(_) => ErrorKind::ObjectNotFound,
            S3Error::BucketNotFound(_) => ErrorKind::BucketNotFound,
            S3Error::AccessDenied(_) => ErrorKind::AccessDenied,
            S3Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            S3Error::EmptyKey => ErrorKind::EmptyKey,
            S3Error::EmptyBucketName => ErrorKind::EmptyBucketName,
            S3Error::DeleteFailed { .. } => ErrorKind::DeleteFailed,
            S3Error::Cancelled => ErrorKind::Cancelled,
            S3Error::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            S3Error::Io { .. } => ErrorKind::Io,
            S3Error::Transport { .. } => ErrorKind::Transport,
        }
    }

    /// Check whether this error is of the given kind
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    pub fn is_not_found(&self) -> bool {
        self.is(ErrorKind::ObjectNotFound)
    }

    /// Cancellation or deadline expiry
    pub fn is_cancellation(&self) -> bool {
        matches!(self, S3Error::Cancelled | S3Error::DeadlineExceeded)
    }

    /// Wrap a transport failure with operation context, then normalize it
    pub(crate) fn from_transport(context: impl Into<String>, source: TransportError) -> Self {
        normalize_error(S3Error::Transport {
            context: context.into(),
            source,
        })
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        S3Error::Io {
            context: context.into(),
            source,
        }
    }
}

/// Map provider-reported transport conditions to domain kinds
///
/// Only [`S3Error::Transport`] is inspected: `NoSuchKey`/`NotFound` become
/// [`S3Error::ObjectNotFound`], `NoSuchBucket` becomes
/// [`S3Error::BucketNotFound`] and `AccessDenied` becomes
/// [`S3Error::AccessDenied`], each keeping the original message. Everything
/// else, including errors that were already normalized, is returned unchanged.
pub fn normalize_error(err: S3Error) -> S3Error {
    match err {
        S3Error::Transport { context, source } => {
            if source.is_not_found() {
                S3Error::ObjectNotFound(format!("{}: {}", context, source))
            } else if source.is_no_such_bucket() {
                S3Error::BucketNotFound(format!("{}: {}", context, source))
            } else if source.is_access_denied() {
                S3Error::AccessDenied(format!("{}: {}", context, source))
            } else {
                S3Error::Transport { context, source }
            }
        }
        other => other,
    }
}

/// [`normalize_error`] lifted over a result; `Ok` passes through untouched
pub fn normalize_result<T>(result: S3Result<T>) -> S3Result<T> {
    result.map_err(normalize_error)
}
