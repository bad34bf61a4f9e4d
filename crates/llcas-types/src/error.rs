use std::fmt;

use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Failure category delivered to callers.
///
/// Absence is not a failure and has no kind here; it is reported as
/// [`LookupResult::NotFound`](crate::LookupResult::NotFound).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed digest, stale handle, dangling reference. Caller-fixable.
    InvalidArgument,
    /// I/O or persistence failure, capacity exhaustion, corruption.
    Store,
    /// Action-cache put disagreed with the existing entry.
    Conflict,
    /// The request was stopped before it did useful work.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::Store => write!(f, "store error"),
            Self::Conflict => write!(f, "conflict"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Structured error handed to the immediate caller of a failing operation.
///
/// Crate-specific errors convert into `CasError` so that every operation,
/// synchronous or delivered through a completion, reports the same shape.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct CasError {
    kind: ErrorKind,
    message: String,
}

impl CasError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Store, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` for intentional cancellation, which callers usually
    /// do not want to treat as a failure.
    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl From<TypeError> for CasError {
    fn from(err: TypeError) -> Self {
        Self::invalid_argument(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = CasError::conflict("key already mapped");
        assert_eq!(err.to_string(), "conflict: key already mapped");
    }

    #[test]
    fn type_errors_are_invalid_arguments() {
        let err: CasError = TypeError::InvalidLength { expected: 32, actual: 3 }.into();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().contains("expected 32"));
    }

    #[test]
    fn cancelled_is_distinguished() {
        assert!(CasError::cancelled("stop").is_cancelled());
        assert!(!CasError::store("disk full").is_cancelled());
    }
}
