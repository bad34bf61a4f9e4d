//! Error types for action cache operations.

use thiserror::Error;

use llcas_log::LogError;
use llcas_types::{CasError, Digest, ErrorKind};

/// Errors that can occur during action cache operations.
#[derive(Debug, Error)]
pub enum ActionCacheError {
    /// The key already maps to a different result and overwriting was not
    /// allowed.
    #[error("action {key} already maps to {existing}; refusing to replace it with {proposed}")]
    Conflict {
        key: Digest,
        existing: Digest,
        proposed: Digest,
    },

    /// The cache configuration is unusable.
    #[error("invalid action cache configuration: {0}")]
    InvalidConfig(String),

    /// Error from the underlying record log.
    #[error("log error: {0}")]
    Log(#[from] LogError),

    /// I/O error during file-based operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A shard lock was poisoned by a panicking thread.
    #[error("action cache lock poisoned")]
    Poisoned,
}

impl ActionCacheError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::InvalidConfig(_) => ErrorKind::InvalidArgument,
            Self::Log(_) | Self::Io(_) | Self::Poisoned => ErrorKind::Store,
        }
    }
}

impl From<ActionCacheError> for CasError {
    fn from(err: ActionCacheError) -> Self {
        CasError::new(err.kind(), err.to_string())
    }
}

/// Convenience type alias for action cache operations.
pub type Result<T> = std::result::Result<T, ActionCacheError>;
