use llcas_log::LogError;
use llcas_types::{CasError, Digest, ErrorKind, ObjectId};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The handle does not name a live object in this store (deleted, or
    /// issued by another store instance).
    #[error("stale object handle: {0:?}")]
    StaleHandle(ObjectId),

    /// A reference passed to `put` does not resolve to a stored object.
    #[error("reference {0:?} does not resolve to a stored object")]
    UnknownReference(ObjectId),

    /// A stored object references content that is no longer present.
    #[error("object {object} references missing object {missing}")]
    DanglingReference { object: Digest, missing: Digest },

    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for {expected}: computed {computed}")]
    HashMismatch { expected: Digest, computed: Digest },

    /// Storing the object would exceed a configured limit.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// The on-disk store was created with incompatible settings.
    #[error("incompatible store: {0}")]
    Incompatible(String),

    /// The record at an indexed location is not what the index expects.
    #[error("corrupt object record at offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Error from the underlying record log.
    #[error("log error: {0}")]
    Log(#[from] LogError),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An index lock was poisoned by a panicking thread.
    #[error("store index lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// The caller-facing category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StaleHandle(_) | Self::UnknownReference(_) | Self::Incompatible(_) => {
                ErrorKind::InvalidArgument
            }
            _ => ErrorKind::Store,
        }
    }
}

impl From<StoreError> for CasError {
    fn from(err: StoreError) -> Self {
        CasError::new(err.kind(), err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
