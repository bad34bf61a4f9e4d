//! Error types for reference graph traversal.

use llcas_store::StoreError;
use llcas_types::{CasError, Digest, ErrorKind};

/// Errors that can occur while traversing the reference graph.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// An edge points at content that is no longer stored.
    #[error("object {object} references {missing}, which was not found")]
    NotFound {
        /// The object holding the dangling edge.
        object: Digest,
        /// The digest the edge points at.
        missing: Digest,
    },

    /// The store failed for a reason other than a dangling edge.
    #[error(transparent)]
    Store(StoreError),
}

impl DagError {
    /// Returns `true` if the walk stopped at a dangling edge.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::Store,
            Self::Store(err) => err.kind(),
        }
    }
}

impl From<StoreError> for DagError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DanglingReference { object, missing } => Self::NotFound { object, missing },
            other => Self::Store(other),
        }
    }
}

impl From<DagError> for CasError {
    fn from(err: DagError) -> Self {
        CasError::new(err.kind(), err.to_string())
    }
}

/// Convenience alias for graph results.
pub type DagResult<T> = Result<T, DagError>;
