use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use llcas_types::CasError;

#[derive(Debug)]
struct TokenState {
    request_id: u64,
    cancelled: AtomicBool,
    retired: AtomicBool,
}

/// Handle to one outstanding request.
///
/// Shared between the issuer, who may cancel it, and the engine, which
/// retires it once the request's completion has been delivered. Clones
/// refer to the same request.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    pub(crate) fn new(request_id: u64) -> Self {
        Self {
            state: Arc::new(TokenState {
                request_id,
                cancelled: AtomicBool::new(false),
                retired: AtomicBool::new(false),
            }),
        }
    }

    /// Identifier of the request, unique per executor.
    pub fn request_id(&self) -> u64 {
        self.state.request_id
    }

    /// Ask for the request to be cancelled.
    ///
    /// Returns `true` only for the call that actually requested it; later
    /// calls, and calls after the request retired, are no-ops returning
    /// `false`.
    pub fn cancel(&self) -> bool {
        if self.is_retired() {
            return false;
        }
        !self.state.cancelled.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// `true` once the request's completion has been delivered.
    pub fn is_retired(&self) -> bool {
        self.state.retired.load(Ordering::Acquire)
    }

    /// Release the issuer's interest in the request.
    ///
    /// A request that has not completed yet is cancelled; it still
    /// completes exactly once. Disposing a retired token is a no-op.
    pub fn dispose(self) {
        self.cancel();
    }

    pub(crate) fn retire(&self) -> bool {
        !self.state.retired.swap(true, Ordering::AcqRel)
    }
}

/// What running work sees of its own request.
#[derive(Debug)]
pub struct Stage {
    token: CancellationToken,
}

impl Stage {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn request_id(&self) -> u64 {
        self.token.request_id()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A safe point: fails with `Cancelled` if the request was withdrawn.
    pub fn checkpoint(&self) -> Result<(), CasError> {
        if self.is_cancelled() {
            Err(CasError::cancelled(format!(
                "request {} cancelled",
                self.request_id()
            )))
        } else {
            Ok(())
        }
    }
}
