//! Completion delivery.
//!
//! A [`Completer`] is the engine side of a request. It delivers exactly one
//! value: the work's output if `complete` is called, otherwise (when it is
//! dropped unused, e.g. because the runtime shut down or the work panicked)
//! the request type's "abandoned" value.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::debug;

use llcas_types::{CasError, LookupResult};

use crate::token::CancellationToken;

/// Outcome types a request can complete with when its work never produced
/// one.
pub trait Interruptible: Send + 'static {
    /// The work was cancelled before it started.
    fn cancelled() -> Self;

    /// The work was dropped without running to completion.
    fn abandoned() -> Self;
}

impl<T: Send + 'static> Interruptible for LookupResult<T> {
    fn cancelled() -> Self {
        LookupResult::Error(CasError::cancelled("request cancelled before it started"))
    }

    fn abandoned() -> Self {
        LookupResult::Error(CasError::cancelled("request abandoned"))
    }
}

impl<T: Send + 'static> Interruptible for Result<T, CasError> {
    fn cancelled() -> Self {
        Err(CasError::cancelled("request cancelled before it started"))
    }

    fn abandoned() -> Self {
        Err(CasError::cancelled("request abandoned"))
    }
}

type Deliver<T> = Box<dyn FnOnce(T) + Send>;

pub(crate) struct Completer<T: Interruptible> {
    token: CancellationToken,
    deliver: Option<Deliver<T>>,
}

impl<T: Interruptible> Completer<T> {
    pub fn new(token: CancellationToken, deliver: impl FnOnce(T) + Send + 'static) -> Self {
        Self {
            token,
            deliver: Some(Box::new(deliver)),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn complete(mut self, value: T) {
        self.deliver(value);
    }

    fn deliver(&mut self, value: T) {
        if let Some(deliver) = self.deliver.take() {
            deliver(value);
            self.token.retire();
            debug!(request = self.token.request_id(), "request completed");
        }
    }
}

impl<T: Interruptible> Drop for Completer<T> {
    fn drop(&mut self) {
        if self.deliver.is_some() {
            debug!(request = self.token.request_id(), "request abandoned");
            self.deliver(T::abandoned());
        }
    }
}

/// The caller side of a submitted request.
///
/// Await it from async code, or call [`Pending::wait`] from a thread that is
/// not driving a tokio runtime.
#[must_use = "a pending request does nothing unless awaited or waited on"]
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<T>,
    token: CancellationToken,
}

impl<T: Interruptible> Pending<T> {
    pub(crate) fn channel(token: CancellationToken) -> (Self, Completer<T>) {
        let (tx, rx) = oneshot::channel();
        let completer = Completer::new(token.clone(), move |value| {
            // The receiver may be gone; the completion still counts as delivered.
            let _ = tx.send(value);
        });
        (Self { rx, token }, completer)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Request cancellation. See [`CancellationToken::cancel`].
    pub fn cancel(&self) -> bool {
        self.token.cancel()
    }

    /// Block the current thread until the request completes.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn wait(self) -> T {
        self.rx.blocking_recv().unwrap_or_else(|_| T::abandoned())
    }
}

impl<T: Interruptible> Future for Pending<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| T::abandoned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type Outcome = Result<u32, CasError>;

    fn counting_completer(count: &Arc<AtomicUsize>, token: CancellationToken) -> Completer<Outcome> {
        let count = Arc::clone(count);
        Completer::new(token, move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn complete_delivers_once_and_retires() {
        let count = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new(1);
        counting_completer(&count, token.clone()).complete(Ok(5));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(token.is_retired());
    }

    #[test]
    fn dropped_completer_delivers_abandoned() {
        let token = CancellationToken::new(2);
        let (pending, completer) = Pending::<Outcome>::channel(token.clone());
        drop(completer);

        let err = pending.wait().unwrap_err();
        assert!(err.is_cancelled());
        assert!(token.is_retired());
    }

    #[test]
    fn drop_after_complete_does_not_deliver_again() {
        let count = Arc::new(AtomicUsize::new(0));
        let completer = counting_completer(&count, CancellationToken::new(3));
        completer.complete(Ok(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pending_receives_value() {
        let (pending, completer) = Pending::<Outcome>::channel(CancellationToken::new(4));
        completer.complete(Ok(42));
        assert_eq!(pending.wait().unwrap(), 42);
    }

    #[test]
    fn lookup_result_interrupt_values() {
        let cancelled = <LookupResult<u8> as Interruptible>::cancelled();
        assert!(cancelled.error().is_some_and(CasError::is_cancelled));
        let abandoned = <LookupResult<u8> as Interruptible>::abandoned();
        assert!(abandoned.error().is_some_and(CasError::is_cancelled));
    }
}
