use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;

use crate::completion::{Completer, Interruptible, Pending};
use crate::error::{ExecError, ExecResult};
use crate::token::{CancellationToken, Stage};

/// Thread pool sizing for an owned runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Async worker threads.
    pub worker_threads: usize,
    /// Upper bound on threads running blocking store work.
    pub max_blocking_threads: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            max_blocking_threads: 8,
        }
    }
}

impl ExecutorConfig {
    pub fn validate(&self) -> ExecResult<()> {
        if self.worker_threads == 0 {
            return Err(ExecError::InvalidConfig("worker_threads must be at least 1".into()));
        }
        if self.max_blocking_threads == 0 {
            return Err(ExecError::InvalidConfig(
                "max_blocking_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Runs submitted requests on a tokio blocking pool.
///
/// An executor either owns its runtime ([`Executor::new`]) or schedules onto
/// an existing one ([`Executor::from_handle`]). Dropping an owning executor
/// shuts the runtime down in the background; requests that never ran are
/// completed as abandoned.
pub struct Executor {
    runtime: Option<Runtime>,
    handle: Handle,
    next_request: AtomicU64,
}

impl Executor {
    pub fn new(config: &ExecutorConfig) -> ExecResult<Self> {
        config.validate()?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .max_blocking_threads(config.max_blocking_threads)
            .thread_name("llcas-worker")
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Some(runtime),
            handle,
            next_request: AtomicU64::new(1),
        })
    }

    /// Schedule onto a runtime owned elsewhere.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            runtime: None,
            handle,
            next_request: AtomicU64::new(1),
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Issue a token for a new request.
    pub fn token(&self) -> CancellationToken {
        CancellationToken::new(self.next_request.fetch_add(1, Ordering::Relaxed))
    }

    /// Submit `work` and get an awaitable handle to its outcome.
    pub fn submit<T, F>(&self, work: F) -> Pending<T>
    where
        T: Interruptible,
        F: FnOnce(&Stage) -> T + Send + 'static,
    {
        let (pending, completer) = Pending::channel(self.token());
        self.spawn(completer, work);
        pending
    }

    /// Submit `work` and have `callback` invoked with its outcome.
    ///
    /// `callback` runs exactly once, on a pool thread, and owns whatever
    /// context it captured until then.
    pub fn submit_with<T, F, C>(&self, work: F, callback: C) -> CancellationToken
    where
        T: Interruptible,
        F: FnOnce(&Stage) -> T + Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        let token = self.token();
        self.spawn(Completer::new(token.clone(), callback), work);
        token
    }

    fn spawn<T, F>(&self, completer: Completer<T>, work: F)
    where
        T: Interruptible,
        F: FnOnce(&Stage) -> T + Send + 'static,
    {
        debug!(request = completer.token().request_id(), "request submitted");
        // The join handle is not needed: the completer reports the outcome,
        // including when the closure is dropped or unwinds.
        drop(self.handle.spawn_blocking(move || {
            let stage = Stage::new(completer.token().clone());
            if stage.is_cancelled() {
                debug!(request = stage.request_id(), "request cancelled before start");
                completer.complete(T::cancelled());
                return;
            }
            let outcome = work(&stage);
            completer.complete(outcome);
        }));
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("owns_runtime", &self.runtime.is_some())
            .field("next_request", &self.next_request.load(Ordering::Relaxed))
            .finish()
    }
}
