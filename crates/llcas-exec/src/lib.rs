//! Request scheduling for llcas.
//!
//! Every potentially blocking operation is submitted as a request: a closure
//! run on a tokio blocking pool, paired with a [`CancellationToken`] the
//! caller may use to withdraw it. Each request completes exactly once, either
//! through an awaitable [`Pending`] or a caller-supplied callback.
//!
//! Cancellation is advisory. Work that has not started when it is cancelled
//! is skipped and completes as `Cancelled`; work that has started may check
//! its [`Stage`] at safe points, but is never interrupted.

pub mod completion;
pub mod error;
pub mod executor;
pub mod token;

pub use completion::{Interruptible, Pending};
pub use error::{ExecError, ExecResult};
pub use executor::{Executor, ExecutorConfig};
pub use token::{CancellationToken, Stage};
