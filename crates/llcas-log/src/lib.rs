//! Append-only record log for llcas.
//!
//! Both persistent indexes (objects and action-cache entries) are stored as a
//! sequence of bincode-serialized records, each framed with a length prefix
//! and a CRC32 checksum. Opening a store replays the log; torn or corrupted
//! entries left by a crash are skipped.

pub mod error;
pub mod log;

pub use error::{LogError, Result};
pub use log::{RecordLog, SyncMode};
