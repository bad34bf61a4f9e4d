//! llcas: a content-addressable storage engine with an action cache.
//!
//! Objects are immutable byte strings with ordered references to other
//! objects, identified by a digest over both. The action cache maps a
//! caller-defined key digest to the object an action produced. [`Cas`] is
//! the instance handle tying the store, the cache and request scheduling
//! together.
//!
//! ```no_run
//! use llcas::{Cas, LookupResult};
//!
//! let cas = Cas::in_memory()?;
//! let a = cas.put(b"alpha", &[])?;
//! let b = cas.put(b"beta", &[a])?;
//!
//! let key = cas.action_key(b"build1");
//! cas.action_put(&key, b)?;
//! assert_eq!(cas.action_get(&key), LookupResult::Found(b));
//! # Ok::<(), llcas::CasError>(())
//! ```

pub mod cas;
pub mod config;
pub mod error;
pub mod gc;

pub use cas::Cas;
pub use config::{ActionCacheConfig, CasConfig};
pub use error::{ConfigError, ConfigResult};
pub use gc::GcReport;

pub use llcas_action::PutOutcome;
pub use llcas_exec::{CancellationToken, ExecutorConfig, Pending};
pub use llcas_log::SyncMode;
pub use llcas_store::{Object, StoreLimits};
pub use llcas_types::{
    CasError, Digest, ErrorKind, HashAlgorithm, LookupResult, LookupStatus, ObjectId, Version,
    DIGEST_LEN, VERSION_MAJOR, VERSION_MINOR,
};
