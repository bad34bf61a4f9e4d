//! Action cache for llcas.
//!
//! Maps a caller-defined key digest (typically a hash of an action's full
//! inputs) to the digest of the object its execution produced.
//! The cache stores associations only; result objects live in the object
//! store and are deduplicated there.
//!
//! A changed result under an unchanged key means either a key collision or
//! a non-deterministic producer. Both are surfaced as `Conflict` unless the
//! caller explicitly allows overwriting.
//!
//! # Backends
//!
//! - [`InMemoryActionCache`] -- sharded in-memory index
//! - [`FileActionCache`] -- the same index, rebuilt from `actions.log` on open

pub mod entry;
pub mod error;
pub mod file;
pub mod index;
pub mod memory;
pub mod traits;

pub use entry::{ActionEntry, PutOutcome};
pub use error::{ActionCacheError, Result};
pub use file::FileActionCache;
pub use index::{Overwrite, ShardedIndex};
pub use memory::InMemoryActionCache;
pub use traits::ActionCache;

/// Default number of index shards.
pub const DEFAULT_SHARDS: usize = 16;
