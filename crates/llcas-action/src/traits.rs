//! The [`ActionCache`] trait defining the action cache interface.

use llcas_types::Digest;

use crate::entry::{ActionEntry, PutOutcome};
use crate::error::Result;

/// Storage backend for action key -> result associations.
///
/// Implementations must be thread-safe and make each `put`'s
/// check-then-set atomic with respect to other puts of the same key. A put
/// that returns successfully is visible to every later `get`.
pub trait ActionCache: Send + Sync {
    /// The result recorded for `key`, or `Ok(None)` if there is none.
    fn get(&self, key: &Digest) -> Result<Option<Digest>>;

    /// Record `key -> result`.
    ///
    /// If `key` already maps to the same result this is a successful no-op
    /// ([`PutOutcome::Confirmed`]). If it maps to a different result, the
    /// put fails with `Conflict` unless `allow_overwrite` is set, in which
    /// case the mapping is replaced.
    fn put(&self, key: Digest, result: Digest, allow_overwrite: bool) -> Result<PutOutcome>;

    /// Record `key -> result`, replacing an existing mapping only if it is
    /// `key -> expected`. Any other existing result is a `Conflict`.
    fn replace(&self, key: Digest, expected: Digest, result: Digest) -> Result<PutOutcome>;

    /// Number of cached keys.
    fn len(&self) -> Result<usize>;

    /// All entries, sorted by key.
    fn entries(&self) -> Result<Vec<ActionEntry>>;

    /// Returns `true` if nothing is cached.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Drop superseded persistent records. Returns how many were dropped.
    ///
    /// Backends without persistent records keep this default.
    fn compact(&self) -> Result<usize> {
        Ok(0)
    }

    /// Distinct result digests referenced by the cache.
    fn results(&self) -> Result<Vec<Digest>> {
        let mut results: Vec<Digest> = self.entries()?.into_iter().map(|e| e.result).collect();
        results.sort_unstable_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
        results.dedup();
        Ok(results)
    }
}
