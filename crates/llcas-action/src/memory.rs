//! In-memory action cache for testing and ephemeral use.

use tracing::debug;

use llcas_types::Digest;

use crate::entry::{ActionEntry, PutOutcome};
use crate::error::Result;
use crate::index::{Overwrite, ShardedIndex};
use crate::traits::ActionCache;

/// An in-memory implementation of [`ActionCache`]. Contents are lost when
/// the cache is dropped.
#[derive(Debug)]
pub struct InMemoryActionCache {
    index: ShardedIndex,
}

impl InMemoryActionCache {
    pub fn new() -> Self {
        Self {
            index: ShardedIndex::default(),
        }
    }

    pub fn with_shards(shards: usize) -> Result<Self> {
        Ok(Self {
            index: ShardedIndex::new(shards)?,
        })
    }
}

impl InMemoryActionCache {
    fn record(&self, entry: ActionEntry, overwrite: Overwrite) -> Result<PutOutcome> {
        let outcome = self.index.put_with(entry, overwrite, |_| Ok(()))?;
        if outcome.changed() {
            debug!(key = %entry.key.short_hex(), result = %entry.result.short_hex(), ?outcome, "action put");
        }
        Ok(outcome)
    }
}

impl Default for InMemoryActionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionCache for InMemoryActionCache {
    fn get(&self, key: &Digest) -> Result<Option<Digest>> {
        self.index.get(key)
    }

    fn put(&self, key: Digest, result: Digest, allow_overwrite: bool) -> Result<PutOutcome> {
        self.record(ActionEntry { key, result }, allow_overwrite.into())
    }

    fn replace(&self, key: Digest, expected: Digest, result: Digest) -> Result<PutOutcome> {
        self.record(ActionEntry { key, result }, Overwrite::Only(expected))
    }

    fn len(&self) -> Result<usize> {
        self.index.len()
    }

    fn entries(&self) -> Result<Vec<ActionEntry>> {
        self.index.entries()
    }
}
