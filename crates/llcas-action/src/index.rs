//! Sharded key -> result index.
//!
//! Keys are spread over a fixed number of `RwLock`ed maps by their first
//! digest bytes. Reads of any shard run in parallel; a put holds only its
//! own shard's write lock for the whole check-then-set, so puts to the same
//! key are serialized while puts to unrelated keys usually are not.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use llcas_types::Digest;

use crate::entry::{ActionEntry, PutOutcome};
use crate::error::{ActionCacheError, Result};
use crate::DEFAULT_SHARDS;

/// Which existing mapping a put may replace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Overwrite {
    Never,
    Always,
    /// Only a mapping to exactly this result.
    Only(Digest),
}

impl From<bool> for Overwrite {
    fn from(allow: bool) -> Self {
        if allow {
            Self::Always
        } else {
            Self::Never
        }
    }
}

#[derive(Debug)]
pub struct ShardedIndex {
    shards: Vec<RwLock<HashMap<Digest, Digest>>>,
}

impl Default for ShardedIndex {
    fn default() -> Self {
        Self {
            shards: (0..DEFAULT_SHARDS).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }
}

impl ShardedIndex {
    pub fn new(shards: usize) -> Result<Self> {
        if shards == 0 {
            return Err(ActionCacheError::InvalidConfig(
                "shard count must be at least 1".into(),
            ));
        }
        Ok(Self {
            shards: (0..shards).map(|_| RwLock::new(HashMap::new())).collect(),
        })
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_of(&self, key: &Digest) -> usize {
        let bytes = key.as_bytes();
        let prefix = u16::from_le_bytes([bytes[0], bytes[1]]);
        usize::from(prefix) % self.shards.len()
    }

    fn read(&self, shard: usize) -> Result<RwLockReadGuard<'_, HashMap<Digest, Digest>>> {
        self.shards[shard].read().map_err(|_| ActionCacheError::Poisoned)
    }

    fn write(&self, shard: usize) -> Result<RwLockWriteGuard<'_, HashMap<Digest, Digest>>> {
        self.shards[shard].write().map_err(|_| ActionCacheError::Poisoned)
    }

    pub fn get(&self, key: &Digest) -> Result<Option<Digest>> {
        Ok(self.read(self.shard_of(key))?.get(key).copied())
    }

    /// Atomically check and set `key -> result`.
    ///
    /// `commit` runs under the shard lock after the check passes and before
    /// the new value becomes visible; if it fails, nothing changes. It is not
    /// called for a `Confirmed` put.
    pub fn put_with<F>(&self, entry: ActionEntry, overwrite: impl Into<Overwrite>, commit: F) -> Result<PutOutcome>
    where
        F: FnOnce(&ActionEntry) -> Result<()>,
    {
        let overwrite = overwrite.into();
        let mut shard = self.write(self.shard_of(&entry.key))?;
        let outcome = match shard.get(&entry.key) {
            None => PutOutcome::Inserted,
            Some(existing) if *existing == entry.result => return Ok(PutOutcome::Confirmed),
            Some(existing) if !replaces(overwrite, existing) => {
                return Err(ActionCacheError::Conflict {
                    key: entry.key,
                    existing: *existing,
                    proposed: entry.result,
                })
            }
            Some(existing) => PutOutcome::Overwritten { previous: *existing },
        };
        commit(&entry)?;
        shard.insert(entry.key, entry.result);
        Ok(outcome)
    }

    /// Set without checking; used when replaying a log.
    pub fn insert(&self, entry: ActionEntry) -> Result<()> {
        self.write(self.shard_of(&entry.key))?.insert(entry.key, entry.result);
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        let mut total = 0;
        for shard in 0..self.shards.len() {
            total += self.read(shard)?.len();
        }
        Ok(total)
    }

    /// A snapshot of all entries, sorted by key.
    pub fn entries(&self) -> Result<Vec<ActionEntry>> {
        let mut entries = Vec::new();
        for shard in 0..self.shards.len() {
            entries.extend(
                self.read(shard)?
                    .iter()
                    .map(|(key, result)| ActionEntry { key: *key, result: *result }),
            );
        }
        entries.sort_unstable_by(|a, b| a.key.as_bytes().cmp(b.key.as_bytes()));
        Ok(entries)
    }
}

fn replaces(overwrite: Overwrite, existing: &Digest) -> bool {
    match overwrite {
        Overwrite::Never => false,
        Overwrite::Always => true,
        Overwrite::Only(expected) => expected == *existing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(byte: u8) -> Digest {
        Digest::from_hash([byte; 32])
    }

    fn entry(key: u8, result: u8) -> ActionEntry {
        ActionEntry {
            key: d(key),
            result: d(result),
        }
    }

    fn no_commit(_: &ActionEntry) -> Result<()> {
        Ok(())
    }

    #[test]
    fn zero_shards_rejected() {
        assert!(matches!(
            ShardedIndex::new(0),
            Err(ActionCacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn outcomes() {
        let index = ShardedIndex::new(4).unwrap();
        assert_eq!(index.put_with(entry(1, 10), false, no_commit).unwrap(), PutOutcome::Inserted);
        assert_eq!(index.put_with(entry(1, 10), false, no_commit).unwrap(), PutOutcome::Confirmed);
        assert!(matches!(
            index.put_with(entry(1, 11), false, no_commit),
            Err(ActionCacheError::Conflict { .. })
        ));
        assert_eq!(
            index.put_with(entry(1, 11), true, no_commit).unwrap(),
            PutOutcome::Overwritten { previous: d(10) }
        );
        assert_eq!(index.get(&d(1)).unwrap(), Some(d(11)));
    }

    #[test]
    fn overwrite_only_matching_result() {
        let index = ShardedIndex::new(4).unwrap();
        index.put_with(entry(5, 50), false, no_commit).unwrap();

        assert!(matches!(
            index.put_with(entry(5, 52), Overwrite::Only(d(51)), no_commit),
            Err(ActionCacheError::Conflict { existing, .. }) if existing == d(50)
        ));
        assert_eq!(
            index.put_with(entry(5, 52), Overwrite::Only(d(50)), no_commit).unwrap(),
            PutOutcome::Overwritten { previous: d(50) }
        );
        assert_eq!(index.get(&d(5)).unwrap(), Some(d(52)));
        assert_eq!(
            index.put_with(entry(6, 60), Overwrite::Only(d(50)), no_commit).unwrap(),
            PutOutcome::Inserted
        );
    }

    #[test]
    fn failed_commit_leaves_index_unchanged() {
        let index = ShardedIndex::new(2).unwrap();
        let err = index.put_with(entry(3, 30), false, |_| Err(ActionCacheError::Poisoned));
        assert!(err.is_err());
        assert_eq!(index.get(&d(3)).unwrap(), None);
    }

    #[test]
    fn commit_not_called_for_confirmation() {
        let index = ShardedIndex::new(2).unwrap();
        index.put_with(entry(4, 40), false, no_commit).unwrap();
        let outcome = index
            .put_with(entry(4, 40), false, |_| panic!("commit called for a no-op"))
            .unwrap();
        assert_eq!(outcome, PutOutcome::Confirmed);
    }

    #[test]
    fn entries_span_all_shards() {
        let index = ShardedIndex::new(16).unwrap();
        for k in 0..50u8 {
            index.insert(entry(k, k.wrapping_add(100))).unwrap();
        }
        assert_eq!(index.len().unwrap(), 50);
        let entries = index.entries().unwrap();
        assert_eq!(entries.len(), 50);
        assert_eq!(entries[0], entry(0, 100));
    }
}
