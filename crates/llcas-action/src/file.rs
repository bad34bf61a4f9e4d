//! File-backed action cache.
//!
//! Every mutation is appended to `actions.log` before it becomes visible.
//! On open the log is replayed in order; the last record for a key wins.

use std::path::Path;
use std::sync::RwLock;

use tracing::{debug, info};

use llcas_log::{RecordLog, SyncMode};
use llcas_types::Digest;

use crate::entry::{ActionEntry, PutOutcome};
use crate::error::{ActionCacheError, Result};
use crate::index::{Overwrite, ShardedIndex};
use crate::traits::ActionCache;

const ACTIONS_LOG: &str = "actions.log";

pub struct FileActionCache {
    log: RecordLog<ActionEntry>,
    index: ShardedIndex,
    /// Puts hold it shared, compaction exclusively.
    compaction: RwLock<()>,
}

impl FileActionCache {
    /// Open (or create) the cache stored under `root`.
    pub fn open(root: &Path, shards: usize, sync_mode: SyncMode) -> Result<Self> {
        let index = ShardedIndex::new(shards)?;
        let log = RecordLog::open(&root.join(ACTIONS_LOG), sync_mode)?;

        let records = log.recover()?;
        let replayed = records.len();
        for (_, entry) in records {
            index.insert(entry)?;
        }

        let live = index.len()?;
        info!(root = %root.display(), entries = live, replayed, "action cache opened");
        Ok(Self {
            log,
            index,
            compaction: RwLock::new(()),
        })
    }
}

impl FileActionCache {
    fn record(&self, entry: ActionEntry, overwrite: Overwrite) -> Result<PutOutcome> {
        let _shared = self.compaction.read().map_err(|_| ActionCacheError::Poisoned)?;
        let outcome = self.index.put_with(entry, overwrite, |entry| {
            self.log.append(entry)?;
            Ok(())
        })?;
        if outcome.changed() {
            debug!(key = %entry.key.short_hex(), result = %entry.result.short_hex(), ?outcome, "action put");
        }
        Ok(outcome)
    }
}

impl ActionCache for FileActionCache {
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

    /// Rewrite the log so it holds one record per key. Returns the number of
    /// superseded records dropped.
    fn compact(&self) -> Result<usize> {
        let _exclusive = self.compaction.write().map_err(|_| ActionCacheError::Poisoned)?;
        let entries = self.index.entries()?;
        let before = self.log.recover()?.len();
        self.log.rewrite(&entries)?;
        let dropped = before.saturating_sub(entries.len());
        info!(entries = entries.len(), dropped, "action log compacted");
        Ok(dropped)
    }
}

impl std::fmt::Debug for FileActionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileActionCache")
            .field("log", &self.log.path())
            .field("shards", &self.index.shard_count())
            .finish()
    }
}
