//! Mark-and-sweep garbage collection.
//!
//! Live objects are everything reachable from the caller's roots plus every
//! result the action cache still points at. Everything else is deleted, and
//! persistent backends are compacted afterwards.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use llcas_action::ActionCache;
use llcas_dag::closure;
use llcas_store::ObjectStore;
use llcas_types::{CasError, ObjectId};

/// Summary of one collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Objects examined.
    pub scanned: usize,
    /// Objects deleted.
    pub deleted: usize,
    /// Object data bytes freed.
    pub bytes_freed: u64,
    /// Bytes reclaimed from the object log by compaction.
    pub log_bytes_reclaimed: u64,
}

pub(crate) fn collect(
    store: &dyn ObjectStore,
    actions: &dyn ActionCache,
    roots: &[ObjectId],
) -> Result<GcReport, CasError> {
    let mut all_roots = roots.to_vec();
    for result in actions.results()? {
        match store.resolve(&result)? {
            Some(id) => all_roots.push(id),
            None => warn!(result = %result.short_hex(), "action result missing during gc"),
        }
    }

    let live: HashSet<ObjectId> = closure(store, &all_roots)?;
    let bytes_before = store.total_bytes()?;

    let ids = store.all_ids()?;
    let mut report = GcReport {
        scanned: ids.len(),
        ..GcReport::default()
    };
    for id in ids {
        if live.contains(&id) {
            continue;
        }
        if store.delete(id)? {
            report.deleted += 1;
        }
    }
    report.bytes_freed = bytes_before.saturating_sub(store.total_bytes()?);

    if report.deleted > 0 {
        report.log_bytes_reclaimed = store.compact()?;
    }
    let superseded = actions.compact()?;
    debug!(superseded, "action records dropped");

    info!(
        scanned = report.scanned,
        deleted = report.deleted,
        bytes_freed = report.bytes_freed,
        "garbage collection complete"
    );
    Ok(report)
}
