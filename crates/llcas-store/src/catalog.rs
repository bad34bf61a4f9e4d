//! Index shared by the store backends.
//!
//! A [`Catalog`] maps digests to their handle, recorded reference digests,
//! size, and a backend-specific location `L` (the bytes themselves for the
//! in-memory store, a log offset for the file store). References are kept as
//! digests so that the catalog can be rebuilt from persistent records after
//! a restart, when every handle is new.

use std::collections::HashMap;

use llcas_types::{Digest, ObjectId};

use crate::error::{StoreError, StoreResult};
use crate::handle::HandleTable;
use crate::limits::StoreLimits;

#[derive(Clone, Debug)]
pub(crate) struct CatalogEntry<L> {
    pub id: ObjectId,
    pub refs: Vec<Digest>,
    pub size: u64,
    pub location: L,
}

#[derive(Debug)]
pub(crate) struct Catalog<L> {
    handles: HandleTable,
    entries: HashMap<Digest, CatalogEntry<L>>,
    total_bytes: u64,
}

impl<L> Catalog<L> {
    pub fn new(handles: HandleTable) -> Self {
        Self {
            handles,
            entries: HashMap::new(),
            total_bytes: 0,
        }
    }

    pub fn resolve(&self, digest: &Digest) -> Option<ObjectId> {
        self.entries.get(digest).map(|e| e.id)
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        self.entries.contains_key(digest)
    }

    /// The digest behind a handle, or `StaleHandle`.
    pub fn digest(&self, id: ObjectId) -> StoreResult<Digest> {
        self.handles
            .get(id)
            .copied()
            .ok_or(StoreError::StaleHandle(id))
    }

    pub fn get(&self, id: ObjectId) -> StoreResult<(Digest, &CatalogEntry<L>)> {
        let digest = self.digest(id)?;
        let entry = self
            .entries
            .get(&digest)
            .ok_or(StoreError::StaleHandle(id))?;
        Ok((digest, entry))
    }

    pub fn get_mut(&mut self, digest: &Digest) -> Option<&mut CatalogEntry<L>> {
        self.entries.get_mut(digest)
    }

    /// Digests of the references passed to `put`. Every handle must be live.
    pub fn ref_digests(&self, refs: &[ObjectId]) -> StoreResult<Vec<Digest>> {
        refs.iter()
            .map(|&r| {
                self.handles
                    .get(r)
                    .copied()
                    .ok_or(StoreError::UnknownReference(r))
            })
            .collect()
    }

    /// Current handles for an entry's references, in recorded order.
    pub fn ref_ids(&self, object: &Digest, refs: &[Digest]) -> StoreResult<Vec<ObjectId>> {
        refs.iter()
            .map(|r| {
                self.resolve(r).ok_or(StoreError::DanglingReference {
                    object: *object,
                    missing: *r,
                })
            })
            .collect()
    }

    pub fn check_capacity(&self, limits: &StoreLimits, additional_bytes: u64) -> StoreResult<()> {
        if let Some(max) = limits.max_objects {
            if self.entries.len() as u64 >= max {
                return Err(StoreError::CapacityExceeded(format!(
                    "object limit of {max} reached"
                )));
            }
        }
        if let Some(max) = limits.max_bytes {
            let wanted = self.total_bytes.saturating_add(additional_bytes);
            if wanted > max {
                return Err(StoreError::CapacityExceeded(format!(
                    "storing {additional_bytes} bytes would use {wanted} of {max} bytes"
                )));
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, digest: Digest, refs: Vec<Digest>, size: u64, location: L) -> ObjectId {
        let id = self.handles.insert(digest);
        self.total_bytes += size;
        self.entries.insert(
            digest,
            CatalogEntry {
                id,
                refs,
                size,
                location,
            },
        );
        id
    }

    pub fn remove(&mut self, digest: &Digest) -> Option<CatalogEntry<L>> {
        let entry = self.entries.remove(digest)?;
        self.handles.remove(entry.id);
        self.total_bytes -= entry.size;
        Some(entry)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Digest, &CatalogEntry<L>)> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.entries.values().map(|e| e.id).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(byte: u8) -> Digest {
        Digest::from_hash([byte; 32])
    }

    fn catalog() -> Catalog<()> {
        Catalog::new(HandleTable::with_epoch(0))
    }

    #[test]
    fn insert_resolve_remove() {
        let mut c = catalog();
        let id = c.insert(digest(1), vec![], 10, ());
        assert_eq!(c.resolve(&digest(1)), Some(id));
        assert_eq!(c.total_bytes(), 10);

        assert!(c.remove(&digest(1)).is_some());
        assert!(c.resolve(&digest(1)).is_none());
        assert!(matches!(c.digest(id), Err(StoreError::StaleHandle(_))));
        assert_eq!(c.total_bytes(), 0);
    }

    #[test]
    fn unknown_reference_is_reported() {
        let c = catalog();
        let err = c.ref_digests(&[ObjectId::new(3, 0)]).unwrap_err();
        assert!(matches!(err, StoreError::UnknownReference(_)));
    }

    #[test]
    fn dangling_reference_is_reported() {
        let c = catalog();
        let err = c.ref_ids(&digest(1), &[digest(2)]).unwrap_err();
        assert!(matches!(err, StoreError::DanglingReference { .. }));
    }

    #[test]
    fn capacity_limits() {
        let mut c = catalog();
        c.insert(digest(1), vec![], 8, ());

        let by_count = StoreLimits {
            max_objects: Some(1),
            max_bytes: None,
        };
        assert!(c.check_capacity(&by_count, 0).is_err());

        let by_bytes = StoreLimits {
            max_objects: None,
            max_bytes: Some(10),
        };
        assert!(c.check_capacity(&by_bytes, 2).is_ok());
        assert!(matches!(
            c.check_capacity(&by_bytes, 3),
            Err(StoreError::CapacityExceeded(_))
        ));
    }
}
