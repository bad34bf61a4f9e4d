use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use tracing::debug;

use llcas_crypto::ContentHasher;
use llcas_types::{Digest, HashAlgorithm, ObjectId};

use crate::catalog::Catalog;
use crate::error::{StoreError, StoreResult};
use crate::handle::HandleTable;
use crate::limits::StoreLimits;
use crate::object::Object;
use crate::traits::ObjectStore;

/// In-memory object store.
///
/// Intended for tests and embedding. All objects are held in memory behind a
/// `RwLock`; loads share the stored buffer instead of copying it.
pub struct InMemoryObjectStore {
    hasher: ContentHasher,
    limits: StoreLimits,
    catalog: RwLock<Catalog<Bytes>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store using BLAKE3.
    pub fn new() -> Self {
        Self::with_options(HashAlgorithm::default(), StoreLimits::unlimited())
    }

    /// Create a new empty store with an explicit algorithm and limits.
    pub fn with_options(algorithm: HashAlgorithm, limits: StoreLimits) -> Self {
        Self::with_handles(algorithm, limits, HandleTable::new())
    }

    pub(crate) fn with_handles(
        algorithm: HashAlgorithm,
        limits: StoreLimits,
        handles: HandleTable,
    ) -> Self {
        Self {
            hasher: ContentHasher::object(algorithm),
            limits,
            catalog: RwLock::new(Catalog::new(handles)),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Catalog<Bytes>>> {
        self.catalog.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Catalog<Bytes>>> {
        self.catalog.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn hasher(&self) -> ContentHasher {
        self.hasher
    }

    fn resolve(&self, digest: &Digest) -> StoreResult<Option<ObjectId>> {
        Ok(self.read()?.resolve(digest))
    }

    fn digest(&self, id: ObjectId) -> StoreResult<Digest> {
        self.read()?.digest(id)
    }

    fn put(&self, data: &[u8], refs: &[ObjectId]) -> StoreResult<ObjectId> {
        let ref_digests = self.read()?.ref_digests(refs)?;
        let digest = self.hasher.object_digest(data, &ref_digests);

        let mut catalog = self.write()?;
        if let Some(id) = catalog.resolve(&digest) {
            return Ok(id);
        }
        // References may have been deleted while the lock was released.
        catalog.ref_digests(refs)?;
        catalog.check_capacity(&self.limits, data.len() as u64)?;

        let id = catalog.insert(
            digest,
            ref_digests,
            data.len() as u64,
            Bytes::copy_from_slice(data),
        );
        debug!(digest = %digest.short_hex(), size = data.len(), refs = refs.len(), "stored object");
        Ok(id)
    }

    fn load(&self, id: ObjectId) -> StoreResult<Option<Object>> {
        let catalog = self.read()?;
        let (digest, entry) = catalog.get(id)?;
        let refs = catalog.ref_ids(&digest, &entry.refs)?;
        Ok(Some(Object {
            id,
            digest,
            data: entry.location.clone(),
            refs,
        }))
    }

    fn has(&self, digest: &Digest) -> StoreResult<bool> {
        Ok(self.read()?.contains(digest))
    }

    fn refs(&self, id: ObjectId) -> StoreResult<Vec<ObjectId>> {
        let catalog = self.read()?;
        let (digest, entry) = catalog.get(id)?;
        catalog.ref_ids(&digest, &entry.refs)
    }

    fn delete(&self, id: ObjectId) -> StoreResult<bool> {
        let mut catalog = self.write()?;
        let Ok(digest) = catalog.digest(id) else {
            return Ok(false);
        };
        let removed = catalog.remove(&digest).is_some();
        if removed {
            debug!(digest = %digest.short_hex(), "deleted object");
        }
        Ok(removed)
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    fn total_bytes(&self) -> StoreResult<u64> {
        Ok(self.read()?.total_bytes())
    }

    fn all_ids(&self) -> StoreResult<Vec<ObjectId>> {
        Ok(self.read()?.ids())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len().unwrap_or_default();
        f.debug_struct("InMemoryObjectStore")
            .field("algorithm", &self.hasher.algorithm())
            .field("object_count", &count)
            .finish()
    }
}
