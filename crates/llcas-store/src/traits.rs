use llcas_crypto::ContentHasher;
use llcas_types::{Digest, ObjectId};

use crate::error::StoreResult;
use crate::object::Object;

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. The digest covers data and
///   reference digests, so identical `put`s coalesce into one object.
/// - Referential integrity is enforced at `put` time: every reference must
///   name a live object in the same store.
/// - Absence is `Ok(None)` / `Ok(false)`, never an error.
/// - Concurrent reads proceed in parallel; writes are serialized.
/// - All I/O errors are propagated, never silently ignored or retried.
pub trait ObjectStore: Send + Sync {
    /// The hasher this store derives digests with.
    fn hasher(&self) -> ContentHasher;

    /// Look up the handle for a digest without materializing data.
    fn resolve(&self, digest: &Digest) -> StoreResult<Option<ObjectId>>;

    /// The digest behind a handle. Fails with `StaleHandle` for handles
    /// that are not live in this store.
    fn digest(&self, id: ObjectId) -> StoreResult<Digest>;

    /// Store `data` with outgoing references `refs` and return its handle.
    ///
    /// Idempotent: storing identical data and references returns the
    /// existing handle without duplicating storage. Fails with
    /// `UnknownReference` if any reference is not live; nothing is stored
    /// in that case.
    fn put(&self, data: &[u8], refs: &[ObjectId]) -> StoreResult<ObjectId>;

    /// Load an object by handle.
    fn load(&self, id: ObjectId) -> StoreResult<Option<Object>>;

    /// Check whether content for a digest is stored.
    fn has(&self, digest: &Digest) -> StoreResult<bool>;

    /// The references recorded for an object, in original order.
    fn refs(&self, id: ObjectId) -> StoreResult<Vec<ObjectId>>;

    /// Delete an object by handle. Returns `true` if it existed.
    ///
    /// Intended for garbage collection only. Deleting an object that is
    /// still referenced leaves its referrers dangling.
    fn delete(&self, id: ObjectId) -> StoreResult<bool>;

    /// Number of stored objects.
    fn len(&self) -> StoreResult<usize>;

    /// Total bytes of object data.
    fn total_bytes(&self) -> StoreResult<u64>;

    /// Sorted handles of all stored objects.
    fn all_ids(&self) -> StoreResult<Vec<ObjectId>>;

    /// Returns `true` if the store holds no objects.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Load an object by digest.
    fn load_digest(&self, digest: &Digest) -> StoreResult<Option<Object>> {
        match self.resolve(digest)? {
            Some(id) => self.load(id),
            None => Ok(None),
        }
    }

    /// Digest a reference-free object would get in this store.
    fn digest_of(&self, data: &[u8]) -> Digest {
        self.hasher().digest_of(data)
    }

    /// Reclaim space held by deleted objects. Returns bytes reclaimed.
    ///
    /// Backends without separate storage reclaim eagerly on `delete` and
    /// keep this default.
    fn compact(&self) -> StoreResult<u64> {
        Ok(0)
    }
}
