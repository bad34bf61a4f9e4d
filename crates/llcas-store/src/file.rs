//! Log-backed object store.
//!
//! Layout of a store directory:
//! ```text
//! <root>/
//!   meta.toml      format version and hash algorithm
//!   objects.log    CRC-framed ObjectRecord entries
//! ```
//!
//! The catalog (digest -> handle, refs, size, log offset) lives in memory and
//! is rebuilt by replaying `objects.log` on open. Object data stays on disk
//! and is read on each load.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use llcas_crypto::ContentHasher;
use llcas_log::{RecordLog, SyncMode};
use llcas_types::{Digest, HashAlgorithm, ObjectId};

use crate::catalog::Catalog;
use crate::error::{StoreError, StoreResult};
use crate::handle::HandleTable;
use crate::limits::StoreLimits;
use crate::object::{Object, ObjectRecord};
use crate::traits::ObjectStore;

const META_FILE: &str = "meta.toml";
const OBJECTS_LOG: &str = "objects.log";
const FORMAT_VERSION: u32 = 1;

/// Options for opening a [`FileObjectStore`].
#[derive(Clone, Debug, Default)]
pub struct FileStoreOptions {
    pub algorithm: HashAlgorithm,
    pub limits: StoreLimits,
    pub sync_mode: SyncMode,
    /// Recompute each loaded object's digest and fail on mismatch.
    pub verify_on_read: bool,
}

/// Persistent store metadata, written once at creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub format_version: u32,
    pub algorithm: HashAlgorithm,
}

impl StoreMeta {
    /// Read `meta.toml` from `root`, creating it if the store is new.
    ///
    /// Fails with `Incompatible` if an existing store was created with a
    /// different algorithm or an unknown format version.
    pub fn load_or_create(root: &Path, algorithm: HashAlgorithm) -> StoreResult<Self> {
        let path = root.join(META_FILE);
        let wanted = Self {
            format_version: FORMAT_VERSION,
            algorithm,
        };

        if !path.exists() {
            let text = toml::to_string(&wanted).map_err(|e| StoreError::Serialization(e.to_string()))?;
            fs::write(&path, text)?;
            return Ok(wanted);
        }

        let text = fs::read_to_string(&path)?;
        let found: Self = toml::from_str(&text).map_err(|e| StoreError::Serialization(e.to_string()))?;
        if found.format_version != FORMAT_VERSION {
            return Err(StoreError::Incompatible(format!(
                "format version {} is not supported (expected {FORMAT_VERSION})",
                found.format_version
            )));
        }
        if found.algorithm != algorithm {
            return Err(StoreError::Incompatible(format!(
                "store uses {} but {} was requested",
                found.algorithm, algorithm
            )));
        }
        Ok(found)
    }
}

/// Object store persisted in an append-only record log.
pub struct FileObjectStore {
    root: PathBuf,
    hasher: ContentHasher,
    options: FileStoreOptions,
    log: RecordLog<ObjectRecord>,
    catalog: RwLock<Catalog<u64>>,
}

impl FileObjectStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: &Path, options: FileStoreOptions) -> StoreResult<Self> {
        fs::create_dir_all(root)?;
        StoreMeta::load_or_create(root, options.algorithm)?;

        let log = RecordLog::open(&root.join(OBJECTS_LOG), options.sync_mode)?;
        let mut catalog = Catalog::new(HandleTable::new());

        for (offset, record) in log.recover()? {
            match record {
                ObjectRecord::Put { digest, refs, data } => {
                    if catalog.contains(&digest) {
                        continue;
                    }
                    if let Some(missing) = refs.iter().find(|r| !catalog.contains(r)) {
                        warn!(
                            digest = %digest.short_hex(),
                            missing = %missing.short_hex(),
                            "recovered object references missing content"
                        );
                    }
                    catalog.insert(digest, refs, data.len() as u64, offset);
                }
                ObjectRecord::Delete { digest } => {
                    catalog.remove(&digest);
                }
            }
        }

        info!(
            root = %root.display(),
            objects = catalog.len(),
            bytes = catalog.total_bytes(),
            "object store opened"
        );

        Ok(Self {
            root: root.to_path_buf(),
            hasher: ContentHasher::object(options.algorithm),
            options,
            log,
            catalog: RwLock::new(catalog),
        })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Catalog<u64>>> {
        self.catalog.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Catalog<u64>>> {
        self.catalog.write().map_err(|_| StoreError::Poisoned)
    }

    /// Read the data of the object recorded at `offset`.
    fn read_data(&self, offset: u64, expected: &Digest) -> StoreResult<Vec<u8>> {
        match self.log.read_at(offset)? {
            ObjectRecord::Put { digest, refs, data } if digest == *expected => {
                if self.options.verify_on_read && !self.hasher.verify(&data, &refs, &digest) {
                    let computed = self.hasher.object_digest(&data, &refs);
                    warn!(expected = %digest.short_hex(), computed = %computed.short_hex(), "hash mismatch on read");
                    return Err(StoreError::HashMismatch {
                        expected: digest,
                        computed,
                    });
                }
                Ok(data)
            }
            other => Err(StoreError::CorruptRecord {
                offset,
                reason: format!("expected object {}, found record for {}", expected, other.digest()),
            }),
        }
    }
}

impl ObjectStore for FileObjectStore {
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
        catalog.ref_digests(refs)?;
        catalog.check_capacity(&self.options.limits, data.len() as u64)?;

        // Write-then-link: the record is durable before the handle exists.
        let offset = self.log.append(&ObjectRecord::Put {
            digest,
            refs: ref_digests.clone(),
            data: data.to_vec(),
        })?;

        let id = catalog.insert(digest, ref_digests, data.len() as u64, offset);
        debug!(digest = %digest.short_hex(), size = data.len(), offset, "stored object");
        Ok(id)
    }

    fn load(&self, id: ObjectId) -> StoreResult<Option<Object>> {
        // Hold the read lock across the disk read so compaction cannot move
        // the record underneath us.
        let catalog = self.read()?;
        let (digest, entry) = catalog.get(id)?;
        let refs = catalog.ref_ids(&digest, &entry.refs)?;
        let data = self.read_data(entry.location, &digest)?;
        Ok(Some(Object {
            id,
            digest,
            data: Bytes::from(data),
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
        self.log.append(&ObjectRecord::Delete { digest })?;
        catalog.remove(&digest);
        debug!(digest = %digest.short_hex(), "deleted object");
        Ok(true)
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

    /// Rewrite `objects.log` with only live objects, in their original
    /// order so that every reference still precedes its referrer.
    fn compact(&self) -> StoreResult<u64> {
        let mut catalog = self.write()?;
        let before = self.log.offset()?;

        let mut live: Vec<(u64, Digest)> = catalog
            .entries()
            .map(|(digest, entry)| (entry.location, *digest))
            .collect();
        live.sort_unstable_by_key(|(offset, _)| *offset);

        let mut records = Vec::with_capacity(live.len());
        for (offset, digest) in &live {
            let record = self.log.read_at(*offset)?;
            if record.digest() != digest {
                return Err(StoreError::CorruptRecord {
                    offset: *offset,
                    reason: format!("expected object {digest} during compaction"),
                });
            }
            records.push(record);
        }

        let offsets = self.log.rewrite(&records)?;
        for ((_, digest), offset) in live.iter().zip(offsets) {
            if let Some(entry) = catalog.get_mut(digest) {
                entry.location = offset;
            }
        }

        let after = self.log.offset()?;
        let reclaimed = before.saturating_sub(after);
        info!(objects = live.len(), reclaimed, "object log compacted");
        Ok(reclaimed)
    }
}

impl std::fmt::Debug for FileObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileObjectStore")
            .field("root", &self.root)
            .field("algorithm", &self.hasher.algorithm())
            .field("object_count", &self.len().unwrap_or_default())
            .finish()
    }
}
