use std::sync::{Arc, RwLock, RwLockReadGuard};

use tokio::runtime::Handle;
use tracing::{info, warn};

use llcas_action::{ActionCache, ActionCacheError, FileActionCache, InMemoryActionCache, PutOutcome};
use llcas_crypto::ContentHasher;
use llcas_dag::Walk;
use llcas_exec::{CancellationToken, Executor, Pending};
use llcas_store::{FileObjectStore, FileStoreOptions, InMemoryObjectStore, Object, ObjectStore};
use llcas_types::{CasError, Digest, LookupResult, ObjectId, Version};

use crate::config::CasConfig;
use crate::gc::{self, GcReport};

/// State shared with in-flight requests.
struct Inner {
    config: CasConfig,
    store: Box<dyn ObjectStore>,
    actions: Box<dyn ActionCache>,
    action_keys: ContentHasher,
    /// Mutations hold it shared; garbage collection holds it exclusively so
    /// that no new reference appears between mark and sweep.
    gc_gate: RwLock<()>,
}

impl Inner {
    fn mutation(&self) -> Result<RwLockReadGuard<'_, ()>, CasError> {
        self.gc_gate
            .read()
            .map_err(|_| CasError::store("collection lock poisoned"))
    }

    fn load(&self, id: ObjectId) -> LookupResult<Object> {
        self.store.load(id).into()
    }

    fn load_digest(&self, digest: &Digest) -> LookupResult<Object> {
        self.store.load_digest(digest).into()
    }

    fn has(&self, digest: &Digest) -> Result<bool, CasError> {
        Ok(self.store.has(digest)?)
    }

    fn action_get(&self, key: &Digest) -> LookupResult<ObjectId> {
        let result = match self.actions.get(key) {
            Ok(Some(result)) => result,
            Ok(None) => return LookupResult::NotFound,
            Err(err) => return LookupResult::Error(err.into()),
        };
        match self.store.resolve(&result) {
            Ok(Some(id)) => LookupResult::Found(id),
            Ok(None) => {
                warn!(
                    key = %key.short_hex(),
                    result = %result.short_hex(),
                    "cached action result is no longer stored"
                );
                LookupResult::NotFound
            }
            Err(err) => LookupResult::Error(err.into()),
        }
    }

    fn action_put(&self, key: &Digest, result: ObjectId, allow_overwrite: bool) -> Result<PutOutcome, CasError> {
        let _mutation = self.mutation()?;
        let digest = self.store.digest(result)?;
        match self.actions.put(*key, digest, allow_overwrite) {
            // A result that is no longer stored is reported as a miss, so it
            // must not block the recomputed one.
            Err(ActionCacheError::Conflict { existing, .. }) if !self.store.has(&existing)? => {
                warn!(
                    key = %key.short_hex(),
                    stale = %existing.short_hex(),
                    "replacing action entry whose result is no longer stored"
                );
                Ok(self.actions.replace(*key, existing, digest)?)
            }
            outcome => Ok(outcome?),
        }
    }
}

/// A content-addressable store instance with its action cache.
///
/// Blocking operations come in three forms: a synchronous call, a
/// `submit_*` call returning an awaitable [`Pending`], and a
/// `submit_*_with` call that invokes a callback exactly once and returns a
/// [`CancellationToken`]. The synchronous form submits and then waits, so it
/// must not be called from within an async runtime context; use the
/// awaitable form there.
///
/// Handles ([`ObjectId`]) and tokens are only meaningful for the instance
/// that issued them. Dropping the instance shuts its runtime down in the
/// background; requests that had not run complete as cancelled.
pub struct Cas {
    inner: Arc<Inner>,
    executor: Executor,
}

impl Cas {
    /// Open a store described by `config` with its own runtime.
    pub fn open(config: CasConfig) -> Result<Self, CasError> {
        config.validate()?;
        let executor = Executor::new(&config.runtime)?;
        Self::build(config, executor)
    }

    /// Open a fresh in-memory store with default settings.
    pub fn in_memory() -> Result<Self, CasError> {
        Self::open(CasConfig::in_memory())
    }

    /// Open a store that schedules requests on an existing runtime.
    pub fn open_with_handle(config: CasConfig, handle: Handle) -> Result<Self, CasError> {
        config.validate()?;
        Self::build(config, Executor::from_handle(handle))
    }

    fn build(config: CasConfig, executor: Executor) -> Result<Self, CasError> {
        let (store, actions): (Box<dyn ObjectStore>, Box<dyn ActionCache>) = match &config.path {
            None => (
                Box::new(InMemoryObjectStore::with_options(config.algorithm, config.limits)),
                Box::new(InMemoryActionCache::with_shards(config.action_cache.shards)?),
            ),
            Some(root) => {
                let options = FileStoreOptions {
                    algorithm: config.algorithm,
                    limits: config.limits,
                    sync_mode: config.sync,
                    verify_on_read: config.verify_on_read,
                };
                (
                    Box::new(FileObjectStore::open(root, options)?),
                    Box::new(FileActionCache::open(root, config.action_cache.shards, config.sync)?),
                )
            }
        };

        info!(
            path = ?config.path,
            algorithm = %config.algorithm,
            version = %Version::CURRENT,
            "cas opened"
        );

        let inner = Inner {
            action_keys: ContentHasher::action_key(config.algorithm),
            config,
            store,
            actions,
            gc_gate: RwLock::new(()),
        };
        Ok(Self {
            inner: Arc::new(inner),
            executor,
        })
    }

    pub fn config(&self) -> &CasConfig {
        &self.inner.config
    }

    /// Engine version, for capability checks by dynamically bound callers.
    pub fn version() -> Version {
        Version::CURRENT
    }

    // ---------------------------------------------------------------
    // Digests and identity
    // ---------------------------------------------------------------

    /// Digest a reference-free object with these bytes would get.
    pub fn digest_of(&self, data: &[u8]) -> Digest {
        self.inner.store.digest_of(data)
    }

    /// Derive an action key from arbitrary input bytes.
    pub fn action_key(&self, input: &[u8]) -> Digest {
        self.inner.action_keys.hash(input)
    }

    /// Parse a digest from raw bytes; any length other than 32 is rejected.
    pub fn parse_digest(bytes: &[u8]) -> Result<Digest, CasError> {
        Ok(Digest::from_slice(bytes)?)
    }

    pub fn resolve(&self, digest: &Digest) -> LookupResult<ObjectId> {
        self.inner.store.resolve(digest).into()
    }

    pub fn digest(&self, id: ObjectId) -> Result<Digest, CasError> {
        Ok(self.inner.store.digest(id)?)
    }

    // ---------------------------------------------------------------
    // Objects
    // ---------------------------------------------------------------

    pub fn put(&self, data: &[u8], refs: &[ObjectId]) -> Result<ObjectId, CasError> {
        let _mutation = self.inner.mutation()?;
        Ok(self.inner.store.put(data, refs)?)
    }

    pub fn load(&self, id: ObjectId) -> LookupResult<Object> {
        self.submit_load(id).wait()
    }

    pub fn submit_load(&self, id: ObjectId) -> Pending<LookupResult<Object>> {
        let inner = Arc::clone(&self.inner);
        self.executor.submit(move |_| inner.load(id))
    }

    pub fn submit_load_with<F>(&self, id: ObjectId, callback: F) -> CancellationToken
    where
        F: FnOnce(LookupResult<Object>) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        self.executor.submit_with(move |_| inner.load(id), callback)
    }

    pub fn load_digest(&self, digest: &Digest) -> LookupResult<Object> {
        self.submit_load_digest(digest).wait()
    }

    pub fn submit_load_digest(&self, digest: &Digest) -> Pending<LookupResult<Object>> {
        let inner = Arc::clone(&self.inner);
        let digest = *digest;
        self.executor.submit(move |_| inner.load_digest(&digest))
    }

    pub fn submit_load_digest_with<F>(&self, digest: &Digest, callback: F) -> CancellationToken
    where
        F: FnOnce(LookupResult<Object>) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let digest = *digest;
        self.executor.submit_with(move |_| inner.load_digest(&digest), callback)
    }

    pub fn has(&self, digest: &Digest) -> Result<bool, CasError> {
        self.submit_has(digest).wait()
    }

    pub fn submit_has(&self, digest: &Digest) -> Pending<Result<bool, CasError>> {
        let inner = Arc::clone(&self.inner);
        let digest = *digest;
        self.executor.submit(move |_| inner.has(&digest))
    }

    pub fn submit_has_with<F>(&self, digest: &Digest, callback: F) -> CancellationToken
    where
        F: FnOnce(Result<bool, CasError>) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let digest = *digest;
        self.executor.submit_with(move |_| inner.has(&digest), callback)
    }

    // ---------------------------------------------------------------
    // Reference graph
    // ---------------------------------------------------------------

    /// References recorded for `id`, in original order.
    pub fn refs(&self, id: ObjectId) -> Result<Vec<ObjectId>, CasError> {
        Ok(self.inner.store.refs(id)?)
    }

    /// Lazy depth-first walk from `root`. See [`llcas_dag::Walk`].
    pub fn walk(&self, root: ObjectId) -> Walk<'_, dyn ObjectStore> {
        Walk::new(self.inner.store.as_ref(), root)
    }

    // ---------------------------------------------------------------
    // Action cache
    // ---------------------------------------------------------------

    /// Look up the result cached under `key`.
    ///
    /// An entry whose result object is no longer stored is `NotFound`, and a
    /// later `action_put` for `key` replaces it under either policy.
    pub fn action_get(&self, key: &Digest) -> LookupResult<ObjectId> {
        self.submit_action_get(key).wait()
    }

    pub fn submit_action_get(&self, key: &Digest) -> Pending<LookupResult<ObjectId>> {
        let inner = Arc::clone(&self.inner);
        let key = *key;
        self.executor.submit(move |_| inner.action_get(&key))
    }

    pub fn submit_action_get_with<F>(&self, key: &Digest, callback: F) -> CancellationToken
    where
        F: FnOnce(LookupResult<ObjectId>) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let key = *key;
        self.executor.submit_with(move |_| inner.action_get(&key), callback)
    }

    /// Record `key -> result` under the configured overwrite policy.
    pub fn action_put(&self, key: &Digest, result: ObjectId) -> Result<PutOutcome, CasError> {
        self.action_put_with_policy(key, result, self.inner.config.action_cache.allow_overwrite)
    }

    pub fn action_put_with_policy(
        &self,
        key: &Digest,
        result: ObjectId,
        allow_overwrite: bool,
    ) -> Result<PutOutcome, CasError> {
        self.submit_action_put(key, result, allow_overwrite).wait()
    }

    pub fn submit_action_put(
        &self,
        key: &Digest,
        result: ObjectId,
        allow_overwrite: bool,
    ) -> Pending<Result<PutOutcome, CasError>> {
        let inner = Arc::clone(&self.inner);
        let key = *key;
        self.executor
            .submit(move |_| inner.action_put(&key, result, allow_overwrite))
    }

    pub fn submit_action_put_with<F>(
        &self,
        key: &Digest,
        result: ObjectId,
        allow_overwrite: bool,
        callback: F,
    ) -> CancellationToken
    where
        F: FnOnce(Result<PutOutcome, CasError>) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let key = *key;
        self.executor
            .submit_with(move |_| inner.action_put(&key, result, allow_overwrite), callback)
    }

    // ---------------------------------------------------------------
    // Maintenance
    // ---------------------------------------------------------------

    /// Delete every object not reachable from `roots` or from an action
    /// cache result. Handles of deleted objects become stale.
    pub fn gc(&self, roots: &[ObjectId]) -> Result<GcReport, CasError> {
        let _exclusive = self
            .inner
            .gc_gate
            .write()
            .map_err(|_| CasError::store("collection lock poisoned"))?;
        gc::collect(self.inner.store.as_ref(), self.inner.actions.as_ref(), roots)
    }

    pub fn object_count(&self) -> Result<usize, CasError> {
        Ok(self.inner.store.len()?)
    }

    pub fn total_bytes(&self) -> Result<u64, CasError> {
        Ok(self.inner.store.total_bytes()?)
    }

    pub fn action_count(&self) -> Result<usize, CasError> {
        Ok(self.inner.actions.len()?)
    }
}

impl std::fmt::Debug for Cas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cas")
            .field("path", &self.inner.config.path)
            .field("algorithm", &self.inner.config.algorithm)
            .field("executor", &self.executor)
            .finish()
    }
}
