//! Content-addressed object storage for llcas.
//!
//! Every object is an immutable byte string plus an ordered list of
//! references to other objects, identified by a digest over both. Callers
//! hold compact [`llcas_types::ObjectId`] handles issued by the store they
//! came from.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileObjectStore`] -- catalog in memory, data in an append-only record log
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Write-then-link: the object is stored before its handle is handed out.
//! 3. Every reference names a live object at the time of `put`.
//! 4. Concurrent reads are always safe; writes are serialized per store.
//! 5. The store never interprets object contents.
//! 6. All I/O errors are propagated, never silently ignored.

mod catalog;
pub mod error;
pub mod file;
pub mod handle;
pub mod limits;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::{FileObjectStore, FileStoreOptions, StoreMeta};
pub use handle::HandleTable;
pub use limits::StoreLimits;
pub use memory::InMemoryObjectStore;
pub use object::{Object, ObjectRecord};
pub use traits::ObjectStore;
