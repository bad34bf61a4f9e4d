//! Foundation types for llcas, a content-addressable storage engine with an
//! attached action cache.
//!
//! Every other llcas crate depends on `llcas-types`.
//!
//! # Key Types
//!
//! - [`Digest`] -- Fixed-length content hash identifying an object
//! - [`ObjectId`] -- Store-local opaque handle standing in for a resolved digest
//! - [`LookupResult`] -- Tri-state outcome of a resolution (found / not found / error)
//! - [`CasError`] -- Structured error carrying an [`ErrorKind`] and a message
//! - [`Version`] -- Published semantic version pair for capability checks

pub mod digest;
pub mod error;
pub mod lookup;
pub mod object;
pub mod version;

pub use digest::{Digest, HashAlgorithm, DIGEST_LEN};
pub use error::{CasError, ErrorKind, TypeError};
pub use lookup::{LookupResult, LookupStatus};
pub use object::ObjectId;
pub use version::{Version, VERSION_MAJOR, VERSION_MINOR};
