//! Content hashing for llcas.
//!
//! Provides the domain-separated hasher used to derive object digests (over
//! data and reference digests) and action-cache keys. Both BLAKE3 and
//! SHA-256 are supported; a store picks one for its lifetime.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
