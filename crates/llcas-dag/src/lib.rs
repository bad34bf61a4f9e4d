//! Reference graph traversal for llcas.
//!
//! An object's references are edges to the objects it needs. The store
//! records them but never interprets them; this crate walks them. There is no
//! cycle detection: every reference must already exist when an object is
//! stored, and a walk's visited set bounds it regardless.

pub mod error;
pub mod walk;

pub use error::{DagError, DagResult};
pub use walk::{closure, verify_closure, walk, Walk};
