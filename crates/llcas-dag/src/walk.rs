//! Depth-first traversal over object references.
//!
//! [`Walk`] is lazy: an object's references are fetched only when the
//! object itself is yielded, so a caller that stops early never touches the
//! rest of the graph.

use std::collections::HashSet;

use tracing::{trace, warn};

use llcas_store::ObjectStore;
use llcas_types::ObjectId;

use crate::error::{DagError, DagResult};

/// Lazy depth-first pre-order walk over the objects reachable from a set of
/// roots.
///
/// Each object is yielded at most once, even if it is referenced many
/// times. References are visited in recorded order. The first error ends
/// the walk: after yielding `Err`, the iterator returns `None`.
pub struct Walk<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    stack: Vec<ObjectId>,
    visited: HashSet<ObjectId>,
    failed: bool,
}

impl<'a, S: ObjectStore + ?Sized> Walk<'a, S> {
    /// Walk from a single root.
    pub fn new(store: &'a S, root: ObjectId) -> Self {
        Self::from_roots(store, &[root])
    }

    /// Walk from several roots, in order, sharing one visited set.
    pub fn from_roots(store: &'a S, roots: &[ObjectId]) -> Self {
        Self {
            store,
            stack: roots.iter().rev().copied().collect(),
            visited: HashSet::new(),
            failed: false,
        }
    }

    /// Number of distinct objects yielded so far.
    pub fn visited(&self) -> usize {
        self.visited.len()
    }
}

impl<S: ObjectStore + ?Sized> Iterator for Walk<'_, S> {
    type Item = DagResult<ObjectId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while let Some(id) = self.stack.pop() {
            if !self.visited.insert(id) {
                continue;
            }
            match self.store.refs(id) {
                Ok(refs) => {
                    trace!(?id, refs = refs.len(), "walk visit");
                    self.stack.extend(refs.into_iter().rev());
                    return Some(Ok(id));
                }
                Err(err) => {
                    self.failed = true;
                    let err = DagError::from(err);
                    if err.is_not_found() {
                        warn!(?id, error = %err, "walk hit a dangling reference");
                    }
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

impl<S: ObjectStore + ?Sized> std::iter::FusedIterator for Walk<'_, S> {}

/// Walk everything reachable from `root`, root first.
pub fn walk<S: ObjectStore + ?Sized>(store: &S, root: ObjectId) -> Walk<'_, S> {
    Walk::new(store, root)
}

/// Every object reachable from `roots`, roots included.
pub fn closure<S: ObjectStore + ?Sized>(store: &S, roots: &[ObjectId]) -> DagResult<HashSet<ObjectId>> {
    Walk::from_roots(store, roots).collect()
}

/// Check that the full closure of `root` is present. Returns the number of
/// reachable objects, or the first dangling edge.
pub fn verify_closure<S: ObjectStore + ?Sized>(store: &S, root: ObjectId) -> DagResult<usize> {
    let mut walk = Walk::new(store, root);
    for step in walk.by_ref() {
        step?;
    }
    Ok(walk.visited())
}

#[cfg(test)]
mod tests {
    use super::*;
    use llcas_store::{InMemoryObjectStore, StoreError};
    use llcas_types::ErrorKind;

    fn ids(walk: Walk<'_, InMemoryObjectStore>) -> Vec<ObjectId> {
        walk.collect::<DagResult<Vec<_>>>().unwrap()
    }

    #[test]
    fn walk_yields_root_then_references() {
        let store = InMemoryObjectStore::new();
        let a = store.put(b"alpha", &[]).unwrap();
        let b = store.put(b"beta", &[a]).unwrap();

        assert_eq!(ids(walk(&store, b)), vec![b, a]);
        assert_eq!(ids(walk(&store, a)), vec![a]);
    }

    #[test]
    fn walk_is_depth_first_in_recorded_order() {
        //        root
        //       /    \
        //      l      r
        //     / \
        //   ll   lr
        let store = InMemoryObjectStore::new();
        let ll = store.put(b"ll", &[]).unwrap();
        let lr = store.put(b"lr", &[]).unwrap();
        let l = store.put(b"l", &[ll, lr]).unwrap();
        let r = store.put(b"r", &[]).unwrap();
        let root = store.put(b"root", &[l, r]).unwrap();

        assert_eq!(ids(walk(&store, root)), vec![root, l, ll, lr, r]);
    }

    #[test]
    fn shared_objects_are_visited_once() {
        let store = InMemoryObjectStore::new();
        let shared = store.put(b"shared", &[]).unwrap();
        let left = store.put(b"left", &[shared]).unwrap();
        let right = store.put(b"right", &[shared]).unwrap();
        let top = store.put(b"top", &[left, right, shared]).unwrap();

        let visited = ids(walk(&store, top));
        assert_eq!(visited, vec![top, left, shared, right]);
    }

    #[test]
    fn dangling_edge_fails_fast_with_not_found() {
        let store = InMemoryObjectStore::new();
        let leaf = store.put(b"leaf", &[]).unwrap();
        let mid = store.put(b"mid", &[leaf]).unwrap();
        let top = store.put(b"top", &[mid]).unwrap();
        store.delete(leaf).unwrap();

        let steps: Vec<_> = walk(&store, top).collect();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].as_ref().unwrap(), &top);
        let err = steps[1].as_ref().unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, DagError::NotFound { missing, .. } if *missing == store.digest_of(b"leaf")));
    }

    #[test]
    fn walk_is_lazy() {
        let store = InMemoryObjectStore::new();
        let leaf = store.put(b"leaf", &[]).unwrap();
        let mid = store.put(b"mid", &[leaf]).unwrap();
        let top = store.put(b"top", &[mid]).unwrap();
        store.delete(leaf).unwrap();

        // The dangling edge below `mid` is never examined.
        let first: Vec<_> = walk(&store, top).take(1).collect();
        assert_eq!(first.len(), 1);
        assert!(first[0].is_ok());
    }

    #[test]
    fn stale_root_is_a_store_error_not_not_found() {
        let store = InMemoryObjectStore::new();
        let id = store.put(b"gone", &[]).unwrap();
        store.delete(id).unwrap();

        let err = walk(&store, id).next().unwrap().unwrap_err();
        assert!(matches!(err, DagError::Store(StoreError::StaleHandle(_))));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn closure_over_multiple_roots() {
        let store = InMemoryObjectStore::new();
        let a = store.put(b"a", &[]).unwrap();
        let b = store.put(b"b", &[a]).unwrap();
        let c = store.put(b"c", &[]).unwrap();
        let unrelated = store.put(b"unrelated", &[]).unwrap();

        let reachable = closure(&store, &[b, c]).unwrap();
        assert_eq!(reachable.len(), 3);
        assert!(reachable.contains(&a));
        assert!(!reachable.contains(&unrelated));
        assert!(closure(&store, &[]).unwrap().is_empty());
    }

    #[test]
    fn verify_closure_counts_or_fails() {
        let store = InMemoryObjectStore::new();
        let a = store.put(b"a", &[]).unwrap();
        let b = store.put(b"b", &[a]).unwrap();
        assert_eq!(verify_closure(&store, b).unwrap(), 2);

        store.delete(a).unwrap();
        assert!(verify_closure(&store, b).unwrap_err().is_not_found());
    }

    #[test]
    fn works_through_a_trait_object() {
        let store = InMemoryObjectStore::new();
        let a = store.put(b"a", &[]).unwrap();
        let dyn_store: &dyn ObjectStore = &store;
        let visited: Vec<_> = walk(dyn_store, a).collect::<DagResult<_>>().unwrap();
        assert_eq!(visited, vec![a]);
    }
}
