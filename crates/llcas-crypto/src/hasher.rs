use llcas_types::{Digest, HashAlgorithm};
use sha2::Digest as _;

const OBJECT_DOMAIN: &str = "llcas-object-v1";
const ACTION_KEY_DOMAIN: &str = "llcas-action-key-v1";

/// Domain-separated content hasher.
///
/// Each hasher carries an algorithm and a domain tag that is prepended to
/// every hash computation, so an object and an action key built from the
/// same bytes never share a digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for stored objects.
    pub const fn object(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            domain: OBJECT_DOMAIN,
        }
    }

    /// Hasher for deriving action-cache keys from caller bytes.
    pub const fn action_key(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            domain: ACTION_KEY_DOMAIN,
        }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        let mut state = HashState::new(self.algorithm);
        state.update(self.domain.as_bytes());
        state.update(b":");
        state.update(data);
        state.finalize()
    }

    /// Digest of an object: its reference digests, in order, followed by
    /// its data.
    ///
    /// The reference count is hashed first so that the boundary between
    /// references and data is unambiguous.
    pub fn object_digest(&self, data: &[u8], refs: &[Digest]) -> Digest {
        let mut state = HashState::new(self.algorithm);
        state.update(self.domain.as_bytes());
        state.update(b":");
        state.update(&(refs.len() as u64).to_le_bytes());
        for r in refs {
            state.update(r.as_bytes());
        }
        state.update(data);
        state.finalize()
    }

    /// Digest of a reference-free object. Equal to
    /// `object_digest(data, &[])`.
    pub fn digest_of(&self, data: &[u8]) -> Digest {
        self.object_digest(data, &[])
    }

    /// Verify that an object's data and references produce `expected`.
    pub fn verify(&self, data: &[u8], refs: &[Digest], expected: &Digest) -> bool {
        self.object_digest(data, refs) == *expected
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

enum HashState {
    Blake3(Box<blake3::Hasher>),
    Sha256(sha2::Sha256),
}

impl HashState {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Blake3(h) => {
                h.update(bytes);
            }
            Self::Sha256(h) => h.update(bytes),
        }
    }

    fn finalize(self) -> Digest {
        match self {
            Self::Blake3(h) => Digest::from_hash(*h.finalize().as_bytes()),
            Self::Sha256(h) => {
                let mut out = [0u8; llcas_types::DIGEST_LEN];
                out.copy_from_slice(&h.finalize());
                Digest::from_hash(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALGORITHMS: [HashAlgorithm; 2] = [HashAlgorithm::Blake3, HashAlgorithm::Sha256];

    #[test]
    fn hash_is_deterministic() {
        for alg in ALGORITHMS {
            let hasher = ContentHasher::object(alg);
            assert_eq!(hasher.hash(b"hello world"), hasher.hash(b"hello world"));
        }
    }

    #[test]
    fn algorithms_disagree() {
        let b = ContentHasher::object(HashAlgorithm::Blake3).digest_of(b"alpha");
        let s = ContentHasher::object(HashAlgorithm::Sha256).digest_of(b"alpha");
        assert_ne!(b, s);
    }

    #[test]
    fn object_and_action_key_domains_are_separate() {
        let obj = ContentHasher::object(HashAlgorithm::Blake3).hash(b"build1");
        let key = ContentHasher::action_key(HashAlgorithm::Blake3).hash(b"build1");
        assert_ne!(obj, key);
    }

    #[test]
    fn references_change_the_digest() {
        let hasher = ContentHasher::object(HashAlgorithm::Blake3);
        let a = hasher.digest_of(b"alpha");
        let plain = hasher.digest_of(b"beta");
        let linked = hasher.object_digest(b"beta", &[a]);
        assert_ne!(plain, linked);
    }

    #[test]
    fn reference_order_is_significant() {
        let hasher = ContentHasher::object(HashAlgorithm::Sha256);
        let a = hasher.digest_of(b"a");
        let b = hasher.digest_of(b"b");
        assert_ne!(
            hasher.object_digest(b"tree", &[a, b]),
            hasher.object_digest(b"tree", &[b, a])
        );
    }

    #[test]
    fn ref_boundary_is_unambiguous() {
        // Moving a digest's worth of bytes from the reference list into the
        // data must not collide.
        let hasher = ContentHasher::object(HashAlgorithm::Blake3);
        let r = hasher.digest_of(b"r");
        let as_ref = hasher.object_digest(b"", &[r]);
        let as_data = hasher.object_digest(r.as_bytes(), &[]);
        assert_ne!(as_ref, as_data);
    }

    #[test]
    fn verify_detects_tampering() {
        let hasher = ContentHasher::object(HashAlgorithm::Blake3);
        let id = hasher.object_digest(b"original", &[]);
        assert!(hasher.verify(b"original", &[], &id));
        assert!(!hasher.verify(b"tampered", &[], &id));
    }

    proptest! {
        #[test]
        fn digest_of_is_stable(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            for alg in ALGORITHMS {
                let first = ContentHasher::object(alg).digest_of(&data);
                let second = ContentHasher::object(alg).digest_of(&data);
                prop_assert_eq!(first, second);
            }
        }
    }
}
