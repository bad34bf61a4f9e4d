use serde::{Deserialize, Serialize};

use llcas_types::Digest;

/// One association from an action key to the digest of its result object.
///
/// This is also the persistent record of the file-backed cache: the last
/// entry logged for a key is its current value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionEntry {
    pub key: Digest,
    pub result: Digest,
}

/// What a successful `put` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    /// The key had no entry; one was created.
    Inserted,
    /// The key already mapped to the same result. Nothing changed.
    Confirmed,
    /// The key mapped to `previous` and was replaced by an explicit overwrite.
    Overwritten { previous: Digest },
}

impl PutOutcome {
    /// Returns `true` if the cache contents changed.
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Confirmed)
    }
}
