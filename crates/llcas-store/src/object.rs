use bytes::Bytes;
use serde::{Deserialize, Serialize};

use llcas_types::{Digest, ObjectId};

/// A loaded object: identity, data, and references in recorded order.
///
/// Objects are immutable. `data` is a cheaply clonable shared buffer owned
/// by the caller once returned; it never aliases the caller's input to
/// `put`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Object {
    /// Handle of this object in the issuing store.
    pub id: ObjectId,
    /// Content digest over data and reference digests.
    pub digest: Digest,
    /// The object's bytes.
    pub data: Bytes,
    /// Outgoing references, in the order given to `put`.
    pub refs: Vec<ObjectId>,
}

/// A persistent object-log record.
///
/// References are recorded as digests: handles do not survive a restart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectRecord {
    /// An object was stored.
    Put {
        digest: Digest,
        refs: Vec<Digest>,
        data: Vec<u8>,
    },
    /// An object was deleted.
    Delete { digest: Digest },
}

impl ObjectRecord {
    /// The digest this record is about.
    pub fn digest(&self) -> &Digest {
        match self {
            Self::Put { digest, .. } | Self::Delete { digest } => digest,
        }
    }
}
