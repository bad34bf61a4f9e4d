use serde::{Deserialize, Serialize};

/// Capacity limits enforced by `put`. `None` means unlimited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLimits {
    /// Maximum total size of object data, in bytes.
    pub max_bytes: Option<u64>,
    /// Maximum number of stored objects.
    pub max_objects: Option<u64>,
}

impl StoreLimits {
    pub fn unlimited() -> Self {
        Self::default()
    }
}
