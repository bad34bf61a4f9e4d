use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, store-local handle for a stored object.
///
/// An `ObjectId` is issued by a store when a digest is first resolved or
/// stored. It names a slot in the store's handle table together with the
/// generation the slot had when the handle was issued. A handle whose
/// generation no longer matches its slot (the object was deleted, or the
/// handle came from another store instance) is stale and is rejected.
///
/// Handles are valid only for the lifetime of the issuing store instance;
/// re-resolve the [`Digest`](crate::Digest) after reopening a store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    slot: u32,
    generation: u32,
}

impl ObjectId {
    /// Build a handle from its parts. Only handle tables should call this.
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Slot index in the issuing handle table.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Generation of the slot at issue time.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Pack into a single opaque `u64` (slot in the high half).
    pub fn to_raw(&self) -> u64 {
        (u64::from(self.slot) << 32) | u64::from(self.generation)
    }

    /// Unpack a value produced by [`ObjectId::to_raw`].
    pub fn from_raw(raw: u64) -> Self {
        Self {
            slot: (raw >> 32) as u32,
            generation: raw as u32,
        }
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}#{})", self.slot, self.generation)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.to_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip() {
        let id = ObjectId::new(7, 0xdead_beef);
        assert_eq!(ObjectId::from_raw(id.to_raw()), id);
        assert_eq!(id.to_raw() >> 32, 7);
    }

    #[test]
    fn generation_distinguishes_handles() {
        assert_ne!(ObjectId::new(1, 1), ObjectId::new(1, 2));
    }

    #[test]
    fn display_is_fixed_width_hex() {
        let display = format!("{}", ObjectId::new(1, 2));
        assert_eq!(display, "0000000100000002");
    }

    #[test]
    fn debug_shows_slot_and_generation() {
        assert_eq!(format!("{:?}", ObjectId::new(3, 9)), "ObjectId(3#9)");
    }
}
