//! Arena of object handles.
//!
//! Each slot carries a generation counter. A slot's first generation is the
//! table's epoch, chosen at random per store instance, and it is bumped
//! whenever the slot is reused. An [`ObjectId`] is a `(slot, generation)`
//! pair, so a handle for a deleted object, or one minted by a different
//! store instance, fails the generation check instead of aliasing whatever
//! now lives in the slot.

use llcas_types::{Digest, ObjectId};

#[derive(Debug)]
struct Slot {
    generation: u32,
    digest: Option<Digest>,
}

/// Slot/generation table mapping [`ObjectId`]s to digests.
#[derive(Debug)]
pub struct HandleTable {
    epoch: u32,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl HandleTable {
    /// Create a table with a random epoch.
    pub fn new() -> Self {
        Self::with_epoch(rand::random())
    }

    /// Create a table with a fixed epoch.
    pub fn with_epoch(epoch: u32) -> Self {
        Self {
            epoch,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Allocate a handle for `digest`.
    pub fn insert(&mut self, digest: Digest) -> ObjectId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.digest = Some(digest);
            return ObjectId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: self.epoch,
            digest: Some(digest),
        });
        ObjectId::new(index, self.epoch)
    }

    /// The digest behind a live handle.
    pub fn get(&self, id: ObjectId) -> Option<&Digest> {
        let slot = self.slots.get(id.slot() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.digest.as_ref()
    }

    /// Release a handle. Returns its digest if the handle was live.
    pub fn remove(&mut self, id: ObjectId) -> Option<Digest> {
        let slot = self.slots.get_mut(id.slot() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let digest = slot.digest.take()?;
        self.free.push(id.slot());
        self.live -= 1;
        Some(digest)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(byte: u8) -> Digest {
        Digest::from_hash([byte; 32])
    }

    #[test]
    fn insert_and_get() {
        let mut table = HandleTable::with_epoch(10);
        let id = table.insert(digest(1));
        assert_eq!(id, ObjectId::new(0, 10));
        assert_eq!(table.get(id), Some(&digest(1)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn removed_handle_is_stale() {
        let mut table = HandleTable::with_epoch(0);
        let id = table.insert(digest(1));
        assert_eq!(table.remove(id), Some(digest(1)));
        assert!(table.get(id).is_none());
        assert!(table.remove(id).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut table = HandleTable::with_epoch(5);
        let old = table.insert(digest(1));
        table.remove(old);
        let new = table.insert(digest(2));

        assert_eq!(new.slot(), old.slot());
        assert_ne!(new.generation(), old.generation());
        assert!(table.get(old).is_none());
        assert_eq!(table.get(new), Some(&digest(2)));
    }

    #[test]
    fn handles_from_another_epoch_are_rejected() {
        let mut first = HandleTable::with_epoch(1);
        let mut second = HandleTable::with_epoch(2);
        let id = first.insert(digest(1));
        second.insert(digest(1));
        assert!(second.get(id).is_none());
    }

    #[test]
    fn out_of_range_slot_is_rejected() {
        let table = HandleTable::with_epoch(0);
        assert!(table.get(ObjectId::new(42, 0)).is_none());
    }

    #[test]
    fn generation_wraps_without_panicking() {
        let mut table = HandleTable::with_epoch(u32::MAX);
        let id = table.insert(digest(1));
        table.remove(id);
        let reused = table.insert(digest(2));
        assert_eq!(reused.generation(), 0);
    }
}
