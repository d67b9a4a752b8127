use std::fmt::Debug;

use crate::traits::{IntMapRead, IntMapWrite};

/// A slot vector indexed by key. `None` marks an absent key.
///
/// The vector only grows. Slots past the largest key ever set may exist but
/// are always `None`.
#[derive(Default)]
pub struct OverflowMap {
    slots: Vec<Option<u32>>,
    len: usize,
}

impl OverflowMap {
    /// Create an empty store with `slots` absent slots pre-allocated.
    pub fn with_slots(slots: usize) -> Self {
        Self { slots: vec![None; slots], len: 0 }
    }

    /// the number of slots, present or not
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Removes every pair while keeping the slot allocation.
    pub fn clear(&mut self) {
        self.slots.fill(None);
        self.len = 0;
    }

    fn grow(&mut self, key: usize) {
        let slots = key.checked_add(1).expect("key out of range");
        log::trace!(
            "growing overflow store from {} to {} slots",
            self.slots.len(),
            slots
        );
        // Vec doubles its capacity underneath, keeping set amortized O(1)
        self.slots.resize(slots, None);
    }
}

impl Clone for OverflowMap {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            len: self.len,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.slots.clone_from(&source.slots);
        self.len = source.len;
    }
}

impl Debug for OverflowMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OverflowMap({}/{})", self.len, self.slots.len())
    }
}

impl PartialEq for OverflowMap {
    fn eq(&self, other: &Self) -> bool {
        // trailing absent slots don't affect equality
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for OverflowMap {}

impl IntMapRead for OverflowMap {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn get(&self, key: usize) -> Option<u32> {
        self.slots.get(key).copied().flatten()
    }

    fn max_key(&self) -> Option<usize> {
        self.slots.iter().rposition(Option::is_some)
    }

    fn iter(&self) -> impl Iterator<Item = (usize, u32)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(key, slot)| slot.map(|value| (key, value)))
    }
}

impl IntMapWrite for OverflowMap {
    fn set(&mut self, key: usize, value: u32) {
        if key >= self.slots.len() {
            self.grow(key);
        }
        if self.slots[key].replace(value).is_none() {
            self.len += 1;
        }
    }

    fn unset(&mut self, key: usize) -> bool {
        let removed = self
            .slots
            .get_mut(key)
            .is_some_and(|slot| slot.take().is_some());
        if removed {
            self.len -= 1;
        }
        removed
    }
}
