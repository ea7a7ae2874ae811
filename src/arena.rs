//! Dense storage with stable ids, deferred removal and swap-remove compaction.

use std::collections::HashMap;

struct Slot<T> {
    id: u32,
    value: T,
    removed: bool,
}

/// Values addressed by a `u32` id that survives compaction.
///
/// Iteration walks the dense vector: insertion order until the first
/// `compact`, after which swap-remove reorders the tail.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    index_of: HashMap<u32, usize>,
    next_id: u32,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index_of: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.index_of.insert(id, self.slots.len());
        self.slots.push(Slot {
            id,
            value,
            removed: false,
        });
        id
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.index_of.get(&id).map(|&i| &self.slots[i].value)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        let i = *self.index_of.get(&id)?;
        Some(&mut self.slots[i].value)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.index_of.contains_key(&id)
    }

    /// Flag for removal at the next `compact`. Returns false for unknown ids.
    pub fn mark_removed(&mut self, id: u32) -> bool {
        match self.index_of.get(&id) {
            Some(&i) => {
                self.slots[i].removed = true;
                true
            }
            None => false,
        }
    }

    pub fn is_marked(&self, id: u32) -> bool {
        self.index_of
            .get(&id)
            .is_some_and(|&i| self.slots[i].removed)
    }

    pub fn pending_removals(&self) -> usize {
        self.slots.iter().filter(|s| s.removed).count()
    }

    /// Swap-remove every flagged slot; returns the removed ids.
    pub fn compact(&mut self) -> Vec<u32> {
        let mut removed = Vec::new();
        let mut i = 0;
        while i < self.slots.len() {
            if !self.slots[i].removed {
                i += 1;
                continue;
            }
            let slot = self.slots.swap_remove(i);
            self.index_of.remove(&slot.id);
            removed.push(slot.id);
            if let Some(moved) = self.slots.get(i) {
                self.index_of.insert(moved.id, i);
            }
        }
        removed
    }

    /// `(id, value, flagged)` in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T, bool)> {
        self.slots.iter().map(|s| (s.id, &s.value, s.removed))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
