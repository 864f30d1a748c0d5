//! Free-slot tracking for the node store.
//!
//! Slots are grouped into buckets of 64, one occupancy word per bucket. A
//! second bit set flags buckets with no room left, so finding a free slot
//! skips full buckets 64 at a time instead of walking slot by slot.

use crate::bitset::BitSet;

const BUCKET: usize = 64;

#[derive(Debug, Clone)]
pub struct FreeSlots {
    /// Bit set per slot in use, one word per bucket.
    occupied: Vec<u64>,
    /// Bit set per bucket with every slot in use.
    full: BitSet,
    capacity: usize,
    free: usize,
    /// Lowest bucket that may still have room.
    hint: usize,
}

impl FreeSlots {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Self {
            occupied: Vec::new(),
            full: BitSet::default(),
            capacity: 0,
            free: 0,
            hint: 0,
        };
        slots.grow(capacity);
        slots
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn free_count(&self) -> usize {
        self.free
    }

    pub fn used_count(&self) -> usize {
        self.capacity - self.free
    }

    pub fn is_used(&self, id: u32) -> bool {
        let id = id as usize;
        id < self.capacity && self.occupied[id / BUCKET] & (1 << (id % BUCKET)) != 0
    }

    /// Extends the tracked range to `capacity` slots, all of them free.
    pub fn grow(&mut self, capacity: usize) {
        if capacity <= self.capacity {
            return;
        }
        let buckets = capacity.div_ceil(BUCKET);
        // Bits past the old capacity in its last word were padding.
        for id in self.capacity..(self.occupied.len() * BUCKET).min(capacity) {
            self.occupied[id / BUCKET] &= !(1 << (id % BUCKET));
            self.full.remove(id / BUCKET);
        }
        self.occupied.resize(buckets, 0);
        self.full.reserve(buckets);
        // Pad the tail so slots past the capacity are never handed out.
        for id in capacity..buckets * BUCKET {
            self.occupied[id / BUCKET] |= 1 << (id % BUCKET);
        }
        if self.occupied[buckets - 1] == u64::MAX {
            self.full.insert(buckets - 1);
        }
        self.hint = self.hint.min(self.capacity / BUCKET);
        self.free += capacity - self.capacity;
        self.capacity = capacity;
    }

    /// Claims the lowest free slot, if any.
    pub fn alloc(&mut self) -> Option<u32> {
        if self.free == 0 {
            return None;
        }
        let bucket = self.full.first_clear_from(self.hint, self.occupied.len())?;
        let word = &mut self.occupied[bucket];
        let bit = (!*word).trailing_zeros() as usize;
        *word |= 1 << bit;
        if *word == u64::MAX {
            self.full.insert(bucket);
        }
        self.hint = bucket;
        self.free -= 1;
        Some((bucket * BUCKET + bit) as u32)
    }

    /// Claims a specific slot. Returns false if it was already in use.
    pub fn claim(&mut self, id: u32) -> bool {
        let id = id as usize;
        assert!(id < self.capacity, "slot {} out of range", id);
        let word = &mut self.occupied[id / BUCKET];
        let mask = 1 << (id % BUCKET);
        if *word & mask != 0 {
            return false;
        }
        *word |= mask;
        if *word == u64::MAX {
            self.full.insert(id / BUCKET);
        }
        self.free -= 1;
        true
    }

    /// Returns a slot to the free pool.
    pub fn release(&mut self, id: u32) {
        let id = id as usize;
        let bucket = id / BUCKET;
        let mask = 1 << (id % BUCKET);
        debug_assert!(self.occupied[bucket] & mask != 0, "double free of slot {}", id);
        if self.occupied[bucket] & mask != 0 {
            self.occupied[bucket] &= !mask;
            self.full.remove(bucket);
            self.hint = self.hint.min(bucket);
            self.free += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_in_order() {
        let mut slots = FreeSlots::new(10);
        assert_eq!(slots.free_count(), 10);
        assert_eq!(slots.alloc(), Some(0));
        assert_eq!(slots.alloc(), Some(1));
        assert_eq!(slots.used_count(), 2);
    }

    #[test]
    fn test_exhaustion_respects_capacity() {
        let mut slots = FreeSlots::new(70);
        let ids: Vec<u32> = std::iter::from_fn(|| slots.alloc()).collect();
        assert_eq!(ids.len(), 70);
        assert_eq!(*ids.last().unwrap(), 69);
        assert_eq!(slots.alloc(), None);
    }

    #[test]
    fn test_release_and_reuse() {
        let mut slots = FreeSlots::new(200);
        for _ in 0..200 {
            slots.alloc().unwrap();
        }
        slots.release(130);
        slots.release(5);
        assert_eq!(slots.free_count(), 2);
        assert_eq!(slots.alloc(), Some(5));
        assert_eq!(slots.alloc(), Some(130));
        assert_eq!(slots.alloc(), None);
    }

    #[test]
    fn test_grow_unpads_tail() {
        let mut slots = FreeSlots::new(3);
        assert!(slots.claim(0));
        assert!(slots.claim(1));
        assert!(!slots.claim(1));
        slots.alloc().unwrap();
        assert_eq!(slots.alloc(), None);
        slots.grow(130);
        assert_eq!(slots.free_count(), 127);
        assert_eq!(slots.alloc(), Some(3));
        assert!(slots.is_used(3));
        assert!(!slots.is_used(4));
        assert!(!slots.is_used(500));
    }
}
