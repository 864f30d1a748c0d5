//! Direct-mapped operator cache.
//!
//! A plain array where each key hashes to exactly one slot. Collisions
//! simply overwrite the previous entry, which is harmless for memoization:
//! a lost entry only costs a recomputation.

use crate::utils::MyHash;

/// A direct-mapped cache with `2^bits` slots.
pub struct BasicCache<K, V> {
    entries: Vec<Option<(K, V)>>,
    bitmask: u64,
    hits: usize,
    misses: usize,
    faults: usize,
}

impl<K, V> BasicCache<K, V> {
    /// Creates a new cache with `2^bits` slots.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Cache bits must be in range 0..=31, got {}", bits);

        let size = 1usize << bits;
        Self {
            entries: (0..size).map(|_| None).collect(),
            bitmask: (size - 1) as u64,
            hits: 0,
            misses: 0,
            faults: 0,
        }
    }

    /// Returns the number of slots in the cache.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Returns the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Returns the number of cache faults (collision misses).
    pub fn faults(&self) -> usize {
        self.faults
    }

    /// Clears all entries. This is O(n).
    pub fn clear(&mut self) {
        self.entries.fill_with(|| None);
    }

    /// Drops every entry for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) {
        for entry in &mut self.entries {
            let stale = matches!(entry, Some((k, v)) if !keep(k, v));
            if stale {
                *entry = None;
            }
        }
    }

    /// Replaces the storage with `2^bits` empty slots.
    pub fn resize(&mut self, bits: usize) {
        let hits = self.hits;
        let misses = self.misses;
        let faults = self.faults;
        *self = Self::new(bits);
        self.hits = hits;
        self.misses = misses;
        self.faults = faults;
    }
}

impl<K: MyHash, V> BasicCache<K, V> {
    #[inline]
    fn index(&self, key: &K) -> usize {
        (key.hash() & self.bitmask) as usize
    }
}

impl<K, V> BasicCache<K, V>
where
    K: MyHash + Eq,
    V: Copy,
{
    /// Looks up a key in the cache.
    #[inline]
    pub fn get(&mut self, key: &K) -> Option<V> {
        let idx = self.index(key);

        match &self.entries[idx] {
            Some((k, v)) if k == key => {
                self.hits += 1;
                Some(*v)
            }
            Some(_) => {
                // Slot occupied by different key
                self.faults += 1;
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts a key-value pair, overwriting any existing entry at the same slot.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) {
        let idx = self.index(&key);
        self.entries[idx] = Some((key, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get() {
        let mut cache = BasicCache::<(u32, u32), i32>::new(4);

        cache.insert((1, 2), 42);
        cache.insert((3, 4), 99);

        assert_eq!(cache.get(&(1, 2)), Some(42));
        assert_eq!(cache.get(&(3, 4)), Some(99));
        assert_eq!(cache.get(&(5, 6)), None);
    }

    #[test]
    fn test_overwrite() {
        let mut cache = BasicCache::<(u32, u32), i32>::new(4);
        cache.insert((1, 2), 10);
        cache.insert((1, 2), 20);
        assert_eq!(cache.get(&(1, 2)), Some(20));
    }

    #[test]
    fn test_collision() {
        // Very small cache to force collisions
        let mut cache = BasicCache::<(u32, u32), i32>::new(2); // 4 slots
        for i in 0..16 {
            cache.insert((i, 0), i as i32);
        }
        let found = (0..16).filter(|&i| cache.get(&(i, 0)).is_some()).count();
        assert!(found <= 4);
        assert!(cache.faults() > 0);
    }

    #[test]
    fn test_retain() {
        let mut cache = BasicCache::<u32, u32>::new(6);
        for i in 0..10 {
            cache.insert(i, i * 10);
        }
        cache.retain(|&k, _| k % 2 == 0);
        assert_eq!(cache.get(&4), Some(40));
        assert_eq!(cache.get(&5), None);
    }

    #[test]
    fn test_resize_keeps_statistics() {
        let mut cache = BasicCache::<u32, u32>::new(4);
        cache.insert(1, 1);
        cache.get(&1); // Hit
        cache.get(&2); // Miss
        cache.resize(6);
        assert_eq!(cache.capacity(), 64);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.get(&1), None);
    }
}
