//! LRU Cache
//!
//! Least Recently Used cache for access decisions.
//! Fixed size. Recency is a per-entry stamp, so a hit is O(1) and only
//! eviction scans for the oldest stamp.

use core::hash::Hash;
use hashbrown::HashMap;

pub struct LruCache<K, V> {
    capacity: usize,
    map: HashMap<K, (V, u64)>,
    /// Stamp handed to the next touched entry
    clock: u64,
}

impl<K: Clone + Eq + Hash, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            clock: 0,
        }
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        let stamp = self.next_stamp();
        let entry = self.map.get_mut(key)?;
        entry.1 = stamp;
        Some(&entry.0)
    }

    pub fn put(&mut self, key: K, value: V) {
        let stamp = self.next_stamp();
        if let Some(entry) = self.map.get_mut(&key) {
            *entry = (value, stamp);
            return;
        }

        if self.map.len() >= self.capacity {
            self.evict_lru();
        }
        self.map.insert(key, (value, stamp));
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    fn next_stamp(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_lru(&mut self) {
        let lru = self
            .map
            .iter()
            .min_by_key(|(_, (_, stamp))| *stamp)
            .map(|(key, _)| key.clone());
        if let Some(key) = lru {
            self.map.remove(&key);
        }
    }
}
