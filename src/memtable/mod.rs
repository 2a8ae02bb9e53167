pub mod skiplist;

use skiplist::{SkipList, SkipListIterator};

use crate::error::Result;
use crate::iterator::RunIterator;
use crate::types::{KVPair, Key, Value};

/// One bounded slice of recent writes. Wraps a SkipList.
///
/// The buffer tier holds a fixed number of these. A run accepts writes until
/// it holds `capacity` distinct keys; an overwrite of a key already present
/// replaces the value in place and does not consume capacity.
pub struct MemRun<K, V> {
    data: SkipList<K, V>,
    capacity: usize,
}

impl<K: Key, V: Value> MemRun<K, V> {
    pub fn new(capacity: usize) -> Self {
        MemRun {
            data: SkipList::new(),
            capacity,
        }
    }

    /// Insert or update a key-value pair.
    pub fn put(&mut self, key: K, value: V) {
        self.data.insert(key, value);
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.data.get(key).copied()
    }

    /// Sorted cursor over all entries.
    pub fn iter(&self) -> SkipListIterator<'_, K, V> {
        self.data.iter()
    }

    /// Bulk ordered extraction of every entry.
    pub fn to_sorted_vec(&self) -> Result<Vec<KVPair<K, V>>> {
        let mut out = Vec::with_capacity(self.len());
        let mut iter = self.iter();
        while iter.is_valid() {
            out.push(KVPair::new(iter.key(), iter.value()));
            iter.next()?;
        }
        Ok(out)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check if the run has reached its element budget.
    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }
}
