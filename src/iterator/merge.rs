use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::Result;
use crate::iterator::RunIterator;
use crate::types::{KVPair, Key, Value};

/// Merges multiple sorted sources into a single sorted stream.
///
/// Used for:
/// - Flushing the oldest memory runs into one level-0 disk run
/// - Cascading the oldest runs of a disk level into the next level
///
/// Sources are ordered by priority: index 0 = newest. When several sources
/// hold the same key only the newest one's value is yielded; the older
/// copies are skipped. Runs time O(n log k) for n entries over k sources.
pub struct MergeIterator<'a, K, V> {
    sources: Vec<Box<dyn RunIterator<K, V> + 'a>>,
    /// Min-heap on (key, source index). Ties on key pop the newest source.
    heap: BinaryHeap<Reverse<(K, usize)>>,
    current: Option<KVPair<K, V>>,
}

impl<'a, K: Key, V: Value> MergeIterator<'a, K, V> {
    /// Create a new MergeIterator positioned at the smallest key.
    pub fn new(sources: Vec<Box<dyn RunIterator<K, V> + 'a>>) -> Result<Self> {
        let heap = sources
            .iter()
            .enumerate()
            .filter(|(_, source)| source.is_valid())
            .map(|(idx, source)| Reverse((source.key(), idx)))
            .collect();

        let mut merged = MergeIterator {
            sources,
            heap,
            current: None,
        };
        merged.pull()?;
        Ok(merged)
    }

    /// Drain the rest of the stream into a vector.
    pub fn collect_pairs(mut self) -> Result<Vec<KVPair<K, V>>> {
        let mut out = Vec::new();
        while let Some(pair) = self.current {
            out.push(pair);
            self.pull()?;
        }
        Ok(out)
    }

    /// Pop the next distinct key, then step every source that shares it.
    fn pull(&mut self) -> Result<()> {
        let Some(Reverse((key, winner))) = self.heap.pop() else {
            self.current = None;
            return Ok(());
        };

        self.current = Some(KVPair::new(key, self.sources[winner].value()));
        self.step(winner)?;

        while let Some(Reverse((next_key, _))) = self.heap.peek() {
            if *next_key != key {
                break;
            }
            if let Some(Reverse((_, shadowed))) = self.heap.pop() {
                self.step(shadowed)?;
            }
        }
        Ok(())
    }

    fn step(&mut self, idx: usize) -> Result<()> {
        let source = &mut self.sources[idx];
        source.next()?;
        if source.is_valid() {
            self.heap.push(Reverse((source.key(), idx)));
        }
        Ok(())
    }
}

impl<K: Key, V: Value> RunIterator<K, V> for MergeIterator<'_, K, V> {
    fn key(&self) -> K {
        self.current.map(|pair| pair.key).unwrap_or_else(|| {
            panic!("MergeIterator::key called on exhausted iterator")
        })
    }

    fn value(&self) -> V {
        self.current.map(|pair| pair.value).unwrap_or_else(|| {
            panic!("MergeIterator::value called on exhausted iterator")
        })
    }

    fn is_valid(&self) -> bool {
        self.current.is_some()
    }

    fn next(&mut self) -> Result<()> {
        self.pull()
    }
}
