use crate::bloom::BloomFilter;
use crate::types::Scalar;

/// Builds the filter attached to a disk run while the run is written.
///
/// A merged run does not know its final length up front (duplicate keys
/// collapse), so the builder is sized from the upper bound and fed every
/// key that actually reaches the run.
pub struct BloomFilterBuilder {
    filter: BloomFilter,
    added: usize,
}

impl BloomFilterBuilder {
    /// Create a builder expecting approximately `estimated_keys` keys.
    pub fn new(estimated_keys: usize, false_positive_rate: f64) -> Self {
        BloomFilterBuilder {
            filter: BloomFilter::new(estimated_keys, false_positive_rate),
            added: 0,
        }
    }

    pub fn add_key<K: Scalar>(&mut self, key: &K) {
        self.filter.insert_key(key);
        self.added += 1;
    }

    /// Keys added so far.
    pub fn len(&self) -> usize {
        self.added
    }

    pub fn is_empty(&self) -> bool {
        self.added == 0
    }

    pub fn build(self) -> BloomFilter {
        self.filter
    }
}
