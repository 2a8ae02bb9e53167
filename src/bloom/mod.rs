pub mod builder;

use xxhash_rust::xxh3::xxh3_128;

use crate::types::Scalar;

/// Probabilistic data structure: "is this key in the set?"
///
/// - If any bit is 0 → key is DEFINITELY NOT in the set
/// - If all bits are 1 → key is PROBABLY in the set (false positive possible)
///
/// One filter is paired with every memory run and every disk run. A lookup
/// asks the filter first and only probes the run when the answer is "maybe".
/// Filters only ever grow; keys are never removed.
///
/// Sizing:
///   bits_per_key = -1.44 * log2(false_positive_rate)
///   num_hashes = bits_per_key * ln(2)
///
///   1% FPR  → ~10 bits/key, 7 hashes
///   0.1% FPR → ~14 bits/key, 10 hashes
///
/// Double hashing: h_i(key) = h1(key) + i * h2(key) (mod m), where h1 and h2
/// are the two halves of one 128-bit xxh3 hash.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_hashes: u32,
    num_bits: u64,
    num_keys: usize,
}

impl BloomFilter {
    /// Create a filter sized for `expected_items` at the given FPR.
    ///
    /// An `expected_items` of zero is treated as one so that filters for
    /// empty runs still answer queries.
    ///
    /// # Panics
    /// Panics if FPR is not in (0, 1). Engine options are validated before
    /// any filter is built, so this only fires on direct misuse.
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        assert!(
            false_positive_rate > 0.0 && false_positive_rate < 1.0,
            "FPR must be in (0, 1)"
        );

        let expected_items = expected_items.max(1);
        let bits_per_key = -1.44 * false_positive_rate.log2();
        let num_bits = ((expected_items as f64) * bits_per_key).ceil() as u64;
        let num_bits = num_bits.max(64);
        let num_hashes = ((bits_per_key * std::f64::consts::LN_2).ceil() as u32).max(1);

        BloomFilter {
            bits: vec![0u64; num_bits.div_ceil(64) as usize],
            num_hashes,
            num_bits,
            num_keys: 0,
        }
    }

    /// Add raw key bytes.
    pub fn insert(&mut self, key: &[u8]) {
        let (h1, h2) = hash_key(key);
        for i in 0..self.num_hashes {
            let pos = self.position(h1, h2, i);
            self.bits[(pos / 64) as usize] |= 1 << (pos % 64);
        }
        self.num_keys += 1;
    }

    /// false → definitely not here. true → probably here.
    pub fn may_contain(&self, key: &[u8]) -> bool {
        let (h1, h2) = hash_key(key);
        (0..self.num_hashes).all(|i| {
            let pos = self.position(h1, h2, i);
            (self.bits[(pos / 64) as usize] >> (pos % 64)) & 1 == 1
        })
    }

    /// Add a typed key using its scalar byte image.
    pub fn insert_key<K: Scalar>(&mut self, key: &K) {
        key.with_bytes(|bytes| self.insert(bytes));
    }

    /// Typed counterpart of [`BloomFilter::may_contain`].
    pub fn may_contain_key<K: Scalar>(&self, key: &K) -> bool {
        key.with_bytes(|bytes| self.may_contain(bytes))
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Number of insert calls made, duplicates included.
    pub fn num_keys(&self) -> usize {
        self.num_keys
    }

    fn position(&self, h1: u64, h2: u64, i: u32) -> u64 {
        h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.num_bits
    }
}

fn hash_key(key: &[u8]) -> (u64, u64) {
    let hash = xxh3_128(key);
    (hash as u64, (hash >> 64) as u64)
}
