use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::types::{KVPair, Key, Value};

/// Bytes reserved for the entry count at the front of a page.
pub const PAGE_HEADER: usize = 4;
/// Bytes reserved for the CRC32 at the end of a page.
pub const PAGE_TRAILER: usize = 4;

/// Accumulates sorted key-value pairs and serializes them into one page.
///
/// Keys and values are fixed width, so no offset array is needed: entry `i`
/// starts at `PAGE_HEADER + i * entry_width`.
///
/// On-disk layout of a page (always exactly `page_size` bytes):
/// ```text
/// ┌──────────────────────────────────────────────┐
/// │ Num entries (4B LE)                          │
/// │ Entry 0: [key (K::WIDTH)][value (V::WIDTH)]  │
/// │ ...                                          │
/// │ Entry N-1                                    │
/// │ Zero padding                                 │
/// │ CRC32 of all preceding bytes (4B LE)         │
/// └──────────────────────────────────────────────┘
/// ```
pub struct PageBuilder<K, V> {
    data: Vec<u8>,
    count: usize,
    capacity: usize,
    page_size: usize,
    _marker: PhantomData<(K, V)>,
}

/// Width of one encoded `(K, V)` entry.
pub fn entry_width<K: Key, V: Value>() -> usize {
    K::WIDTH + V::WIDTH
}

/// How many entries fit in a page of `page_size` bytes. Zero means the page
/// is too small to be usable.
pub fn entries_per_page<K: Key, V: Value>(page_size: usize) -> usize {
    page_size.saturating_sub(PAGE_HEADER + PAGE_TRAILER) / entry_width::<K, V>()
}

impl<K: Key, V: Value> PageBuilder<K, V> {
    pub fn new(page_size: usize) -> Self {
        let mut data = Vec::with_capacity(page_size);
        data.extend_from_slice(&0u32.to_le_bytes());
        PageBuilder {
            data,
            count: 0,
            capacity: entries_per_page::<K, V>(page_size),
            page_size,
            _marker: PhantomData,
        }
    }

    /// Add an entry. Returns false if the page is full.
    /// Entries MUST be added in sorted key order.
    pub fn add(&mut self, pair: &KVPair<K, V>) -> bool {
        if self.count >= self.capacity {
            return false;
        }
        pair.key.with_bytes(|b| self.data.extend_from_slice(b));
        pair.value.with_bytes(|b| self.data.extend_from_slice(b));
        self.count += 1;
        true
    }

    /// Finalize: write the count, pad and append the checksum.
    pub fn build(mut self) -> Vec<u8> {
        self.data[..PAGE_HEADER].copy_from_slice(&(self.count as u32).to_le_bytes());
        self.data.resize(self.page_size - PAGE_TRAILER, 0);
        let crc = crc32fast::hash(&self.data);
        self.data.extend_from_slice(&crc.to_le_bytes());
        self.data
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.capacity
    }
}

/// A decoded, checksum-verified page.
pub struct Page<K, V> {
    data: Vec<u8>,
    count: usize,
    _marker: PhantomData<(K, V)>,
}

impl<K: Key, V: Value> Page<K, V> {
    /// Decode a raw page read from disk.
    pub fn decode(data: Vec<u8>) -> Result<Self> {
        if data.len() < PAGE_HEADER + PAGE_TRAILER {
            return Err(Error::Corruption(format!(
                "page of {} bytes is shorter than its header and trailer",
                data.len()
            )));
        }

        let body_len = data.len() - PAGE_TRAILER;
        let stored = u32::from_le_bytes([
            data[body_len],
            data[body_len + 1],
            data[body_len + 2],
            data[body_len + 3],
        ]);
        let actual = crc32fast::hash(&data[..body_len]);
        if stored != actual {
            return Err(Error::Corruption(format!(
                "page checksum mismatch: stored {stored:#010x}, computed {actual:#010x}"
            )));
        }

        let count = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if PAGE_HEADER + count * entry_width::<K, V>() > body_len {
            return Err(Error::Corruption(format!(
                "page claims {count} entries, more than fit in {} bytes",
                data.len()
            )));
        }

        Ok(Page {
            data,
            count,
            _marker: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn key_at(&self, idx: usize) -> K {
        K::decode(&self.data[self.offset(idx)..])
    }

    pub fn pair_at(&self, idx: usize) -> KVPair<K, V> {
        let offset = self.offset(idx);
        KVPair::new(
            K::decode(&self.data[offset..]),
            V::decode(&self.data[offset + K::WIDTH..]),
        )
    }

    /// Binary search for `key` within the page.
    pub fn get(&self, key: &K) -> Option<V> {
        let (mut lo, mut hi) = (0, self.count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.key_at(mid).cmp(key) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Some(self.pair_at(mid).value),
            }
        }
        None
    }

    fn offset(&self, idx: usize) -> usize {
        PAGE_HEADER + idx * entry_width::<K, V>()
    }
}
