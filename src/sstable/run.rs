use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::bloom::BloomFilter;
use crate::error::{Error, Result};
use crate::iterator::{MergeIterator, RunIterator};
use crate::sstable::page::Page;
use crate::sstable::{DiskRunBuilder, RunConfig};
use crate::types::{KVPair, Key, RunId, Value};

/// An immutable sorted run stored in one file.
///
/// Only the fence pointers (first key of each page), the key range and the
/// bloom filter stay in memory. A point lookup costs at most one page read.
pub struct DiskRun<K, V> {
    pub(crate) id: RunId,
    pub(crate) path: PathBuf,
    /// RefCell because seek+read needs &mut File but lookups take &self.
    pub(crate) file: RefCell<File>,
    pub(crate) fences: Vec<K>,
    pub(crate) max_key: Option<K>,
    pub(crate) len: usize,
    pub(crate) capacity: usize,
    pub(crate) page_size: usize,
    pub(crate) filter: BloomFilter,
    pub(crate) _marker: PhantomData<V>,
}

impl<K: Key, V: Value> DiskRun<K, V> {
    /// Build a run from an array already sorted by strictly increasing key.
    pub fn build_from_sorted(
        path: &Path,
        id: RunId,
        pairs: &[KVPair<K, V>],
        capacity: usize,
        config: RunConfig,
    ) -> Result<Self> {
        build_or_remove(path, || {
            let mut builder = DiskRunBuilder::new(path, id, capacity, pairs.len(), config)?;
            for pair in pairs {
                builder.add(*pair)?;
            }
            builder.finish()
        })
    }

    /// Build a run by k-way merging `sources`, which must be ordered newest
    /// first. A key present in several sources keeps the newest value.
    pub fn build_from_merge(
        path: &Path,
        id: RunId,
        sources: &[&DiskRun<K, V>],
        capacity: usize,
        config: RunConfig,
    ) -> Result<Self> {
        build_or_remove(path, || {
            let estimated = sources.iter().map(|run| run.len()).sum();
            let mut builder = DiskRunBuilder::new(path, id, capacity, estimated, config)?;

            let mut iters: Vec<Box<dyn RunIterator<K, V> + '_>> = Vec::with_capacity(sources.len());
            for run in sources {
                iters.push(Box::new(run.iter()?));
            }
            let mut merged = MergeIterator::new(iters)?;
            while merged.is_valid() {
                builder.add(KVPair::new(merged.key(), merged.value()))?;
                merged.next()?;
            }
            builder.finish()
        })
    }

    /// Filter-gated point lookup.
    pub fn lookup(&self, key: &K) -> Result<Option<V>> {
        if !self.filter.may_contain_key(key) {
            return Ok(None);
        }
        let Some(max_key) = self.max_key else {
            return Ok(None);
        };
        if *key > max_key {
            return Ok(None);
        }

        // Last page whose first key is <= key.
        let page_idx = match self.fences.partition_point(|fence| fence <= key) {
            0 => return Ok(None),
            n => n - 1,
        };
        Ok(self.read_page(page_idx)?.get(key))
    }

    /// Whether the bloom filter admits `key`.
    pub fn may_contain(&self, key: &K) -> bool {
        self.filter.may_contain_key(key)
    }

    /// Sorted cursor over the whole run, reading one page at a time.
    pub fn iter(&self) -> Result<DiskRunIter<'_, K, V>> {
        DiskRunIter::new(self)
    }

    /// Bulk read of every entry in key order.
    pub fn read_all(&self) -> Result<Vec<KVPair<K, V>>> {
        let mut out = Vec::with_capacity(self.len);
        for page_idx in 0..self.num_pages() {
            let page = self.read_page(page_idx)?;
            out.extend((0..page.len()).map(|i| page.pair_at(i)));
        }
        Ok(out)
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of entries this run was sized for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    pub fn min_key(&self) -> Option<K> {
        self.fences.first().copied()
    }

    pub fn max_key(&self) -> Option<K> {
        self.max_key
    }

    pub fn num_pages(&self) -> usize {
        self.fences.len()
    }

    fn read_page(&self, page_idx: usize) -> Result<Page<K, V>> {
        let mut data = vec![0u8; self.page_size];
        {
            let mut file = self.file.borrow_mut();
            file.seek(SeekFrom::Start((page_idx * self.page_size) as u64))?;
            file.read_exact(&mut data)?;
        }
        Page::decode(data)
    }
}

impl<K, V> Drop for DiskRun<K, V> {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    run = %self.id,
                    path = %self.path.display(),
                    error = %e,
                    "Failed to delete run file"
                );
            }
        }
    }
}

/// Runs `build`; if it fails, the partially written file is removed. A file
/// that already existed belongs to someone else and is left alone.
fn build_or_remove<T>(path: &Path, build: impl FnOnce() -> Result<T>) -> Result<T> {
    let result = build();
    match &result {
        Err(Error::Io(e)) if e.kind() == io::ErrorKind::AlreadyExists => {}
        Err(_) => {
            let _ = fs::remove_file(path);
        }
        Ok(_) => {}
    }
    result
}

/// Page-at-a-time cursor over a disk run.
pub struct DiskRunIter<'a, K, V> {
    run: &'a DiskRun<K, V>,
    page: Option<Page<K, V>>,
    page_idx: usize,
    slot: usize,
}

impl<'a, K: Key, V: Value> DiskRunIter<'a, K, V> {
    fn new(run: &'a DiskRun<K, V>) -> Result<Self> {
        let page = if run.num_pages() > 0 {
            Some(run.read_page(0)?)
        } else {
            None
        };
        Ok(DiskRunIter {
            run,
            page,
            page_idx: 0,
            slot: 0,
        })
    }

    fn current(&self) -> KVPair<K, V> {
        match &self.page {
            Some(page) => page.pair_at(self.slot),
            None => panic!("DiskRunIter accessed after exhaustion"),
        }
    }
}

impl<K: Key, V: Value> RunIterator<K, V> for DiskRunIter<'_, K, V> {
    fn key(&self) -> K {
        self.current().key
    }

    fn value(&self) -> V {
        self.current().value
    }

    fn is_valid(&self) -> bool {
        self.page.as_ref().is_some_and(|page| self.slot < page.len())
    }

    fn next(&mut self) -> Result<()> {
        let Some(page) = &self.page else {
            return Ok(());
        };
        self.slot += 1;
        if self.slot < page.len() {
            return Ok(());
        }

        self.page_idx += 1;
        self.slot = 0;
        self.page = if self.page_idx < self.run.num_pages() {
            Some(self.run.read_page(self.page_idx)?)
        } else {
            None
        };
        Ok(())
    }
}
