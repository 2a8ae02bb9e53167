use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::bloom::builder::BloomFilterBuilder;
use crate::error::{Error, Result};
use crate::sstable::page::{PageBuilder, entries_per_page};
use crate::sstable::{DiskRun, RunConfig};
use crate::types::{KVPair, Key, RunId, Value};

/// Writes one disk run from a sorted stream of key-value pairs.
///
/// Used during:
/// - Buffer flush (merged memory runs → level-0 run)
/// - Cascade (merged disk runs → run in the next level)
///
/// Build process:
/// 1. Add entries one by one (strictly increasing keys)
/// 2. Entries fill pages; a full page is written out and its first key
///    becomes a fence pointer
/// 3. finish() flushes the last page and reopens the file for reads
pub struct DiskRunBuilder<K, V> {
    page: PageBuilder<K, V>,
    /// First key of every page written so far, plus the open one.
    fences: Vec<K>,
    writer: BufWriter<File>,
    path: PathBuf,
    id: RunId,
    config: RunConfig,
    capacity: usize,
    filter: BloomFilterBuilder,
    last_key: Option<K>,
    entry_count: usize,
    _marker: PhantomData<V>,
}

impl<K: Key, V: Value> DiskRunBuilder<K, V> {
    /// Create a builder for a run of at most `capacity` entries.
    /// `estimated_entries` sizes the bloom filter.
    pub fn new(
        path: &Path,
        id: RunId,
        capacity: usize,
        estimated_entries: usize,
        config: RunConfig,
    ) -> Result<Self> {
        if entries_per_page::<K, V>(config.page_size) == 0 {
            return Err(Error::Config(format!(
                "page size {} cannot hold a single entry",
                config.page_size
            )));
        }

        // Never truncate an existing run.
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        Ok(DiskRunBuilder {
            page: PageBuilder::new(config.page_size),
            fences: Vec::new(),
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            id,
            config,
            capacity,
            filter: BloomFilterBuilder::new(estimated_entries.min(capacity), config.bloom_fp_rate),
            last_key: None,
            entry_count: 0,
            _marker: PhantomData,
        })
    }

    /// Add a key-value pair. Keys MUST be strictly increasing.
    pub fn add(&mut self, pair: KVPair<K, V>) -> Result<()> {
        if let Some(last) = self.last_key {
            if pair.key <= last {
                return Err(Error::InvalidInput(format!(
                    "run {} keys out of order: {:?} after {:?}",
                    self.id, pair.key, last
                )));
            }
        }
        if self.entry_count >= self.capacity {
            return Err(Error::InvalidInput(format!(
                "run {} exceeds its capacity of {} entries",
                self.id, self.capacity
            )));
        }

        if self.page.is_full() {
            self.flush_page()?;
        }
        if self.page.is_empty() {
            self.fences.push(pair.key);
        }
        // Cannot fail: the page was flushed above if it was full.
        self.page.add(&pair);

        self.filter.add_key(&pair.key);
        self.last_key = Some(pair.key);
        self.entry_count += 1;
        Ok(())
    }

    /// Write the current page to the file and start a fresh one.
    fn flush_page(&mut self) -> Result<()> {
        if self.page.is_empty() {
            return Ok(());
        }
        let page = std::mem::replace(&mut self.page, PageBuilder::new(self.config.page_size));
        self.writer.write_all(&page.build())?;
        Ok(())
    }

    /// Finalize the run and open it for reads.
    pub fn finish(mut self) -> Result<DiskRun<K, V>> {
        self.flush_page()?;
        self.writer.flush()?;
        drop(self.writer);

        let file = File::open(&self.path)?;
        Ok(DiskRun {
            id: self.id,
            path: self.path,
            file: RefCell::new(file),
            fences: self.fences,
            max_key: self.last_key,
            len: self.entry_count,
            capacity: self.capacity,
            page_size: self.config.page_size,
            filter: self.filter.build(),
            _marker: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}
