mod buffer;
mod lock;
mod options;

pub use options::Options;

use buffer::BufferTier;
use lock::DirLock;

use crate::compaction::DiskTier;
use crate::error::{Error, Result, check_invariant};
use crate::event::{Event, EventListener, Events};
use crate::level::DiskLevel;
use crate::sstable::RunConfig;
use crate::sstable::page::entries_per_page;
use crate::types::{Key, Value};

/// Point-in-time counters describing the engine's shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    /// Elements resident in the buffer tier.
    pub buffer_elements: u64,
    /// Buffer flushes into level 0 so far.
    pub flushes: u64,
    /// Level-to-level cascades so far.
    pub cascades: u64,
    pub levels: Vec<LevelStats>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelStats {
    pub runs: usize,
    pub max_runs: usize,
    pub run_capacity: usize,
    pub entries: usize,
}

/// The LSM engine.
///
/// Writes land in the buffer tier, a fixed number of bounded memory runs
/// each paired with a bloom filter. When every memory run is sealed the
/// oldest `num_to_merge` of them are merged into one run on disk level 0.
/// A full level first cascades its oldest runs into the next, larger level,
/// recursively, so the write always finds room.
///
/// Reads go newest to oldest: memory runs from the most recent back, then
/// disk levels from 0 down, runs within a level from the most recent back.
/// The first hit wins, which makes the latest write for a key win.
///
/// All merging happens synchronously inside [`Lsm::insert`].
pub struct Lsm<K, V> {
    options: Options,
    elts_per_run: usize,
    num_to_merge: usize,
    buffer: BufferTier<K, V>,
    disk: DiskTier<K, V>,
    listener: Option<Box<dyn EventListener>>,
    flushes: u64,
    /// Declared last so it is released only after the run files are gone.
    _lock: DirLock,
}

impl<K: Key, V: Value> Lsm<K, V> {
    /// Validate `options`, create and lock the data directory and build an
    /// empty engine. Nothing is created when validation fails.
    ///
    /// Fails with [`Error::DirectoryLocked`] while another engine holds the
    /// same directory.
    pub fn open(options: Options) -> Result<Self> {
        options.validate()?;
        if entries_per_page::<K, V>(options.page_size) == 0 {
            return Err(Error::Config(format!(
                "page_size {} cannot hold one {}-byte entry",
                options.page_size,
                K::WIDTH + V::WIDTH
            )));
        }

        std::fs::create_dir_all(&options.data_dir)?;
        let lock = DirLock::acquire(&options.data_dir)?;

        let elts_per_run = options.elts_per_run();
        let num_to_merge = options.num_to_merge();
        let level0_run_capacity = num_to_merge.checked_mul(elts_per_run).ok_or_else(|| {
            Error::Config("level 0 run capacity overflows".into())
        })?;

        let disk = DiskTier::new(
            options.data_dir.clone(),
            RunConfig {
                page_size: options.page_size,
                bloom_fp_rate: options.bloom_fp_rate,
            },
            level0_run_capacity,
            options.disk_runs_per_level,
            options.level_merge_count(),
        );

        tracing::debug!(
            dir = %options.data_dir.display(),
            mem_runs = options.num_mem_runs,
            elts_per_run,
            num_to_merge,
            "Opened LSM engine"
        );

        Ok(Lsm {
            buffer: BufferTier::new(options.num_mem_runs, elts_per_run, options.bloom_fp_rate),
            disk,
            elts_per_run,
            num_to_merge,
            options,
            listener: None,
            flushes: 0,
            _lock: lock,
        })
    }

    /// Register a listener for structural events (flushes, level creation,
    /// cascades).
    pub fn with_listener(mut self, listener: impl EventListener + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Insert or overwrite `key`. Flushes and cascades run to completion
    /// before this returns.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        if self.buffer.is_full() {
            self.flush_buffer()?;
        }
        check_invariant(self.buffer.insert(key, value).inspect_err(|_| {
            tracing::error!("Buffer tier still full after flush");
        }))
    }

    /// Most recent value written for `key`.
    ///
    /// Absent keys are `Ok(None)`; errors only come from reading disk runs.
    pub fn lookup(&self, key: K) -> Result<Option<V>> {
        if let Some(value) = self.buffer.lookup(&key) {
            return Ok(Some(value));
        }
        self.disk.lookup(&key)
    }

    /// Elements resident in the buffer tier. Disk levels are not counted.
    pub fn element_count(&self) -> u64 {
        self.buffer.len() as u64
    }

    pub fn num_disk_levels(&self) -> usize {
        self.disk.levels().len()
    }

    /// Disk levels, index 0 being the newest and smallest.
    pub fn disk_levels(&self) -> &[DiskLevel<K, V>] {
        self.disk.levels()
    }

    pub fn elts_per_run(&self) -> usize {
        self.elts_per_run
    }

    pub fn num_to_merge(&self) -> usize {
        self.num_to_merge
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn stats(&self) -> Stats {
        Stats {
            buffer_elements: self.element_count(),
            flushes: self.flushes,
            cascades: self.disk.cascades(),
            levels: self
                .disk
                .levels()
                .iter()
                .map(|level| LevelStats {
                    runs: level.num_runs(),
                    max_runs: level.max_runs(),
                    run_capacity: level.run_capacity(),
                    entries: level.entries(),
                })
                .collect(),
        }
    }

    /// Move the oldest `num_to_merge` memory runs into a new level-0 run.
    ///
    /// The memory runs stay readable until the disk run is committed; only
    /// then are their slots retired.
    fn flush_buffer(&mut self) -> Result<()> {
        let events = Events::new(self.listener.as_deref());

        let sorted = self.buffer.merge_oldest(self.num_to_merge)?;
        let run = self.disk.flush(&sorted, events)?;
        self.buffer.retire_oldest(self.num_to_merge);
        self.flushes += 1;

        events.emit(Event::BufferFlushed {
            mem_runs: self.num_to_merge,
            entries: sorted.len(),
            run,
        });
        Ok(())
    }
}
