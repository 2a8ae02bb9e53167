//! The disk tier: writing flushed buffers into level 0 and cascading full
//! levels downward.
//!
//! Every step builds its output run completely before any input run is
//! released, so a failed write leaves all existing data in place and a
//! run that a deeper cascade might still read is never freed early.

use std::path::PathBuf;

use crate::error::{Error, Result, check_invariant};
use crate::event::{Event, Events};
use crate::level::DiskLevel;
use crate::sstable::{DiskRun, RunConfig, run_file_path};
use crate::types::{KVPair, Key, RunId, Value};

pub(crate) struct DiskTier<K, V> {
    /// Index 0 is the newest and smallest level.
    levels: Vec<DiskLevel<K, V>>,
    dir: PathBuf,
    config: RunConfig,
    runs_per_level: usize,
    merge_count: usize,
    next_run_id: u64,
    cascades: u64,
}

impl<K: Key, V: Value> DiskTier<K, V> {
    /// Allocate level 0 with runs of `level0_run_capacity` entries.
    pub(crate) fn new(
        dir: PathBuf,
        config: RunConfig,
        level0_run_capacity: usize,
        runs_per_level: usize,
        merge_count: usize,
    ) -> Self {
        DiskTier {
            levels: vec![DiskLevel::new(
                0,
                level0_run_capacity,
                runs_per_level,
                merge_count,
            )],
            dir,
            config,
            runs_per_level,
            merge_count,
            next_run_id: 0,
            cascades: 0,
        }
    }

    pub(crate) fn levels(&self) -> &[DiskLevel<K, V>] {
        &self.levels
    }

    pub(crate) fn cascades(&self) -> u64 {
        self.cascades
    }

    /// Write an already sorted, duplicate-free buffer as a new level-0 run,
    /// cascading level 0 first if it has no room.
    pub(crate) fn flush(&mut self, sorted: &[KVPair<K, V>], events: Events<'_>) -> Result<RunId> {
        if self.levels[0].is_full() {
            self.cascade(1, events)?;
        }

        let id = self.allocate_id();
        let level = &mut self.levels[0];
        let run = DiskRun::build_from_sorted(
            &run_file_path(&self.dir, 0, id),
            id,
            sorted,
            level.run_capacity(),
            self.config,
        )?;
        check_invariant(level.absorb(run))?;
        Ok(id)
    }

    /// Merge the oldest runs of level `target - 1` into level `target`,
    /// creating `target` if needed and making room in it first.
    fn cascade(&mut self, target: usize, events: Events<'_>) -> Result<()> {
        debug_assert!(target >= 1);

        if target == self.levels.len() {
            let upper = &self.levels[target - 1];
            let run_capacity = upper
                .run_capacity()
                .checked_mul(upper.merge_count())
                .ok_or_else(|| {
                    Error::Config(format!("run capacity of disk level {target} overflows"))
                })?;
            self.levels.push(DiskLevel::new(
                target,
                run_capacity,
                self.runs_per_level,
                self.merge_count,
            ));
            events.emit(Event::LevelCreated {
                level: target,
                run_capacity,
            });
        }

        if self.levels[target].is_full() {
            self.cascade(target + 1, events)?;
        }

        events.emit(Event::CascadeStarted {
            from: target - 1,
            to: target,
        });
        self.cascades += 1;

        let id = self.allocate_id();
        let path = run_file_path(&self.dir, target, id);
        let (upper, lower) = self.levels.split_at_mut(target);
        let source = &mut upper[target - 1];
        let dest = &mut lower[0];

        let candidates = source.select_merge_candidates();
        let consumed: Vec<RunId> = candidates.iter().map(|run| run.id()).collect();
        // Candidates are oldest first; the merge wants newest first.
        let newest_first: Vec<&DiskRun<K, V>> = candidates.iter().rev().collect();

        let merged = DiskRun::build_from_merge(
            &path,
            id,
            &newest_first,
            dest.run_capacity(),
            self.config,
        )?;
        let entries = merged.len();
        check_invariant(dest.absorb(merged))?;

        // The new run is committed; only now may the inputs go.
        check_invariant(source.release(&consumed))?;

        events.emit(Event::RunMerged {
            level: target,
            run: id,
            sources: consumed.len(),
            entries,
        });
        Ok(())
    }

    /// Probe levels newest (0) to oldest; the first hit wins.
    pub(crate) fn lookup(&self, key: &K) -> Result<Option<V>> {
        for level in &self.levels {
            if let Some(value) = level.lookup(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn allocate_id(&mut self) -> RunId {
        let id = RunId(self.next_run_id);
        self.next_run_id += 1;
        id
    }
}
