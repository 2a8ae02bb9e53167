use crate::error::{Error, Result};
use crate::sstable::DiskRun;
use crate::types::{Key, RunId, Value};

/// One size tier of disk runs.
///
/// Holds up to `max_runs` runs of at most `run_capacity` entries each,
/// ordered oldest first. Runs only enter through [`DiskLevel::absorb`] and
/// only leave through [`DiskLevel::release`]; a run is never edited in place.
pub struct DiskLevel<K, V> {
    index: usize,
    runs: Vec<DiskRun<K, V>>,
    max_runs: usize,
    run_capacity: usize,
    merge_count: usize,
}

impl<K: Key, V: Value> DiskLevel<K, V> {
    /// `merge_count` is how many of this level's runs move down together
    /// when the level cascades into the next one.
    pub fn new(index: usize, run_capacity: usize, max_runs: usize, merge_count: usize) -> Self {
        DiskLevel {
            index,
            runs: Vec::with_capacity(max_runs),
            max_runs,
            run_capacity,
            merge_count,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_full(&self) -> bool {
        self.runs.len() >= self.max_runs
    }

    /// The oldest `merge_count` runs, oldest first.
    pub fn select_merge_candidates(&self) -> &[DiskRun<K, V>] {
        &self.runs[..self.merge_count.min(self.runs.len())]
    }

    /// Append a freshly built run as the newest member.
    pub fn absorb(&mut self, run: DiskRun<K, V>) -> Result<()> {
        if self.is_full() {
            tracing::error!(level = self.index, run = %run.id(), "Absorb into a full level");
            return Err(Error::LevelCapacityExceeded { level: self.index });
        }
        self.runs.push(run);
        Ok(())
    }

    /// Remove exactly the given runs and delete their files.
    ///
    /// Every id is checked before anything is removed, so a bad id leaves
    /// the level untouched.
    pub fn release(&mut self, ids: &[RunId]) -> Result<()> {
        for (pos, id) in ids.iter().enumerate() {
            let member = self.runs.iter().any(|run| run.id() == *id);
            if !member || ids[..pos].contains(id) {
                tracing::error!(
                    level = self.index,
                    run = %id,
                    "Release of a run the level does not hold"
                );
                return Err(Error::UnknownRun {
                    level: self.index,
                    run: *id,
                });
            }
        }
        // Dropping a DiskRun deletes its file.
        self.runs.retain(|run| !ids.contains(&run.id()));
        Ok(())
    }

    /// Probe runs newest to oldest; the first hit wins.
    pub fn lookup(&self, key: &K) -> Result<Option<V>> {
        for run in self.runs.iter().rev() {
            if let Some(value) = run.lookup(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Runs ordered oldest first.
    pub fn runs(&self) -> &[DiskRun<K, V>] {
        &self.runs
    }

    pub fn num_runs(&self) -> usize {
        self.runs.len()
    }

    pub fn max_runs(&self) -> usize {
        self.max_runs
    }

    pub fn run_capacity(&self) -> usize {
        self.run_capacity
    }

    pub fn merge_count(&self) -> usize {
        self.merge_count
    }

    /// Entries stored across all runs of the level.
    pub fn entries(&self) -> usize {
        self.runs.iter().map(|run| run.len()).sum()
    }
}
