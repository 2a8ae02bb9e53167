use std::path::PathBuf;

use crate::error::{Error, Result};

/// Engine configuration, fixed for the lifetime of an [`crate::Lsm`].
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Directory that holds disk run files. Created on open.
    pub data_dir: PathBuf,
    /// Total elements the buffer tier holds across all of its memory runs.
    pub buffer_capacity: usize,
    /// Number of memory runs the buffer tier is split into.
    pub num_mem_runs: usize,
    /// Fraction of memory runs (and of a disk level's runs) merged per flush
    /// or cascade. Must be in (0, 1].
    pub merged_fraction: f64,
    /// Target false positive rate of every bloom filter.
    pub bloom_fp_rate: f64,
    /// Disk page size in bytes.
    pub page_size: usize,
    /// Maximum number of runs per disk level.
    pub disk_runs_per_level: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            data_dir: PathBuf::from("lsm-data"),
            buffer_capacity: 4096,
            num_mem_runs: 8,
            merged_fraction: 0.5,
            bloom_fp_rate: 0.01,
            page_size: 4096,
            disk_runs_per_level: 4,
        }
    }
}

impl Options {
    /// Default options rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Options {
            data_dir: data_dir.into(),
            ..Options::default()
        }
    }

    pub fn buffer_capacity(mut self, elements: usize) -> Self {
        self.buffer_capacity = elements;
        self
    }

    pub fn num_mem_runs(mut self, runs: usize) -> Self {
        self.num_mem_runs = runs;
        self
    }

    pub fn merged_fraction(mut self, fraction: f64) -> Self {
        self.merged_fraction = fraction;
        self
    }

    pub fn bloom_fp_rate(mut self, rate: f64) -> Self {
        self.bloom_fp_rate = rate;
        self
    }

    pub fn page_size(mut self, bytes: usize) -> Self {
        self.page_size = bytes;
        self
    }

    pub fn disk_runs_per_level(mut self, runs: usize) -> Self {
        self.disk_runs_per_level = runs;
        self
    }

    /// Elements each memory run holds: `buffer_capacity / num_mem_runs`.
    pub fn elts_per_run(&self) -> usize {
        self.buffer_capacity
            .checked_div(self.num_mem_runs)
            .unwrap_or(0)
    }

    /// Memory runs merged per flush: `ceil(merged_fraction * num_mem_runs)`.
    pub fn num_to_merge(&self) -> usize {
        merge_count(self.merged_fraction, self.num_mem_runs)
    }

    /// Disk runs merged per cascade: `ceil(merged_fraction * disk_runs_per_level)`.
    pub fn level_merge_count(&self) -> usize {
        merge_count(self.merged_fraction, self.disk_runs_per_level)
    }

    /// Reject configurations the engine could never operate under.
    pub fn validate(&self) -> Result<()> {
        if self.num_mem_runs == 0 {
            return Err(Error::Config("num_mem_runs must be at least 1".into()));
        }
        if self.elts_per_run() == 0 {
            return Err(Error::Config(format!(
                "buffer_capacity {} is smaller than num_mem_runs {}",
                self.buffer_capacity, self.num_mem_runs
            )));
        }
        if !self.merged_fraction.is_finite()
            || self.merged_fraction <= 0.0
            || self.merged_fraction > 1.0
        {
            return Err(Error::Config(format!(
                "merged_fraction {} must be in (0, 1]",
                self.merged_fraction
            )));
        }
        if self.num_to_merge() == 0 {
            return Err(Error::Config(
                "merged_fraction selects zero memory runs per flush".into(),
            ));
        }
        if !(self.bloom_fp_rate > 0.0 && self.bloom_fp_rate < 1.0) {
            return Err(Error::Config(format!(
                "bloom_fp_rate {} must be in (0, 1)",
                self.bloom_fp_rate
            )));
        }
        if self.disk_runs_per_level == 0 {
            return Err(Error::Config("disk_runs_per_level must be at least 1".into()));
        }
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be non-zero".into()));
        }
        Ok(())
    }
}

fn merge_count(fraction: f64, runs: usize) -> usize {
    if !fraction.is_finite() || fraction <= 0.0 {
        return 0;
    }
    ((fraction * runs as f64).ceil() as usize).min(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_sizes() {
        let opts = Options::new("x")
            .buffer_capacity(8)
            .num_mem_runs(4)
            .merged_fraction(0.5)
            .disk_runs_per_level(3);
        assert_eq!(opts.elts_per_run(), 2);
        assert_eq!(opts.num_to_merge(), 2);
        assert_eq!(opts.level_merge_count(), 2);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn rejects_bad_fractions() {
        for fraction in [0.0, -0.5, 1.5, f64::NAN] {
            let opts = Options::default().merged_fraction(fraction);
            assert!(matches!(opts.validate(), Err(Error::Config(_))), "{fraction}");
        }
    }
}
