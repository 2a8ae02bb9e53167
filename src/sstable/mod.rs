//! Immutable on-disk sorted runs.
//!
//! A disk run is written exactly once, from a fully sorted array (a buffer
//! flush) or from a k-way merge of other runs (a cascade), and is never
//! modified afterwards. Its file is removed when the run is dropped, which
//! happens when its level releases it.

pub mod builder;
pub mod page;
pub mod run;

pub use builder::DiskRunBuilder;
pub use run::{DiskRun, DiskRunIter};

use std::path::{Path, PathBuf};

/// Parameters shared by every disk run the engine writes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunConfig {
    /// Size of one on-disk page in bytes.
    pub page_size: usize,
    /// Target false positive rate of each run's bloom filter.
    pub bloom_fp_rate: f64,
}

/// File name of a run inside the data directory.
pub fn run_file_path(dir: &Path, level: usize, id: crate::types::RunId) -> PathBuf {
    dir.join(format!("run-{level}-{:08}.dat", id.0))
}
