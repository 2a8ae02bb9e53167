//! # Tiered LSM Storage Engine
//!
//! An embedded key-value engine using the Log-Structured Merge design with
//! a multi-run memory buffer and size-tiered disk levels.
//!
//! ## Core idea
//! Writes go to a bounded buffer of sorted memory runs. When the buffer
//! fills, its oldest runs are merged into one sorted run on disk level 0.
//! When a level holds its maximum number of runs, its oldest runs are
//! merged into a single larger run one level down. Each level's runs are
//! `merge count` times larger than the level above.
//!
//! Every run carries a bloom filter so lookups skip runs that cannot hold
//! the key. Lookups scan newest to oldest, so the latest write wins.
//!
//! ```no_run
//! use lsm_tiered::{Lsm, Options};
//!
//! let mut db: Lsm<u64, u64> = Lsm::open(Options::new("/tmp/lsm"))?;
//! db.insert(1, 100)?;
//! assert_eq!(db.lookup(1)?, Some(100));
//! # Ok::<(), lsm_tiered::Error>(())
//! ```

pub mod bloom;
mod compaction;
pub mod db;
pub mod error;
pub mod event;
pub mod iterator;
pub mod level;
pub mod memtable;
pub mod sstable;
pub mod types;

// Public re-exports for the top-level API
pub use db::{LevelStats, Lsm, Options, Stats};
pub use error::{Error, Result};
pub use event::{Event, EventListener};
pub use types::{KVPair, Key, RunId, Scalar, Value};
