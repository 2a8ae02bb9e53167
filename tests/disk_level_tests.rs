// DiskLevel: fullness, merge-candidate selection, absorb and checked release.

use lsm_tiered::level::DiskLevel;
use lsm_tiered::sstable::{DiskRun, RunConfig, run_file_path};
use lsm_tiered::{Error, KVPair, RunId};
use std::path::Path;
use tempfile::tempdir;

const CONFIG: RunConfig = RunConfig {
    page_size: 256,
    bloom_fp_rate: 0.01,
};

fn run(dir: &Path, id: u64, keys: std::ops::Range<u32>, value: u32) -> DiskRun<u32, u32> {
    let pairs: Vec<_> = keys.map(|k| KVPair::new(k, value)).collect();
    DiskRun::build_from_sorted(&run_file_path(dir, 0, RunId(id)), RunId(id), &pairs, 16, CONFIG)
        .unwrap()
}

#[test]
fn fills_up_to_max_runs() {
    let dir = tempdir().unwrap();
    let mut level = DiskLevel::new(0, 16, 3, 2);
    assert!(!level.is_full());

    for id in 0..3 {
        level.absorb(run(dir.path(), id, 0..4, 0)).unwrap();
    }
    assert!(level.is_full());
    assert_eq!(level.num_runs(), 3);
    assert_eq!(level.entries(), 12);

    let err = level.absorb(run(dir.path(), 3, 0..4, 0)).unwrap_err();
    assert!(matches!(err, Error::LevelCapacityExceeded { level: 0 }));
    assert!(err.is_invariant_violation());
    assert_eq!(level.num_runs(), 3);
}

#[test]
fn merge_candidates_are_the_oldest_runs() {
    let dir = tempdir().unwrap();
    let mut level = DiskLevel::new(0, 16, 4, 2);
    for id in [10, 11, 12] {
        level.absorb(run(dir.path(), id, 0..4, 0)).unwrap();
    }

    let ids: Vec<RunId> = level
        .select_merge_candidates()
        .iter()
        .map(|r| r.id())
        .collect();
    assert_eq!(ids, vec![RunId(10), RunId(11)]);
}

#[test]
fn merge_candidates_capped_by_run_count() {
    let dir = tempdir().unwrap();
    let mut level = DiskLevel::new(0, 16, 4, 3);
    level.absorb(run(dir.path(), 1, 0..4, 0)).unwrap();
    assert_eq!(level.select_merge_candidates().len(), 1);
}

#[test]
fn release_removes_runs_and_files() {
    let dir = tempdir().unwrap();
    let mut level = DiskLevel::new(0, 16, 3, 2);
    for id in 0..3 {
        level.absorb(run(dir.path(), id, 0..4, id as u32)).unwrap();
    }
    let released = run_file_path(dir.path(), 0, RunId(0));
    assert!(released.exists());

    level.release(&[RunId(0), RunId(1)]).unwrap();
    assert_eq!(level.num_runs(), 1);
    assert_eq!(level.runs()[0].id(), RunId(2));
    assert!(!released.exists());
    assert!(!level.is_full());
}

#[test]
fn release_of_unknown_run_changes_nothing() {
    let dir = tempdir().unwrap();
    let mut level = DiskLevel::new(2, 16, 3, 2);
    level.absorb(run(dir.path(), 0, 0..4, 0)).unwrap();
    level.absorb(run(dir.path(), 1, 0..4, 0)).unwrap();

    let err = level.release(&[RunId(0), RunId(7)]).unwrap_err();
    assert!(matches!(
        err,
        Error::UnknownRun {
            level: 2,
            run: RunId(7)
        }
    ));
    assert_eq!(level.num_runs(), 2);
}

#[test]
fn double_release_is_rejected() {
    let dir = tempdir().unwrap();
    let mut level = DiskLevel::new(0, 16, 3, 2);
    level.absorb(run(dir.path(), 0, 0..4, 0)).unwrap();

    level.release(&[RunId(0)]).unwrap();
    assert!(matches!(
        level.release(&[RunId(0)]),
        Err(Error::UnknownRun { .. })
    ));
}

#[test]
fn repeated_id_in_one_release_is_rejected() {
    let dir = tempdir().unwrap();
    let mut level = DiskLevel::new(0, 16, 3, 2);
    level.absorb(run(dir.path(), 0, 0..4, 0)).unwrap();

    assert!(matches!(
        level.release(&[RunId(0), RunId(0)]),
        Err(Error::UnknownRun { .. })
    ));
    assert_eq!(level.num_runs(), 1);
}

#[test]
fn lookup_prefers_newest_run() {
    let dir = tempdir().unwrap();
    let mut level = DiskLevel::new(0, 16, 3, 2);
    level.absorb(run(dir.path(), 0, 0..8, 1)).unwrap();
    level.absorb(run(dir.path(), 1, 4..12, 2)).unwrap();

    assert_eq!(level.lookup(&2).unwrap(), Some(1));
    assert_eq!(level.lookup(&6).unwrap(), Some(2));
    assert_eq!(level.lookup(&11).unwrap(), Some(2));
    assert_eq!(level.lookup(&12).unwrap(), None);
}
