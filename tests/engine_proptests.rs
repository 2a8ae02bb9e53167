// Property tests: the engine behaves like an ordered map under any write order.

use std::collections::BTreeMap;

use lsm_tiered::{Lsm, Options};
use proptest::prelude::*;
use tempfile::tempdir;

fn options(dir: &std::path::Path, runs_per_level: usize, fraction: f64) -> Options {
    Options::new(dir)
        .buffer_capacity(8)
        .num_mem_runs(4)
        .merged_fraction(fraction)
        .page_size(64)
        .disk_runs_per_level(runs_per_level)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Every key returns its most recent value, however many flushes and
    /// cascades happened since it was written.
    #[test]
    fn last_write_wins(
        writes in prop::collection::vec((0u16..64, any::<u32>()), 0..400),
        runs_per_level in 2usize..5,
        fraction in prop_oneof![Just(0.5), Just(1.0)],
    ) {
        let dir = tempdir().unwrap();
        let opts = options(dir.path(), runs_per_level, fraction);
        let mut db: Lsm<u16, u32> = Lsm::open(opts).unwrap();
        let mut model = BTreeMap::new();

        for (key, value) in writes {
            db.insert(key, value).unwrap();
            model.insert(key, value);
        }

        for key in 0u16..64 {
            prop_assert_eq!(db.lookup(key).unwrap(), model.get(&key).copied(), "key {}", key);
        }
        for key in 64u16..96 {
            prop_assert_eq!(db.lookup(key).unwrap(), None);
        }
    }

    /// Merges never lose a key: everything ever written is still found.
    #[test]
    fn no_false_negatives(keys in prop::collection::hash_set(any::<i32>(), 1..300)) {
        let dir = tempdir().unwrap();
        let mut db: Lsm<i32, i32> = Lsm::open(options(dir.path(), 2, 0.5)).unwrap();

        for &key in &keys {
            db.insert(key, key.wrapping_mul(3)).unwrap();
        }
        for &key in &keys {
            prop_assert_eq!(db.lookup(key).unwrap(), Some(key.wrapping_mul(3)));
        }
    }

    /// Disk levels keep their shape invariants after any write sequence.
    #[test]
    fn levels_stay_within_bounds(
        keys in prop::collection::vec(0u32..1000, 0..500),
    ) {
        let dir = tempdir().unwrap();
        let mut db: Lsm<u32, u32> = Lsm::open(options(dir.path(), 3, 0.5)).unwrap();
        for key in keys {
            db.insert(key, key).unwrap();
        }

        prop_assert!(db.element_count() <= 8);
        for level in db.disk_levels() {
            prop_assert!(level.num_runs() <= level.max_runs());
            for run in level.runs() {
                prop_assert!(run.len() <= run.capacity());
                let pairs = run.read_all().unwrap();
                prop_assert!(pairs.windows(2).all(|w| w[0].key < w[1].key));
            }
        }
    }
}
