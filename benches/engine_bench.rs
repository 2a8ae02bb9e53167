use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use lsm_tiered::{Lsm, Options};
use tempfile::tempdir;

const N: u64 = 10_000;

fn options(dir: &std::path::Path) -> Options {
    Options::new(dir)
        .buffer_capacity(1024)
        .num_mem_runs(8)
        .merged_fraction(0.5)
        .page_size(4096)
        .disk_runs_per_level(4)
}

fn insert_sequential(c: &mut Criterion) {
    c.bench_function("insert_sequential_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let db: Lsm<u64, u64> = Lsm::open(options(dir.path())).unwrap();
                (dir, db)
            },
            |(_dir, mut db)| {
                for k in 0..N {
                    db.insert(k, k).unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn insert_scrambled(c: &mut Criterion) {
    c.bench_function("insert_scrambled_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let db: Lsm<u64, u64> = Lsm::open(options(dir.path())).unwrap();
                (dir, db)
            },
            |(_dir, mut db)| {
                for i in 0..N {
                    let k = i.wrapping_mul(0x9E37_79B9_7F4A_7C15);
                    db.insert(k, i).unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn lookup_hits_and_misses(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let mut db: Lsm<u64, u64> = Lsm::open(options(dir.path())).unwrap();
    for k in 0..N {
        db.insert(k * 2, k).unwrap();
    }

    c.bench_function("lookup_hit", |b| {
        let mut k = 0;
        b.iter(|| {
            k = (k + 2) % (N * 2);
            black_box(db.lookup(k).unwrap())
        });
    });

    c.bench_function("lookup_miss", |b| {
        let mut k = 1;
        b.iter(|| {
            k = (k + 2) % (N * 2);
            black_box(db.lookup(k).unwrap())
        });
    });
}

criterion_group!(
    benches,
    insert_sequential,
    insert_scrambled,
    lookup_hits_and_misses
);
criterion_main!(benches);
