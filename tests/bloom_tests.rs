// Bloom filter tests: the membership filter paired with every run.

use lsm_tiered::bloom::BloomFilter;
use lsm_tiered::bloom::builder::BloomFilterBuilder;

#[test]
fn test_empty_filter_returns_false() {
    let bf = BloomFilter::new(100, 0.01);

    // Empty filter should never return true
    assert!(!bf.may_contain(b"any_key"));
    assert!(!bf.may_contain(b""));
    assert!(!bf.may_contain_key(&42u64));
}

#[test]
fn test_inserted_key_found() {
    let mut bf = BloomFilter::new(100, 0.01);
    bf.insert(b"hello");
    assert!(bf.may_contain(b"hello"));
}

#[test]
fn test_duplicate_insert_no_error() {
    let mut bf = BloomFilter::new(100, 0.01);
    bf.insert_key(&7i32);
    bf.insert_key(&7i32);
    bf.insert_key(&7i32);

    assert!(bf.may_contain_key(&7i32));
    assert_eq!(bf.num_keys(), 3);
}

#[test]
fn test_typed_keys_never_false_negative() {
    let mut bf = BloomFilter::new(1000, 0.01);
    for k in (0..1000i64).map(|i| i * 7919 - 3_000_000) {
        bf.insert_key(&k);
    }
    for k in (0..1000i64).map(|i| i * 7919 - 3_000_000) {
        assert!(bf.may_contain_key(&k), "false negative for {k}");
    }
}

#[test]
fn test_typed_key_matches_byte_image() {
    let mut bf = BloomFilter::new(10, 0.01);
    bf.insert_key(&0x0102_0304u32);

    // Little-endian image of the same scalar.
    assert!(bf.may_contain(&[0x04, 0x03, 0x02, 0x01]));
}

#[test]
fn test_false_positive_rate() {
    let n = 10000;
    let target_fpr = 0.01; // 1% target
    let mut bf = BloomFilter::new(n, target_fpr);

    for i in 0..n as u64 {
        bf.insert_key(&i);
    }

    let mut false_positives = 0;
    for i in n as u64..(2 * n) as u64 {
        if bf.may_contain_key(&i) {
            false_positives += 1;
        }
    }

    let actual_fpr = false_positives as f64 / n as f64;
    println!("Target FPR: {}, Actual FPR: {}", target_fpr, actual_fpr);

    // Should be within 2x of target (so under 2%)
    assert!(
        actual_fpr < target_fpr * 2.0,
        "FPR too high: {} vs target {}",
        actual_fpr,
        target_fpr
    );
}

#[test]
fn test_various_fpr_values() {
    let test_cases = vec![(0.10, "10%"), (0.05, "5%"), (0.01, "1%"), (0.001, "0.1%")];

    for (fpr, desc) in test_cases {
        let n = 5000;
        let mut bf = BloomFilter::new(n, fpr);

        for i in 0..n {
            let key = format!("test_{}_{}", desc, i);
            bf.insert(key.as_bytes());
        }

        let mut false_positives = 0;
        for i in n..(n * 2) {
            let key = format!("test_{}_{}", desc, i);
            if bf.may_contain(key.as_bytes()) {
                false_positives += 1;
            }
        }

        let actual_fpr = false_positives as f64 / n as f64;
        println!("FPR {}: target={}, actual={}", desc, fpr, actual_fpr);

        assert!(
            actual_fpr < fpr * 3.0,
            "FPR {} too high: {} vs target {}",
            desc,
            actual_fpr,
            fpr
        );
    }
}

#[test]
fn test_lower_fpr_means_more_bits() {
    let loose = BloomFilter::new(1000, 0.1);
    let tight = BloomFilter::new(1000, 0.001);
    assert!(tight.num_bits() > loose.num_bits());
    assert!(tight.num_hashes() > loose.num_hashes());
}

#[test]
#[should_panic(expected = "FPR must be in (0, 1)")]
fn test_invalid_fpr_panics() {
    let _ = BloomFilter::new(10, 1.0);
}

#[test]
fn test_builder_counts_and_builds() {
    let mut builder = BloomFilterBuilder::new(50, 0.01);
    assert!(builder.is_empty());

    for k in 0..50u16 {
        builder.add_key(&k);
    }
    assert_eq!(builder.len(), 50);

    let bf = builder.build();
    assert!((0..50u16).all(|k| bf.may_contain_key(&k)));
}
