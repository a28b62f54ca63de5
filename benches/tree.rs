// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use buffered_tree::{MessageType, Options, Tree};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::Rng;

fn sequential_inserts(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential inserts");

    for item_count in [1_000, 10_000, 100_000] {
        group.bench_function(format!("{item_count} sequential puts"), |b| {
            b.iter(|| {
                let tree = Tree::open_in_memory(Options::default()).expect("open");
                for i in 0..item_count {
                    let key = (i as u64).to_be_bytes();
                    tree.put(key.as_slice(), b"v".as_slice(), MessageType::Insert, None)
                        .expect("put");
                }
            });
        });
    }
}

fn random_inserts(c: &mut Criterion) {
    let mut group = c.benchmark_group("random inserts");

    for item_count in [1_000, 10_000, 100_000] {
        group.bench_function(format!("{item_count} random puts"), |b| {
            b.iter(|| {
                let tree = Tree::open_in_memory(Options::default()).expect("open");
                let mut rng = rand::rng();
                for _ in 0..item_count {
                    let key: u64 = rng.random();
                    tree.put(
                        key.to_be_bytes().as_slice(),
                        b"v".as_slice(),
                        MessageType::Insert,
                        None,
                    )
                    .expect("put");
                }
            });
        });
    }
}

fn small_page_thresholds(c: &mut Criterion) {
    let mut group = c.benchmark_group("inserts with frequent splits/flushes");

    let opts = Options::new()
        .leaf_node_page_count(64)
        .inner_node_page_count(64)
        .inner_node_fanout(8);

    for item_count in [1_000, 10_000] {
        group.bench_function(format!("{item_count} puts, tight thresholds"), |b| {
            b.iter(|| {
                let tree = Tree::open_in_memory(opts.clone()).expect("open");
                for i in 0..item_count {
                    let key = format!("{i:08}");
                    tree.put(key, "v", MessageType::Insert, None).expect("put");
                }
            });
        });
    }
}

criterion_group!(
    benches,
    sequential_inserts,
    random_inserts,
    small_page_thresholds
);
criterion_main!(benches);
