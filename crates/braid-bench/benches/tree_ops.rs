//! Criterion micro-benchmarks for tree insertion and path traversal.

use std::hint::black_box;

use braid_bench::{bushy_tree, counter_profile, linear_tree};
use braid_core::Rounding;
use braid_simpacks::Counter;
use braid_tree::Tree;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

fn bench_add_stepped_state(c: &mut Criterion) {
    let profile = counter_profile();
    c.bench_function("add_stepped_state_10k", |b| {
        b.iter_batched(
            Tree::<Counter>::new,
            |mut tree| {
                let mut leaf = tree.add_state(Counter::new(0), None).unwrap();
                for i in 1..10_000 {
                    leaf = tree
                        .add_stepped_state(Counter::new(i), leaf, profile.clone())
                        .unwrap();
                }
                black_box(tree)
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_fork_mid_block(c: &mut Criterion) {
    c.bench_function("fork_mid_block_10k", |b| {
        b.iter_batched(
            || linear_tree(10_000).unwrap(),
            |(mut tree, leaf)| {
                let middle = tree.ancestor(leaf, 5_000).unwrap().unwrap();
                black_box(tree.add_state(Counter::new(-1), Some(middle)).unwrap());
                black_box(tree)
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_path_to(c: &mut Criterion) {
    let (tree, leaf) = bushy_tree(10_000, 100, 5).unwrap();
    c.bench_function("path_to_bushy_10k", |b| {
        b.iter(|| black_box(tree.path_to(black_box(leaf)).unwrap().len()));
    });
}

fn bench_path_lookup(c: &mut Criterion) {
    let (tree, leaf) = bushy_tree(10_000, 100, 5).unwrap();
    let mut path = tree.make_containing_path(leaf).unwrap();
    c.bench_function("path_node_by_clock_bushy_10k", |b| {
        let mut clock = 0.0;
        b.iter(|| {
            clock = (clock + 37.0) % 10_000.0;
            black_box(
                path.node_by_clock(&tree, black_box(clock), Rounding::Closest)
                    .unwrap(),
            )
        });
    });
}

fn bench_leaves_within(c: &mut Criterion) {
    let (tree, _) = bushy_tree(10_000, 100, 5).unwrap();
    let root = tree.roots()[0];
    c.bench_function("leaves_within_bushy_10k", |b| {
        b.iter(|| black_box(tree.leaves_within(root, 5_000.0).unwrap().len()));
    });
}

criterion_group!(
    benches,
    bench_add_stepped_state,
    bench_fork_mid_block,
    bench_path_to,
    bench_path_lookup,
    bench_leaves_within
);
criterion_main!(benches);
