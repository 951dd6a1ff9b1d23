//! Benchmarks for the immutable collections.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use immutable_collections::codegen::render;
use immutable_collections::sync::parallel_update;
use immutable_collections::{List, Map, Mergeable, Set};

fn bench_set_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_add");
    for size in [100u64, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let set = (0..size).fold(Set::new(), |s, i| s.add(black_box(i)));
                black_box(set);
            });
        });
    }
    group.finish();
}

fn bench_map_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_lookup");
    for size in [1_000u64, 100_000] {
        let map: Map<u64, u64> = (0..size).map(|i| (i, i * 2)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &map, |b, map| {
            b.iter(|| {
                for i in (0..size).step_by(97) {
                    black_box(map.get(&black_box(i)));
                }
            });
        });
    }
    group.finish();
}

fn bench_set_merge(c: &mut Criterion) {
    let base: Set<u64> = (0..10_000).collect();
    let left = (10_000..10_100).fold(base.clone(), |s, i| s.add(i));
    let right = (0..100).fold(base.clone(), |s, i| s.remove(&i));

    c.bench_function("set_merge_10k", |b| {
        b.iter(|| {
            black_box(base.merge2(black_box(&left), black_box(&right)).unwrap());
        });
    });
}

fn bench_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("list");
    for size in [1_000usize, 100_000] {
        group.bench_with_input(BenchmarkId::new("append", size), &size, |b, &size| {
            b.iter(|| {
                let list = (0..size).fold(List::new(), |l, i| l.append(black_box(i)));
                black_box(list);
            });
        });
        let list: List<usize> = (0..size).collect();
        group.bench_with_input(BenchmarkId::new("set", size), &list, |b, list| {
            b.iter(|| {
                black_box(list.set(black_box(size / 2), 0).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_parallel_update(c: &mut Criterion) {
    let items: Vec<u64> = (0..20_000).collect();
    c.bench_function("parallel_update_20k", |b| {
        b.iter(|| {
            black_box(parallel_update(&Set::new(), &items, |s, i| s.add(*i)).unwrap());
        });
    });
}

fn bench_render(c: &mut Criterion) {
    c.bench_function("render_all_structs", |b| {
        b.iter(|| {
            let max = black_box(render::MAX_STRUCT_ARITY);
            black_box(render::render_all(max, render::EXTERN_TRAIT_PATH));
        });
    });
}

criterion_group!(
    benches,
    bench_set_add,
    bench_map_lookup,
    bench_set_merge,
    bench_list,
    bench_parallel_update,
    bench_render
);
criterion_main!(benches);
