use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ravl_tree::{RavlMap, RavlSet};
use std::collections::{BTreeMap, BTreeSet};

const N: usize = 10_000;

// ─── Helper functions to generate key sequences ─────────────────────────────

fn ordered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).collect()
}

fn reverse_ordered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).rev().collect()
}

fn random_keys(n: usize) -> Vec<i64> {
    // Use a simple LCG for deterministic pseudo-random sequence
    let mut keys = Vec::with_capacity(n);
    let mut x: u64 = 12345;
    for _ in 0..n {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        keys.push((x >> 33) as i64);
    }
    keys
}

// ─── Map Benchmarks ─────────────────────────────────────────────────────────

fn bench_map_insert(c: &mut Criterion) {
    for (name, keys) in [
        ("map_insert_ordered", ordered_keys(N)),
        ("map_insert_reverse", reverse_ordered_keys(N)),
        ("map_insert_random", random_keys(N)),
    ] {
        let mut group = c.benchmark_group(name);

        group.bench_function(BenchmarkId::new("RavlMap", N), |b| {
            b.iter(|| {
                let mut map = RavlMap::new();
                for &k in &keys {
                    map.insert(k, k);
                }
                map
            });
        });

        group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
            b.iter(|| {
                let mut map = BTreeMap::new();
                for &k in &keys {
                    map.insert(k, k);
                }
                map
            });
        });

        group.finish();
    }
}

fn bench_map_get(c: &mut Criterion) {
    let keys = random_keys(N);
    let ravl: RavlMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();
    let btree: BTreeMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();

    let mut group = c.benchmark_group("map_get_random");

    group.bench_function(BenchmarkId::new("RavlMap", N), |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for k in &keys {
                if ravl.get(k).is_some() {
                    hits += 1;
                }
            }
            hits
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for k in &keys {
                if btree.get(k).is_some() {
                    hits += 1;
                }
            }
            hits
        });
    });

    group.finish();
}

fn bench_map_remove(c: &mut Criterion) {
    let keys = random_keys(N);

    let mut group = c.benchmark_group("map_remove_random");

    group.bench_function(BenchmarkId::new("RavlMap", N), |b| {
        b.iter_batched(
            || keys.iter().map(|&k| (k, k)).collect::<RavlMap<i64, i64>>(),
            |mut map| {
                for k in &keys {
                    map.remove(k);
                }
                map
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter_batched(
            || keys.iter().map(|&k| (k, k)).collect::<BTreeMap<i64, i64>>(),
            |mut map| {
                for k in &keys {
                    map.remove(k);
                }
                map
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

// ─── Order-statistic Benchmarks ─────────────────────────────────────────────

fn bench_rank_queries(c: &mut Criterion) {
    let keys = random_keys(N);
    let ravl: RavlMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();
    let btree: BTreeMap<i64, i64> = keys.iter().map(|&k| (k, k)).collect();
    let len = ravl.len();

    let mut group = c.benchmark_group("get_by_rank");

    // RavlMap answers rank queries in O(log n); the BTreeMap baseline has to
    // walk the iterator.
    group.bench_function(BenchmarkId::new("RavlMap", N), |b| {
        b.iter(|| {
            let mut acc = 0i64;
            for rank in (0..len).step_by(97) {
                let (&k, _) = ravl.get_by_rank(rank).unwrap();
                acc = acc.wrapping_add(k);
            }
            acc
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap-iter-nth", N), |b| {
        b.iter(|| {
            let mut acc = 0i64;
            for rank in (0..len).step_by(97) {
                let (&k, _) = btree.iter().nth(rank).unwrap();
                acc = acc.wrapping_add(k);
            }
            acc
        });
    });

    group.finish();

    let mut group = c.benchmark_group("rank_of");

    group.bench_function(BenchmarkId::new("RavlMap", N), |b| {
        b.iter(|| {
            let mut acc = 0usize;
            for k in keys.iter().step_by(97) {
                if let Some(rank) = ravl.rank_of(k) {
                    acc = acc.wrapping_add(rank);
                }
            }
            acc
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap-range-count", N), |b| {
        b.iter(|| {
            let mut acc = 0usize;
            for k in keys.iter().step_by(97) {
                if btree.contains_key(k) {
                    acc = acc.wrapping_add(btree.range(..*k).count());
                }
            }
            acc
        });
    });

    group.finish();
}

// ─── Set Benchmarks ─────────────────────────────────────────────────────────

fn bench_set_insert_contains(c: &mut Criterion) {
    let keys = random_keys(N);

    let mut group = c.benchmark_group("set_insert_random");

    group.bench_function(BenchmarkId::new("RavlSet", N), |b| {
        b.iter(|| {
            let mut set = RavlSet::new();
            for &k in &keys {
                set.insert(k);
            }
            set
        });
    });

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter(|| {
            let mut set = BTreeSet::new();
            for &k in &keys {
                set.insert(k);
            }
            set
        });
    });

    group.finish();

    let ravl: RavlSet<i64> = keys.iter().copied().collect();
    let btree: BTreeSet<i64> = keys.iter().copied().collect();

    let mut group = c.benchmark_group("set_contains_random");

    group.bench_function(BenchmarkId::new("RavlSet", N), |b| {
        b.iter(|| keys.iter().filter(|k| ravl.contains(k)).count());
    });

    group.bench_function(BenchmarkId::new("BTreeSet", N), |b| {
        b.iter(|| keys.iter().filter(|k| btree.contains(k)).count());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_map_insert,
    bench_map_get,
    bench_map_remove,
    bench_rank_queries,
    bench_set_insert_contains
);
criterion_main!(benches);
