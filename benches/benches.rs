use std::collections::BTreeMap as StdBTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use linked_rbmap::RbMap;

const SIZES: [usize; 3] = [100, 1_000, 10_000];

fn random_keys(n: usize) -> Vec<u64> {
    let mut rng = SmallRng::seed_from_u64(0xbe4c);
    (0..n).map(|_| rng.gen()).collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for n in SIZES {
        let keys = random_keys(n);
        group.bench_with_input(BenchmarkId::new("linked-rbmap", n), &keys, |b, keys| {
            b.iter(|| {
                let mut map = RbMap::new();
                for &key in keys {
                    map.insert(key, key);
                }
                map
            })
        });
        group.bench_with_input(BenchmarkId::new("std", n), &keys, |b, keys| {
            b.iter(|| {
                let mut map = StdBTreeMap::new();
                for &key in keys {
                    map.insert(key, key);
                }
                map
            })
        });
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    for n in SIZES {
        let keys = random_keys(n);
        let map: RbMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();
        let std_map: StdBTreeMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();
        group.bench_with_input(BenchmarkId::new("linked-rbmap", n), &keys, |b, keys| {
            b.iter(|| {
                for key in keys {
                    black_box(map.get(key));
                }
            })
        });
        group.bench_with_input(BenchmarkId::new("std", n), &keys, |b, keys| {
            b.iter(|| {
                for key in keys {
                    black_box(std_map.get(key));
                }
            })
        });
    }
    group.finish();
}

fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");
    for n in SIZES {
        let map: RbMap<u64, u64> = random_keys(n).into_iter().map(|k| (k, k)).collect();
        let std_map: StdBTreeMap<u64, u64> = random_keys(n).into_iter().map(|k| (k, k)).collect();
        group.bench_function(BenchmarkId::new("linked-rbmap", n), |b| {
            b.iter(|| map.iter().map(|(_, v)| v).sum::<u64>())
        });
        group.bench_function(BenchmarkId::new("std", n), |b| {
            b.iter(|| std_map.iter().map(|(_, v)| v).sum::<u64>())
        });
    }
    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove");
    for n in SIZES {
        let keys = random_keys(n);
        group.bench_with_input(BenchmarkId::new("linked-rbmap", n), &keys, |b, keys| {
            b.iter_batched(
                || keys.iter().map(|&k| (k, k)).collect::<RbMap<u64, u64>>(),
                |mut map| {
                    for key in keys {
                        black_box(map.remove(key));
                    }
                },
                criterion::BatchSize::SmallInput,
            )
        });
        group.bench_with_input(BenchmarkId::new("std", n), &keys, |b, keys| {
            b.iter_batched(
                || keys.iter().map(|&k| (k, k)).collect::<StdBTreeMap<u64, u64>>(),
                |mut map| {
                    for key in keys {
                        black_box(map.remove(key));
                    }
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup, bench_iterate, bench_remove);
criterion_main!(benches);
