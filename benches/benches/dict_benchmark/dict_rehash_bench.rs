use std::{collections::HashMap, hint::black_box, time::Duration};

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use zkit::{Dict, HashDictType, MurmurDictType, ResizePolicy};

type IntDict = Dict<HashDictType<u64, u64>>;

const SIZES: &[usize] = &[256, 1_024, 8_192, 65_536];
const REHASH_BASE: usize = 16_384;

fn filled(n: usize) -> IntDict {
    let mut d = IntDict::default();
    for i in 0..n as u64 {
        d.add(i, i).unwrap();
    }
    while d.rehash(100) {}
    d
}

fn bench_insert_with_rehash(c: &mut Criterion) {
    let mut group = c.benchmark_group("rehash/insert_no_prealloc");

    for &n in SIZES {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("dict", n), &n, |b, &n| {
            b.iter(|| {
                let mut d = IntDict::default();
                for i in 0..n as u64 {
                    d.add(black_box(i), black_box(i)).unwrap();
                }
                black_box(d.len())
            });
        });
        group.bench_with_input(BenchmarkId::new("hashmap_ahash", n), &n, |b, &n| {
            b.iter(|| {
                let mut d: HashMap<u64, u64, ahash::RandomState> = HashMap::default();
                for i in 0..n as u64 {
                    d.insert(black_box(i), black_box(i));
                }
                black_box(d.len())
            });
        });
    }

    group.finish();
}

fn bench_insert_presized(c: &mut Criterion) {
    let mut group = c.benchmark_group("rehash/insert_presized");

    for &n in SIZES {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut d = IntDict::default();
                d.expand(n).unwrap();
                for i in 0..n as u64 {
                    d.add(black_box(i), black_box(i)).unwrap();
                }
                black_box(d.len())
            });
        });
    }

    group.finish();
}

fn bench_lookup_during_rehash(c: &mut Criterion) {
    let mut group = c.benchmark_group("rehash/lookup_during_rehash");
    group.throughput(Throughput::Elements(REHASH_BASE as u64));

    group.bench_function("find_drives_rehash", |b| {
        b.iter_batched(
            || {
                let mut d = filled(REHASH_BASE);
                d.expand(REHASH_BASE * 4).unwrap();
                d
            },
            |mut d| {
                for i in 0..REHASH_BASE as u64 {
                    black_box(d.find(&i).is_some());
                }
                black_box(d.is_rehashing())
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("get_stable", |b| {
        let d = filled(REHASH_BASE);
        b.iter(|| {
            for i in 0..REHASH_BASE as u64 {
                black_box(d.get(&i));
            }
        });
    });

    group.finish();
}

fn bench_rehash_for(c: &mut Criterion) {
    let mut group = c.benchmark_group("rehash/rehash_for");

    for &budget_us in &[100u64, 1_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{budget_us}us")),
            &budget_us,
            |b, &budget_us| {
                b.iter_batched(
                    || {
                        let mut d = filled(REHASH_BASE);
                        d.expand(REHASH_BASE * 4).unwrap();
                        d
                    },
                    |mut d| black_box(d.rehash_for(Duration::from_micros(budget_us))),
                    BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_string_keys_avoid_policy(c: &mut Criterion) {
    let keys: Vec<String> = (0..8_192).map(|i| format!("user:{i:06}")).collect();
    let mut group = c.benchmark_group("rehash/string_keys");
    group.throughput(Throughput::Elements(keys.len() as u64));

    for policy in [ResizePolicy::Enable, ResizePolicy::Avoid] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{policy:?}")),
            &policy,
            |b, &policy| {
                b.iter(|| {
                    let mut d: Dict<MurmurDictType<String, usize>> = Dict::default();
                    d.set_resize_policy(policy);
                    for (i, k) in keys.iter().enumerate() {
                        d.add(k.clone(), i).unwrap();
                    }
                    black_box(d.table_sizes())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_with_rehash,
    bench_insert_presized,
    bench_lookup_during_rehash,
    bench_rehash_for,
    bench_string_keys_avoid_policy,
);
criterion_main!(benches);
