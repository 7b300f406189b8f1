use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use zkit::{ScoreRange, ZSkipList};

fn make_sample_scores(
    n: usize,
    seed: u64,
) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-1.0e6..1.0e6)).collect()
}

fn build(scores: &[f64]) -> ZSkipList {
    let mut zsl = ZSkipList::with_seed(42);
    for (i, &s) in scores.iter().enumerate() {
        zsl.insert(s, format!("m{i}")).unwrap();
    }
    zsl
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("zskiplist_insert");
    for &n in &[1_000usize, 10_000, 50_000] {
        let scores = make_sample_scores(n, 7);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &scores, |b, scores| {
            b.iter(|| black_box(build(scores).len()));
        });
    }
    group.finish();
}

fn bench_rank(c: &mut Criterion) {
    let n = 50_000;
    let scores = make_sample_scores(n, 11);
    let zsl = build(&scores);

    let mut group = c.benchmark_group("zskiplist_rank");
    group.throughput(Throughput::Elements(1_000));

    group.bench_function("rank_of", |b| {
        b.iter(|| {
            for (i, &s) in scores.iter().take(1_000).enumerate() {
                black_box(zsl.rank_of(s, &format!("m{i}")));
            }
        });
    });

    group.bench_function("element_by_rank", |b| {
        b.iter(|| {
            for r in (1..=n).step_by(n / 1_000) {
                black_box(zsl.element_by_rank(r).map(|node| node.score()));
            }
        });
    });

    group.finish();
}

fn bench_range(c: &mut Criterion) {
    let scores = make_sample_scores(50_000, 13);
    let zsl = build(&scores);
    let mut group = c.benchmark_group("zskiplist_range");

    for &width in &[10.0f64, 1_000.0, 100_000.0] {
        let range = ScoreRange::inclusive(-width / 2.0, width / 2.0);
        group.bench_with_input(BenchmarkId::new("range_by_score", width), &range, |b, r| {
            b.iter(|| black_box(zsl.range_by_score(r).count()));
        });
        group.bench_with_input(BenchmarkId::new("first_in_range", width), &range, |b, r| {
            b.iter(|| black_box(zsl.first_in_range(r).is_some()));
        });
    }

    group.finish();
}

fn bench_delete(c: &mut Criterion) {
    let scores = make_sample_scores(10_000, 17);

    c.bench_function("zskiplist_delete 10_000", |b| {
        b.iter_batched(
            || build(&scores),
            |mut zsl| {
                for (i, &s) in scores.iter().enumerate() {
                    black_box(zsl.delete(s, &format!("m{i}")));
                }
                zsl
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_insert, bench_rank, bench_range, bench_delete);
criterion_main!(benches);
