//! Benchmarks for nearest-point queries and full overlap analysis.
//!
//! Run with: `cargo bench --bench overlap`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use track_compare::proximity::min_distance_linear;
use track_compare::{analyze_overlap, OverlapThreshold, ProximityIndex, Track, TrackPoint};

/// Winding track of `count` points, roughly 50m apart.
fn winding_track(count: usize, phase: f64) -> Vec<TrackPoint> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            TrackPoint::new(
                47.37 + t * 0.00045,
                8.54 + (t * 0.05 + phase).sin() * 0.004,
            )
        })
        .collect()
}

fn bench_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_distance");

    for size in [200, 1_000, 5_000] {
        let reference = winding_track(size, 0.0);
        let queries = winding_track(size, 0.3);
        let index = ProximityIndex::build(&reference).unwrap();

        group.bench_with_input(BenchmarkId::new("rtree", size), &queries, |b, qs| {
            b.iter(|| {
                qs.iter()
                    .map(|q| index.nearest_distance(black_box(q)))
                    .sum::<f64>()
            });
        });

        if size <= 1_000 {
            group.bench_with_input(BenchmarkId::new("linear", size), &queries, |b, qs| {
                b.iter(|| {
                    qs.iter()
                        .map(|q| min_distance_linear(black_box(q), &reference))
                        .sum::<f64>()
                });
            });
        }
    }

    group.finish();
}

fn bench_analyze_overlap(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_overlap");
    let threshold = OverlapThreshold::default();

    for size in [200, 2_000] {
        let a = Track::new("a", winding_track(size, 0.0));
        let b = Track::new("b", winding_track(size, 0.2));
        group.bench_with_input(BenchmarkId::from_parameter(size), &(a, b), |bench, (a, b)| {
            bench.iter(|| analyze_overlap(black_box(a), black_box(b), threshold).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_nearest, bench_analyze_overlap);
criterion_main!(benches);
