//! Scaling benchmark for the multiplicative-update engine.
//!
//! Measures `optimize` over growing point counts at a fixed iteration budget,
//! so the numbers reflect per-iteration cost (four dense products plus the
//! entrywise update) rather than convergence behavior.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use symnmf::factorization::{initial_factor, optimize, FactorizationConfig};
use symnmf::normalized_from_points;

/// Two well-separated blobs with deterministic jitter.
fn two_blob_points(n: usize) -> Array2<f64> {
    let mut points = Array2::zeros((n, 2));
    for i in 0..n {
        let (cx, cy) = if i < n / 2 { (0.0, 0.0) } else { (5.0, 5.0) };
        let jitter = (i as f64 * 0.37).sin() * 0.25;
        points[[i, 0]] = cx + jitter;
        points[[i, 1]] = cy - jitter;
    }
    points
}

fn bench_factorization_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("factorization_scaling");

    for n in [32usize, 64, 128, 256] {
        let points = two_blob_points(n);
        let w = normalized_from_points(&points).unwrap();
        let h0 = initial_factor(&w, 2, 1234).unwrap();
        let cfg = FactorizationConfig {
            max_iter: 50,    // Fixed budget for a fair per-size comparison
            eps: 1e-300,     // Never converge early
        };

        group.bench_with_input(BenchmarkId::new("optimize", n), &n, |b, _| {
            b.iter(|| black_box(optimize(black_box(&h0), &w, &cfg)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_factorization_scaling);
criterion_main!(benches);
