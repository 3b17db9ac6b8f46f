//! Benchmarks for the batch flux solver.
//!
//! Run with: `cargo bench --bench solver_bench`
//!
//! Measures scaling of the full 20-pass solve over batch size. Samples are
//! independent, so throughput should be close to linear in N.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lakeflux::{solve, Observations, Site, SolverConfig};

/// Generate a synthetic forcing batch with diurnal-looking variation.
fn generate_inputs(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut ts = Vec::with_capacity(n);
    let mut u = Vec::with_capacity(n);
    let mut ta = Vec::with_capacity(n);
    let mut rh = Vec::with_capacity(n);
    for i in 0..n {
        let phase = (i as f64) * 0.1;
        ts.push(18.0 + 4.0 * phase.sin());
        u.push((5.0 + 4.0 * (phase * 0.3).cos()).max(0.0));
        ta.push(16.0 + 7.0 * (phase * 0.7).sin());
        rh.push(60.0 + 35.0 * (phase * 0.2).sin().abs());
    }
    (ts, u, ta, rh)
}

fn bench_solver(c: &mut Criterion) {
    let site = Site::new(2.0, 2.0, 2.0, 100.0, 45.0);
    let config = SolverConfig::default();

    let mut group = c.benchmark_group("flux_solver");
    for n in [100, 1_000, 10_000] {
        let (ts, u, ta, rh) = generate_inputs(n);
        group.bench_with_input(BenchmarkId::new("solve", n), &n, |b, _| {
            b.iter(|| {
                let obs = Observations::new(
                    black_box(&ts),
                    black_box(&u),
                    black_box(&ta),
                    black_box(&rh),
                );
                solve(&obs, &site, &config).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_solver);
criterion_main!(benches);
