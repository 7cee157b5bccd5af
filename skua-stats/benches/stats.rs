//! Benchmarks for the expensive exact-distribution paths.
//!
//! Covers the rank-sum null distribution, the conditional odds-ratio
//! interval, full permutation enumeration, the Kolmogorov-Smirnov matrix
//! power, Imhof inversion for Durbin-Watson, and the Sison-Glaz volume
//! search.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use skua_stats::{
    ConfidenceInterval, DurbinWatsonTest, DwPValueMethod, ExactMannWhitneyUTest,
    ExactOneSampleKSTest, FisherExactTest, HypothesisTest, PermutationTest, PowerDivergenceTest,
    Tail,
};
use statrs::distribution::Uniform;

// =========================================================================
// Sample generation: deterministic LCG, tie-free at 53-bit resolution
// =========================================================================

fn lcg_uniforms(len: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        out.push((state >> 11) as f64 / 9007199254740992.0);
    }
    out
}

// =========================================================================
// Rank-sum null distribution
// =========================================================================

fn bench_mann_whitney_exact(c: &mut Criterion) {
    let mut group = c.benchmark_group("mann_whitney_exact");

    for &n in &[10usize, 20, 30] {
        let x = lcg_uniforms(n, 42);
        let y: Vec<f64> = lcg_uniforms(n, 137).iter().map(|v| v + 0.1).collect();

        group.throughput(Throughput::Elements(2 * n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let test = ExactMannWhitneyUTest::new(black_box(&x), black_box(&y)).unwrap();
                test.default_pvalue().unwrap()
            })
        });
    }

    group.finish();
}

// =========================================================================
// Conditional odds-ratio interval
// =========================================================================

fn bench_fisher_confint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fisher_confint");

    for &(a, b_, cc, d) in &[(12u64, 5u64, 7u64, 15u64), (120, 50, 70, 150)] {
        let total = a + b_ + cc + d;
        let test = FisherExactTest::new(a, b_, cc, d).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(total), &total, |bch, _| {
            bch.iter(|| black_box(&test).confint(0.05, Tail::Both).unwrap())
        });
    }

    group.finish();
}

// =========================================================================
// Full permutation enumeration
// =========================================================================

fn bench_permutation_exact(c: &mut Criterion) {
    let mut group = c.benchmark_group("permutation_exact");

    for &n in &[6usize, 8, 10] {
        let x = lcg_uniforms(n, 7);
        let y: Vec<f64> = lcg_uniforms(n, 91).iter().map(|v| v + 0.2).collect();

        group.bench_with_input(BenchmarkId::from_parameter(2 * n), &n, |b, _| {
            b.iter(|| {
                let mean = |s: &[f64]| s.iter().sum::<f64>() / s.len() as f64;
                PermutationTest::exact(black_box(&x), black_box(&y), |xs, ys| {
                    mean(xs) - mean(ys)
                })
                .unwrap()
                .default_pvalue()
                .unwrap()
            })
        });
    }

    group.finish();
}

// =========================================================================
// Kolmogorov-Smirnov matrix power
// =========================================================================

fn bench_ks_exact(c: &mut Criterion) {
    let mut group = c.benchmark_group("ks_exact");
    let reference = Uniform::new(0.0, 1.0).unwrap();

    for &n in &[50usize, 100, 200] {
        let x = lcg_uniforms(n, 4242);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let test = ExactOneSampleKSTest::new(black_box(&x), &reference).unwrap();
                test.default_pvalue().unwrap()
            })
        });
    }

    group.finish();
}

// =========================================================================
// Imhof inversion for the exact Durbin-Watson p-value
// =========================================================================

fn bench_durbin_watson_exact(c: &mut Criterion) {
    let mut group = c.benchmark_group("durbin_watson_exact");

    for &n in &[25usize, 50, 75] {
        let mut xmat = Vec::with_capacity(n * 2);
        for t in 0..n {
            xmat.push(1.0);
            xmat.push(t as f64);
        }
        let e: Vec<f64> = lcg_uniforms(n, 99).iter().map(|v| v - 0.5).collect();

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let test = DurbinWatsonTest::new(
                    black_box(&xmat),
                    n,
                    2,
                    black_box(&e),
                    DwPValueMethod::Exact,
                )
                .unwrap();
                test.default_pvalue().unwrap()
            })
        });
    }

    group.finish();
}

// =========================================================================
// Sison-Glaz volume search
// =========================================================================

fn bench_multinomial_confint(c: &mut Criterion) {
    let mut group = c.benchmark_group("sison_glaz_confint");

    let surveys: [&[u64]; 2] = [
        &[56, 72, 73, 59, 62, 87, 58],
        &[
            101, 94, 108, 99, 103, 97, 95, 110, 104, 89, 100, 98, 107, 92, 105, 96, 102, 93,
            106, 101,
        ],
    ];
    for counts in surveys {
        let test = PowerDivergenceTest::goodness_of_fit(counts, None, 1.0).unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(counts.len()),
            &counts.len(),
            |b, _| b.iter(|| test.confint(black_box(0.05), Tail::Both).unwrap()),
        );
    }

    group.finish();
}

// =========================================================================
// Criterion harness
// =========================================================================

criterion_group!(
    benches,
    bench_mann_whitney_exact,
    bench_fisher_confint,
    bench_permutation_exact,
    bench_ks_exact,
    bench_durbin_watson_exact,
    bench_multinomial_confint,
);
criterion_main!(benches);
