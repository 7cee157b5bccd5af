//! Kolmogorov-Smirnov tests of distributional fit.
//!
//! One-sample tests compare the empirical CDF against a hypothesized
//! continuous distribution; the two-sample test compares two empirical
//! CDFs. The exact one-sample two-sided null is evaluated with the
//! Marsaglia-Tsang-Wang matrix power method and the one-sided nulls with
//! the Birnbaum-Tingey sum; the approximate engines use the limiting
//! Kolmogorov distribution.
//!
//! The KS null assumes a continuous parent, so tied observations make
//! every variant conservative.

use std::f64::consts::PI;

use skua_core::{Result, Summarizable};
use statrs::distribution::ContinuousCDF;

use crate::combinatorics::ln_choose;
use crate::hypothesis::{check_sample, HypothesisTest, Tail};

// ── Shared statistics ──────────────────────────────────────────────────────

/// One-sample supremum deviations `(n, delta_plus, delta_minus, delta)`.
fn ks_stats<D>(x: &[f64], dist: &D) -> Result<(usize, f64, f64, f64)>
where
    D: ContinuousCDF<f64, f64>,
{
    check_sample("x", x)?;
    let n = x.len();
    let nf = n as f64;
    let mut sorted = x.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut delta_plus = 0.0f64;
    let mut delta_minus = 0.0f64;
    for (i, &v) in sorted.iter().enumerate() {
        let cdf = dist.cdf(v);
        delta_plus = delta_plus.max((i + 1) as f64 / nf - cdf);
        delta_minus = delta_minus.max(cdf - i as f64 / nf);
    }
    Ok((n, delta_plus, delta_minus, delta_plus.max(delta_minus)))
}

// ── Null distribution machinery ────────────────────────────────────────────

/// `P(D_n < d)` by the Marsaglia-Tsang-Wang matrix power method.
fn marsaglia_cdf(n: usize, d: f64) -> f64 {
    if d <= 0.0 {
        return 0.0;
    }
    if d >= 1.0 {
        return 1.0;
    }
    let nf = n as f64;
    let nd = nf * d;
    let k = nd.floor() as usize + 1;
    let m = 2 * k - 1;
    let h = k as f64 - nd;

    let mut hm = vec![0.0; m * m];
    for i in 0..m {
        for j in 0..=(i + 1).min(m - 1) {
            hm[i * m + j] = 1.0;
        }
    }
    for i in 0..m {
        hm[i * m] -= h.powi(i as i32 + 1);
        hm[(m - 1) * m + i] -= h.powi((m - i) as i32);
    }
    let two_h = 2.0 * h - 1.0;
    if two_h > 0.0 {
        hm[(m - 1) * m] += two_h.powi(m as i32);
    }
    // Divide entry (i, j) by (i - j + 1)! below the superdiagonal.
    for i in 0..m {
        for j in 0..=i {
            for g in 1..=(i + 1 - j) {
                hm[i * m + j] /= g as f64;
            }
        }
    }

    let (q, mut exponent) = mat_power(&hm, m, n);
    let mut s = q[(k - 1) * m + (k - 1)];
    for i in 1..=n {
        s = s * i as f64 / nf;
        if s < 1e-140 {
            s *= 1e140;
            exponent -= 140;
        }
    }
    s * 10f64.powi(exponent)
}

fn mat_multiply(a: &[f64], b: &[f64], m: usize) -> Vec<f64> {
    let mut c = vec![0.0; m * m];
    for i in 0..m {
        for l in 0..m {
            let ail = a[i * m + l];
            if ail != 0.0 {
                for j in 0..m {
                    c[i * m + j] += ail * b[l * m + j];
                }
            }
        }
    }
    c
}

/// `A^n` with a base-10 exponent carried separately to dodge overflow.
fn mat_power(a: &[f64], m: usize, n: usize) -> (Vec<f64>, i32) {
    if n == 1 {
        return (a.to_vec(), 0);
    }
    let (half, mut exponent) = mat_power(a, m, n / 2);
    let mut b = mat_multiply(&half, &half, m);
    exponent *= 2;
    if n % 2 == 1 {
        b = mat_multiply(a, &b, m);
    }
    if b[(m / 2) * m + m / 2] > 1e140 {
        for v in &mut b {
            *v *= 1e-140;
        }
        exponent += 140;
    }
    (b, exponent)
}

/// `P(D+ >= d)` by the Birnbaum-Tingey sum, evaluated in log space.
fn one_sided_sf(n: usize, d: f64) -> f64 {
    if d <= 0.0 {
        return 1.0;
    }
    if d >= 1.0 {
        return 0.0;
    }
    let nf = n as f64;
    let cutoff = (nf * (1.0 - d)).floor() as u64;
    let mut sum = 0.0;
    for j in 0..=cutoff {
        let jf = j as f64;
        let a = d + jf / nf;
        let b = 1.0 - a;
        let ln_term = ln_choose(n as u64, j) + (jf - 1.0) * a.ln() + (nf - jf) * b.ln();
        sum += ln_term.exp();
    }
    (d * sum).min(1.0)
}

/// Survival function of the limiting Kolmogorov distribution.
fn kolmogorov_sf(x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    if x < 1.0 {
        // Jacobi theta form of the CDF, sharp for small arguments.
        let mut cdf_sum = 0.0;
        for k in 0..20u32 {
            let odd = f64::from(2 * k + 1);
            cdf_sum += (-odd * odd * PI * PI / (8.0 * x * x)).exp();
        }
        1.0 - (2.0 * PI).sqrt() / x * cdf_sum
    } else {
        let mut sf = 0.0;
        let mut sign = 1.0;
        for k in 1..100u32 {
            let term = (-2.0 * f64::from(k * k) * x * x).exp();
            sf += sign * term;
            sign = -sign;
            if term < 1e-16 {
                break;
            }
        }
        2.0 * sf
    }
}

// ── One-sample tests ───────────────────────────────────────────────────────

/// One-sample KS test against the exact finite-sample null.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExactOneSampleKSTest {
    pub n: usize,
    /// Two-sided supremum deviation.
    pub delta: f64,
    /// Largest excess of the empirical CDF over the hypothesized one.
    pub delta_plus: f64,
    /// Largest shortfall of the empirical CDF under the hypothesized one.
    pub delta_minus: f64,
}

impl ExactOneSampleKSTest {
    /// Test whether `x` was drawn from `dist`.
    pub fn new<D>(x: &[f64], dist: &D) -> Result<Self>
    where
        D: ContinuousCDF<f64, f64>,
    {
        let (n, delta_plus, delta_minus, delta) = ks_stats(x, dist)?;
        Ok(ExactOneSampleKSTest {
            n,
            delta,
            delta_plus,
            delta_minus,
        })
    }
}

impl HypothesisTest for ExactOneSampleKSTest {
    fn test_name(&self) -> &'static str {
        "Exact one-sample Kolmogorov-Smirnov test"
    }

    fn statistic(&self) -> f64 {
        self.delta
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        Ok(match tail {
            Tail::Both => 1.0 - marsaglia_cdf(self.n, self.delta),
            Tail::Left => one_sided_sf(self.n, self.delta_minus),
            Tail::Right => one_sided_sf(self.n, self.delta_plus),
        })
    }
}

impl Summarizable for ExactOneSampleKSTest {
    fn summary(&self) -> String {
        format!(
            "{}: D = {:.4}, n = {}, p = {:.4}",
            self.test_name(),
            self.delta,
            self.n,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

/// One-sample KS test against the limiting Kolmogorov null.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApproximateOneSampleKSTest {
    pub n: usize,
    pub delta: f64,
    pub delta_plus: f64,
    pub delta_minus: f64,
}

impl ApproximateOneSampleKSTest {
    /// Test whether `x` was drawn from `dist`.
    pub fn new<D>(x: &[f64], dist: &D) -> Result<Self>
    where
        D: ContinuousCDF<f64, f64>,
    {
        let (n, delta_plus, delta_minus, delta) = ks_stats(x, dist)?;
        Ok(ApproximateOneSampleKSTest {
            n,
            delta,
            delta_plus,
            delta_minus,
        })
    }
}

impl HypothesisTest for ApproximateOneSampleKSTest {
    fn test_name(&self) -> &'static str {
        "Approximate one-sample Kolmogorov-Smirnov test"
    }

    fn statistic(&self) -> f64 {
        self.delta
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        let nf = self.n as f64;
        Ok(match tail {
            Tail::Both => kolmogorov_sf(nf.sqrt() * self.delta),
            Tail::Left => (-2.0 * nf * self.delta_minus * self.delta_minus).exp(),
            Tail::Right => (-2.0 * nf * self.delta_plus * self.delta_plus).exp(),
        })
    }
}

impl Summarizable for ApproximateOneSampleKSTest {
    fn summary(&self) -> String {
        format!(
            "{}: D = {:.4}, n = {}, p = {:.4}",
            self.test_name(),
            self.delta,
            self.n,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Two-sample test ────────────────────────────────────────────────────────

/// Two-sample KS test under the limiting null with the effective size
/// `nx ny / (nx + ny)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApproximateTwoSampleKSTest {
    pub nx: usize,
    pub ny: usize,
    /// Two-sided supremum deviation between the empirical CDFs.
    pub delta: f64,
    /// Largest excess of the first empirical CDF over the second.
    pub delta_plus: f64,
    /// Largest shortfall of the first empirical CDF under the second.
    pub delta_minus: f64,
}

impl ApproximateTwoSampleKSTest {
    /// Test whether `x` and `y` share a distribution.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        check_sample("x", x)?;
        check_sample("y", y)?;
        let mut sx = x.to_vec();
        sx.sort_by(f64::total_cmp);
        let mut sy = y.to_vec();
        sy.sort_by(f64::total_cmp);
        let (nx, ny) = (sx.len(), sy.len());

        // Walk the pooled order one distinct value at a time so ties move
        // both empirical CDFs before the difference is taken.
        let mut i = 0;
        let mut j = 0;
        let mut delta_plus = 0.0f64;
        let mut delta_minus = 0.0f64;
        while i < nx || j < ny {
            let v = match (sx.get(i), sy.get(j)) {
                (Some(&a), Some(&b)) => a.min(b),
                (Some(&a), None) => a,
                (None, Some(&b)) => b,
                (None, None) => unreachable!(),
            };
            while i < nx && sx[i] == v {
                i += 1;
            }
            while j < ny && sy[j] == v {
                j += 1;
            }
            let diff = i as f64 / nx as f64 - j as f64 / ny as f64;
            delta_plus = delta_plus.max(diff);
            delta_minus = delta_minus.max(-diff);
        }

        Ok(ApproximateTwoSampleKSTest {
            nx,
            ny,
            delta: delta_plus.max(delta_minus),
            delta_plus,
            delta_minus,
        })
    }

    fn effective_n(&self) -> f64 {
        (self.nx * self.ny) as f64 / (self.nx + self.ny) as f64
    }
}

impl HypothesisTest for ApproximateTwoSampleKSTest {
    fn test_name(&self) -> &'static str {
        "Approximate two-sample Kolmogorov-Smirnov test"
    }

    fn statistic(&self) -> f64 {
        self.delta
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        let n = self.effective_n();
        Ok(match tail {
            Tail::Both => kolmogorov_sf(n.sqrt() * self.delta),
            Tail::Left => (-2.0 * n * self.delta_minus * self.delta_minus).exp(),
            Tail::Right => (-2.0 * n * self.delta_plus * self.delta_plus).exp(),
        })
    }
}

impl Summarizable for ApproximateTwoSampleKSTest {
    fn summary(&self) -> String {
        format!(
            "{}: D = {:.4}, nx = {}, ny = {}, p = {:.4}",
            self.test_name(),
            self.delta,
            self.nx,
            self.ny,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use statrs::distribution::Uniform;

    #[test]
    fn limiting_distribution_reference_values() {
        // Classical table: sf(1.358) ~ 0.05, cdf(0.5) ~ 0.0361.
        assert!((kolmogorov_sf(1.358) - 0.05).abs() < 2e-3);
        assert!((kolmogorov_sf(0.5) - 0.9639).abs() < 1e-3);
        let expected = 2.0 * ((-8.0f64).exp() - (-32.0f64).exp());
        assert!((kolmogorov_sf(2.0) - expected).abs() < 1e-12);
        assert_eq!(kolmogorov_sf(0.0), 1.0);
    }

    #[test]
    fn single_observation_has_closed_form() {
        // For n = 1 and uniform parent, D = max(U, 1 - U) with
        // P(D <= d) = 2d - 1 on [1/2, 1].
        let u = Uniform::new(0.0, 1.0).unwrap();
        let test = ExactOneSampleKSTest::new(&[0.3], &u).unwrap();
        assert!((test.delta - 0.7).abs() < 1e-12);
        assert!((test.delta_minus - 0.3).abs() < 1e-12);
        assert!((test.pvalue(Tail::Both).unwrap() - 0.6).abs() < 1e-12);
        assert!((test.pvalue(Tail::Right).unwrap() - 0.3).abs() < 1e-12);
        assert!((test.pvalue(Tail::Left).unwrap() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn perfectly_spaced_sample_attains_the_minimum() {
        let n = 10;
        let x: Vec<f64> = (1..=n).map(|i| (2 * i - 1) as f64 / (2 * n) as f64).collect();
        let u = Uniform::new(0.0, 1.0).unwrap();
        let test = ExactOneSampleKSTest::new(&x, &u).unwrap();
        // D cannot go below 1/(2n), so the p-value is exactly one.
        assert!((test.delta - 0.05).abs() < 1e-12);
        assert!((test.pvalue(Tail::Both).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn exact_and_asymptotic_agree_for_moderate_n() {
        let n = 25;
        let x: Vec<f64> = (1..=n).map(|i| (2 * i - 1) as f64 / (2 * n) as f64).collect();
        // Testing uniform data against Uniform(0, 1.25) misfits the upper
        // tail and puts the p-value in an informative mid range.
        let u = Uniform::new(0.0, 1.25).unwrap();
        let exact = ExactOneSampleKSTest::new(&x, &u).unwrap();
        let approx = ApproximateOneSampleKSTest::new(&x, &u).unwrap();
        assert_eq!(exact.delta, approx.delta);
        let pe = exact.pvalue(Tail::Both).unwrap();
        let pa = approx.pvalue(Tail::Both).unwrap();
        assert!(pe > 0.01 && pe < 0.9, "pe = {pe}");
        assert!((pe - pa).abs() < 0.05, "exact {pe} vs approx {pa}");
        // The two-sided exceedance never beats the sum of one-sided ones.
        let pl = exact.pvalue(Tail::Left).unwrap();
        let pr = exact.pvalue(Tail::Right).unwrap();
        assert!(pe <= pl + pr + 1e-12);
    }

    #[test]
    fn two_sample_with_disjoint_supports() {
        let test = ApproximateTwoSampleKSTest::new(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(test.delta, 1.0);
        assert_eq!(test.delta_minus, 0.0);
        let p = test.pvalue(Tail::Both).unwrap();
        assert!((p - kolmogorov_sf(1.5f64.sqrt())).abs() < 1e-15);
        assert!((p - 0.0995).abs() < 1e-3, "p = {p}");
        assert!((test.pvalue(Tail::Right).unwrap() - (-3.0f64).exp()).abs() < 1e-12);
        assert_eq!(test.pvalue(Tail::Left).unwrap(), 1.0);
    }

    #[test]
    fn two_sample_ties_move_both_cdfs_together() {
        let test = ApproximateTwoSampleKSTest::new(&[1.0, 2.0, 2.0], &[2.0, 3.0]).unwrap();
        assert!((test.delta_plus - 0.5).abs() < 1e-12);
        assert_eq!(test.delta_minus, 0.0);
        assert!((test.delta - 0.5).abs() < 1e-12);
    }

    #[test]
    fn one_sided_sum_matches_simple_cases() {
        // P(D+ >= d) for n = 1 is P(U <= 1 - d) = 1 - d.
        assert!((one_sided_sf(1, 0.4) - 0.6).abs() < 1e-12);
        assert_eq!(one_sided_sf(5, 0.0), 1.0);
        assert_eq!(one_sided_sf(5, 1.0), 0.0);
        // Monotone decreasing in d.
        assert!(one_sided_sf(20, 0.1) > one_sided_sf(20, 0.2));
        assert!(one_sided_sf(20, 0.2) > one_sided_sf(20, 0.4));
    }
}
