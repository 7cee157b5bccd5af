//! Binomial proportion test with the classical menu of proportion intervals,
//! and the sign test for a location shift.

use skua_core::{Estimate, Result, SkuaError, Summarizable};
use statrs::distribution::{ContinuousCDF, Discrete, DiscreteCDF};

use crate::descriptive::quantile_sorted;
use crate::dist;
use crate::hypothesis::{
    check_alpha, combine_tails, ConfInt, ConfidenceInterval, HypothesisTest, Tail,
    MINLIKE_REL_EPS,
};

/// Interval construction for a binomial proportion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinomialCiMethod {
    /// Exact interval from inverse Beta quantiles.
    #[default]
    ClopperPearson,
    /// Normal interval around the sample proportion. Not clamped to [0, 1].
    Wald,
    /// Score interval.
    Wilson,
    /// Bayesian interval under the Jeffreys prior.
    Jeffreys,
    /// Adjusted Wald interval with pseudo-observations.
    AgrestiCoull,
    /// Variance-stabilizing arcsine transform interval.
    Arcsine,
}

impl BinomialCiMethod {
    fn name(self) -> &'static str {
        match self {
            BinomialCiMethod::ClopperPearson => "clopper_pearson",
            BinomialCiMethod::Wald => "wald",
            BinomialCiMethod::Wilson => "wilson",
            BinomialCiMethod::Jeffreys => "jeffreys",
            BinomialCiMethod::AgrestiCoull => "agresti_coull",
            BinomialCiMethod::Arcsine => "arcsine",
        }
    }
}

/// Exact test of a binomial success probability against `p0`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinomialTest {
    /// Observed successes.
    pub x: u64,
    /// Number of trials.
    pub n: u64,
    /// Null success probability.
    pub p0: f64,
}

impl BinomialTest {
    /// Test `x` successes in `n` trials against success probability `p0`.
    pub fn new(x: u64, n: u64, p0: f64) -> Result<Self> {
        if n == 0 {
            return Err(SkuaError::InvalidArgument(
                "binomial test needs at least one trial".into(),
            ));
        }
        if x > n {
            return Err(SkuaError::InvalidArgument(format!(
                "successes exceed trials ({x} > {n})"
            )));
        }
        if !(p0 > 0.0 && p0 < 1.0) {
            return Err(SkuaError::InvalidArgument(format!(
                "null probability must lie in (0, 1), got {p0}"
            )));
        }
        Ok(BinomialTest { x, n, p0 })
    }

    /// Test a sequence of Bernoulli outcomes against `p0`.
    pub fn from_outcomes(outcomes: &[bool], p0: f64) -> Result<Self> {
        let x = outcomes.iter().filter(|&&b| b).count() as u64;
        Self::new(x, outcomes.len() as u64, p0)
    }

    /// Sample proportion.
    pub fn proportion(&self) -> f64 {
        self.x as f64 / self.n as f64
    }

    /// Interval for the success probability by the chosen method.
    pub fn confint_with(&self, alpha: f64, tail: Tail, method: BinomialCiMethod) -> Result<ConfInt> {
        check_alpha(alpha)?;
        let (lower, upper) = match tail {
            Tail::Both => self.ci_bounds(alpha, method)?,
            // One-sided intervals pin the free end to the parameter space
            // boundary and spend the whole alpha on the other end.
            Tail::Left => (0.0, self.ci_bounds(2.0 * alpha, method)?.1),
            Tail::Right => (self.ci_bounds(2.0 * alpha, method)?.0, 1.0),
        };
        Ok(ConfInt { lower, upper, coverage: 1.0 - alpha, method: method.name() })
    }

    fn ci_bounds(&self, alpha: f64, method: BinomialCiMethod) -> Result<(f64, f64)> {
        // Doubled one-sided alpha may reach 1; quantiles below still need a
        // proper level.
        check_alpha(alpha)?;
        let (x, n) = (self.x as f64, self.n as f64);
        let phat = self.proportion();
        let normal = dist::std_normal();
        let q = normal.inverse_cdf(1.0 - alpha / 2.0);
        Ok(match method {
            BinomialCiMethod::ClopperPearson => {
                let lower = if self.x == 0 {
                    0.0
                } else {
                    dist::beta(x, n - x + 1.0)?.inverse_cdf(alpha / 2.0)
                };
                let upper = if self.x == self.n {
                    1.0
                } else {
                    dist::beta(x + 1.0, n - x)?.inverse_cdf(1.0 - alpha / 2.0)
                };
                (lower, upper)
            }
            BinomialCiMethod::Wald => {
                let se = (phat * (1.0 - phat) / n).sqrt();
                (phat - q * se, phat + q * se)
            }
            BinomialCiMethod::Wilson => {
                let denom = 1.0 + q * q / n;
                let center = (phat + q * q / (2.0 * n)) / denom;
                let half = q * (phat * (1.0 - phat) / n + q * q / (4.0 * n * n)).sqrt() / denom;
                (center - half, center + half)
            }
            BinomialCiMethod::Jeffreys => {
                let posterior = dist::beta(x + 0.5, n - x + 0.5)?;
                (
                    posterior.inverse_cdf(alpha / 2.0),
                    posterior.inverse_cdf(1.0 - alpha / 2.0),
                )
            }
            BinomialCiMethod::AgrestiCoull => {
                let n_adj = n + q * q;
                let p_adj = (x + q * q / 2.0) / n_adj;
                let half = q * (p_adj * (1.0 - p_adj) / n_adj).sqrt();
                (p_adj - half, p_adj + half)
            }
            BinomialCiMethod::Arcsine => {
                let center = phat.sqrt().asin();
                let half = q / (2.0 * n.sqrt());
                (
                    (center - half).sin().powi(2),
                    (center + half).sin().powi(2),
                )
            }
        })
    }
}

impl HypothesisTest for BinomialTest {
    fn test_name(&self) -> &'static str {
        "Binomial test"
    }

    fn statistic(&self) -> f64 {
        self.x as f64
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        let d = dist::binomial(self.p0, self.n)?;
        match tail {
            Tail::Left => Ok(d.cdf(self.x)),
            Tail::Right => Ok(upper_tail(&d, self.x)),
            Tail::Both => minlike_binomial(&d, self.n, self.p0, self.x),
        }
    }
}

impl ConfidenceInterval for BinomialTest {
    fn confint(&self, alpha: f64, tail: Tail) -> Result<ConfInt> {
        self.confint_with(alpha, tail, BinomialCiMethod::default())
    }
}

impl Estimate for BinomialTest {
    fn estimate(&self) -> f64 {
        self.proportion()
    }
}

impl Summarizable for BinomialTest {
    fn summary(&self) -> String {
        format!(
            "{}: {}/{} successes against p0 = {}, p = {:.4}",
            self.test_name(),
            self.x,
            self.n,
            self.p0,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

/// P(X >= x) for a discrete distribution on 0..=n.
fn upper_tail(d: &statrs::distribution::Binomial, x: u64) -> f64 {
    if x == 0 {
        1.0
    } else {
        1.0 - d.cdf(x - 1)
    }
}

/// Two-sided p-value as the total probability of outcomes no more likely
/// than the observed one. Scans the far side of the mean for the cutover
/// point, so the cost is linear in n.
fn minlike_binomial(
    d: &statrs::distribution::Binomial,
    n: u64,
    p0: f64,
    x: u64,
) -> Result<f64> {
    let observed = d.pmf(x);
    if !observed.is_finite() {
        return Err(SkuaError::Numerical(format!(
            "binomial pmf underflowed at x = {x}, n = {n}, p0 = {p0}"
        )));
    }
    let threshold = observed * (1.0 + MINLIKE_REL_EPS);
    let m = n as f64 * p0;
    let p = if (x as f64) == m {
        1.0
    } else if (x as f64) < m {
        // Count outcomes above the mean that are as rare as the observed one.
        let start = m.ceil() as u64;
        let y = (start..=n).filter(|&k| d.pmf(k) <= threshold).count() as u64;
        let right = if y == 0 { 0.0 } else { 1.0 - d.cdf(n - y) };
        d.cdf(x) + right
    } else {
        let stop = m.floor() as u64;
        let y = (0..=stop).filter(|&k| d.pmf(k) <= threshold).count() as u64;
        let left = if y == 0 { 0.0 } else { d.cdf(y - 1) };
        left + upper_tail(d, x)
    };
    Ok(p.min(1.0))
}

// ── Sign test ───────────────────────────────────────────────────────────────

/// Sign test of the null hypothesis that the population median equals `m0`.
///
/// Observations equal to `m0` are discarded; the count above `m0` is then
/// binomial with success probability one half under the null.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignTest {
    /// Null median.
    pub m0: f64,
    /// Observations strictly above `m0`.
    pub above: u64,
    /// Observations not equal to `m0`.
    pub n: u64,
    sorted: Vec<f64>,
}

impl SignTest {
    /// Test whether the median of `x` equals `m0`.
    pub fn new(x: &[f64], m0: f64) -> Result<Self> {
        crate::hypothesis::check_sample("x", x)?;
        if !m0.is_finite() {
            return Err(SkuaError::InvalidArgument(
                "null median must be finite".into(),
            ));
        }
        let above = x.iter().filter(|&&v| v > m0).count() as u64;
        let n = x.iter().filter(|&&v| v != m0).count() as u64;
        let mut sorted = x.to_vec();
        sorted.sort_by(f64::total_cmp);
        Ok(SignTest { m0, above, n, sorted })
    }

    /// Paired test on the differences `x - y`.
    pub fn paired(x: &[f64], y: &[f64], m0: f64) -> Result<Self> {
        crate::hypothesis::check_paired(x, y)?;
        let diffs: Vec<f64> = x.iter().zip(y).map(|(a, b)| a - b).collect();
        Self::new(&diffs, m0)
    }

    /// Sample median.
    pub fn median(&self) -> f64 {
        quantile_sorted(&self.sorted, 0.5)
    }

    /// Number of order statistics trimmed from each end so that the interval
    /// between the remaining extremes covers the median with probability at
    /// least `1 - prob_each_side * 2`.
    fn trim_count(&self, prob_each_side: f64) -> Result<usize> {
        let n = self.sorted.len() as u64;
        let d = dist::binomial(0.5, n)?;
        if d.cdf(0) > prob_each_side {
            return Err(SkuaError::Degenerate(format!(
                "{n} observations cannot support a sign interval at this level"
            )));
        }
        let mut q: u64 = 1;
        while q < n / 2 && d.cdf(q) <= prob_each_side {
            q += 1;
        }
        Ok(q as usize)
    }
}

impl HypothesisTest for SignTest {
    fn test_name(&self) -> &'static str {
        "Sign test"
    }

    fn statistic(&self) -> f64 {
        self.above as f64
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        if self.n == 0 {
            // Every observation sat exactly on the null median.
            return Ok(1.0);
        }
        let d = dist::binomial(0.5, self.n)?;
        let p_left = d.cdf(self.above);
        let p_right = upper_tail(&d, self.above);
        Ok(combine_tails(p_left, p_right, tail))
    }
}

impl ConfidenceInterval for SignTest {
    fn confint(&self, alpha: f64, tail: Tail) -> Result<ConfInt> {
        check_alpha(alpha)?;
        let n = self.sorted.len();
        let (lower, upper) = match tail {
            Tail::Both => {
                let q = self.trim_count(alpha / 2.0)?;
                (self.sorted[q - 1], self.sorted[n - q])
            }
            Tail::Left => {
                let q = self.trim_count(alpha)?;
                (f64::NEG_INFINITY, self.sorted[n - q])
            }
            Tail::Right => {
                let q = self.trim_count(alpha)?;
                (self.sorted[q - 1], f64::INFINITY)
            }
        };
        Ok(ConfInt { lower, upper, coverage: 1.0 - alpha, method: "order_statistic" })
    }
}

impl Estimate for SignTest {
    fn estimate(&self) -> f64 {
        self.median()
    }
}

impl Summarizable for SignTest {
    fn summary(&self) -> String {
        format!(
            "{}: {} of {} above {}, p = {:.4}",
            self.test_name(),
            self.above,
            self.n,
            self.m0,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minlike_two_sided_on_a_symmetric_null() {
        // 7 of 10 against one half: both pmf tails below pmf(7) sum to
        // 352/1024 exactly.
        let test = BinomialTest::new(7, 10, 0.5).unwrap();
        let p = test.pvalue(Tail::Both).unwrap();
        assert!((p - 0.34375).abs() < 1e-10, "p = {p}");
        assert!((test.pvalue(Tail::Left).unwrap() - 968.0 / 1024.0).abs() < 1e-10);
        assert!((test.pvalue(Tail::Right).unwrap() - 176.0 / 1024.0).abs() < 1e-10);
    }

    #[test]
    fn minlike_two_sided_on_a_skewed_null() {
        // 3 of 12 against 0.6; only the extreme opposite outcome (12) is as
        // rare as the observed one.
        let test = BinomialTest::new(3, 12, 0.6).unwrap();
        let p = test.pvalue(Tail::Both).unwrap();
        assert!((p - 0.0174442).abs() < 1e-4, "p = {p}");
        // Observed count equal to the null mean gives p = 1.
        let at_mean = BinomialTest::new(9, 10, 0.9).unwrap();
        assert!((at_mean.pvalue(Tail::Both).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn clopper_pearson_interval() {
        let test = BinomialTest::new(7, 10, 0.5).unwrap();
        let ci = test.confint(0.05, Tail::Both).unwrap();
        assert_eq!(ci.method, "clopper_pearson");
        assert!((ci.lower - 0.34755).abs() < 1e-4, "lower = {}", ci.lower);
        assert!((ci.upper - 0.93328).abs() < 1e-4, "upper = {}", ci.upper);

        // Boundary counts pin the matching endpoint.
        let none = BinomialTest::new(0, 10, 0.5).unwrap();
        assert_eq!(none.confint(0.05, Tail::Both).unwrap().lower, 0.0);
        let all = BinomialTest::new(10, 10, 0.5).unwrap();
        assert_eq!(all.confint(0.05, Tail::Both).unwrap().upper, 1.0);
    }

    #[test]
    fn proportion_interval_menu() {
        let test = BinomialTest::new(7, 10, 0.5).unwrap();

        let wald = test.confint_with(0.05, Tail::Both, BinomialCiMethod::Wald).unwrap();
        assert!((wald.lower - 0.41603).abs() < 1e-4, "lower = {}", wald.lower);
        assert!((wald.upper - 0.98397).abs() < 1e-4, "upper = {}", wald.upper);

        let wilson = test.confint_with(0.05, Tail::Both, BinomialCiMethod::Wilson).unwrap();
        assert!((wilson.lower - 0.39678).abs() < 1e-4, "lower = {}", wilson.lower);
        assert!((wilson.upper - 0.89221).abs() < 1e-4, "upper = {}", wilson.upper);

        let arcsine = test.confint_with(0.05, Tail::Both, BinomialCiMethod::Arcsine).unwrap();
        assert!((arcsine.lower - 0.3964).abs() < 2e-3, "lower = {}", arcsine.lower);
        assert!((arcsine.upper - 0.9290).abs() < 2e-3, "upper = {}", arcsine.upper);

        // Agresti-Coull shares Wilson's center and is at least as wide.
        let ac = test
            .confint_with(0.05, Tail::Both, BinomialCiMethod::AgrestiCoull)
            .unwrap();
        let wilson_center = (wilson.lower + wilson.upper) / 2.0;
        let ac_center = (ac.lower + ac.upper) / 2.0;
        assert!((wilson_center - ac_center).abs() < 1e-10);
        assert!(ac.lower <= wilson.lower && ac.upper >= wilson.upper);

        let jeffreys = test
            .confint_with(0.05, Tail::Both, BinomialCiMethod::Jeffreys)
            .unwrap();
        assert!(jeffreys.lower > 0.3 && jeffreys.lower < 0.45);
        assert!(jeffreys.upper > 0.85 && jeffreys.upper < 0.95);
        assert!(jeffreys.contains(test.proportion()));
    }

    #[test]
    fn one_sided_intervals_pin_the_free_endpoint() {
        let test = BinomialTest::new(7, 10, 0.5).unwrap();
        let left = test.confint(0.05, Tail::Left).unwrap();
        assert_eq!(left.lower, 0.0);
        let both_doubled = test.confint(0.10, Tail::Both).unwrap();
        assert!((left.upper - both_doubled.upper).abs() < 1e-12);

        let right = test.confint(0.05, Tail::Right).unwrap();
        assert_eq!(right.upper, 1.0);
        assert!((right.lower - both_doubled.lower).abs() < 1e-12);
    }

    #[test]
    fn invalid_construction() {
        assert!(matches!(BinomialTest::new(5, 0, 0.5), Err(SkuaError::InvalidArgument(_))));
        assert!(matches!(BinomialTest::new(11, 10, 0.5), Err(SkuaError::InvalidArgument(_))));
        assert!(matches!(BinomialTest::new(5, 10, 0.0), Err(SkuaError::InvalidArgument(_))));
        assert!(matches!(BinomialTest::new(5, 10, 1.0), Err(SkuaError::InvalidArgument(_))));
    }

    #[test]
    fn sign_test_counts_and_pvalue() {
        // Five above, one below, one exactly on the null median.
        let x = [2.0, 3.1, 4.2, 5.3, 6.4, 0.5, 1.0];
        let test = SignTest::new(&x, 1.0).unwrap();
        assert_eq!(test.above, 5);
        assert_eq!(test.n, 6);
        // Binomial(6, 1/2): 2 * P(X >= 5) = 2 * 7/64.
        let p = test.pvalue(Tail::Both).unwrap();
        assert!((p - 14.0 / 64.0).abs() < 1e-12, "p = {p}");
    }

    #[test]
    fn sign_test_all_on_the_median() {
        let test = SignTest::new(&[2.0, 2.0, 2.0], 2.0).unwrap();
        assert_eq!(test.n, 0);
        assert!((test.pvalue(Tail::Both).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sign_interval_uses_order_statistics() {
        let x: Vec<f64> = (1..=20).map(f64::from).collect();
        let test = SignTest::new(&x, 10.0).unwrap();
        let ci = test.confint(0.05, Tail::Both).unwrap();
        // Trimming q from each end of 1..=20 gives (q, 21 - q); the interval
        // must be symmetric and cover the sample median 10.5.
        assert!((ci.lower + ci.upper - 21.0).abs() < 1e-12);
        assert!(ci.contains(test.median()));
        // Conservative coverage: P(X < q) <= alpha/2 for X ~ Bin(20, 1/2).
        let q = ci.lower as u64;
        let d = dist::binomial(0.5, 20).unwrap();
        assert!(d.cdf(q - 1) <= 0.025);
        assert!(d.cdf(q) > 0.025);
    }

    #[test]
    fn sign_interval_rejects_tiny_samples() {
        let test = SignTest::new(&[1.0, 2.0, 3.0], 2.0).unwrap();
        assert!(matches!(
            test.confint(0.05, Tail::Both),
            Err(SkuaError::Degenerate(_))
        ));
        // At a looser level the same sample is fine.
        assert!(test.confint(0.5, Tail::Both).is_ok());
    }
}
