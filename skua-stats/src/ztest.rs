//! z tests for one sample, paired samples, and two samples, treating the
//! sample variance as if it were known.

use skua_core::{Estimate, Result, SkuaError, Summarizable};
use statrs::distribution::ContinuousCDF;

use crate::descriptive::{mean, std_dev, variance};
use crate::dist;
use crate::hypothesis::{
    check_alpha, check_paired, check_sample, tail_from_cdf, ConfInt, ConfidenceInterval,
    HypothesisTest, Tail,
};

/// One-sample z test of the mean against `mu0`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OneSampleZTest {
    /// Sample size.
    pub n: usize,
    /// Sample mean (the estimate under test).
    pub xbar: f64,
    /// Standard error of the mean.
    pub stderr: f64,
    /// Null value of the mean.
    pub mu0: f64,
    /// z statistic.
    pub z: f64,
}

impl OneSampleZTest {
    /// Test whether the mean of `x` equals `mu0`.
    pub fn new(x: &[f64], mu0: f64) -> Result<Self> {
        check_sample("x", x)?;
        if x.len() < 2 {
            return Err(SkuaError::InvalidArgument(
                "one-sample z test needs at least two observations".into(),
            ));
        }
        Self::from_stats(mean(x), std_dev(x, 1), x.len(), mu0)
    }

    /// Build the test from pre-aggregated sufficient statistics.
    pub fn from_stats(xbar: f64, stddev: f64, n: usize, mu0: f64) -> Result<Self> {
        if n == 0 {
            return Err(SkuaError::InvalidArgument("empty sample".into()));
        }
        if !stddev.is_finite() || stddev < 0.0 || !xbar.is_finite() || !mu0.is_finite() {
            return Err(SkuaError::InvalidArgument(
                "mean, stddev, and mu0 must be finite, stddev non-negative".into(),
            ));
        }
        if stddev == 0.0 {
            return Err(SkuaError::Degenerate(
                "zero-variance sample: the z statistic is undefined".into(),
            ));
        }
        let stderr = stddev / (n as f64).sqrt();
        Ok(OneSampleZTest { n, xbar, stderr, mu0, z: (xbar - mu0) / stderr })
    }

    /// Paired test: a one-sample test on the differences `x - y`.
    pub fn paired(x: &[f64], y: &[f64], mu0: f64) -> Result<Self> {
        check_paired(x, y)?;
        let diffs: Vec<f64> = x.iter().zip(y).map(|(a, b)| a - b).collect();
        Self::new(&diffs, mu0)
    }
}

impl HypothesisTest for OneSampleZTest {
    fn test_name(&self) -> &'static str {
        "One sample z-test"
    }

    fn statistic(&self) -> f64 {
        self.z
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        Ok(z_pvalue(self.z, tail))
    }
}

impl ConfidenceInterval for OneSampleZTest {
    fn confint(&self, alpha: f64, tail: Tail) -> Result<ConfInt> {
        z_confint(self.xbar, self.stderr, alpha, tail)
    }
}

impl Estimate for OneSampleZTest {
    fn estimate(&self) -> f64 {
        self.xbar
    }
}

impl Summarizable for OneSampleZTest {
    fn summary(&self) -> String {
        format!(
            "{}: z = {:.4}, p = {:.4}",
            self.test_name(),
            self.z,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

/// Two-sample z test with pooled variance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EqualVarianceZTest {
    pub nx: usize,
    pub ny: usize,
    /// Difference of the sample means.
    pub xbar: f64,
    /// Standard error of the mean difference.
    pub stderr: f64,
    /// z statistic.
    pub z: f64,
}

impl EqualVarianceZTest {
    /// Test whether the means of `x` and `y` are equal, pooling the variance.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        check_sample("x", x)?;
        check_sample("y", y)?;
        let (nx, ny) = (x.len(), y.len());
        if nx + ny < 3 {
            return Err(SkuaError::InvalidArgument(
                "pooled z test needs nx + ny >= 3".into(),
            ));
        }
        let (mx, my) = (mean(x), mean(y));
        let ssx: f64 = x.iter().map(|&v| (v - mx) * (v - mx)).sum();
        let ssy: f64 = y.iter().map(|&v| (v - my) * (v - my)).sum();
        let pooled = (ssx + ssy) / (nx + ny - 2) as f64;
        if pooled == 0.0 {
            return Err(SkuaError::Degenerate(
                "zero-variance samples: the z statistic is undefined".into(),
            ));
        }
        let stderr = (pooled * (1.0 / nx as f64 + 1.0 / ny as f64)).sqrt();
        let xbar = mx - my;
        Ok(EqualVarianceZTest { nx, ny, xbar, stderr, z: xbar / stderr })
    }
}

impl HypothesisTest for EqualVarianceZTest {
    fn test_name(&self) -> &'static str {
        "Two sample z-test (equal variance)"
    }

    fn statistic(&self) -> f64 {
        self.z
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        Ok(z_pvalue(self.z, tail))
    }
}

impl ConfidenceInterval for EqualVarianceZTest {
    fn confint(&self, alpha: f64, tail: Tail) -> Result<ConfInt> {
        z_confint(self.xbar, self.stderr, alpha, tail)
    }
}

impl Estimate for EqualVarianceZTest {
    fn estimate(&self) -> f64 {
        self.xbar
    }
}

impl Summarizable for EqualVarianceZTest {
    fn summary(&self) -> String {
        format!(
            "{}: z = {:.4}, p = {:.4}",
            self.test_name(),
            self.z,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

/// Two-sample z test without the equal-variance assumption.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnequalVarianceZTest {
    pub nx: usize,
    pub ny: usize,
    /// Difference of the sample means.
    pub xbar: f64,
    /// Standard error of the mean difference.
    pub stderr: f64,
    /// z statistic.
    pub z: f64,
}

impl UnequalVarianceZTest {
    /// Test whether the means of `x` and `y` are equal without pooling.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        check_sample("x", x)?;
        check_sample("y", y)?;
        let (nx, ny) = (x.len(), y.len());
        if nx < 2 || ny < 2 {
            return Err(SkuaError::InvalidArgument(
                "unequal-variance z test needs at least two observations per sample".into(),
            ));
        }
        let fx = variance(x, 1) / nx as f64;
        let fy = variance(y, 1) / ny as f64;
        if fx + fy == 0.0 {
            return Err(SkuaError::Degenerate(
                "zero-variance samples: the z statistic is undefined".into(),
            ));
        }
        let stderr = (fx + fy).sqrt();
        let xbar = mean(x) - mean(y);
        Ok(UnequalVarianceZTest { nx, ny, xbar, stderr, z: xbar / stderr })
    }
}

impl HypothesisTest for UnequalVarianceZTest {
    fn test_name(&self) -> &'static str {
        "Two sample z-test (unequal variance)"
    }

    fn statistic(&self) -> f64 {
        self.z
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        Ok(z_pvalue(self.z, tail))
    }
}

impl ConfidenceInterval for UnequalVarianceZTest {
    fn confint(&self, alpha: f64, tail: Tail) -> Result<ConfInt> {
        z_confint(self.xbar, self.stderr, alpha, tail)
    }
}

impl Estimate for UnequalVarianceZTest {
    fn estimate(&self) -> f64 {
        self.xbar
    }
}

impl Summarizable for UnequalVarianceZTest {
    fn summary(&self) -> String {
        format!(
            "{}: z = {:.4}, p = {:.4}",
            self.test_name(),
            self.z,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Shared z machinery ─────────────────────────────────────────────────────

fn z_pvalue(z: f64, tail: Tail) -> f64 {
    tail_from_cdf(dist::std_normal().cdf(z), tail)
}

fn z_confint(estimate: f64, stderr: f64, alpha: f64, tail: Tail) -> Result<ConfInt> {
    check_alpha(alpha)?;
    let normal = dist::std_normal();
    let (lower, upper) = match tail {
        Tail::Both => {
            let q = normal.inverse_cdf(1.0 - alpha / 2.0);
            (estimate - q * stderr, estimate + q * stderr)
        }
        Tail::Left => {
            let q = normal.inverse_cdf(1.0 - alpha);
            (f64::NEG_INFINITY, estimate + q * stderr)
        }
        Tail::Right => {
            let q = normal.inverse_cdf(1.0 - alpha);
            (estimate - q * stderr, f64::INFINITY)
        }
    };
    Ok(ConfInt { lower, upper, coverage: 1.0 - alpha, method: "z" })
}

// ── Tests ──────────────────────────────────────────────────────────────────
