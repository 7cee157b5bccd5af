//! Student t tests for one sample, paired samples, and two samples with
//! pooled or Welch variance.

use skua_core::{Estimate, Result, SkuaError, Summarizable};
use statrs::distribution::ContinuousCDF;

use crate::descriptive::{mean, std_dev, variance};
use crate::dist;
use crate::hypothesis::{
    check_alpha, check_paired, check_sample, tail_from_cdf, ConfInt, ConfidenceInterval,
    HypothesisTest, Tail,
};

/// One-sample Student t test of the mean against `mu0`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OneSampleTTest {
    /// Sample size.
    pub n: usize,
    /// Sample mean (the estimate under test).
    pub xbar: f64,
    /// Standard error of the mean.
    pub stderr: f64,
    /// Null value of the mean.
    pub mu0: f64,
    /// t statistic.
    pub t: f64,
    /// Degrees of freedom, n − 1.
    pub df: f64,
}

impl OneSampleTTest {
    /// Test whether the mean of `x` equals `mu0`.
    pub fn new(x: &[f64], mu0: f64) -> Result<Self> {
        check_sample("x", x)?;
        if x.len() < 2 {
            return Err(SkuaError::InvalidArgument(
                "one-sample t test needs at least two observations".into(),
            ));
        }
        Self::from_stats(mean(x), std_dev(x, 1), x.len(), mu0)
    }

    /// Build the test from pre-aggregated sufficient statistics.
    pub fn from_stats(xbar: f64, stddev: f64, n: usize, mu0: f64) -> Result<Self> {
        if n < 2 {
            return Err(SkuaError::InvalidArgument(format!(
                "one-sample t test needs n >= 2, got {n}"
            )));
        }
        if !stddev.is_finite() || stddev < 0.0 || !xbar.is_finite() || !mu0.is_finite() {
            return Err(SkuaError::InvalidArgument(
                "mean, stddev, and mu0 must be finite, stddev non-negative".into(),
            ));
        }
        if stddev == 0.0 {
            return Err(SkuaError::Degenerate(
                "zero-variance sample: the t statistic is undefined".into(),
            ));
        }
        let stderr = stddev / (n as f64).sqrt();
        Ok(OneSampleTTest {
            n,
            xbar,
            stderr,
            mu0,
            t: (xbar - mu0) / stderr,
            df: (n - 1) as f64,
        })
    }

    /// Paired test: a one-sample test on the differences `x - y`.
    pub fn paired(x: &[f64], y: &[f64], mu0: f64) -> Result<Self> {
        check_paired(x, y)?;
        let diffs: Vec<f64> = x.iter().zip(y).map(|(a, b)| a - b).collect();
        Self::new(&diffs, mu0)
    }
}

impl HypothesisTest for OneSampleTTest {
    fn test_name(&self) -> &'static str {
        "One sample t-test"
    }

    fn statistic(&self) -> f64 {
        self.t
    }

    fn degrees_of_freedom(&self) -> Option<f64> {
        Some(self.df)
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        t_pvalue(self.t, self.df, tail)
    }
}

impl ConfidenceInterval for OneSampleTTest {
    fn confint(&self, alpha: f64, tail: Tail) -> Result<ConfInt> {
        t_confint(self.xbar, self.stderr, self.df, alpha, tail)
    }
}

impl Estimate for OneSampleTTest {
    fn estimate(&self) -> f64 {
        self.xbar
    }
}

impl Summarizable for OneSampleTTest {
    fn summary(&self) -> String {
        format!(
            "{}: t = {:.4}, df = {}, p = {:.4}",
            self.test_name(),
            self.t,
            self.df,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

/// Two-sample t test with pooled variance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EqualVarianceTTest {
    pub nx: usize,
    pub ny: usize,
    /// Difference of the sample means.
    pub xbar: f64,
    /// Standard error of the mean difference.
    pub stderr: f64,
    /// t statistic.
    pub t: f64,
    /// Degrees of freedom, nx + ny − 2.
    pub df: f64,
}

impl EqualVarianceTTest {
    /// Test whether the means of `x` and `y` are equal, assuming the two
    /// populations share a variance.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        check_sample("x", x)?;
        check_sample("y", y)?;
        let (nx, ny) = (x.len(), y.len());
        if nx + ny < 3 {
            return Err(SkuaError::InvalidArgument(
                "pooled t test needs nx + ny >= 3".into(),
            ));
        }
        let (mx, my) = (mean(x), mean(y));
        let ssx: f64 = x.iter().map(|&v| (v - mx) * (v - mx)).sum();
        let ssy: f64 = y.iter().map(|&v| (v - my) * (v - my)).sum();
        let df = (nx + ny - 2) as f64;
        let pooled = (ssx + ssy) / df;
        if pooled == 0.0 {
            return Err(SkuaError::Degenerate(
                "zero-variance samples: the t statistic is undefined".into(),
            ));
        }
        let stderr = (pooled * (1.0 / nx as f64 + 1.0 / ny as f64)).sqrt();
        let xbar = mx - my;
        Ok(EqualVarianceTTest { nx, ny, xbar, stderr, t: xbar / stderr, df })
    }
}

impl HypothesisTest for EqualVarianceTTest {
    fn test_name(&self) -> &'static str {
        "Two sample t-test (equal variance)"
    }

    fn statistic(&self) -> f64 {
        self.t
    }

    fn degrees_of_freedom(&self) -> Option<f64> {
        Some(self.df)
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        t_pvalue(self.t, self.df, tail)
    }
}

impl ConfidenceInterval for EqualVarianceTTest {
    fn confint(&self, alpha: f64, tail: Tail) -> Result<ConfInt> {
        t_confint(self.xbar, self.stderr, self.df, alpha, tail)
    }
}

impl Estimate for EqualVarianceTTest {
    fn estimate(&self) -> f64 {
        self.xbar
    }
}

impl Summarizable for EqualVarianceTTest {
    fn summary(&self) -> String {
        format!(
            "{}: t = {:.4}, df = {}, p = {:.4}",
            self.test_name(),
            self.t,
            self.df,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

/// Two-sample t test without the equal-variance assumption (Welch).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnequalVarianceTTest {
    pub nx: usize,
    pub ny: usize,
    /// Difference of the sample means.
    pub xbar: f64,
    /// Standard error of the mean difference.
    pub stderr: f64,
    /// t statistic.
    pub t: f64,
    /// Welch-Satterthwaite degrees of freedom.
    pub df: f64,
}

impl UnequalVarianceTTest {
    /// Test whether the means of `x` and `y` are equal without assuming a
    /// shared variance.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        check_sample("x", x)?;
        check_sample("y", y)?;
        let (nx, ny) = (x.len(), y.len());
        if nx < 2 || ny < 2 {
            return Err(SkuaError::InvalidArgument(
                "Welch t test needs at least two observations per sample".into(),
            ));
        }
        let (vx, vy) = (variance(x, 1), variance(y, 1));
        let (fx, fy) = (vx / nx as f64, vy / ny as f64);
        if fx + fy == 0.0 {
            return Err(SkuaError::Degenerate(
                "zero-variance samples: the t statistic is undefined".into(),
            ));
        }
        let stderr = (fx + fy).sqrt();
        let df = (fx + fy) * (fx + fy)
            / (fx * fx / (nx - 1) as f64 + fy * fy / (ny - 1) as f64);
        let xbar = mean(x) - mean(y);
        Ok(UnequalVarianceTTest { nx, ny, xbar, stderr, t: xbar / stderr, df })
    }
}

impl HypothesisTest for UnequalVarianceTTest {
    fn test_name(&self) -> &'static str {
        "Two sample t-test (unequal variance)"
    }

    fn statistic(&self) -> f64 {
        self.t
    }

    fn degrees_of_freedom(&self) -> Option<f64> {
        Some(self.df)
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        t_pvalue(self.t, self.df, tail)
    }
}

impl ConfidenceInterval for UnequalVarianceTTest {
    fn confint(&self, alpha: f64, tail: Tail) -> Result<ConfInt> {
        t_confint(self.xbar, self.stderr, self.df, alpha, tail)
    }
}

impl Estimate for UnequalVarianceTTest {
    fn estimate(&self) -> f64 {
        self.xbar
    }
}

impl Summarizable for UnequalVarianceTTest {
    fn summary(&self) -> String {
        format!(
            "{}: t = {:.4}, df = {:.2}, p = {:.4}",
            self.test_name(),
            self.t,
            self.df,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Shared t machinery ─────────────────────────────────────────────────────

fn t_pvalue(t: f64, df: f64, tail: Tail) -> Result<f64> {
    let reference = dist::students_t(df)?;
    Ok(tail_from_cdf(reference.cdf(t), tail))
}

/// Interval for the location parameter: estimate ± t quantile × stderr,
/// opened on one side for one-sided tails.
fn t_confint(estimate: f64, stderr: f64, df: f64, alpha: f64, tail: Tail) -> Result<ConfInt> {
    check_alpha(alpha)?;
    let reference = dist::students_t(df)?;
    let (lower, upper) = match tail {
        Tail::Both => {
            let q = reference.inverse_cdf(1.0 - alpha / 2.0);
            (estimate - q * stderr, estimate + q * stderr)
        }
        Tail::Left => {
            let q = reference.inverse_cdf(1.0 - alpha);
            (f64::NEG_INFINITY, estimate + q * stderr)
        }
        Tail::Right => {
            let q = reference.inverse_cdf(1.0 - alpha);
            (estimate - q * stderr, f64::INFINITY)
        }
    };
    Ok(ConfInt { lower, upper, coverage: 1.0 - alpha, method: "t" })
}

// ── Tests ──────────────────────────────────────────────────────────────────
