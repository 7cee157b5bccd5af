//! F tests: the two-sample variance ratio test and one-way analysis of
//! variance across two or more groups.

use skua_core::{Estimate, Result, SkuaError, Summarizable};
use statrs::distribution::ContinuousCDF;

use crate::descriptive::{mean, variance};
use crate::dist;
use crate::hypothesis::{check_sample, tail_from_cdf, HypothesisTest, Tail};

/// F test of equality of two population variances.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarianceFTest {
    pub nx: usize,
    pub ny: usize,
    /// Numerator degrees of freedom, nx − 1.
    pub df_x: f64,
    /// Denominator degrees of freedom, ny − 1.
    pub df_y: f64,
    /// Ratio of the sample variances, var(x) / var(y).
    pub f: f64,
}

impl VarianceFTest {
    /// Test whether `x` and `y` have the same variance.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        check_sample("x", x)?;
        check_sample("y", y)?;
        let (nx, ny) = (x.len(), y.len());
        if nx < 2 || ny < 2 {
            return Err(SkuaError::InvalidArgument(
                "variance F test needs at least two observations per sample".into(),
            ));
        }
        let vy = variance(y, 1);
        if vy == 0.0 {
            return Err(SkuaError::Degenerate(
                "zero-variance denominator sample: the F ratio is undefined".into(),
            ));
        }
        Ok(VarianceFTest {
            nx,
            ny,
            df_x: (nx - 1) as f64,
            df_y: (ny - 1) as f64,
            f: variance(x, 1) / vy,
        })
    }
}

impl HypothesisTest for VarianceFTest {
    fn test_name(&self) -> &'static str {
        "Variance F-test"
    }

    fn statistic(&self) -> f64 {
        self.f
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        let reference = dist::fisher_f(self.df_x, self.df_y)?;
        Ok(tail_from_cdf(reference.cdf(self.f), tail))
    }
}

impl Estimate for VarianceFTest {
    fn estimate(&self) -> f64 {
        self.f
    }
}

impl Summarizable for VarianceFTest {
    fn summary(&self) -> String {
        format!(
            "{}: F = {:.4}, df = ({}, {}), p = {:.4}",
            self.test_name(),
            self.f,
            self.df_x,
            self.df_y,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

/// One-way fixed-effects analysis of variance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OneWayAnovaTest {
    /// Observations per group.
    pub group_sizes: Vec<usize>,
    /// Total observation count.
    pub n: usize,
    /// Between-group sum of squares.
    pub ss_between: f64,
    /// Within-group sum of squares.
    pub ss_within: f64,
    /// Numerator degrees of freedom, k − 1.
    pub df_between: f64,
    /// Denominator degrees of freedom, n − k.
    pub df_within: f64,
    /// Ratio of the mean squares.
    pub f: f64,
}

impl OneWayAnovaTest {
    /// Test whether the group means are all equal.
    pub fn new(groups: &[&[f64]]) -> Result<Self> {
        let k = groups.len();
        if k < 2 {
            return Err(SkuaError::InvalidArgument(format!(
                "analysis of variance needs at least two groups, got {k}"
            )));
        }
        for (i, g) in groups.iter().enumerate() {
            check_sample(&format!("group {i}"), g)?;
        }
        let group_sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        let n: usize = group_sizes.iter().sum();
        if n <= k {
            return Err(SkuaError::InvalidArgument(format!(
                "analysis of variance needs more observations ({n}) than groups ({k})"
            )));
        }

        let grand = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / n as f64;
        let mut ss_between = 0.0;
        let mut ss_within = 0.0;
        for g in groups {
            let m = mean(g);
            ss_between += g.len() as f64 * (m - grand) * (m - grand);
            ss_within += g.iter().map(|&v| (v - m) * (v - m)).sum::<f64>();
        }

        let df_between = (k - 1) as f64;
        let df_within = (n - k) as f64;
        if ss_within == 0.0 {
            return Err(SkuaError::Degenerate(
                "zero within-group variance: the F ratio is undefined".into(),
            ));
        }
        Ok(OneWayAnovaTest {
            group_sizes,
            n,
            ss_between,
            ss_within,
            df_between,
            df_within,
            f: (ss_between / df_between) / (ss_within / df_within),
        })
    }
}

impl HypothesisTest for OneWayAnovaTest {
    fn test_name(&self) -> &'static str {
        "One-way ANOVA test"
    }

    fn statistic(&self) -> f64 {
        self.f
    }

    /// Numerator degrees of freedom; the denominator is `df_within`.
    fn degrees_of_freedom(&self) -> Option<f64> {
        Some(self.df_between)
    }

    fn default_tail(&self) -> Tail {
        Tail::Right
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        let reference = dist::fisher_f(self.df_between, self.df_within)?;
        Ok(tail_from_cdf(reference.cdf(self.f), tail))
    }
}

impl Summarizable for OneWayAnovaTest {
    fn summary(&self) -> String {
        format!(
            "{}: F = {:.4}, df = ({}, {}), p = {:.4}",
            self.test_name(),
            self.f,
            self.df_between,
            self.df_within,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
