//! Shared vocabulary for hypothesis tests: alternative tails, p-value
//! combination, confidence intervals, and the capability traits every test
//! family implements.
//!
//! Tests are immutable value types holding sufficient statistics. Once a
//! test is constructed, `pvalue` and `confint` never need the original data
//! again.

use skua_core::{Result, SkuaError};

/// Direction of the alternative hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tail {
    /// The parameter is below its null value.
    Left,
    /// The parameter is above its null value.
    Right,
    /// Two-sided alternative.
    Both,
}

/// A confidence interval tagged with its nominal coverage and the method
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfInt {
    pub lower: f64,
    pub upper: f64,
    /// Nominal coverage, `1 - alpha`.
    pub coverage: f64,
    /// Short name of the construction method, e.g. `"clopper_pearson"`.
    pub method: &'static str,
}

impl ConfInt {
    /// Whether `value` lies inside the closed interval.
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Common interface over all test families.
pub trait HypothesisTest {
    /// Human-readable test name.
    fn test_name(&self) -> &'static str;

    /// The test statistic.
    fn statistic(&self) -> f64;

    /// Degrees of freedom of the reference distribution, where one exists.
    fn degrees_of_freedom(&self) -> Option<f64> {
        None
    }

    /// The conventional alternative for this family: `Both` for location
    /// tests, `Right` for chi-squared and F families, `Left` for unit-root
    /// tests.
    fn default_tail(&self) -> Tail {
        Tail::Both
    }

    /// p-value under the given alternative.
    fn pvalue(&self, tail: Tail) -> Result<f64>;

    /// p-value under [`default_tail`](Self::default_tail).
    fn default_pvalue(&self) -> Result<f64> {
        self.pvalue(self.default_tail())
    }
}

/// Tests whose parameter admits an interval estimate.
pub trait ConfidenceInterval: HypothesisTest {
    /// Interval with nominal coverage `1 - alpha`.
    ///
    /// One-sided tails give the half-open doubled-alpha construction, with
    /// the free endpoint at the boundary of the parameter space.
    fn confint(&self, alpha: f64, tail: Tail) -> Result<ConfInt>;
}

// ── Tail policy ────────────────────────────────────────────────────────────

/// Relative slack when comparing outcome probabilities in minimum-likelihood
/// two-sided sums. Outcomes whose null probability is within this factor of
/// the observed outcome's probability still count as "at least as extreme",
/// so ties in the pmf are not lost to rounding.
pub(crate) const MINLIKE_REL_EPS: f64 = 1e-7;

/// Combine one-sided p-values into the requested tail.
///
/// The two-sided value doubles the smaller tail and caps at 1. Discrete
/// families with a sharper two-sided rule (minimum likelihood) compute it
/// directly instead of going through here.
pub(crate) fn combine_tails(p_left: f64, p_right: f64, tail: Tail) -> f64 {
    match tail {
        Tail::Left => p_left,
        Tail::Right => p_right,
        Tail::Both => (2.0 * p_left.min(p_right)).min(1.0),
    }
}

/// Tail resolution for a continuous reference, given the CDF at the
/// observed statistic.
pub(crate) fn tail_from_cdf(cdf: f64, tail: Tail) -> f64 {
    combine_tails(cdf, 1.0 - cdf, tail)
}

// ── Validation helpers ─────────────────────────────────────────────────────

/// Reject alpha outside the open unit interval.
pub(crate) fn check_alpha(alpha: f64) -> Result<()> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(SkuaError::InvalidArgument(format!(
            "alpha must lie in (0, 1), got {alpha}"
        )));
    }
    Ok(())
}

/// Reject empty samples and non-finite values.
pub(crate) fn check_sample(name: &str, xs: &[f64]) -> Result<()> {
    if xs.is_empty() {
        return Err(SkuaError::InvalidArgument(format!(
            "{name} must not be empty"
        )));
    }
    if let Some(bad) = xs.iter().find(|v| !v.is_finite()) {
        return Err(SkuaError::InvalidArgument(format!(
            "{name} contains a non-finite value ({bad})"
        )));
    }
    Ok(())
}

/// Reject mismatched paired samples.
pub(crate) fn check_paired(x: &[f64], y: &[f64]) -> Result<()> {
    check_sample("x", x)?;
    check_sample("y", y)?;
    if x.len() != y.len() {
        return Err(SkuaError::InvalidArgument(format!(
            "paired samples must have equal length ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────
