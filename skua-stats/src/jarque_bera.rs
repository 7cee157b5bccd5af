//! Jarque-Bera normality test from sample skewness and kurtosis.
//!
//! The chi-squared(2) reference is asymptotic and noticeably conservative
//! for small n; no finite-sample correction is applied.

use skua_core::{Result, SkuaError, Summarizable};
use statrs::distribution::ContinuousCDF;

use crate::descriptive::{kurtosis, skewness};
use crate::dist;
use crate::hypothesis::{check_sample, tail_from_cdf, HypothesisTest, Tail};

/// Jarque-Bera test of composite normality.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JarqueBeraTest {
    /// Sample size.
    pub n: usize,
    /// Sample skewness.
    pub skewness: f64,
    /// Sample kurtosis (not excess).
    pub kurtosis: f64,
    /// The JB statistic.
    pub jb: f64,
}

impl JarqueBeraTest {
    /// Test whether `y` is compatible with a normal distribution.
    pub fn new(y: &[f64]) -> Result<Self> {
        check_sample("y", y)?;
        let skew = skewness(y);
        let kurt = kurtosis(y);
        if !skew.is_finite() || !kurt.is_finite() {
            return Err(SkuaError::Degenerate(
                "zero-variance sample: skewness and kurtosis are undefined".into(),
            ));
        }
        let n = y.len();
        let jb = n as f64 / 6.0 * (skew * skew + (kurt - 3.0) * (kurt - 3.0) / 4.0);
        Ok(JarqueBeraTest { n, skewness: skew, kurtosis: kurt, jb })
    }
}

impl HypothesisTest for JarqueBeraTest {
    fn test_name(&self) -> &'static str {
        "Jarque-Bera normality test"
    }

    fn statistic(&self) -> f64 {
        self.jb
    }

    fn degrees_of_freedom(&self) -> Option<f64> {
        Some(2.0)
    }

    fn default_tail(&self) -> Tail {
        Tail::Right
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        let reference = dist::chi_squared(2.0)?;
        Ok(tail_from_cdf(reference.cdf(self.jb), tail))
    }
}

impl Summarizable for JarqueBeraTest {
    fn summary(&self) -> String {
        format!(
            "{}: JB = {:.4}, skewness = {:.4}, kurtosis = {:.4}, p = {:.4}",
            self.test_name(),
            self.jb,
            self.skewness,
            self.kurtosis,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_ladder() {
        // 1..5 has skewness 0 and kurtosis 1.7, so JB = 5/6 * 1.69/4.
        let test = JarqueBeraTest::new(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(test.skewness.abs() < 1e-12);
        assert!((test.kurtosis - 1.7).abs() < 1e-12);
        assert!((test.jb - 0.3520833).abs() < 1e-6);
        // chi-squared(2) right tail is exp(-x/2).
        let p = test.default_pvalue().unwrap();
        assert!((p - (-test.jb / 2.0).exp()).abs() < 1e-10, "p = {p}");
    }

    #[test]
    fn skew_raises_the_statistic() {
        let symmetric = JarqueBeraTest::new(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let skewed = JarqueBeraTest::new(&[1.0, 1.5, 2.0, 2.5, 30.0]).unwrap();
        assert!(skewed.skewness > 1.0);
        assert!(skewed.jb > symmetric.jb);
        assert!(skewed.default_pvalue().unwrap() < symmetric.default_pvalue().unwrap());
    }

    #[test]
    fn tails_complement() {
        let test = JarqueBeraTest::new(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let pl = test.pvalue(Tail::Left).unwrap();
        let pr = test.pvalue(Tail::Right).unwrap();
        assert!((pl + pr - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_input_is_degenerate() {
        let err = JarqueBeraTest::new(&[4.0, 4.0, 4.0, 4.0]);
        assert!(matches!(err, Err(SkuaError::Degenerate(_))));
    }
}
