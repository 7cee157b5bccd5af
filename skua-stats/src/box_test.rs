//! Box-Pierce and Ljung-Box portmanteau tests for serial correlation.
//!
//! Both accumulate squared sample autocorrelations up to `lag`; Ljung-Box
//! weights them by n(n+2)/(n-k) for better small-sample calibration. The
//! `dof` argument discounts parameters of a previously fitted model, so
//! the reference is chi-squared with lag - dof degrees of freedom.

use skua_core::{Result, SkuaError, Summarizable};
use statrs::distribution::ContinuousCDF;

use crate::descriptive::mean;
use crate::dist;
use crate::hypothesis::{check_sample, tail_from_cdf, HypothesisTest, Tail};

/// Box-Pierce test, Q = n Σ r_k².
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoxPierceTest {
    pub n: usize,
    pub lag: usize,
    /// Fitted-model parameters discounted from the degrees of freedom.
    pub dof: usize,
    /// The Q statistic.
    pub q: f64,
}

/// Ljung-Box test, Q = n(n+2) Σ r_k²/(n−k).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LjungBoxTest {
    pub n: usize,
    pub lag: usize,
    /// Fitted-model parameters discounted from the degrees of freedom.
    pub dof: usize,
    /// The Q statistic.
    pub q: f64,
}

impl BoxPierceTest {
    /// Test `y` for autocorrelation up to `lag`.
    pub fn new(y: &[f64], lag: usize, dof: usize) -> Result<Self> {
        let r = autocorrelations(y, lag, dof)?;
        let n = y.len() as f64;
        let q = n * r.iter().map(|&rk| rk * rk).sum::<f64>();
        Ok(BoxPierceTest { n: y.len(), lag, dof, q })
    }
}

impl LjungBoxTest {
    /// Test `y` for autocorrelation up to `lag`.
    pub fn new(y: &[f64], lag: usize, dof: usize) -> Result<Self> {
        let r = autocorrelations(y, lag, dof)?;
        let n = y.len() as f64;
        let q = n
            * (n + 2.0)
            * r.iter()
                .enumerate()
                .map(|(i, &rk)| rk * rk / (n - (i + 1) as f64))
                .sum::<f64>();
        Ok(LjungBoxTest { n: y.len(), lag, dof, q })
    }
}

/// Demeaned sample autocorrelations r_1..r_lag, plus the shared argument
/// checks for both portmanteau statistics.
fn autocorrelations(y: &[f64], lag: usize, dof: usize) -> Result<Vec<f64>> {
    check_sample("y", y)?;
    let n = y.len();
    if lag == 0 || lag >= n {
        return Err(SkuaError::InvalidArgument(format!(
            "lag must satisfy 1 <= lag < n, got lag {lag} with n {n}"
        )));
    }
    if dof >= lag {
        return Err(SkuaError::InvalidArgument(format!(
            "dof ({dof}) must be smaller than lag ({lag})"
        )));
    }

    let m = mean(y);
    let denom: f64 = y.iter().map(|&v| (v - m) * (v - m)).sum();
    if denom == 0.0 {
        return Err(SkuaError::Degenerate(
            "constant series: autocorrelations are undefined".into(),
        ));
    }
    let mut r = Vec::with_capacity(lag);
    for k in 1..=lag {
        let num: f64 = (k..n).map(|t| (y[t] - m) * (y[t - k] - m)).sum();
        r.push(num / denom);
    }
    Ok(r)
}

/// Both portmanteau statistics share the chi-squared reference and differ
/// only in how Q is accumulated, so the trait impls are macro-generated.
macro_rules! portmanteau_test_impl {
    ($ty:ident, $name:expr) => {
        impl HypothesisTest for $ty {
            fn test_name(&self) -> &'static str {
                $name
            }

            fn statistic(&self) -> f64 {
                self.q
            }

            fn degrees_of_freedom(&self) -> Option<f64> {
                Some((self.lag - self.dof) as f64)
            }

            fn default_tail(&self) -> Tail {
                Tail::Right
            }

            fn pvalue(&self, tail: Tail) -> Result<f64> {
                let reference = dist::chi_squared((self.lag - self.dof) as f64)?;
                Ok(tail_from_cdf(reference.cdf(self.q), tail))
            }
        }

        impl Summarizable for $ty {
            fn summary(&self) -> String {
                format!(
                    "{}: Q = {:.4}, df = {}, p = {:.4}",
                    self.test_name(),
                    self.q,
                    self.lag - self.dof,
                    self.default_pvalue().unwrap_or(f64::NAN)
                )
            }
        }
    };
}

portmanteau_test_impl!(BoxPierceTest, "Box-Pierce test");
portmanteau_test_impl!(LjungBoxTest, "Ljung-Box test");

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const Y: [f64; 5] = [1.0, 2.0, 3.0, 2.0, 1.0];

    #[test]
    fn autocorrelations_of_the_tent() {
        // Mean 1.8, denominator 2.8, lag-1 numerator 0.16, lag-2 -1.88.
        let r = autocorrelations(&Y, 2, 0).unwrap();
        assert!((r[0] - 0.0571429).abs() < 1e-6);
        assert!((r[1] + 0.6714286).abs() < 1e-6);
    }

    #[test]
    fn box_pierce_statistic() {
        let test = BoxPierceTest::new(&Y, 2, 0).unwrap();
        assert!((test.q - 2.27041).abs() < 1e-5, "q = {}", test.q);
        assert_eq!(test.degrees_of_freedom(), Some(2.0));
        // chi-squared(2) right tail is exp(-q/2).
        let p = test.default_pvalue().unwrap();
        assert!((p - (-test.q / 2.0).exp()).abs() < 1e-10, "p = {p}");
    }

    #[test]
    fn ljung_box_statistic() {
        let test = LjungBoxTest::new(&Y, 2, 0).unwrap();
        assert!((test.q - 5.28810).abs() < 1e-5, "q = {}", test.q);
        let p = test.default_pvalue().unwrap();
        assert!((p - (-test.q / 2.0).exp()).abs() < 1e-10, "p = {p}");
        // The Ljung-Box reweighting always exceeds plain Box-Pierce.
        let bp = BoxPierceTest::new(&Y, 2, 0).unwrap();
        assert!(test.q > bp.q);
    }

    #[test]
    fn discounted_degrees_of_freedom() {
        let y: Vec<f64> = (0..20).map(|i| ((i * 7) % 11) as f64).collect();
        let test = LjungBoxTest::new(&y, 4, 2).unwrap();
        assert_eq!(test.degrees_of_freedom(), Some(2.0));
    }

    #[test]
    fn a_trend_is_strongly_autocorrelated() {
        let y: Vec<f64> = (1..=20).map(f64::from).collect();
        let test = LjungBoxTest::new(&y, 1, 0).unwrap();
        assert!(test.default_pvalue().unwrap() < 0.01);
    }

    #[test]
    fn argument_checks() {
        assert!(matches!(
            BoxPierceTest::new(&Y, 0, 0),
            Err(SkuaError::InvalidArgument(_))
        ));
        assert!(matches!(
            BoxPierceTest::new(&Y, 5, 0),
            Err(SkuaError::InvalidArgument(_))
        ));
        assert!(matches!(
            LjungBoxTest::new(&Y, 2, 2),
            Err(SkuaError::InvalidArgument(_))
        ));
        assert!(matches!(
            LjungBoxTest::new(&[3.0; 6], 2, 0),
            Err(SkuaError::Degenerate(_))
        ));
    }
}
