//! Breusch-Godfrey test for serial correlation in regression residuals.
//!
//! The residuals are regressed on the original design augmented with their
//! own lags; under the null of no serial correlation n·R² of that auxiliary
//! fit is asymptotically chi-squared with `lag` degrees of freedom.

use skua_core::{Result, SkuaError, Summarizable};
use statrs::distribution::ContinuousCDF;

use crate::dist;
use crate::hypothesis::{check_sample, tail_from_cdf, HypothesisTest, Tail};
use crate::linalg;

/// Breusch-Godfrey serial correlation test.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BreuschGodfreyTest {
    /// Observations entering the auxiliary regression.
    pub n: usize,
    /// Number of residual lags tested.
    pub lag: usize,
    /// The n·R² statistic.
    pub bg: f64,
}

impl BreuschGodfreyTest {
    /// Test the `residuals` of a fit on the n×k row-major design `xmat` for
    /// autocorrelation up to order `lag`.
    ///
    /// With `start0` the pre-sample lagged residuals are set to zero and all
    /// n observations are kept; otherwise the first `lag` rows are dropped.
    pub fn new(
        xmat: &[f64],
        n: usize,
        k: usize,
        residuals: &[f64],
        lag: usize,
        start0: bool,
    ) -> Result<Self> {
        check_sample("residuals", residuals)?;
        if residuals.len() != n || xmat.len() != n * k {
            return Err(SkuaError::InvalidArgument(format!(
                "design and residual dimensions disagree (n = {n}, k = {k}, \
                 xmat = {}, residuals = {})",
                xmat.len(),
                residuals.len()
            )));
        }
        if lag == 0 || lag >= n {
            return Err(SkuaError::InvalidArgument(format!(
                "lag must satisfy 1 <= lag < n, got lag {lag} with n {n}"
            )));
        }

        let offset = if start0 { 0 } else { lag };
        let n_eff = n - offset;
        let k_aux = k + lag;

        // [X | lagged residuals], pre-sample lags zero-filled.
        let mut regmat = Vec::with_capacity(n_eff * k_aux);
        for t in offset..n {
            regmat.extend_from_slice(&xmat[t * k..(t + 1) * k]);
            for j in 1..=lag {
                regmat.push(if t >= j { residuals[t - j] } else { 0.0 });
            }
        }
        let response = &residuals[offset..];

        let fit = linalg::ols(&regmat, n_eff, k_aux, response)?;
        let rss: f64 = fit.residuals.iter().map(|r| r * r).sum();
        let tss: f64 = response.iter().map(|e| e * e).sum();
        if tss == 0.0 {
            return Err(SkuaError::Degenerate(
                "all residuals are zero: R-squared is undefined".into(),
            ));
        }

        // Uncentered R-squared; the residuals of an intercept fit already
        // have mean zero.
        let rsq = 1.0 - rss / tss;
        Ok(BreuschGodfreyTest { n: n_eff, lag, bg: n_eff as f64 * rsq })
    }
}

impl HypothesisTest for BreuschGodfreyTest {
    fn test_name(&self) -> &'static str {
        "Breusch-Godfrey test"
    }

    fn statistic(&self) -> f64 {
        self.bg
    }

    fn degrees_of_freedom(&self) -> Option<f64> {
        Some(self.lag as f64)
    }

    fn default_tail(&self) -> Tail {
        Tail::Right
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        let reference = dist::chi_squared(self.lag as f64)?;
        Ok(tail_from_cdf(reference.cdf(self.bg), tail))
    }
}

impl Summarizable for BreuschGodfreyTest {
    fn summary(&self) -> String {
        format!(
            "{}: BG = {:.4}, lag = {}, p = {:.4}",
            self.test_name(),
            self.bg,
            self.lag,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
