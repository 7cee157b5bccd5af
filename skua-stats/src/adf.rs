//! Augmented Dickey-Fuller unit root test.
//!
//! Regresses the first difference of the series on its lagged level, lagged
//! differences, and the chosen deterministic terms. The tau statistic is
//! compared against MacKinnon's response-surface critical values (2010) and
//! converted to a p-value with the MacKinnon (1994) regression surface.

use skua_core::{Result, SkuaError, Summarizable};
use statrs::distribution::ContinuousCDF;

use crate::dist;
use crate::hypothesis::{check_sample, combine_tails, HypothesisTest, Tail};
use crate::linalg;

/// Deterministic terms included in the unit root regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Deterministic {
    /// No deterministic terms.
    None,
    /// Intercept only.
    Constant,
    /// Intercept and linear trend.
    Trend,
    /// Intercept, linear and squared trend.
    SquaredTrend,
}

impl Deterministic {
    fn term_count(self) -> usize {
        match self {
            Deterministic::None => 0,
            Deterministic::Constant => 1,
            Deterministic::Trend => 2,
            Deterministic::SquaredTrend => 3,
        }
    }
}

/// Augmented Dickey-Fuller test for a unit root.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ADFTest {
    pub deterministic: Deterministic,
    /// Number of lagged differences in the regression.
    pub lag: usize,
    /// Observations entering the regression, len(y) − 1 − lag.
    pub n: usize,
    /// Estimated coefficient on the lagged level.
    pub coefficient: f64,
    /// The tau statistic.
    pub stat: f64,
    /// Critical values at the 1, 5, and 10 percent levels for this design
    /// and sample size.
    pub cv: [f64; 3],
}

impl ADFTest {
    /// Test `y` for a unit root with `lag` augmenting differences.
    pub fn new(y: &[f64], deterministic: Deterministic, lag: usize) -> Result<Self> {
        check_sample("y", y)?;
        let nobs = y.len();
        let k = 1 + lag + deterministic.term_count();
        if nobs < lag + 2 + k {
            return Err(SkuaError::InvalidArgument(format!(
                "series of length {nobs} is too short for lag {lag} with \
                 {} deterministic terms",
                deterministic.term_count()
            )));
        }

        let deltas: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();
        let n_reg = nobs - 1 - lag;

        let mut x = Vec::with_capacity(n_reg * k);
        let mut response = Vec::with_capacity(n_reg);
        for i in 0..n_reg {
            response.push(deltas[lag + i]);
            x.push(y[lag + i]);
            for back in 1..=lag {
                x.push(deltas[lag + i - back]);
            }
            let t = (i + 1) as f64;
            match deterministic {
                Deterministic::None => {}
                Deterministic::Constant => x.push(1.0),
                Deterministic::Trend => {
                    x.push(1.0);
                    x.push(t);
                }
                Deterministic::SquaredTrend => {
                    x.push(1.0);
                    x.push(t);
                    x.push(t * t);
                }
            }
        }

        let fit = linalg::ols(&x, n_reg, k, &response)?;
        if fit.se[0] == 0.0 {
            return Err(SkuaError::Degenerate(
                "the unit root regression fits exactly: tau is undefined".into(),
            ));
        }
        Ok(ADFTest {
            deterministic,
            lag,
            n: n_reg,
            coefficient: fit.coef[0],
            stat: fit.coef[0] / fit.se[0],
            cv: critical_values(n_reg as f64, deterministic),
        })
    }
}

impl HypothesisTest for ADFTest {
    fn test_name(&self) -> &'static str {
        "Augmented Dickey-Fuller test"
    }

    fn statistic(&self) -> f64 {
        self.stat
    }

    /// A unit root is rejected for strongly negative tau, so the left tail
    /// is the default.
    fn default_tail(&self) -> Tail {
        Tail::Left
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        let left = mackinnon_pvalue(self.stat, self.deterministic);
        Ok(combine_tails(left, 1.0 - left, tail))
    }
}

impl Summarizable for ADFTest {
    fn summary(&self) -> String {
        format!(
            "{}: tau = {:.4}, lag = {}, n = {}, p = {:.4}, cv(1/5/10%) = \
             ({:.3}, {:.3}, {:.3})",
            self.test_name(),
            self.stat,
            self.lag,
            self.n,
            self.default_pvalue().unwrap_or(f64::NAN),
            self.cv[0],
            self.cv[1],
            self.cv[2],
        )
    }
}

// ── MacKinnon surfaces ─────────────────────────────────────────────────────

/// Critical values at the 1, 5, and 10 percent levels from the MacKinnon
/// (2010) response surfaces, at regression sample size `n`.
fn critical_values(n: f64, det: Deterministic) -> [f64; 3] {
    let rows: [[f64; 4]; 3] = match det {
        Deterministic::None => [
            [-2.56574, -2.2358, -3.627, 0.0],
            [-1.94100, -0.2686, -3.365, 31.223],
            [-1.61682, 0.2656, -2.714, 25.364],
        ],
        Deterministic::Constant => [
            [-3.43035, -6.5393, -16.786, -79.433],
            [-2.86154, -2.8903, -4.234, -40.040],
            [-2.56677, -1.5384, -2.809, 0.0],
        ],
        Deterministic::Trend => [
            [-3.95877, -9.0531, -28.428, -134.155],
            [-3.41049, -4.3904, -9.036, -45.374],
            [-3.12705, -2.5856, -3.925, -22.380],
        ],
        Deterministic::SquaredTrend => [
            [-4.37113, -11.5882, -35.5199, -334.047],
            [-3.83239, -5.9057, -12.490, -118.284],
            [-3.55326, -3.6596, -5.293, -63.559],
        ],
    };
    rows.map(|b| b[0] + b[1] / n + b[2] / (n * n) + b[3] / (n * n * n))
}

/// Left-tail p-value from the MacKinnon (1994) regression surface for the
/// asymptotic tau distribution.
fn mackinnon_pvalue(tau: f64, det: Deterministic) -> f64 {
    let (star, floor, cap) = match det {
        Deterministic::None => (-1.04, -19.04, f64::INFINITY),
        Deterministic::Constant => (-1.61, -18.83, 2.74),
        Deterministic::Trend => (-2.89, -16.18, 0.70),
        Deterministic::SquaredTrend => (-3.21, -17.17, 0.54),
    };
    if tau > cap {
        return 1.0;
    }
    if tau < floor {
        return 0.0;
    }

    let z = if tau <= star {
        let c = match det {
            Deterministic::None => [0.6344, 1.2378, 3.2496e-2],
            Deterministic::Constant => [2.1659, 1.4412, 3.8269e-2],
            Deterministic::Trend => [3.2512, 1.6047, 4.9588e-2],
            Deterministic::SquaredTrend => [4.0003, 1.658, 4.8288e-2],
        };
        (c[2] * tau + c[1]) * tau + c[0]
    } else {
        let c = match det {
            Deterministic::None => [0.4797, 9.3557e-1, -6.999e-2, 3.3066e-2],
            Deterministic::Constant => [1.7339, 9.3202e-1, -1.2745e-1, -1.0368e-2],
            Deterministic::Trend => [2.5261, 6.1654e-1, -3.7956e-1, -6.0285e-2],
            Deterministic::SquaredTrend => [3.0778, 4.9529e-1, -4.1477e-1, -5.9359e-2],
        };
        ((c[3] * tau + c[2]) * tau + c[1]) * tau + c[0]
    };
    dist::std_normal().cdf(z)
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic noise in roughly (-1, 1).
    fn lcg_noise(len: usize, mut state: u64) -> Vec<f64> {
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            out.push((state >> 33) as f64 / f64::from(1u32 << 30) - 1.0);
        }
        out
    }

    #[test]
    fn pvalue_surface_recovers_the_nominal_levels() {
        // Plugging the asymptotic critical values back into the p-value
        // regression reproduces the levels they were fitted at.
        let five = [
            (Deterministic::None, -1.94100),
            (Deterministic::Constant, -2.86154),
            (Deterministic::Trend, -3.41049),
            (Deterministic::SquaredTrend, -3.83239),
        ];
        for (det, tau) in five {
            let p = mackinnon_pvalue(tau, det);
            assert!((p - 0.05).abs() < 1e-3, "{det:?}: p = {p}");
        }
        assert!((mackinnon_pvalue(-2.56574, Deterministic::None) - 0.01).abs() < 5e-4);
        assert!((mackinnon_pvalue(-1.61682, Deterministic::None) - 0.10).abs() < 1e-3);
        // Saturation outside the fitted range.
        assert_eq!(mackinnon_pvalue(3.0, Deterministic::Constant), 1.0);
        assert_eq!(mackinnon_pvalue(-20.0, Deterministic::Constant), 0.0);
    }

    #[test]
    fn critical_values_shift_with_sample_size() {
        let asymptotic = critical_values(f64::INFINITY, Deterministic::Constant);
        assert!((asymptotic[1] + 2.86154).abs() < 1e-10);
        let small = critical_values(25.0, Deterministic::Constant);
        // -2.86154 - 2.8903/25 - 4.234/625 - 40.040/15625
        assert!((small[1] + 2.98649).abs() < 1e-4, "cv = {}", small[1]);
        for cv in [asymptotic, small] {
            assert!(cv[0] < cv[1] && cv[1] < cv[2]);
        }
    }

    #[test]
    fn stationary_series_rejects_the_unit_root() {
        let noise = lcg_noise(200, 42);
        let mut ar = vec![noise[0]];
        for t in 1..200 {
            ar.push(0.5 * ar[t - 1] + noise[t]);
        }
        let test = ADFTest::new(&ar, Deterministic::Constant, 0).unwrap();
        assert_eq!(test.n, 199);
        // The level coefficient estimates phi - 1, far below zero.
        assert!(test.coefficient < -0.2);
        assert!(test.stat < test.cv[0], "tau = {}", test.stat);
        assert!(test.default_pvalue().unwrap() < 0.01);

        let mut walk = vec![noise[0]];
        for t in 1..200 {
            walk.push(walk[t - 1] + noise[t]);
        }
        let rw = ADFTest::new(&walk, Deterministic::Constant, 0).unwrap();
        assert!(rw.default_pvalue().unwrap() > test.default_pvalue().unwrap());
    }

    #[test]
    fn lag_structure_and_dimensions() {
        let noise = lcg_noise(40, 7);
        let y: Vec<f64> = noise
            .iter()
            .enumerate()
            .map(|(t, &u)| 0.05 * t as f64 + u)
            .collect();
        let test = ADFTest::new(&y, Deterministic::Trend, 2).unwrap();
        assert_eq!(test.n, 37);
        assert_eq!(test.lag, 2);
        assert!(test.stat.is_finite());
        let pl = test.pvalue(Tail::Left).unwrap();
        let pr = test.pvalue(Tail::Right).unwrap();
        assert!((pl + pr - 1.0).abs() < 1e-12);
        assert_eq!(pl, test.default_pvalue().unwrap());
    }

    #[test]
    fn constant_series_is_degenerate() {
        // The lagged level of a constant series is collinear with the
        // intercept.
        let err = ADFTest::new(&[5.0; 12], Deterministic::Constant, 0);
        assert!(matches!(err, Err(SkuaError::Degenerate(_))));
    }

    #[test]
    fn short_series_are_rejected_eagerly() {
        let err = ADFTest::new(&[1.0, 2.0, 1.5], Deterministic::SquaredTrend, 0);
        assert!(matches!(err, Err(SkuaError::InvalidArgument(_))));
    }
}
