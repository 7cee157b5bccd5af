//! Fisher's exact test for 2x2 contingency tables.
//!
//! Conditional on both margins, the upper-left cell follows Fisher's
//! non-central hypergeometric distribution with odds ratio omega. All pmf
//! work happens in log space over the conditional support and is
//! renormalized, so lopsided tables do not underflow.

use skua_core::{Estimate, Result, SkuaError, Summarizable};

use crate::combinatorics::ln_choose;
use crate::hypothesis::{
    check_alpha, combine_tails, ConfInt, ConfidenceInterval, HypothesisTest, Tail,
    MINLIKE_REL_EPS,
};

/// Two-sided extremeness criterion for the exact test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FisherPValueMethod {
    /// Twice the smaller one-sided tail, capped at one.
    #[default]
    Central,
    /// Total probability of tables no more likely than the observed one.
    MinLike,
}

/// Fisher's exact test on the table `[[a, b], [c, d]]`.
///
/// A table with a zero margin fixes the cell completely; such tests report a
/// p-value of one, estimate an odds ratio of one, and refuse to build an
/// interval.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FisherExactTest {
    pub a: u64,
    pub b: u64,
    pub c: u64,
    pub d: u64,
    /// Conditional maximum likelihood estimate of the odds ratio, solving
    /// `E[A] = a` under the non-central hypergeometric law.
    pub omega_hat: f64,
    support: CondSupport,
}

impl FisherExactTest {
    pub fn new(a: u64, b: u64, c: u64, d: u64) -> Result<Self> {
        if a + b + c + d == 0 {
            return Err(SkuaError::InvalidArgument("empty 2x2 table".into()));
        }
        let support = CondSupport::new(a, b, c, d);
        let omega_hat = if support.is_single_point() {
            1.0
        } else if support.observed == 0 {
            0.0
        } else if support.observed == support.len() - 1 {
            f64::INFINITY
        } else {
            let target = a as f64;
            bisect_increasing(|lw| support.mean(lw) - target, "conditional MLE")?
        };
        Ok(FisherExactTest { a, b, c, d, omega_hat, support })
    }

    /// p-value under the given alternative and two-sided criterion.
    pub fn pvalue_with(&self, tail: Tail, method: FisherPValueMethod) -> Result<f64> {
        if self.support.is_single_point() {
            return Ok(1.0);
        }
        if let (Tail::Both, FisherPValueMethod::MinLike) = (tail, method) {
            return Ok(self.support.minlike(0.0));
        }
        let (p_left, p_right) = self.support.tails(0.0);
        Ok(combine_tails(p_left, p_right, tail))
    }

    /// Interval for the odds ratio, inverting the central test.
    ///
    /// The minimum-likelihood criterion does not yield intervals here; its
    /// acceptance region need not be connected.
    pub fn confint_with(
        &self,
        alpha: f64,
        tail: Tail,
        method: FisherPValueMethod,
    ) -> Result<ConfInt> {
        check_alpha(alpha)?;
        if method == FisherPValueMethod::MinLike {
            return Err(SkuaError::NotImplemented(
                "Fisher odds ratio interval under the minimum-likelihood criterion".into(),
            ));
        }
        if self.support.is_single_point() {
            return Err(SkuaError::Degenerate(
                "a zero margin fixes the table; the odds ratio is unidentified".into(),
            ));
        }
        let (lower, upper) = match tail {
            Tail::Both => (self.lower_bound(alpha / 2.0)?, self.upper_bound(alpha / 2.0)?),
            Tail::Left => (0.0, self.upper_bound(alpha)?),
            Tail::Right => (self.lower_bound(alpha)?, f64::INFINITY),
        };
        Ok(ConfInt { lower, upper, coverage: 1.0 - alpha, method: "central" })
    }

    /// Odds ratio at which P(A >= a) first reaches `half`.
    fn lower_bound(&self, half: f64) -> Result<f64> {
        if self.support.observed == 0 {
            return Ok(0.0);
        }
        bisect_increasing(
            |lw| self.support.tails(lw).1 - half,
            "Fisher interval lower bound",
        )
    }

    /// Odds ratio at which P(A <= a) last exceeds `half`.
    fn upper_bound(&self, half: f64) -> Result<f64> {
        if self.support.observed == self.support.len() - 1 {
            return Ok(f64::INFINITY);
        }
        bisect_increasing(
            |lw| half - self.support.tails(lw).0,
            "Fisher interval upper bound",
        )
    }
}

impl HypothesisTest for FisherExactTest {
    fn test_name(&self) -> &'static str {
        "Fisher's exact test"
    }

    fn statistic(&self) -> f64 {
        self.a as f64
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        self.pvalue_with(tail, FisherPValueMethod::default())
    }
}

impl ConfidenceInterval for FisherExactTest {
    fn confint(&self, alpha: f64, tail: Tail) -> Result<ConfInt> {
        self.confint_with(alpha, tail, FisherPValueMethod::default())
    }
}

impl Estimate for FisherExactTest {
    fn estimate(&self) -> f64 {
        self.omega_hat
    }
}

impl Summarizable for FisherExactTest {
    fn summary(&self) -> String {
        format!(
            "{}: [[{}, {}], [{}, {}]], odds ratio {:.4}, p = {:.4}",
            self.test_name(),
            self.a,
            self.b,
            self.c,
            self.d,
            self.omega_hat,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Conditional distribution ───────────────────────────────────────────────

/// The conditional support of the upper-left cell with both margins fixed,
/// carried as log binomial weights at omega = 1.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct CondSupport {
    /// Smallest admissible cell value.
    lo: u64,
    /// ln C(m1, k) + ln C(m2, t - k) for k = lo, lo + 1, ...
    ln_base: Vec<f64>,
    /// Index of the observed cell, a - lo.
    observed: usize,
}

impl CondSupport {
    fn new(a: u64, b: u64, c: u64, d: u64) -> Self {
        let (m1, m2, t) = (a + b, c + d, a + c);
        let lo = t.saturating_sub(m2);
        let hi = m1.min(t);
        let ln_base = (lo..=hi)
            .map(|k| ln_choose(m1, k) + ln_choose(m2, t - k))
            .collect();
        CondSupport { lo, ln_base, observed: (a - lo) as usize }
    }

    fn len(&self) -> usize {
        self.ln_base.len()
    }

    fn is_single_point(&self) -> bool {
        self.ln_base.len() == 1
    }

    /// Renormalized pmf at the given log odds ratio. The constant
    /// `lo * ln_omega` cancels in the normalization, so weights use indices
    /// relative to the support start.
    fn pmf(&self, ln_omega: f64) -> Vec<f64> {
        let ln_w: Vec<f64> = self
            .ln_base
            .iter()
            .enumerate()
            .map(|(i, &base)| base + i as f64 * ln_omega)
            .collect();
        let max = ln_w.iter().fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        let mut w: Vec<f64> = ln_w.iter().map(|&v| (v - max).exp()).collect();
        let total: f64 = w.iter().sum();
        for v in &mut w {
            *v /= total;
        }
        w
    }

    /// (P(A <= a), P(A >= a)) at the given log odds ratio.
    fn tails(&self, ln_omega: f64) -> (f64, f64) {
        let pmf = self.pmf(ln_omega);
        let left: f64 = pmf[..=self.observed].iter().sum();
        let right: f64 = pmf[self.observed..].iter().sum();
        (left.min(1.0), right.min(1.0))
    }

    /// Total probability of outcomes no more likely than the observed one.
    fn minlike(&self, ln_omega: f64) -> f64 {
        let pmf = self.pmf(ln_omega);
        let threshold = pmf[self.observed] * (1.0 + MINLIKE_REL_EPS);
        pmf.iter().filter(|&&p| p <= threshold).sum::<f64>().min(1.0)
    }

    /// E[A] at the given log odds ratio.
    fn mean(&self, ln_omega: f64) -> f64 {
        self.pmf(ln_omega)
            .iter()
            .enumerate()
            .map(|(i, &p)| (self.lo + i as u64) as f64 * p)
            .sum()
    }
}

const LN_OMEGA_RANGE: f64 = 80.0;

/// Bisection root of an increasing function of the log odds ratio, returned
/// on the natural scale.
fn bisect_increasing<F: Fn(f64) -> f64>(f: F, what: &str) -> Result<f64> {
    let (mut lo, mut hi) = (-LN_OMEGA_RANGE, LN_OMEGA_RANGE);
    if f(lo) > 0.0 || f(hi) < 0.0 {
        return Err(SkuaError::Numerical(format!(
            "{what}: no odds ratio root within [e^-80, e^80]"
        )));
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if f(mid) <= 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-10 {
            break;
        }
    }
    Ok((0.5 * (lo + hi)).exp())
}

// ── Tests ──────────────────────────────────────────────────────────────────
