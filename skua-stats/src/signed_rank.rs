//! Wilcoxon signed rank test for the location of a single sample (or of
//! paired differences), with Hodges-Lehmann interval estimates.
//!
//! Zeros are dropped before ranking, as in the classical treatment. The
//! exact engine counts rank subsets with a dynamic program when the
//! non-zero magnitudes are free of ties and enumerates all 2^n sign
//! assignments otherwise; the approximate engine uses the tie-corrected
//! normal approximation with continuity correction.
//!
//! Confidence intervals invert the tie-free null distribution over the
//! sorted Walsh averages, so with heavy ties they are approximate.

use skua_core::{CancelToken, Estimate, Result, SkuaError, Summarizable};
use statrs::distribution::ContinuousCDF;

use crate::descriptive::quantile_sorted;
use crate::dist;
use crate::hypothesis::{
    check_alpha, check_paired, check_sample, combine_tails, ConfInt, ConfidenceInterval,
    HypothesisTest, Tail,
};
use crate::rank::{tie_adjustment, tied_ranks};

/// Largest non-zero count for which the automatic selector uses the exact
/// engine on tie-free magnitudes.
pub const SIGNED_RANK_EXACT_MAX_N: usize = 50;

/// Largest non-zero count for which the automatic selector uses the exact
/// engine when the magnitudes contain ties.
pub const SIGNED_RANK_EXACT_MAX_TIED_N: usize = 15;

// ── Shared statistics ──────────────────────────────────────────────────────

/// W+ statistic and rank bookkeeping. Returns the retained values, the
/// ranks of their magnitudes, W+, and the tie adjustment.
fn signed_rank_stats(x: &[f64]) -> Result<(Vec<f64>, Vec<f64>, f64, f64)> {
    check_sample("x", x)?;
    let nonzero: Vec<f64> = x.iter().copied().filter(|&v| v != 0.0).collect();
    let magnitudes: Vec<f64> = nonzero.iter().map(|v| v.abs()).collect();
    let (ranks, runs) = tied_ranks(&magnitudes);
    let w = nonzero
        .iter()
        .zip(&ranks)
        .filter(|(&v, _)| v > 0.0)
        .map(|(_, &r)| r)
        .sum();
    Ok((nonzero, ranks, w, tie_adjustment(&runs)))
}

/// Cumulative tie-free null distribution of W+ for `n` observations:
/// entry `s` is `P(W+ <= s)`. Subset counts stay below 2^53, so the f64
/// arithmetic is exact.
fn signed_rank_cdf(n: usize) -> Vec<f64> {
    let max_sum = n * (n + 1) / 2;
    let mut counts = vec![0.0; max_sum + 1];
    counts[0] = 1.0;
    for v in 1..=n {
        for s in (v..=max_sum).rev() {
            counts[s] += counts[s - v];
        }
    }
    let total = (n as f64).exp2();
    let mut acc = 0.0;
    counts
        .iter()
        .map(|&c| {
            acc += c;
            acc / total
        })
        .collect()
}

/// Sorted Walsh averages `(x_i + x_j) / 2` over all pairs `i <= j`.
fn walsh_averages(vals: &[f64]) -> Vec<f64> {
    let n = vals.len();
    let mut walsh = Vec::with_capacity(n * (n + 1) / 2);
    for i in 0..n {
        for j in i..n {
            walsh.push((vals[i] + vals[j]) / 2.0);
        }
    }
    walsh.sort_by(f64::total_cmp);
    walsh
}

/// Interval between the `q`-th smallest and `q`-th largest Walsh average
/// (1-based trim), with one-sided tails freeing the far endpoint.
fn walsh_interval(walsh: &[f64], q: usize, coverage: f64, tail: Tail) -> ConfInt {
    let m = walsh.len();
    let (lower, upper) = match tail {
        Tail::Both => (walsh[q - 1], walsh[m - q]),
        Tail::Left => (f64::NEG_INFINITY, walsh[m - q]),
        Tail::Right => (walsh[q - 1], f64::INFINITY),
    };
    ConfInt {
        lower,
        upper,
        coverage,
        method: "walsh",
    }
}

// ── Exact test ─────────────────────────────────────────────────────────────

/// Wilcoxon signed rank test against the exact sign-flip null.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExactSignedRankTest {
    /// Values retained after dropping zeros.
    vals: Vec<f64>,
    ranks: Vec<f64>,
    /// Number of non-zero observations.
    pub n: usize,
    /// W+ statistic: rank sum of the positive observations.
    pub w: f64,
    /// Tie adjustment `sum(t^3 - t)` over magnitude tie runs.
    pub tie_adjustment: f64,
    n_total: usize,
}

impl ExactSignedRankTest {
    /// Test whether `x` is symmetric about zero.
    pub fn new(x: &[f64]) -> Result<Self> {
        let (vals, ranks, w, tie_adjustment) = signed_rank_stats(x)?;
        Ok(ExactSignedRankTest {
            n: vals.len(),
            vals,
            ranks,
            w,
            tie_adjustment,
            n_total: x.len(),
        })
    }

    /// Paired test on the differences `x - y`.
    pub fn paired(x: &[f64], y: &[f64]) -> Result<Self> {
        check_paired(x, y)?;
        let diffs: Vec<f64> = x.iter().zip(y).map(|(a, b)| a - b).collect();
        Self::new(&diffs)
    }

    /// Like [`pvalue`](HypothesisTest::pvalue), polling `token` during the
    /// sign-pattern enumeration.
    pub fn pvalue_cancellable(&self, tail: Tail, token: &CancelToken) -> Result<f64> {
        let (p_left, p_right) = match self.tail_probabilities(Some(token))? {
            Some(p) => p,
            None => return Ok(1.0),
        };
        Ok(combine_tails(p_left, p_right, tail))
    }

    /// All input values, zeros included; these feed the Walsh averages.
    fn original_values(&self) -> Vec<f64> {
        let mut vals = self.vals.clone();
        vals.resize(self.n_total, 0.0);
        vals
    }

    /// `(P(W <= w), P(W >= w))`, or `None` when every observation was zero.
    fn tail_probabilities(&self, token: Option<&CancelToken>) -> Result<Option<(f64, f64)>> {
        if self.n == 0 {
            return Ok(None);
        }
        if self.tie_adjustment == 0.0 {
            let cdf = signed_rank_cdf(self.n);
            let w = self.w.round() as usize;
            let p_left = cdf[w];
            let p_right = if w == 0 { 1.0 } else { 1.0 - cdf[w - 1] };
            Ok(Some((p_left, p_right)))
        } else {
            // Tied magnitudes: enumerate all sign assignments of the ranks.
            let mut le = 0u64;
            let mut ge = 0u64;
            let total = 1u64 << self.n;
            for mask in 0..total {
                if let Some(token) = token {
                    if token.is_cancelled() {
                        return Err(SkuaError::Cancelled(
                            "signed rank sign enumeration".into(),
                        ));
                    }
                }
                let mut w_s = 0.0;
                for (i, &r) in self.ranks.iter().enumerate() {
                    if mask & (1 << i) != 0 {
                        w_s += r;
                    }
                }
                if w_s <= self.w {
                    le += 1;
                }
                if w_s >= self.w {
                    ge += 1;
                }
            }
            Ok(Some((le as f64 / total as f64, ge as f64 / total as f64)))
        }
    }
}

impl HypothesisTest for ExactSignedRankTest {
    fn test_name(&self) -> &'static str {
        "Exact Wilcoxon signed rank test"
    }

    fn statistic(&self) -> f64 {
        self.w
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        let (p_left, p_right) = match self.tail_probabilities(None)? {
            Some(p) => p,
            None => return Ok(1.0),
        };
        Ok(combine_tails(p_left, p_right, tail))
    }
}

impl ConfidenceInterval for ExactSignedRankTest {
    fn confint(&self, alpha: f64, tail: Tail) -> Result<ConfInt> {
        check_alpha(alpha)?;
        let prob = match tail {
            Tail::Both => alpha / 2.0,
            Tail::Left | Tail::Right => alpha,
        };
        let n = self.n_total;
        let cdf = signed_rank_cdf(n);
        if cdf[0] > prob {
            return Err(SkuaError::Degenerate(format!(
                "{n} observations cannot support a signed rank interval at this level"
            )));
        }
        let q = cdf
            .iter()
            .position(|&p| p >= prob)
            .unwrap_or(0)
            .max(1);
        let walsh = walsh_averages(&self.original_values());
        Ok(walsh_interval(&walsh, q, 1.0 - alpha, tail))
    }
}

impl Estimate for ExactSignedRankTest {
    /// Hodges-Lehmann pseudomedian: the median of the Walsh averages.
    fn estimate(&self) -> f64 {
        let walsh = walsh_averages(&self.original_values());
        quantile_sorted(&walsh, 0.5)
    }
}

impl Summarizable for ExactSignedRankTest {
    fn summary(&self) -> String {
        format!(
            "{}: W = {}, n = {}, p = {:.4}",
            self.test_name(),
            self.w,
            self.n,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Normal approximation ───────────────────────────────────────────────────

/// Wilcoxon signed rank test under the tie-corrected normal approximation
/// with continuity correction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApproximateSignedRankTest {
    vals: Vec<f64>,
    /// Number of non-zero observations.
    pub n: usize,
    /// W+ statistic.
    pub w: f64,
    /// Centered statistic `W - n(n+1)/4`.
    pub mu: f64,
    /// Null standard deviation of W, tie-corrected.
    pub sigma: f64,
    /// Tie adjustment `sum(t^3 - t)` over magnitude tie runs.
    pub tie_adjustment: f64,
    n_total: usize,
}

impl ApproximateSignedRankTest {
    /// Test whether `x` is symmetric about zero.
    pub fn new(x: &[f64]) -> Result<Self> {
        let (vals, _, w, tie_adjustment) = signed_rank_stats(x)?;
        let n = vals.len();
        let nf = n as f64;
        let mu = w - nf * (nf + 1.0) / 4.0;
        let sigma = (nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - tie_adjustment / 48.0).sqrt();
        Ok(ApproximateSignedRankTest {
            vals,
            n,
            w,
            mu,
            sigma,
            tie_adjustment,
            n_total: x.len(),
        })
    }

    /// Paired test on the differences `x - y`.
    pub fn paired(x: &[f64], y: &[f64]) -> Result<Self> {
        check_paired(x, y)?;
        let diffs: Vec<f64> = x.iter().zip(y).map(|(a, b)| a - b).collect();
        Self::new(&diffs)
    }

    fn all_values(&self) -> Vec<f64> {
        let mut vals = self.vals.clone();
        vals.resize(self.n_total, 0.0);
        vals
    }
}

impl HypothesisTest for ApproximateSignedRankTest {
    fn test_name(&self) -> &'static str {
        "Approximate Wilcoxon signed rank test"
    }

    fn statistic(&self) -> f64 {
        self.w
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        if self.n == 0 {
            return Ok(1.0);
        }
        let normal = dist::std_normal();
        Ok(match tail {
            Tail::Both => {
                let z = if self.mu == 0.0 {
                    0.0
                } else {
                    (self.mu.abs() - 0.5) / self.sigma
                };
                2.0 * normal.sf(z)
            }
            Tail::Left => normal.cdf((self.mu + 0.5) / self.sigma),
            Tail::Right => normal.sf((self.mu - 0.5) / self.sigma),
        })
    }
}

impl ConfidenceInterval for ApproximateSignedRankTest {
    fn confint(&self, alpha: f64, tail: Tail) -> Result<ConfInt> {
        check_alpha(alpha)?;
        let prob = match tail {
            Tail::Both => alpha / 2.0,
            Tail::Left | Tail::Right => alpha,
        };
        let n = self.n_total as f64;
        let z = dist::std_normal().inverse_cdf(1.0 - prob);
        let cutoff = n * (n + 1.0) / 4.0 - z * (n * (n + 1.0) * (2.0 * n + 1.0) / 24.0).sqrt();
        let walsh = walsh_averages(&self.all_values());
        let m = walsh.len();
        // Trim count, clamped so the interval stays well formed.
        let q = ((cutoff.floor() as isize + 1).max(1) as usize).min((m + 1) / 2);
        Ok(walsh_interval(&walsh, q, 1.0 - alpha, tail))
    }
}

impl Estimate for ApproximateSignedRankTest {
    /// Hodges-Lehmann pseudomedian: the median of the Walsh averages.
    fn estimate(&self) -> f64 {
        let walsh = walsh_averages(&self.all_values());
        quantile_sorted(&walsh, 0.5)
    }
}

impl Summarizable for ApproximateSignedRankTest {
    fn summary(&self) -> String {
        format!(
            "{}: W = {}, n = {}, p = {:.4}",
            self.test_name(),
            self.w,
            self.n,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Selector ───────────────────────────────────────────────────────────────

/// Wilcoxon signed rank test with automatic engine selection.
///
/// Exact when at most [`SIGNED_RANK_EXACT_MAX_TIED_N`] non-zero
/// observations remain, or at most [`SIGNED_RANK_EXACT_MAX_N`] with
/// tie-free magnitudes; the normal approximation otherwise.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignedRankTest {
    Exact(ExactSignedRankTest),
    Approximate(ApproximateSignedRankTest),
}

impl SignedRankTest {
    pub fn new(x: &[f64]) -> Result<Self> {
        let (vals, _, _, tie_adjustment) = signed_rank_stats(x)?;
        let n = vals.len();
        if n <= SIGNED_RANK_EXACT_MAX_TIED_N
            || (n <= SIGNED_RANK_EXACT_MAX_N && tie_adjustment == 0.0)
        {
            Ok(SignedRankTest::Exact(ExactSignedRankTest::new(x)?))
        } else {
            Ok(SignedRankTest::Approximate(ApproximateSignedRankTest::new(
                x,
            )?))
        }
    }

    /// Paired test on the differences `x - y`.
    pub fn paired(x: &[f64], y: &[f64]) -> Result<Self> {
        check_paired(x, y)?;
        let diffs: Vec<f64> = x.iter().zip(y).map(|(a, b)| a - b).collect();
        Self::new(&diffs)
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, SignedRankTest::Exact(_))
    }
}

impl HypothesisTest for SignedRankTest {
    fn test_name(&self) -> &'static str {
        match self {
            SignedRankTest::Exact(t) => t.test_name(),
            SignedRankTest::Approximate(t) => t.test_name(),
        }
    }

    fn statistic(&self) -> f64 {
        match self {
            SignedRankTest::Exact(t) => t.statistic(),
            SignedRankTest::Approximate(t) => t.statistic(),
        }
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        match self {
            SignedRankTest::Exact(t) => t.pvalue(tail),
            SignedRankTest::Approximate(t) => t.pvalue(tail),
        }
    }
}

impl ConfidenceInterval for SignedRankTest {
    fn confint(&self, alpha: f64, tail: Tail) -> Result<ConfInt> {
        match self {
            SignedRankTest::Exact(t) => t.confint(alpha, tail),
            SignedRankTest::Approximate(t) => t.confint(alpha, tail),
        }
    }
}

impl Estimate for SignedRankTest {
    fn estimate(&self) -> f64 {
        match self {
            SignedRankTest::Exact(t) => t.estimate(),
            SignedRankTest::Approximate(t) => t.estimate(),
        }
    }
}

impl Summarizable for SignedRankTest {
    fn summary(&self) -> String {
        match self {
            SignedRankTest::Exact(t) => t.summary(),
            SignedRankTest::Approximate(t) => t.summary(),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
