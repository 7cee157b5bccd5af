//! Mann-Whitney U test (Wilcoxon rank sum) for two independent samples.
//!
//! [`MannWhitneyUTest::new`] picks the engine: the exact null distribution
//! for small samples, a normal approximation with continuity and tie
//! corrections otherwise. Both engines are also constructible directly.
//!
//! Without ties the exact null is computed by counting rank subsets with a
//! dynamic program. With ties every assignment of the pooled ranks to the
//! first sample is enumerated, which is exponential in the pooled size and
//! therefore only selected automatically for very small samples.

use skua_core::{CancelToken, Result, SkuaError, Summarizable};
use statrs::distribution::ContinuousCDF;

use crate::combinatorics::Combinations;
use crate::dist;
use crate::hypothesis::{check_sample, combine_tails, HypothesisTest, Tail};
use crate::rank::{tie_adjustment, tied_ranks};

/// Largest pooled size for which the automatic selector uses the exact
/// engine on tie-free data.
pub const MWU_EXACT_MAX_N: usize = 50;

/// Largest pooled size for which the automatic selector uses the exact
/// engine when the pooled sample contains ties.
pub const MWU_EXACT_MAX_TIED_N: usize = 10;

// ── Shared statistics ──────────────────────────────────────────────────────

/// U statistic and rank bookkeeping for the pooled sample.
fn mwu_stats(x: &[f64], y: &[f64]) -> Result<(usize, usize, f64, Vec<f64>, f64)> {
    check_sample("x", x)?;
    check_sample("y", y)?;
    let nx = x.len();
    let ny = y.len();

    let mut pooled = Vec::with_capacity(nx + ny);
    pooled.extend_from_slice(x);
    pooled.extend_from_slice(y);
    let (ranks, runs) = tied_ranks(&pooled);

    let r1: f64 = ranks[..nx].iter().sum();
    let u = r1 - (nx * (nx + 1)) as f64 / 2.0;
    Ok((nx, ny, u, ranks, tie_adjustment(&runs)))
}

/// Counts of `k`-subsets of the ranks `1..=n` by rank sum.
///
/// Entry `s` is the number of subsets summing to `s`. All counts are
/// integers below 2^53, so the f64 arithmetic is exact.
fn rank_sum_counts(n: usize, k: usize) -> Vec<f64> {
    let max_sum = k * (2 * n - k + 1) / 2;
    let mut dp = vec![vec![0.0; max_sum + 1]; k + 1];
    dp[0][0] = 1.0;
    for v in 1..=n {
        for j in (1..=k.min(v)).rev() {
            for s in (v..=max_sum).rev() {
                let add = dp[j - 1][s - v];
                if add > 0.0 {
                    dp[j][s] += add;
                }
            }
        }
    }
    dp.swap_remove(k)
}

// ── Exact test ─────────────────────────────────────────────────────────────

/// Mann-Whitney U test against the exact permutation null.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExactMannWhitneyUTest {
    /// First sample size.
    pub nx: usize,
    /// Second sample size.
    pub ny: usize,
    /// U statistic of the first sample.
    pub u: f64,
    /// Tie adjustment `sum(t^3 - t)` over pooled tie runs.
    pub tie_adjustment: f64,
    ranks: Vec<f64>,
}

impl ExactMannWhitneyUTest {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        let (nx, ny, u, ranks, tie_adjustment) = mwu_stats(x, y)?;
        Ok(ExactMannWhitneyUTest {
            nx,
            ny,
            u,
            tie_adjustment,
            ranks,
        })
    }

    /// Like [`pvalue`](HypothesisTest::pvalue), polling `token` during the
    /// tie enumeration so a long-running computation can be abandoned.
    pub fn pvalue_cancellable(&self, tail: Tail, token: &CancelToken) -> Result<f64> {
        let (p_left, p_right) = self.tail_probabilities(Some(token))?;
        Ok(combine_tails(p_left, p_right, tail))
    }

    /// `(P(U <= u), P(U >= u))` under the exact null.
    fn tail_probabilities(&self, token: Option<&CancelToken>) -> Result<(f64, f64)> {
        let offset = (self.nx * (self.nx + 1)) as f64 / 2.0;
        if self.tie_adjustment == 0.0 {
            let counts = rank_sum_counts(self.nx + self.ny, self.nx);
            let total: f64 = counts.iter().sum();
            let mut le = 0.0;
            let mut ge = 0.0;
            for (s, &c) in counts.iter().enumerate() {
                let u_s = s as f64 - offset;
                if u_s <= self.u {
                    le += c;
                }
                if u_s >= self.u {
                    ge += c;
                }
            }
            Ok((le / total, ge / total))
        } else {
            // Ranks are tied: the rank-sum distribution depends on the tie
            // pattern, so enumerate every assignment of ranks to sample x.
            let mut le = 0u64;
            let mut ge = 0u64;
            let mut total = 0u64;
            for subset in Combinations::new(self.ranks.len(), self.nx) {
                if let Some(token) = token {
                    if token.is_cancelled() {
                        return Err(SkuaError::Cancelled(
                            "Mann-Whitney tie enumeration".into(),
                        ));
                    }
                }
                let u_s = subset.iter().map(|&i| self.ranks[i]).sum::<f64>() - offset;
                if u_s <= self.u {
                    le += 1;
                }
                if u_s >= self.u {
                    ge += 1;
                }
                total += 1;
            }
            Ok((le as f64 / total as f64, ge as f64 / total as f64))
        }
    }
}

impl HypothesisTest for ExactMannWhitneyUTest {
    fn test_name(&self) -> &'static str {
        "Exact Mann-Whitney U test"
    }

    fn statistic(&self) -> f64 {
        self.u
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        let (p_left, p_right) = self.tail_probabilities(None)?;
        Ok(combine_tails(p_left, p_right, tail))
    }
}

impl Summarizable for ExactMannWhitneyUTest {
    fn summary(&self) -> String {
        format!(
            "{}: U = {}, p = {:.4}",
            self.test_name(),
            self.u,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Normal approximation ───────────────────────────────────────────────────

/// Mann-Whitney U test under the tie-corrected normal approximation with
/// continuity correction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ApproximateMannWhitneyUTest {
    pub nx: usize,
    pub ny: usize,
    /// U statistic of the first sample.
    pub u: f64,
    /// Centered statistic `U - nx ny / 2`.
    pub mu: f64,
    /// Null standard deviation of U, tie-corrected.
    pub sigma: f64,
    /// Tie adjustment `sum(t^3 - t)` over pooled tie runs.
    pub tie_adjustment: f64,
}

impl ApproximateMannWhitneyUTest {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        let (nx, ny, u, _, tie_adjustment) = mwu_stats(x, y)?;
        let n = (nx + ny) as f64;
        let mu = u - (nx * ny) as f64 / 2.0;
        let sigma =
            ((nx * ny) as f64 * (n + 1.0 - tie_adjustment / (n * (n - 1.0))) / 12.0).sqrt();
        if sigma == 0.0 {
            return Err(SkuaError::Degenerate(
                "all observations are tied: U has zero variance".into(),
            ));
        }
        Ok(ApproximateMannWhitneyUTest {
            nx,
            ny,
            u,
            mu,
            sigma,
            tie_adjustment,
        })
    }
}

impl HypothesisTest for ApproximateMannWhitneyUTest {
    fn test_name(&self) -> &'static str {
        "Approximate Mann-Whitney U test"
    }

    fn statistic(&self) -> f64 {
        self.u
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        let normal = dist::std_normal();
        Ok(match tail {
            Tail::Both => {
                // Continuity correction shrinks mu toward zero by 1/2.
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

impl Summarizable for ApproximateMannWhitneyUTest {
    fn summary(&self) -> String {
        format!(
            "{}: U = {}, p = {:.4}",
            self.test_name(),
            self.u,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Selector ───────────────────────────────────────────────────────────────

/// Mann-Whitney U test with automatic engine selection.
///
/// Exact when the pooled size is at most [`MWU_EXACT_MAX_TIED_N`], or at
/// most [`MWU_EXACT_MAX_N`] with no ties; the normal approximation
/// otherwise.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MannWhitneyUTest {
    Exact(ExactMannWhitneyUTest),
    Approximate(ApproximateMannWhitneyUTest),
}

impl MannWhitneyUTest {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        let (nx, ny, _, _, tie_adjustment) = mwu_stats(x, y)?;
        let n = nx + ny;
        if n <= MWU_EXACT_MAX_TIED_N || (n <= MWU_EXACT_MAX_N && tie_adjustment == 0.0) {
            Ok(MannWhitneyUTest::Exact(ExactMannWhitneyUTest::new(x, y)?))
        } else {
            Ok(MannWhitneyUTest::Approximate(
                ApproximateMannWhitneyUTest::new(x, y)?,
            ))
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, MannWhitneyUTest::Exact(_))
    }
}

impl HypothesisTest for MannWhitneyUTest {
    fn test_name(&self) -> &'static str {
        match self {
            MannWhitneyUTest::Exact(t) => t.test_name(),
            MannWhitneyUTest::Approximate(t) => t.test_name(),
        }
    }

    fn statistic(&self) -> f64 {
        match self {
            MannWhitneyUTest::Exact(t) => t.statistic(),
            MannWhitneyUTest::Approximate(t) => t.statistic(),
        }
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        match self {
            MannWhitneyUTest::Exact(t) => t.pvalue(tail),
            MannWhitneyUTest::Approximate(t) => t.pvalue(tail),
        }
    }
}

impl Summarizable for MannWhitneyUTest {
    fn summary(&self) -> String {
        match self {
            MannWhitneyUTest::Exact(t) => t.summary(),
            MannWhitneyUTest::Approximate(t) => t.summary(),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
