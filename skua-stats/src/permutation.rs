//! Two-sample permutation test for an arbitrary real-valued statistic.
//!
//! The null hypothesis is exchangeability of the group labels. The exact
//! engine evaluates the statistic on every split of the pooled sample into
//! groups of the original sizes; the approximate engine samples random
//! relabelings from a caller-supplied random number generator.
//!
//! The statistic is given as a closure over the two groups and should not
//! depend on the order of elements within a group, since relabelings are
//! enumerated as unordered splits.

use rand::seq::SliceRandom;
use rand::Rng;
use skua_core::{CancelToken, Result, SkuaError, Summarizable};

use crate::combinatorics::Combinations;
use crate::hypothesis::{check_sample, HypothesisTest, Tail};

/// Permutation test summarised by its observed statistic and the tail
/// counts of the relabeling distribution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PermutationTest {
    /// Statistic on the original labeling.
    pub observed: f64,
    /// Number of relabelings evaluated.
    pub n_samples: usize,
    count_le: usize,
    count_ge: usize,
    count_abs_ge: usize,
    exact: bool,
}

impl PermutationTest {
    /// Evaluate `stat` on every split of the pooled sample.
    ///
    /// The relabeling count is `C(nx + ny, nx)`, so this is only viable
    /// for small samples; see [`approximate`](Self::approximate) otherwise.
    pub fn exact<F>(x: &[f64], y: &[f64], stat: F) -> Result<Self>
    where
        F: Fn(&[f64], &[f64]) -> f64,
    {
        Self::exact_inner(x, y, stat, None)
    }

    /// Like [`exact`](Self::exact), polling `token` between relabelings.
    pub fn exact_cancellable<F>(
        x: &[f64],
        y: &[f64],
        stat: F,
        token: &CancelToken,
    ) -> Result<Self>
    where
        F: Fn(&[f64], &[f64]) -> f64,
    {
        Self::exact_inner(x, y, stat, Some(token))
    }

    fn exact_inner<F>(
        x: &[f64],
        y: &[f64],
        stat: F,
        token: Option<&CancelToken>,
    ) -> Result<Self>
    where
        F: Fn(&[f64], &[f64]) -> f64,
    {
        let observed = Self::observe(x, y, &stat)?;
        let pooled = [x, y].concat();
        let nx = x.len();

        let mut tally = Tally::new(observed);
        let mut xs = Vec::with_capacity(nx);
        let mut ys = Vec::with_capacity(y.len());
        for subset in Combinations::new(pooled.len(), nx) {
            if let Some(token) = token {
                if token.is_cancelled() {
                    return Err(SkuaError::Cancelled("permutation enumeration".into()));
                }
            }
            xs.clear();
            ys.clear();
            let mut si = 0;
            for (i, &v) in pooled.iter().enumerate() {
                if si < subset.len() && subset[si] == i {
                    xs.push(v);
                    si += 1;
                } else {
                    ys.push(v);
                }
            }
            tally.add(stat(&xs, &ys));
        }
        Ok(tally.finish(true))
    }

    /// Evaluate `stat` on `n_draws` uniformly random relabelings.
    pub fn approximate<F, R>(
        x: &[f64],
        y: &[f64],
        stat: F,
        n_draws: usize,
        rng: &mut R,
    ) -> Result<Self>
    where
        F: Fn(&[f64], &[f64]) -> f64,
        R: Rng + ?Sized,
    {
        if n_draws == 0 {
            return Err(SkuaError::InvalidArgument(
                "permutation sampling needs at least one draw".into(),
            ));
        }
        let observed = Self::observe(x, y, &stat)?;
        let mut pooled = [x, y].concat();
        let nx = x.len();

        let mut tally = Tally::new(observed);
        for _ in 0..n_draws {
            pooled.shuffle(rng);
            tally.add(stat(&pooled[..nx], &pooled[nx..]));
        }
        Ok(tally.finish(false))
    }

    fn observe<F>(x: &[f64], y: &[f64], stat: &F) -> Result<f64>
    where
        F: Fn(&[f64], &[f64]) -> f64,
    {
        check_sample("x", x)?;
        check_sample("y", y)?;
        let observed = stat(x, y);
        if !observed.is_finite() {
            return Err(SkuaError::Numerical(
                "statistic is not finite on the observed labeling".into(),
            ));
        }
        Ok(observed)
    }

    /// Whether every relabeling was enumerated rather than sampled.
    pub fn is_exact(&self) -> bool {
        self.exact
    }
}

struct Tally {
    observed: f64,
    n: usize,
    le: usize,
    ge: usize,
    abs_ge: usize,
}

impl Tally {
    fn new(observed: f64) -> Self {
        Tally {
            observed,
            n: 0,
            le: 0,
            ge: 0,
            abs_ge: 0,
        }
    }

    fn add(&mut self, s: f64) {
        self.n += 1;
        if s <= self.observed {
            self.le += 1;
        }
        if s >= self.observed {
            self.ge += 1;
        }
        if s.abs() >= self.observed.abs() {
            self.abs_ge += 1;
        }
    }

    fn finish(self, exact: bool) -> PermutationTest {
        PermutationTest {
            observed: self.observed,
            n_samples: self.n,
            count_le: self.le,
            count_ge: self.ge,
            count_abs_ge: self.abs_ge,
            exact,
        }
    }
}

impl HypothesisTest for PermutationTest {
    fn test_name(&self) -> &'static str {
        if self.exact {
            "Exact permutation test"
        } else {
            "Approximate permutation test"
        }
    }

    fn statistic(&self) -> f64 {
        self.observed
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        let n = self.n_samples as f64;
        Ok(match tail {
            Tail::Left => self.count_le as f64 / n,
            Tail::Right => self.count_ge as f64 / n,
            Tail::Both => self.count_abs_ge as f64 / n,
        })
    }
}

impl Summarizable for PermutationTest {
    fn summary(&self) -> String {
        format!(
            "{}: statistic = {:.4}, relabelings = {}, p = {:.4}",
            self.test_name(),
            self.observed,
            self.n_samples,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
