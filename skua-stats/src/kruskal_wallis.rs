//! Kruskal-Wallis rank sum test for location shifts among k independent
//! groups.
//!
//! The reference distribution is the asymptotic chi-squared with k − 1
//! degrees of freedom. That approximation is coarse for very small groups
//! (a few observations each); there is no exact small-sample engine here.

use skua_core::{Result, SkuaError, Summarizable};
use statrs::distribution::ContinuousCDF;

use crate::dist;
use crate::hypothesis::{check_sample, tail_from_cdf, HypothesisTest, Tail};
use crate::rank::{tie_adjustment, tied_ranks};

/// Kruskal-Wallis test that k samples share a location.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KruskalWallisTest {
    /// Group sizes.
    pub group_sizes: Vec<usize>,
    /// Sum of pooled ranks per group.
    pub rank_sums: Vec<f64>,
    /// Tie correction factor `1 - sum(t^3 - t) / (n^3 - n)`.
    pub tie_correction: f64,
    /// Tie-corrected H statistic.
    pub h: f64,
    /// Degrees of freedom, k − 1.
    pub df: f64,
}

impl KruskalWallisTest {
    /// Test whether all groups come from the same distribution against the
    /// alternative that at least one is shifted.
    pub fn new(groups: &[&[f64]]) -> Result<Self> {
        if groups.len() < 2 {
            return Err(SkuaError::InvalidArgument(format!(
                "Kruskal-Wallis needs at least two groups, got {}",
                groups.len()
            )));
        }
        for xs in groups {
            check_sample("group", xs)?;
        }

        let group_sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        let n: usize = group_sizes.iter().sum();
        let nf = n as f64;

        let pooled: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
        let (ranks, runs) = tied_ranks(&pooled);

        let mut rank_sums = Vec::with_capacity(groups.len());
        let mut offset = 0;
        for &size in &group_sizes {
            rank_sums.push(ranks[offset..offset + size].iter().sum::<f64>());
            offset += size;
        }

        let tie_correction = 1.0 - tie_adjustment(&runs) / (nf.powi(3) - nf);
        if tie_correction == 0.0 {
            return Err(SkuaError::Degenerate(
                "all observations are tied: the H statistic is undefined".into(),
            ));
        }

        let h_raw = 12.0 / (nf * (nf + 1.0))
            * rank_sums
                .iter()
                .zip(&group_sizes)
                .map(|(&r, &size)| r * r / size as f64)
                .sum::<f64>()
            - 3.0 * (nf + 1.0);

        Ok(KruskalWallisTest {
            df: (group_sizes.len() - 1) as f64,
            group_sizes,
            rank_sums,
            tie_correction,
            h: h_raw / tie_correction,
        })
    }

    /// Total number of observations across all groups.
    pub fn n(&self) -> usize {
        self.group_sizes.iter().sum()
    }
}

impl HypothesisTest for KruskalWallisTest {
    fn test_name(&self) -> &'static str {
        "Kruskal-Wallis rank sum test"
    }

    fn statistic(&self) -> f64 {
        self.h
    }

    fn degrees_of_freedom(&self) -> Option<f64> {
        Some(self.df)
    }

    fn default_tail(&self) -> Tail {
        Tail::Right
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        let dist = dist::chi_squared(self.df)?;
        Ok(tail_from_cdf(dist.cdf(self.h), tail))
    }
}

impl Summarizable for KruskalWallisTest {
    fn summary(&self) -> String {
        format!(
            "{}: H = {:.4}, df = {}, p = {:.4}",
            self.test_name(),
            self.h,
            self.df,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
