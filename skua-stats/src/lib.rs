//! Hypothesis testing for the Skua crates.
//!
//! Every test is an immutable value type built from data (or sufficient
//! statistics) by a validating constructor. Construction does the numeric
//! work once; the resulting value answers [`pvalue`](HypothesisTest::pvalue)
//! and, where the parameter admits one, [`confint`](ConfidenceInterval::confint)
//! without touching the original data again.
//!
//! Families:
//!
//! - location: one/two-sample and paired t and z tests
//! - proportions: exact binomial and sign tests, Fisher's exact test
//! - count data: the power-divergence family (Pearson chi-squared,
//!   likelihood ratio, Cressie-Read) with simultaneous multinomial intervals
//! - distribution shape: Kolmogorov-Smirnov (exact and asymptotic),
//!   Anderson-Darling, Jarque-Bera
//! - rank-based: Mann-Whitney U, Wilcoxon signed rank, Kruskal-Wallis
//! - resampling: exact and sampled two-sample permutation tests
//! - variances: the variance-ratio F test and one-way ANOVA
//! - time series and regression: Durbin-Watson, Box-Pierce/Ljung-Box,
//!   Breusch-Godfrey, augmented Dickey-Fuller
//!
//! Exact small-sample engines and their large-sample approximations are
//! separate types; the selector wrappers ([`MannWhitneyUTest`],
//! [`SignedRankTest`]) pick between them by sample size and tie structure.

pub mod adf;
pub mod anderson_darling;
pub mod binomial;
pub mod box_test;
pub mod breusch_godfrey;
mod combinatorics;
mod descriptive;
mod dist;
pub mod durbin_watson;
pub mod fisher;
pub mod ftest;
pub mod hypothesis;
pub mod jarque_bera;
pub mod kruskal_wallis;
pub mod ks;
mod linalg;
pub mod mann_whitney;
pub mod permutation;
pub mod power_divergence;
pub mod rank;
pub mod signed_rank;
pub mod ttest;
pub mod ztest;

pub use adf::{ADFTest, Deterministic};
pub use anderson_darling::OneSampleADTest;
pub use binomial::{BinomialCiMethod, BinomialTest, SignTest};
pub use box_test::{BoxPierceTest, LjungBoxTest};
pub use breusch_godfrey::BreuschGodfreyTest;
pub use combinatorics::Combinations;
pub use durbin_watson::{DurbinWatsonTest, DwPValueMethod, DW_EXACT_MAX_N};
pub use fisher::{FisherExactTest, FisherPValueMethod};
pub use ftest::{OneWayAnovaTest, VarianceFTest};
pub use hypothesis::{ConfInt, ConfidenceInterval, HypothesisTest, Tail};
pub use jarque_bera::JarqueBeraTest;
pub use kruskal_wallis::KruskalWallisTest;
pub use ks::{ApproximateOneSampleKSTest, ApproximateTwoSampleKSTest, ExactOneSampleKSTest};
pub use mann_whitney::{
    ApproximateMannWhitneyUTest, ExactMannWhitneyUTest, MannWhitneyUTest, MWU_EXACT_MAX_N,
    MWU_EXACT_MAX_TIED_N,
};
pub use permutation::PermutationTest;
pub use power_divergence::{
    chisq_test, multinomial_lrt, MultinomialCiMethod, PowerDivergenceTest,
};
pub use signed_rank::{
    ApproximateSignedRankTest, ExactSignedRankTest, SignedRankTest, SIGNED_RANK_EXACT_MAX_N,
    SIGNED_RANK_EXACT_MAX_TIED_N,
};
pub use ttest::{EqualVarianceTTest, OneSampleTTest, UnequalVarianceTTest};
pub use ztest::{EqualVarianceZTest, OneSampleZTest, UnequalVarianceZTest};
