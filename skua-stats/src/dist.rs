//! Construction glue over the statrs distribution primitives.
//!
//! The reference distributions themselves come from `statrs`; this module
//! only maps parameter errors into [`SkuaError`] so test constructors can
//! use `?` instead of threading a foreign error type.

use skua_core::{Result, SkuaError};
use statrs::distribution::{
    Beta, Binomial, ChiSquared, FisherSnedecor, Normal, Poisson, StudentsT,
};

/// The standard normal reference. Fixed parameters, cannot fail.
pub(crate) fn std_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("unit normal parameters are valid")
}

/// Student t reference with `df` degrees of freedom.
pub(crate) fn students_t(df: f64) -> Result<StudentsT> {
    StudentsT::new(0.0, 1.0, df)
        .map_err(|e| SkuaError::InvalidArgument(format!("t reference with df {df}: {e}")))
}

/// Chi-squared reference with `df` degrees of freedom.
pub(crate) fn chi_squared(df: f64) -> Result<ChiSquared> {
    ChiSquared::new(df)
        .map_err(|e| SkuaError::InvalidArgument(format!("chi-squared reference with df {df}: {e}")))
}

/// F reference with `(df1, df2)` degrees of freedom.
pub(crate) fn fisher_f(df1: f64, df2: f64) -> Result<FisherSnedecor> {
    FisherSnedecor::new(df1, df2)
        .map_err(|e| SkuaError::InvalidArgument(format!("F reference with df ({df1}, {df2}): {e}")))
}

/// Beta distribution with the given shape parameters.
pub(crate) fn beta(shape_a: f64, shape_b: f64) -> Result<Beta> {
    Beta::new(shape_a, shape_b)
        .map_err(|e| SkuaError::InvalidArgument(format!("beta({shape_a}, {shape_b}): {e}")))
}

/// Binomial distribution with `n` trials and success probability `p`.
pub(crate) fn binomial(p: f64, n: u64) -> Result<Binomial> {
    Binomial::new(p, n)
        .map_err(|e| SkuaError::InvalidArgument(format!("binomial(n = {n}, p = {p}): {e}")))
}

/// Poisson distribution with the given rate.
pub(crate) fn poisson(rate: f64) -> Result<Poisson> {
    Poisson::new(rate).map_err(|e| SkuaError::InvalidArgument(format!("poisson({rate}): {e}")))
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use statrs::distribution::ContinuousCDF;

    #[test]
    fn std_normal_is_symmetric() {
        let n = std_normal();
        assert!((n.cdf(0.0) - 0.5).abs() < 1e-12);
        assert!((n.cdf(-1.0) + n.cdf(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_parameters_are_invalid_argument() {
        assert!(matches!(
            students_t(0.0),
            Err(SkuaError::InvalidArgument(_))
        ));
        assert!(matches!(beta(-1.0, 2.0), Err(SkuaError::InvalidArgument(_))));
        assert!(matches!(binomial(1.5, 10), Err(SkuaError::InvalidArgument(_))));
    }
}
