//! Internal descriptive helpers shared by the test families.
//!
//! Constructors validate shape (non-empty, finite) before reaching these,
//! so the helpers assume well-formed input.

/// Arithmetic mean.
pub(crate) fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Variance with `ddof` delta degrees of freedom (1 gives the unbiased
/// sample variance, 0 the population variance).
pub(crate) fn variance(xs: &[f64], ddof: usize) -> f64 {
    let m = mean(xs);
    let ss: f64 = xs.iter().map(|&x| (x - m) * (x - m)).sum();
    ss / (xs.len() - ddof) as f64
}

/// Standard deviation with `ddof` delta degrees of freedom.
pub(crate) fn std_dev(xs: &[f64], ddof: usize) -> f64 {
    variance(xs, ddof).sqrt()
}

/// Second, third, and fourth central moments, each normalized by n.
pub(crate) fn central_moments(xs: &[f64]) -> (f64, f64, f64) {
    let n = xs.len() as f64;
    let m = mean(xs);
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &x in xs {
        let d = x - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

/// Population skewness, m3 / m2^(3/2).
pub(crate) fn skewness(xs: &[f64]) -> f64 {
    let (m2, m3, _) = central_moments(xs);
    m3 / m2.powf(1.5)
}

/// Population kurtosis, m4 / m2^2 (not excess).
pub(crate) fn kurtosis(xs: &[f64]) -> f64 {
    let (m2, _, m4) = central_moments(xs);
    m4 / (m2 * m2)
}

/// Linear-interpolation quantile (R type 7) of already-sorted data.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_variance() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&xs) - 5.0).abs() < 1e-12);
        assert!((variance(&xs, 0) - 4.0).abs() < 1e-12);
        assert!((std_dev(&xs, 0) - 2.0).abs() < 1e-12);
        assert!((variance(&xs, 1) - 32.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn moments_of_a_symmetric_ladder() {
        // 1..5: m2 = 2, m3 = 0, m4 = 6.8
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (m2, m3, m4) = central_moments(&xs);
        assert!((m2 - 2.0).abs() < 1e-12);
        assert!(m3.abs() < 1e-12);
        assert!((m4 - 6.8).abs() < 1e-12);
        assert!(skewness(&xs).abs() < 1e-12);
        assert!((kurtosis(&xs) - 1.7).abs() < 1e-12);
    }

    #[test]
    fn quantile_interpolates() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile_sorted(&xs, 0.0) - 1.0).abs() < 1e-12);
        assert!((quantile_sorted(&xs, 1.0) - 4.0).abs() < 1e-12);
        assert!((quantile_sorted(&xs, 0.5) - 2.5).abs() < 1e-12);
        assert!((quantile_sorted(&xs, 0.25) - 1.75).abs() < 1e-12);
    }
}
