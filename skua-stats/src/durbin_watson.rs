//! Durbin-Watson test for first-order serial correlation in regression
//! residuals.
//!
//! The null distribution of DW depends on the design matrix. The exact
//! p-value conditions on it: the statistic is a ratio of quadratic forms,
//! so P(DW < d) reduces to the sign of a weighted chi-squared combination
//! whose weights are eigenvalues of the difference matrix projected onto
//! the residual space, inverted numerically by Imhof's formula. For large
//! samples the Durbin-Watson normal approximation from the trace moments
//! of that projection is used instead.

use skua_core::{Result, SkuaError, Summarizable};
use statrs::distribution::ContinuousCDF;

use crate::dist;
use crate::hypothesis::{check_sample, combine_tails, HypothesisTest, Tail};
use crate::linalg;

/// Largest sample size for which `NDep` still picks the exact p-value.
pub const DW_EXACT_MAX_N: usize = 100;

const SIMPSON_MAX_DEPTH: usize = 30;
const TAIL_MAX_SEGMENTS: usize = 80;

/// How the Durbin-Watson p-value is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DwPValueMethod {
    /// Exact for n below [`DW_EXACT_MAX_N`], the normal approximation above.
    #[default]
    NDep,
    /// Imhof inversion of the exact conditional distribution.
    Exact,
    /// Durbin-Watson normal approximation from trace moments.
    Approx,
}

/// Durbin-Watson serial correlation test.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DurbinWatsonTest {
    /// Observation count.
    pub n: usize,
    /// Regressor count.
    pub k: usize,
    /// The DW statistic.
    pub dw: f64,
    /// The resolved p-value method; `NDep` is resolved at construction and
    /// never stored.
    pub p_compute: DwPValueMethod,
    xmat: Vec<f64>,
}

impl DurbinWatsonTest {
    /// Test the `residuals` of a fit on the n×k row-major design `xmat` for
    /// first-order autocorrelation.
    pub fn new(
        xmat: &[f64],
        n: usize,
        k: usize,
        residuals: &[f64],
        p_compute: DwPValueMethod,
    ) -> Result<Self> {
        check_sample("residuals", residuals)?;
        if k == 0 || n <= k {
            return Err(SkuaError::InvalidArgument(format!(
                "Durbin-Watson needs more observations than regressors (n = {n}, k = {k})"
            )));
        }
        if residuals.len() != n || xmat.len() != n * k {
            return Err(SkuaError::InvalidArgument(format!(
                "design and residual dimensions disagree (n = {n}, k = {k}, \
                 xmat = {}, residuals = {})",
                xmat.len(),
                residuals.len()
            )));
        }

        let sum_sq: f64 = residuals.iter().map(|e| e * e).sum();
        if sum_sq == 0.0 {
            return Err(SkuaError::Degenerate(
                "all residuals are zero: the DW ratio is undefined".into(),
            ));
        }
        let diff_sq: f64 = residuals.windows(2).map(|w| (w[1] - w[0]) * (w[1] - w[0])).sum();

        let resolved = match p_compute {
            DwPValueMethod::NDep => {
                if n < DW_EXACT_MAX_N {
                    DwPValueMethod::Exact
                } else {
                    DwPValueMethod::Approx
                }
            }
            other => other,
        };
        Ok(DurbinWatsonTest {
            n,
            k,
            dw: diff_sq / sum_sq,
            p_compute: resolved,
            xmat: xmat.to_vec(),
        })
    }

    /// Whether the p-value comes from the exact conditional distribution.
    pub fn is_exact(&self) -> bool {
        self.p_compute == DwPValueMethod::Exact
    }

    /// P(DW < observed) under the null, by the resolved method.
    fn cdf(&self) -> Result<f64> {
        if self.is_exact() {
            self.exact_cdf()
        } else {
            self.approx_cdf()
        }
    }

    fn exact_cdf(&self) -> Result<f64> {
        let lambda = self.projected_eigenvalues()?;
        imhof_prob_negative(&lambda)
    }

    /// Eigenvalues of Q2'(A − dw·I)Q2, where A is the first-difference
    /// quadratic form and the columns of Q2 span the orthogonal complement
    /// of the design.
    fn projected_eigenvalues(&self) -> Result<Vec<f64>> {
        let (n, k) = (self.n, self.k);
        let m = n - k;
        let q = linalg::qr_q_full(&self.xmat, n, k)?;

        let q2 = |i: usize, j: usize| q[i * n + k + j];
        // C = (A - dw·I)·Q2 row by row; A is tridiagonal with diagonal
        // (1, 2, .., 2, 1) and -1 off the diagonal.
        let mut c = vec![0.0; n * m];
        for j in 0..m {
            c[j] = (1.0 - self.dw) * q2(0, j) - q2(1, j);
            c[(n - 1) * m + j] = (1.0 - self.dw) * q2(n - 1, j) - q2(n - 2, j);
        }
        for i in 1..n - 1 {
            for j in 0..m {
                c[i * m + j] = (2.0 - self.dw) * q2(i, j) - q2(i - 1, j) - q2(i + 1, j);
            }
        }

        let mut q2_mat = vec![0.0; n * m];
        for i in 0..n {
            for j in 0..m {
                q2_mat[i * m + j] = q2(i, j);
            }
        }
        let b = linalg::matmul_tn(&q2_mat, &c, n, m, m);
        linalg::sym_eigenvalues(b, m)
    }

    fn approx_cdf(&self) -> Result<f64> {
        let (n, k) = (self.n, self.k);
        let x = &self.xmat;

        let mut ax = vec![0.0; n * k];
        for j in 0..k {
            ax[j] = x[j] - x[k + j];
            ax[(n - 1) * k + j] = x[(n - 1) * k + j] - x[(n - 2) * k + j];
        }
        for i in 1..n - 1 {
            for j in 0..k {
                ax[i * k + j] = 2.0 * x[i * k + j] - x[(i - 1) * k + j] - x[(i + 1) * k + j];
            }
        }

        let xtx = linalg::matmul_tn(x, x, n, k, k);
        let inv = linalg::invert_small(&xtx, k)?;
        let xax = linalg::matmul_tn(x, &ax, n, k, k);
        let xaax = linalg::matmul_tn(&ax, &ax, n, k, k);
        let inv_xax = linalg::matmul_small(&inv, &xax, k);

        let nf = n as f64;
        // tr(A) = 2n - 2 and tr(A²) = 6n - 8 for the difference form.
        let p_mom = 2.0 * (nf - 1.0) - linalg::trace(&inv_xax, k);
        let q_mom = 2.0 * (3.0 * nf - 4.0)
            - 2.0 * linalg::trace(&linalg::matmul_small(&inv, &xaax, k), k)
            + linalg::trace(&linalg::matmul_small(&inv_xax, &inv_xax, k), k);

        let df = (n - k) as f64;
        let mean = p_mom / df;
        let var = 2.0 / (df * (df + 2.0)) * (q_mom - p_mom * mean);
        if var <= 0.0 || !var.is_finite() {
            return Err(SkuaError::Numerical(
                "non-positive variance in the Durbin-Watson approximation".into(),
            ));
        }
        Ok(dist::std_normal().cdf((self.dw - mean) / var.sqrt()))
    }
}

impl HypothesisTest for DurbinWatsonTest {
    fn test_name(&self) -> &'static str {
        "Durbin-Watson test"
    }

    fn statistic(&self) -> f64 {
        self.dw
    }

    /// The right tail tests for positive serial correlation, which shrinks
    /// the statistic, so it is the lower tail of the null distribution.
    fn default_tail(&self) -> Tail {
        Tail::Right
    }

    fn pvalue(&self, tail: Tail) -> Result<f64> {
        let cdf = self.cdf()?;
        Ok(combine_tails(1.0 - cdf, cdf, tail))
    }
}

impl Summarizable for DurbinWatsonTest {
    fn summary(&self) -> String {
        format!(
            "{}: DW = {:.4}, n = {}, k = {}, p = {:.4}",
            self.test_name(),
            self.dw,
            self.n,
            self.k,
            self.default_pvalue().unwrap_or(f64::NAN)
        )
    }
}

// ── Imhof inversion ────────────────────────────────────────────────────────

/// P(Σ λ_j z_j² < 0) for independent standard normal z, by numerically
/// inverting the characteristic function:
///
///   P = 1/2 − (1/π) ∫₀^∞ sin(½ Σ atan(λ u)) / (u Π(1+λ²u²)^¼) du.
///
/// Eigenvalues are rescaled by their largest magnitude first; the integral
/// is invariant under that substitution. The head [0, 1] and the log-space
/// tail are handled by adaptive Simpson quadrature.
fn imhof_prob_negative(lambda: &[f64]) -> Result<f64> {
    let scale = lambda.iter().fold(0.0f64, |m, &l| m.max(l.abs()));
    let mu: Vec<f64> = lambda
        .iter()
        .filter(|&&l| l.abs() > 1e-10 * scale)
        .map(|&l| l / scale)
        .collect();
    if mu.is_empty() {
        return Err(SkuaError::Degenerate(
            "the projected quadratic form has no non-zero eigenvalues".into(),
        ));
    }

    let integrand = |u: f64| -> f64 {
        if u == 0.0 {
            return 0.5 * mu.iter().sum::<f64>();
        }
        let theta: f64 = 0.5 * mu.iter().map(|&m| (m * u).atan()).sum::<f64>();
        let ln_scale: f64 =
            u.ln() + 0.25 * mu.iter().map(|&m| (m * m * u * u).ln_1p()).sum::<f64>();
        theta.sin() * (-ln_scale).exp()
    };

    let mut integral = adaptive_simpson(&integrand, 0.0, 1.0, 1e-10, 0)?;

    // Tail in log space; u·ρ(u) grows monotonically, so once a segment is
    // negligible the remainder is too.
    let tail = |s: f64| {
        let u = s.exp();
        integrand(u) * u
    };
    let mut converged = false;
    for seg in 0..TAIL_MAX_SEGMENTS {
        let s = seg as f64;
        let piece = adaptive_simpson(&tail, s, s + 1.0, 1e-12, 0)?;
        integral += piece;
        if piece.abs() < 1e-12 {
            converged = true;
            break;
        }
    }
    if !converged {
        return Err(SkuaError::Numerical(
            "Imhof tail integral did not converge".into(),
        ));
    }

    Ok((0.5 - integral / std::f64::consts::PI).clamp(0.0, 1.0))
}

fn adaptive_simpson<F: Fn(f64) -> f64>(
    f: &F,
    a: f64,
    b: f64,
    eps: f64,
    depth: usize,
) -> Result<f64> {
    let m = 0.5 * (a + b);
    let (fa, fm, fb) = (f(a), f(m), f(b));
    simpson_refine(f, a, b, fa, fm, fb, simpson(a, b, fa, fm, fb), eps, depth)
}

#[allow(clippy::too_many_arguments)]
fn simpson_refine<F: Fn(f64) -> f64>(
    f: &F,
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    eps: f64,
    depth: usize,
) -> Result<f64> {
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let (flm, frm) = (f(lm), f(rm));
    let left = simpson(a, m, fa, flm, fm);
    let right = simpson(m, b, fm, frm, fb);
    let delta = left + right - whole;
    if delta.abs() <= 15.0 * eps {
        return Ok(left + right + delta / 15.0);
    }
    if depth >= SIMPSON_MAX_DEPTH {
        return Err(SkuaError::Numerical(
            "adaptive quadrature exceeded its refinement depth".into(),
        ));
    }
    Ok(simpson_refine(f, a, m, fa, flm, fm, left, 0.5 * eps, depth + 1)?
        + simpson_refine(f, m, b, fm, frm, fb, right, 0.5 * eps, depth + 1)?)
}

fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

// ── Tests ──────────────────────────────────────────────────────────────────
