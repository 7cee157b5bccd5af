//! Dense linear algebra on flat row-major slices.
//!
//! The regression-based tests need small least-squares fits, an orthonormal
//! basis of the residual space, and the spectrum of a symmetric matrix.
//! Everything here works on `&[f64]` with explicit dimensions; matrices are
//! row-major.

use skua_core::{Result, SkuaError};

/// An ordinary least squares fit of `y` on an n×k design matrix.
pub(crate) struct OlsFit {
    pub(crate) coef: Vec<f64>,
    pub(crate) residuals: Vec<f64>,
    /// Standard errors of the coefficients.
    pub(crate) se: Vec<f64>,
    /// Residual variance, SSE / (n − k).
    pub(crate) sigma2: f64,
}

/// Least squares via Householder QR.
///
/// Requires n > k and a full-rank design; rank deficiency reports
/// `Degenerate`.
pub(crate) fn ols(x: &[f64], n: usize, k: usize, y: &[f64]) -> Result<OlsFit> {
    if n <= k || k == 0 {
        return Err(SkuaError::InvalidArgument(format!(
            "least squares needs more observations than regressors (n = {n}, k = {k})"
        )));
    }
    if x.len() != n * k || y.len() != n {
        return Err(SkuaError::InvalidArgument(
            "design matrix dimensions do not match the response".into(),
        ));
    }

    let scale = x.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1.0);
    let tol = 1e-12 * scale;

    let mut r = x.to_vec();
    let mut qty = y.to_vec();
    let mut v = vec![0.0; n];

    for j in 0..k {
        let mut norm2 = 0.0;
        for i in j..n {
            let e = r[i * k + j];
            norm2 += e * e;
        }
        let norm = norm2.sqrt();
        if norm <= tol {
            return Err(SkuaError::Degenerate(format!(
                "design matrix is rank deficient (column {j})"
            )));
        }

        let pivot = r[j * k + j];
        let alpha = if pivot >= 0.0 { -norm } else { norm };
        v[j] = pivot - alpha;
        let mut vnorm2 = v[j] * v[j];
        for i in j + 1..n {
            v[i] = r[i * k + j];
            vnorm2 += v[i] * v[i];
        }

        r[j * k + j] = alpha;
        for i in j + 1..n {
            r[i * k + j] = 0.0;
        }

        for c in j + 1..k {
            let mut dot = 0.0;
            for i in j..n {
                dot += v[i] * r[i * k + c];
            }
            let f = 2.0 * dot / vnorm2;
            for i in j..n {
                r[i * k + c] -= f * v[i];
            }
        }

        let mut dot = 0.0;
        for i in j..n {
            dot += v[i] * qty[i];
        }
        let f = 2.0 * dot / vnorm2;
        for i in j..n {
            qty[i] -= f * v[i];
        }
    }

    // Back-substitute R b = Q'y.
    let mut coef = vec![0.0; k];
    for j in (0..k).rev() {
        let mut s = qty[j];
        for c in j + 1..k {
            s -= r[j * k + c] * coef[c];
        }
        coef[j] = s / r[j * k + j];
    }

    let mut residuals = vec![0.0; n];
    let mut sse = 0.0;
    for i in 0..n {
        let mut fit = 0.0;
        for c in 0..k {
            fit += x[i * k + c] * coef[c];
        }
        residuals[i] = y[i] - fit;
        sse += residuals[i] * residuals[i];
    }
    let sigma2 = sse / (n - k) as f64;

    // (X'X)^-1 = R^-1 R^-T; the diagonal comes from the rows of R^-1.
    let rinv = invert_upper(&r, k);
    let mut se = vec![0.0; k];
    for j in 0..k {
        let mut s = 0.0;
        for c in j..k {
            s += rinv[j * k + c] * rinv[j * k + c];
        }
        se[j] = (sigma2 * s).sqrt();
    }

    Ok(OlsFit { coef, residuals, se, sigma2 })
}

/// Inverse of the upper-triangular k×k block stored in the top of `r`
/// (row-major with row stride k). Diagonal entries are already checked
/// non-zero by the factorization.
fn invert_upper(r: &[f64], k: usize) -> Vec<f64> {
    let mut inv = vec![0.0; k * k];
    for j in (0..k).rev() {
        inv[j * k + j] = 1.0 / r[j * k + j];
        for c in j + 1..k {
            let mut s = 0.0;
            for l in j + 1..=c {
                s += r[j * k + l] * inv[l * k + c];
            }
            inv[j * k + c] = -s / r[j * k + j];
        }
    }
    inv
}

/// Full orthonormal factor Q (n×n) of an n×k design matrix.
///
/// The first k columns span col(X); the remaining n−k columns span its
/// orthogonal complement, which is what the exact Durbin-Watson distribution
/// needs.
pub(crate) fn qr_q_full(x: &[f64], n: usize, k: usize) -> Result<Vec<f64>> {
    if k == 0 || n < k {
        return Err(SkuaError::InvalidArgument(format!(
            "full QR needs 1 <= k <= n (n = {n}, k = {k})"
        )));
    }
    let scale = x.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1.0);
    let tol = 1e-12 * scale;

    let mut r = x.to_vec();
    let mut q = vec![0.0; n * n];
    for i in 0..n {
        q[i * n + i] = 1.0;
    }
    let mut v = vec![0.0; n];

    for j in 0..k {
        let mut norm2 = 0.0;
        for i in j..n {
            let e = r[i * k + j];
            norm2 += e * e;
        }
        let norm = norm2.sqrt();
        if norm <= tol {
            return Err(SkuaError::Degenerate(format!(
                "design matrix is rank deficient (column {j})"
            )));
        }

        let pivot = r[j * k + j];
        let alpha = if pivot >= 0.0 { -norm } else { norm };
        v[j] = pivot - alpha;
        let mut vnorm2 = v[j] * v[j];
        for i in j + 1..n {
            v[i] = r[i * k + j];
            vnorm2 += v[i] * v[i];
        }

        r[j * k + j] = alpha;
        for i in j + 1..n {
            r[i * k + j] = 0.0;
        }
        for c in j + 1..k {
            let mut dot = 0.0;
            for i in j..n {
                dot += v[i] * r[i * k + c];
            }
            let f = 2.0 * dot / vnorm2;
            for i in j..n {
                r[i * k + c] -= f * v[i];
            }
        }

        // Accumulate Q <- Q · H_j (H_j is symmetric).
        for row in 0..n {
            let mut dot = 0.0;
            for l in j..n {
                dot += q[row * n + l] * v[l];
            }
            let f = 2.0 * dot / vnorm2;
            for l in j..n {
                q[row * n + l] -= f * v[l];
            }
        }
    }

    Ok(q)
}

/// Eigenvalues of a symmetric n×n matrix by cyclic Jacobi rotations,
/// returned in ascending order. `a` is consumed as scratch.
pub(crate) fn sym_eigenvalues(mut a: Vec<f64>, n: usize) -> Result<Vec<f64>> {
    if a.len() != n * n {
        return Err(SkuaError::InvalidArgument(
            "eigenvalue input is not square".into(),
        ));
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let frob = a.iter().map(|v| v * v).sum::<f64>().sqrt();
    let tol = 1e-13 * frob.max(f64::MIN_POSITIVE);
    const MAX_SWEEPS: usize = 100;

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..n {
            for q in p + 1..n {
                off += a[p * n + q] * a[p * n + q];
            }
        }
        if off.sqrt() <= tol {
            let mut eig: Vec<f64> = (0..n).map(|i| a[i * n + i]).collect();
            eig.sort_by(f64::total_cmp);
            return Ok(eig);
        }

        for p in 0..n - 1 {
            for q in p + 1..n {
                let apq = a[p * n + q];
                if apq.abs() <= tol / n as f64 {
                    continue;
                }
                let theta = (a[q * n + q] - a[p * n + p]) / (2.0 * apq);
                let t = if theta >= 0.0 {
                    1.0 / (theta + (theta * theta + 1.0).sqrt())
                } else {
                    -1.0 / (-theta + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                let app = a[p * n + p];
                let aqq = a[q * n + q];
                a[p * n + p] = app - t * apq;
                a[q * n + q] = aqq + t * apq;
                a[p * n + q] = 0.0;
                a[q * n + p] = 0.0;

                for i in 0..n {
                    if i == p || i == q {
                        continue;
                    }
                    let aip = a[i * n + p];
                    let aiq = a[i * n + q];
                    let new_p = c * aip - s * aiq;
                    let new_q = s * aip + c * aiq;
                    a[i * n + p] = new_p;
                    a[p * n + i] = new_p;
                    a[i * n + q] = new_q;
                    a[q * n + i] = new_q;
                }
            }
        }
    }

    Err(SkuaError::Numerical(
        "Jacobi eigenvalue iteration did not converge".into(),
    ))
}

/// Inverse of a small k×k matrix by Gauss-Jordan elimination with partial
/// pivoting.
pub(crate) fn invert_small(a: &[f64], k: usize) -> Result<Vec<f64>> {
    let scale = a.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1.0);
    let tol = 1e-12 * scale;

    let mut m = a.to_vec();
    let mut inv = vec![0.0; k * k];
    for i in 0..k {
        inv[i * k + i] = 1.0;
    }

    for col in 0..k {
        let mut piv = col;
        for row in col + 1..k {
            if m[row * k + col].abs() > m[piv * k + col].abs() {
                piv = row;
            }
        }
        if m[piv * k + col].abs() <= tol {
            return Err(SkuaError::Degenerate("singular matrix".into()));
        }
        if piv != col {
            for c in 0..k {
                m.swap(piv * k + c, col * k + c);
                inv.swap(piv * k + c, col * k + c);
            }
        }
        let d = m[col * k + col];
        for c in 0..k {
            m[col * k + c] /= d;
            inv[col * k + c] /= d;
        }
        for row in 0..k {
            if row == col {
                continue;
            }
            let f = m[row * k + col];
            if f != 0.0 {
                for c in 0..k {
                    m[row * k + c] -= f * m[col * k + c];
                    inv[row * k + c] -= f * inv[col * k + c];
                }
            }
        }
    }
    Ok(inv)
}

/// Product aᵀ·b where `a` is n×k1 and `b` is n×k2, giving k1×k2.
pub(crate) fn matmul_tn(a: &[f64], b: &[f64], n: usize, k1: usize, k2: usize) -> Vec<f64> {
    let mut out = vec![0.0; k1 * k2];
    for r in 0..n {
        for i in 0..k1 {
            let av = a[r * k1 + i];
            if av == 0.0 {
                continue;
            }
            for j in 0..k2 {
                out[i * k2 + j] += av * b[r * k2 + j];
            }
        }
    }
    out
}

/// Product of two k×k matrices.
pub(crate) fn matmul_small(a: &[f64], b: &[f64], k: usize) -> Vec<f64> {
    let mut out = vec![0.0; k * k];
    for i in 0..k {
        for l in 0..k {
            let av = a[i * k + l];
            if av == 0.0 {
                continue;
            }
            for j in 0..k {
                out[i * k + j] += av * b[l * k + j];
            }
        }
    }
    out
}

/// Trace of a k×k matrix.
pub(crate) fn trace(a: &[f64], k: usize) -> f64 {
    (0..k).map(|i| a[i * k + i]).sum()
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ols_simple_regression() {
        // y on [1, x] for x = 1..5.
        let x = [
            1.0, 1.0, //
            1.0, 2.0, //
            1.0, 3.0, //
            1.0, 4.0, //
            1.0, 5.0,
        ];
        let y = [2.1, 3.9, 6.2, 7.8, 10.1];
        let fit = ols(&x, 5, 2, &y).unwrap();

        assert!((fit.coef[0] - 0.05).abs() < 1e-10, "intercept {}", fit.coef[0]);
        assert!((fit.coef[1] - 1.99).abs() < 1e-10, "slope {}", fit.coef[1]);
        assert!((fit.sigma2 - 0.107 / 3.0).abs() < 1e-10);
        // se(slope) = sqrt(sigma2 / Sxx), Sxx = 10.
        assert!((fit.se[1] - (fit.sigma2 / 10.0).sqrt()).abs() < 1e-10);
        let sse: f64 = fit.residuals.iter().map(|r| r * r).sum();
        assert!((sse - 0.107).abs() < 1e-10);
    }

    #[test]
    fn ols_rejects_rank_deficiency() {
        // Second column is twice the first.
        let x = [1.0, 2.0, 2.0, 4.0, 3.0, 6.0];
        let y = [1.0, 2.0, 3.0];
        assert!(matches!(
            ols(&x, 3, 2, &y),
            Err(SkuaError::Degenerate(_))
        ));
    }

    #[test]
    fn full_q_is_orthonormal_and_spans_the_design() {
        let x = [
            1.0, 1.0, //
            1.0, 2.0, //
            1.0, 3.0, //
            1.0, 4.0,
        ];
        let n = 4;
        let q = qr_q_full(&x, n, 2).unwrap();

        // Q'Q = I.
        for i in 0..n {
            for j in 0..n {
                let mut dot = 0.0;
                for r in 0..n {
                    dot += q[r * n + i] * q[r * n + j];
                }
                let expect = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expect).abs() < 1e-10, "Q'Q[{i},{j}] = {dot}");
            }
        }

        // Columns k.. are orthogonal to the design columns.
        for col in 2..n {
            for xc in 0..2 {
                let mut dot = 0.0;
                for r in 0..n {
                    dot += q[r * n + col] * x[r * 2 + xc];
                }
                assert!(dot.abs() < 1e-10);
            }
        }
    }

    #[test]
    fn jacobi_known_spectra() {
        let eig = sym_eigenvalues(vec![2.0, 1.0, 1.0, 2.0], 2).unwrap();
        assert!((eig[0] - 1.0).abs() < 1e-10);
        assert!((eig[1] - 3.0).abs() < 1e-10);

        let a = vec![
            2.0, -1.0, 0.0, //
            -1.0, 2.0, -1.0, //
            0.0, -1.0, 2.0,
        ];
        let eig = sym_eigenvalues(a, 3).unwrap();
        let sqrt2 = 2f64.sqrt();
        assert!((eig[0] - (2.0 - sqrt2)).abs() < 1e-10);
        assert!((eig[1] - 2.0).abs() < 1e-10);
        assert!((eig[2] - (2.0 + sqrt2)).abs() < 1e-10);
    }

    #[test]
    fn small_inverse_round_trip() {
        let a = [4.0, 7.0, 2.0, 6.0];
        let inv = invert_small(&a, 2).unwrap();
        let prod = matmul_small(&a, &inv, 2);
        assert!((prod[0] - 1.0).abs() < 1e-12);
        assert!(prod[1].abs() < 1e-12);
        assert!(prod[2].abs() < 1e-12);
        assert!((prod[3] - 1.0).abs() < 1e-12);
        assert!(matches!(
            invert_small(&[1.0, 2.0, 2.0, 4.0], 2),
            Err(SkuaError::Degenerate(_))
        ));
    }

    #[test]
    fn transpose_product() {
        // a = [[1,2],[3,4],[5,6]], a'a = [[35,44],[44,56]].
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ata = matmul_tn(&a, &a, 3, 2, 2);
        assert_eq!(ata, vec![35.0, 44.0, 44.0, 56.0]);
        assert!((trace(&ata, 2) - 91.0).abs() < 1e-12);
    }
}
