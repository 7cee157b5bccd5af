//! Combinatorial support for the exact-enumeration engines.

use statrs::function::gamma::ln_gamma;

/// Natural log of n!.
pub(crate) fn ln_factorial(n: u64) -> f64 {
    ln_gamma(n as f64 + 1.0)
}

/// Natural log of the binomial coefficient C(n, k).
///
/// Returns negative infinity when k > n, matching an empty count.
pub(crate) fn ln_choose(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k)
}

/// Lazy lexicographic enumeration of the k-element index subsets of `0..n`.
///
/// The number of subsets is C(n, k) and grows combinatorially; the exact
/// test paths that consume this iterator poll a cancellation token between
/// draws rather than bounding n here.
pub struct Combinations {
    n: usize,
    k: usize,
    indices: Vec<usize>,
    exhausted: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Combinations {
            n,
            k,
            indices: (0..k).collect(),
            exhausted: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.exhausted {
            return None;
        }
        let current = self.indices.clone();

        // Advance to the lexicographic successor: bump the rightmost index
        // with headroom, then reset everything after it.
        let mut i = self.k;
        loop {
            if i == 0 {
                self.exhausted = true;
                break;
            }
            i -= 1;
            if self.indices[i] != i + self.n - self.k {
                self.indices[i] += 1;
                for j in i + 1..self.k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                break;
            }
        }
        Some(current)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
