//! Ranking with ties.
//!
//! Every rank-based test in the crate (Mann-Whitney, signed rank,
//! Kruskal-Wallis) assigns average ranks to tied observations and shares one
//! tie adjustment, a = Σ(t³ − t) over the tie-run lengths t.

/// Average ranks (1-based) of `xs` together with the lengths of the tie
/// runs, in ascending value order.
///
/// Ties receive the mean of the rank positions they occupy. The run lengths
/// describe every run, including singletons.
pub fn tied_ranks(xs: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let n = xs.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| xs[a].total_cmp(&xs[b]));

    let mut ranks = vec![0.0; n];
    let mut runs = Vec::new();
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && xs[order[j]] == xs[order[i]] {
            j += 1;
        }
        // Positions i+1 ..= j share the average rank.
        let avg = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = avg;
        }
        runs.push(j - i);
        i = j;
    }
    (ranks, runs)
}

/// The tie adjustment a = Σ(t³ − t) over tie-run lengths.
pub fn tie_adjustment(runs: &[usize]) -> f64 {
    runs.iter()
        .map(|&t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum()
}

/// Whether any run ties two or more observations.
pub fn has_ties(runs: &[usize]) -> bool {
    runs.iter().any(|&t| t > 1)
}

// ── Tests ──────────────────────────────────────────────────────────────────
