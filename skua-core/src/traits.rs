//! Cross-cutting traits shared by the Skua crates.

/// A type that can render a short human-readable account of itself.
pub trait Summarizable {
    /// One-line summary suitable for logs or interactive sessions.
    fn summary(&self) -> String;
}

/// A type that carries a point estimate of the quantity it measures.
///
/// For a hypothesis test this is the estimate of the parameter under test:
/// a sample mean, a proportion, an odds ratio.
pub trait Estimate {
    /// The point estimate.
    fn estimate(&self) -> f64;
}

// ── Tests ──────────────────────────────────────────────────────────────────
