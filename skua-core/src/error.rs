//! Error handling for the Skua workspace.
//!
//! Every fallible operation in the workspace returns [`Result`], and the
//! variants of [`SkuaError`] separate caller mistakes from statistical
//! degeneracy and from numeric breakdown, so callers can branch on the
//! failure class rather than on message text.

use thiserror::Error;

/// Unified error type for all Skua operations.
#[derive(Debug, Error)]
pub enum SkuaError {
    /// A caller-supplied argument is structurally invalid: wrong shape,
    /// out-of-range parameter, mismatched lengths.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested combination of options is recognized but unsupported.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// An iterative numeric procedure failed to converge, overflowed, or
    /// left its domain.
    #[error("numerical failure: {0}")]
    Numerical(String),

    /// The input is well-formed but statistically degenerate, so the
    /// requested quantity is undefined (zero variance, all-tied ranks,
    /// an empty conditional support).
    #[error("degenerate input: {0}")]
    Degenerate(String),

    /// A cooperative cancellation flag was raised mid-computation.
    #[error("cancelled: {0}")]
    Cancelled(String),
}

/// Convenience alias used throughout the Skua codebase.
pub type Result<T> = std::result::Result<T, SkuaError>;

// ── Tests ──────────────────────────────────────────────────────────────────
