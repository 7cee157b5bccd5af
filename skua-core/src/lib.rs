//! Shared primitives and traits for the Skua statistics workspace.
//!
//! `skua-core` provides the foundation the other Skua crates build on:
//!
//! - **Error types**: [`SkuaError`] and [`Result`] for structured error
//!   handling with a stable failure taxonomy
//! - **Traits**: [`Summarizable`] and [`Estimate`] for uniform reporting
//! - **Cancellation**: [`CancelToken`] for cooperative interruption of long
//!   exact enumerations

pub mod cancel;
pub mod error;
pub mod traits;

pub use cancel::CancelToken;
pub use error::{Result, SkuaError};
pub use traits::*;
