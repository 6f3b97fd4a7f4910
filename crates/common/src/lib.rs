//! Shared utilities for the Groundwork crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: canonical errors, validation, serde utilities
//! - `runtime`: async infrastructure (retry engine, wait policies, intervals)
//! - `observability`: tracing instrumentation (implied by `runtime`)
//!
//! The `runtime` tier is enabled by default.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod utils;
#[cfg(feature = "foundation")]
pub mod validation;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;
#[cfg(feature = "runtime")]
pub mod time;

// Re-export commonly used types for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{Error, ErrorKind, Result};
#[cfg(feature = "runtime")]
pub use resilience::{
    retry, retry_on_kinds, Clock, ManualClock, RetryPolicy, SystemClock, WaitStrategy,
};
#[cfg(feature = "foundation")]
pub use utils::serde::duration_millis;
#[cfg(feature = "foundation")]
pub use validation::{is_base64, is_port, PortCandidate};
