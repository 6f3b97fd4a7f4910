//! Time utilities for recurring work.

pub mod interval;

pub use interval::{interval_with_jitter, Interval};
