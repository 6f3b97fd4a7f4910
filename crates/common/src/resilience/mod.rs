//! Resilience primitives: the retry engine and its wait policies.
//!
//! The retry engine ([`retry`], [`retry_on_kinds`]) is the substrate the
//! HTTP client is built on; the wait policies ([`WaitStrategy`]) decide how
//! long to pause between attempts, deferring to server `Retry-After` hints
//! where the caller supplies them. Time is abstracted behind [`Clock`] so
//! expiry- and backoff-dependent behaviour stays deterministic under test.

mod clock;
pub mod retry;
pub mod wait;

pub use clock::{Clock, ManualClock, SystemClock};
pub use retry::{retry, retry_on_kinds, sleep_cancellable, with_scheduling_jitter, RetryPolicy};
pub use wait::{parse_retry_after, retry_after_hint, WaitStrategy};
