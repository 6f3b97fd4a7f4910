//! Generic conditional retry engine.
//!
//! The engine drives a fallible async operation through a configured number
//! of attempts, pausing between them according to the policy's wait
//! strategy. A cancellation token is consulted before every attempt and
//! during every pause, so a cancelled caller never waits out a backoff.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::context::ensure_live;
use crate::error::{Error, ErrorKind, Result};
use crate::utils::serde::duration_millis;

use super::wait::WaitStrategy;

/// Upper bound on the random scheduling jitter added to every wait, to keep
/// synchronised clients from retrying in lockstep.
const MAX_SCHEDULING_JITTER: Duration = Duration::from_millis(25);

/// Configuration governing retry behaviour.
///
/// Invariants, enforced by [`RetryPolicy::validate`]:
/// - backoff requires a positive attempt count and a positive maximum wait;
/// - linear backoff requires backoff to be enabled;
/// - a disabled policy performs a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Whether retries happen at all; `false` means a single attempt.
    pub enabled: bool,
    /// Total number of attempts (initial try included).
    pub max_attempts: u32,
    /// Ignore server `Retry-After` hints and always use the computed wait.
    pub ignore_server_retry_after: bool,
    /// Minimum wait between attempts.
    #[serde(with = "duration_millis")]
    pub wait_min: Duration,
    /// Maximum wait between attempts.
    #[serde(with = "duration_millis")]
    pub wait_max: Duration,
    /// Whether waits grow across attempts.
    pub backoff_enabled: bool,
    /// Linear growth instead of exponential; requires `backoff_enabled`.
    pub linear_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 4,
            ignore_server_retry_after: false,
            wait_min: Duration::from_millis(200),
            wait_max: Duration::from_secs(30),
            backoff_enabled: true,
            linear_backoff: false,
        }
    }
}

impl RetryPolicy {
    /// Policy performing a single attempt.
    pub fn disabled() -> Self {
        Self { enabled: false, backoff_enabled: false, ..Self::default() }
    }

    /// Constant-wait policy.
    pub fn basic(max_attempts: u32, wait: Duration) -> Self {
        Self {
            enabled: true,
            max_attempts,
            wait_min: wait,
            wait_max: wait,
            backoff_enabled: false,
            linear_backoff: false,
            ..Self::default()
        }
    }

    /// Exponential-backoff policy.
    pub fn exponential(max_attempts: u32, wait_min: Duration, wait_max: Duration) -> Self {
        Self {
            enabled: true,
            max_attempts,
            wait_min,
            wait_max,
            backoff_enabled: true,
            linear_backoff: false,
            ..Self::default()
        }
    }

    /// Linearly growing policy with jitter.
    pub fn linear(max_attempts: u32, wait_min: Duration, wait_max: Duration) -> Self {
        Self {
            enabled: true,
            max_attempts,
            wait_min,
            wait_max,
            backoff_enabled: true,
            linear_backoff: true,
            ..Self::default()
        }
    }

    /// Check the policy invariants.
    pub fn validate(&self) -> Result<()> {
        if self.backoff_enabled && self.max_attempts == 0 {
            return Err(Error::new(
                ErrorKind::Invalid,
                "backoff requires a positive attempt count",
            ));
        }
        if self.backoff_enabled && self.wait_max.is_zero() {
            return Err(Error::new(ErrorKind::Invalid, "backoff requires a positive maximum wait"));
        }
        if self.linear_backoff && !self.backoff_enabled {
            return Err(Error::new(
                ErrorKind::Invalid,
                "linear backoff requires backoff to be enabled",
            ));
        }
        Ok(())
    }
}

/// Run an operation under a retry policy.
///
/// The predicate decides retryability: a `false` verdict terminates the loop
/// immediately with that error. Only the final error is returned; every
/// intermediate failure is logged as a warning with the 1-indexed attempt.
/// Cancellation observed before an attempt or during a pause aborts with
/// `cancelled` without invoking the operation again.
#[instrument(skip_all, fields(message = %message, max_attempts = policy.max_attempts))]
pub async fn retry<T, F, Fut, P>(
    token: &CancellationToken,
    policy: &RetryPolicy,
    message: &str,
    predicate: P,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&Error) -> bool,
{
    policy.validate()?;

    if !policy.enabled {
        ensure_live(token)?;
        return operation().await;
    }

    let strategy = WaitStrategy::from_policy(policy);
    let attempts = policy.max_attempts.max(1);

    for attempt in 0..attempts {
        ensure_live(token)?;

        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt = attempt + 1, "operation succeeded after retries");
                }
                return Ok(value);
            }
            Err(err) => {
                warn!(attempt = attempt + 1, error = %err, "{message}");

                if !predicate(&err) || attempt + 1 == attempts {
                    return Err(err);
                }

                let delay = strategy.delay(policy.wait_min, policy.wait_max, attempt, None);
                sleep_cancellable(token, with_scheduling_jitter(delay)).await?;
            }
        }
    }

    Err(Error::new(ErrorKind::Unexpected, "retry loop exhausted without a result"))
}

/// [`retry`] with retryability decided by kind membership.
pub async fn retry_on_kinds<T, F, Fut>(
    token: &CancellationToken,
    policy: &RetryPolicy,
    message: &str,
    kinds: &[ErrorKind],
    operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry(token, policy, message, |err| err.is_any(kinds), operation).await
}

/// Sleep that wakes immediately on cancellation.
pub async fn sleep_cancellable(token: &CancellationToken, delay: Duration) -> Result<()> {
    tokio::select! {
        _ = token.cancelled() => Err(Error::new(ErrorKind::Cancelled, "operation cancelled")),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Add up to [`MAX_SCHEDULING_JITTER`] of random positive jitter.
pub fn with_scheduling_jitter(delay: Duration) -> Duration {
    let jitter = rand::thread_rng().gen_range(Duration::ZERO..=MAX_SCHEDULING_JITTER);
    delay + jitter
}
