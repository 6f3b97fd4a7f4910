//! Wait policies for the retry engine.
//!
//! A [`WaitStrategy`] decides how long to pause between attempts. All three
//! strategies defer to a server-provided `Retry-After` hint when one is
//! supplied; the hint parser accepts delta-seconds and the common HTTP date
//! formats.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;

use crate::error::{Error, ErrorKind, Result};

use super::retry::RetryPolicy;

/// RFC 1123 date, GMT-suffixed (the classic HTTP-date form).
const RFC1123_GMT: &str = "%a, %d %b %Y %H:%M:%S GMT";
/// RFC 1123 date with a numeric UTC offset.
const RFC1123_OFFSET: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Strategy for computing the pause between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Constant wait: always the configured minimum.
    Basic,
    /// Wait scaling linearly with the attempt number, randomly perturbed.
    LinearJitter,
    /// Wait doubling with each attempt, capped at the configured maximum.
    Exponential,
}

impl WaitStrategy {
    /// Choose the strategy a retry policy calls for.
    pub fn from_policy(policy: &RetryPolicy) -> Self {
        if !policy.enabled || !policy.backoff_enabled {
            WaitStrategy::Basic
        } else if policy.linear_backoff {
            WaitStrategy::LinearJitter
        } else {
            WaitStrategy::Exponential
        }
    }

    /// Compute the wait before the attempt after `attempt` (0-indexed).
    ///
    /// A `retry_after` hint, when present, overrides the computed value.
    pub fn delay(
        &self,
        min: Duration,
        max: Duration,
        attempt: u32,
        retry_after: Option<Duration>,
    ) -> Duration {
        if let Some(hint) = retry_after {
            return hint;
        }
        match self {
            WaitStrategy::Basic => min,
            WaitStrategy::LinearJitter => {
                let base = min.saturating_mul(attempt + 1);
                let jittered = apply_jitter(base);
                jittered.clamp(min, max.max(min))
            }
            WaitStrategy::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                min.saturating_mul(factor).min(max.max(min))
            }
        }
    }
}

/// Perturb a delay into the 75%–125% band.
fn apply_jitter(delay: Duration) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    let factor = rand::thread_rng().gen_range(0.75..=1.25);
    delay.mul_f64(factor)
}

/// Parse a `Retry-After` header value into a wait duration.
///
/// Accepts a decimal integer of seconds (negative values yield zero) or a
/// date in RFC 1123, RFC 1123 with numeric offset, or RFC 3339 form (with or
/// without fractional seconds); past dates yield zero. Unparseable input is
/// a `not-found` error so callers fall back to their algorithmic delay.
pub fn parse_retry_after(value: &str) -> Result<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::new(ErrorKind::NotFound, "empty retry-after value"));
    }

    if let Ok(seconds) = value.parse::<i64>() {
        let seconds = u64::try_from(seconds).unwrap_or(0);
        return Ok(Duration::from_secs(seconds));
    }

    if let Some(date) = parse_http_date(value) {
        let wait = (date - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        return Ok(wait);
    }

    Err(Error::new(ErrorKind::NotFound, format!("unparseable retry-after value: {value}")))
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, RFC1123_GMT) {
        return Some(parsed.and_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_str(value, RFC1123_OFFSET) {
        return Some(parsed.with_timezone(&Utc));
    }
    None
}

/// Extract the server wait hint for a response, if the status carries one.
///
/// Only 429 and 503 responses are trusted to carry `Retry-After`; anything
/// unparseable is ignored so the caller keeps its algorithmic delay.
pub fn retry_after_hint(status: u16, retry_after: Option<&str>) -> Option<Duration> {
    if !matches!(status, 429 | 503) {
        return None;
    }
    retry_after.and_then(|value| parse_retry_after(value).ok())
}
