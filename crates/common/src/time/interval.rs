//! Recurring intervals with optional jitter.
//!
//! Periodic background work (cache garbage collection, schedulers) ticks on
//! an [`Interval`]. A jitter fraction desynchronises fleets of instances
//! that would otherwise all wake at the same moment.

use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep, Instant};

/// A recurring interval with an optional jitter fraction.
pub struct Interval {
    period: Duration,
    /// Jitter fraction in `0.0..=1.0`; each tick is perturbed by up to this
    /// share of the period in either direction.
    jitter: f64,
    ticker: Option<tokio::time::Interval>,
}

impl Interval {
    /// Create an interval that ticks every `period` without jitter.
    pub fn new(period: Duration) -> Self {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        Self { period, jitter: 0.0, ticker: Some(ticker) }
    }

    /// Create a jittered interval; `jitter` is clamped into `0.0..=1.0`.
    pub fn with_jitter(period: Duration, jitter: f64) -> Self {
        let jitter = jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return Self::new(period);
        }
        Self { period, jitter, ticker: None }
    }

    /// Wait for the next tick.
    ///
    /// The first tick of an unjittered interval fires immediately, matching
    /// the underlying tokio interval; jittered intervals always sleep.
    pub async fn tick(&mut self) -> Instant {
        if let Some(ticker) = self.ticker.as_mut() {
            ticker.tick().await
        } else {
            let spread = self.period.as_secs_f64() * self.jitter;
            let offset = rand::thread_rng().gen_range(-spread..=spread);
            let delay = Duration::from_secs_f64((self.period.as_secs_f64() + offset).max(0.0));
            sleep(delay).await;
            Instant::now()
        }
    }
}

/// Convenience constructor for a jittered interval.
pub fn interval_with_jitter(period: Duration, jitter: f64) -> Interval {
    Interval::with_jitter(period, jitter)
}
