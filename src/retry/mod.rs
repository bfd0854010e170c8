//! Retry decisions for failed service calls.
//!
//! [`RetryStrategy`] consumes the classification of a [`ServiceException`] and
//! tells the caller whether to send the request again, how long to wait first,
//! and whether its clock offset needs correcting.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::exception::clock_skew::compute_clock_skew;
use crate::exception::{ServiceErrorKind, ServiceException};
use crate::metrics::{Counter, NoOpCounter};

/// Why a failed call should not be attempted again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GiveUpReason {
    /// The error will not go away by retrying.
    NotRetryable,
    /// Every allowed attempt has been used.
    AttemptsExhausted,
}

/// What the caller should do after a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Send the request again after `delay`.
    Retry { delay: Duration },
    /// Store `clock_skew` as the new client clock offset, then send the request
    /// again after `delay`.
    RetryWithClockSkew {
        delay: Duration,
        clock_skew: chrono::Duration,
    },
    /// Surface the error to the caller.
    DoNotRetry(GiveUpReason),
}

impl RetryDecision {
    /// Returns true for either retry variant.
    pub fn should_retry(&self) -> bool {
        !matches!(self, RetryDecision::DoNotRetry(_))
    }

    /// Returns the delay before the next attempt, if there is one.
    pub fn delay(&self) -> Option<Duration> {
        match self {
            RetryDecision::Retry { delay } | RetryDecision::RetryWithClockSkew { delay, .. } => {
                Some(*delay)
            }
            RetryDecision::DoNotRetry(_) => None,
        }
    }
}

/// Counters updated by a [`RetryStrategy`]. All no-ops by default.
#[derive(Clone, Debug)]
pub struct RetryMetrics {
    /// Incremented for each decision to retry.
    pub retries: Arc<dyn Counter>,
    /// Incremented for each decision to give up.
    pub give_ups: Arc<dyn Counter>,
    /// Incremented each time a new clock offset is handed out.
    pub clock_skew_corrections: Arc<dyn Counter>,
}

impl Default for RetryMetrics {
    fn default() -> Self {
        Self {
            retries: Arc::new(NoOpCounter),
            give_ups: Arc::new(NoOpCounter),
            clock_skew_corrections: Arc::new(NoOpCounter),
        }
    }
}

/// Exponential backoff driven by service error classification.
#[derive(Clone, Debug)]
pub struct RetryStrategy {
    /// Base delay for the first retry attempt.
    pub base_delay: Duration,
    /// Base delay used instead of `base_delay` when the service is throttling.
    pub throttling_base_delay: Duration,
    /// Maximum delay cap for any retry attempt.
    pub max_delay: Duration,
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Percentage of jitter to add to delays (0-100).
    pub jitter_percent: u8,
    /// Counters updated on every decision.
    pub metrics: RetryMetrics,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            throttling_base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(20),
            max_attempts: 3,
            jitter_percent: 10,
            metrics: RetryMetrics::default(),
        }
    }
}

impl RetryStrategy {
    /// Creates a new retry strategy with the specified parameters.
    ///
    /// Throttled calls back off from twice `base_delay`.
    pub fn new(
        base_delay: Duration,
        max_delay: Duration,
        max_attempts: u32,
        jitter_percent: u8,
    ) -> Self {
        Self {
            base_delay,
            throttling_base_delay: base_delay.saturating_mul(2),
            max_delay,
            max_attempts,
            jitter_percent: jitter_percent.min(100),
            metrics: RetryMetrics::default(),
        }
    }

    /// Sets the counters updated on every decision.
    pub fn with_metrics(mut self, metrics: RetryMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Calculates the delay before retry number `attempt` (1-based).
    ///
    /// The delay is `base * 2^(attempt - 1)`, capped at `max_delay`, with
    /// jitter of up to `jitter_percent` applied.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        self.backoff(self.base_delay, attempt)
    }

    /// Like [`RetryStrategy::calculate_delay`], using the throttling base delay
    /// for throttled calls.
    pub fn calculate_delay_for(&self, attempt: u32, kind: ServiceErrorKind) -> Duration {
        match kind {
            ServiceErrorKind::Throttling => self.backoff(self.throttling_base_delay, attempt),
            _ => self.backoff(self.base_delay, attempt),
        }
    }

    fn backoff(&self, base: Duration, attempt: u32) -> Duration {
        if attempt == 0 {
            return base.min(self.max_delay);
        }

        let exponent = (attempt - 1).min(31);
        let multiplier = 1u64 << exponent;
        let base_millis = base.as_millis() as u64;
        let delay_millis = base_millis.saturating_mul(multiplier);

        let capped_millis = delay_millis.min(self.max_delay.as_millis() as u64);

        let jitter_range = (capped_millis as f64 * self.jitter_percent as f64) / 100.0;
        let jitter = deterministic_jitter(attempt, jitter_range);

        let final_millis = (capped_millis as i64 + jitter).max(0) as u64;
        Duration::from_millis(final_millis)
    }

    /// Decides what to do after attempt number `attempt` (1-based) failed
    /// with `exception`, judged against the current local time.
    pub fn decide(&self, attempt: u32, exception: &ServiceException) -> RetryDecision {
        self.decide_at(attempt, exception, Utc::now())
    }

    /// Like [`RetryStrategy::decide`], with an explicit local clock.
    pub fn decide_at(
        &self,
        attempt: u32,
        exception: &ServiceException,
        now: DateTime<Utc>,
    ) -> RetryDecision {
        let kind = exception.classification_at(now);
        let decision = self.decide_kind(attempt, kind, exception, now);

        match decision {
            RetryDecision::DoNotRetry(reason) => {
                self.metrics.give_ups.increment();
                if reason == GiveUpReason::AttemptsExhausted {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        %kind,
                        "giving up after exhausting retry attempts"
                    );
                }
            }
            RetryDecision::RetryWithClockSkew { clock_skew, .. } => {
                self.metrics.retries.increment();
                self.metrics.clock_skew_corrections.increment();
                debug!(
                    attempt,
                    clock_skew_secs = clock_skew.num_seconds(),
                    "retrying with corrected clock skew"
                );
            }
            RetryDecision::Retry { delay } => {
                self.metrics.retries.increment();
                debug!(attempt, delay_ms = delay.as_millis() as u64, %kind, "retrying");
            }
        }
        decision
    }

    fn decide_kind(
        &self,
        attempt: u32,
        kind: ServiceErrorKind,
        exception: &ServiceException,
        now: DateTime<Utc>,
    ) -> RetryDecision {
        if kind == ServiceErrorKind::Fatal {
            return RetryDecision::DoNotRetry(GiveUpReason::NotRetryable);
        }
        if attempt >= self.max_attempts {
            return RetryDecision::DoNotRetry(GiveUpReason::AttemptsExhausted);
        }

        if kind == ServiceErrorKind::ClockSkew {
            // Without a server clock there is nothing to correct, so fall back
            // to treating a retryable code as an ordinary transient failure.
            return match exception.server_time() {
                Some(server_time) => RetryDecision::RetryWithClockSkew {
                    delay: Duration::ZERO,
                    clock_skew: compute_clock_skew(now, server_time),
                },
                None if exception.retryable() => RetryDecision::Retry {
                    delay: self.calculate_delay(attempt),
                },
                None => RetryDecision::DoNotRetry(GiveUpReason::NotRetryable),
            };
        }

        RetryDecision::Retry {
            delay: self.calculate_delay_for(attempt, kind),
        }
    }
}

/// Deterministic jitter alternating in sign with the attempt number.
fn deterministic_jitter(attempt: u32, jitter_range: f64) -> i64 {
    let sign = if attempt % 2 == 0 { 1.0 } else { -1.0 };
    let factor = ((attempt % 5) as f64 + 1.0) / 5.0;
    (jitter_range * sign * factor) as i64
}
