// crates/passport-gate/src/retry.rs
// ============================================================================
// Module: Retry Policy
// Description: Backoff schedule, rate-limit waits, and request deadlines.
// Purpose: Keep retry arithmetic pure so it can be tested without I/O.
// Dependencies: passport-gate-config
// ============================================================================

//! ## Overview
//! Only transient failures (timeouts, unavailability) are retried with
//! exponential backoff. A rate-limited response earns exactly one retry after
//! the service's hint (or the configured default), capped. Everything runs
//! inside a request-scoped deadline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use passport_gate_config::RetryConfig;

use crate::remote::RemoteError;
use crate::remote::RemoteErrorKind;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Retry and deadline policy for decision requests.
///
/// # Invariants
/// - `max_attempts >= 1`.
/// - `base_delay <= max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts for transient failures, including the first.
    max_attempts: u32,
    /// Initial backoff delay.
    base_delay: Duration,
    /// Backoff cap.
    max_delay: Duration,
    /// Request-scoped deadline.
    deadline: Duration,
    /// Wait used when a rate-limit response has no hint.
    default_retry_after: Duration,
    /// Cap on honored rate-limit hints.
    max_retry_after: Duration,
    /// Whether one rate-limited retry is allowed.
    retry_rate_limited: bool,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Wait, then attempt again.
    RetryAfter(Duration),
    /// Surface the error.
    GiveUp,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Builds a policy from the retry configuration section.
    #[must_use]
    pub const fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: if config.max_attempts == 0 { 1 } else { config.max_attempts },
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            deadline: Duration::from_millis(config.deadline_ms),
            default_retry_after: Duration::from_millis(config.default_retry_after_ms),
            max_retry_after: Duration::from_millis(config.max_retry_after_ms),
            retry_rate_limited: true,
        }
    }

    /// Returns a policy that never retries.
    #[must_use]
    pub const fn no_retry(deadline: Duration) -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            deadline,
            default_retry_after: Duration::ZERO,
            max_retry_after: Duration::ZERO,
            retry_rate_limited: false,
        }
    }

    /// Returns the request-scoped deadline.
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Returns the maximum attempts for transient failures.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the backoff delay before retry number `retry` (zero-based).
    #[must_use]
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay.checked_mul(factor).map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Returns the wait applied before the single rate-limit retry.
    #[must_use]
    pub fn rate_limit_delay(&self, hint: Option<Duration>) -> Duration {
        hint.unwrap_or(self.default_retry_after).min(self.max_retry_after)
    }

    /// Decides the next step after a failed attempt.
    ///
    /// `transient_failures` counts timeouts and unavailability seen so far,
    /// including `error`; `rate_limit_retried` is true once the single
    /// rate-limit retry has been spent.
    #[must_use]
    pub fn next_step(
        &self,
        error: &RemoteError,
        transient_failures: u32,
        rate_limit_retried: bool,
    ) -> RetryStep {
        match error.kind {
            RemoteErrorKind::Timeout | RemoteErrorKind::ServiceUnavailable
                if transient_failures < self.max_attempts =>
            {
                RetryStep::RetryAfter(self.backoff_delay(transient_failures.saturating_sub(1)))
            }
            RemoteErrorKind::RateLimited {
                retry_after,
            } if self.retry_rate_limited && !rate_limit_retried => {
                RetryStep::RetryAfter(self.rate_limit_delay(retry_after))
            }
            _ => RetryStep::GiveUp,
        }
    }
}
