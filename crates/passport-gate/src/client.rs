// crates/passport-gate/src/client.rs
// ============================================================================
// Module: Decision Client
// Description: Retrying, deadline-bounded decision requests.
// Purpose: Turn single-attempt transport calls into one resolved outcome.
// Dependencies: tokio, crate::{retry, transport}
// ============================================================================

//! ## Overview
//! [`DecisionClient`] drives a [`PolicyService`] through the
//! [`RetryPolicy`]. The whole sequence (attempts and waits) runs inside a
//! request-scoped deadline; when the deadline elapses, or a scheduled wait
//! would cross it, the request ends with a terminal timeout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use passport_gate_core::Decision;
use tokio::time::Instant;

use crate::remote::RemoteError;
use crate::remote::RemoteErrorKind;
use crate::retry::RetryPolicy;
use crate::retry::RetryStep;
use crate::transport::DecisionRequest;
use crate::transport::PolicyService;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Decision client applying retry and deadline policy.
#[derive(Clone)]
pub struct DecisionClient {
    /// Single-attempt policy service.
    service: Arc<dyn PolicyService>,
    /// Retry and deadline policy.
    retry: RetryPolicy,
}

impl DecisionClient {
    /// Creates a decision client.
    #[must_use]
    pub fn new(service: Arc<dyn PolicyService>, retry: RetryPolicy) -> Self {
        Self {
            service,
            retry,
        }
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Requests a decision under the configured deadline.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] once retries are exhausted or the deadline elapses.
    pub async fn request(&self, request: &DecisionRequest) -> Result<Decision, RemoteError> {
        self.request_within(request, self.retry.deadline()).await
    }

    /// Requests a decision under the tighter of `budget` and the configured deadline.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] once retries are exhausted or the deadline elapses.
    pub async fn request_within(
        &self,
        request: &DecisionRequest,
        budget: Duration,
    ) -> Result<Decision, RemoteError> {
        let budget = budget.min(self.retry.deadline());
        let deadline = Instant::now() + budget;
        if let Ok(result) = tokio::time::timeout_at(deadline, self.attempt(request, deadline)).await
        {
            result
        } else {
            Err(RemoteError::timeout(format!(
                "request deadline of {} ms exceeded",
                budget.as_millis()
            )))
        }
    }

    /// Runs attempts until success, a terminal error, or an unaffordable wait.
    async fn attempt(
        &self,
        request: &DecisionRequest,
        deadline: Instant,
    ) -> Result<Decision, RemoteError> {
        let mut transient_failures = 0u32;
        let mut rate_limit_retried = false;
        loop {
            let error = match self.service.request_decision(request).await {
                Ok(decision) => return Ok(decision),
                Err(error) => error,
            };
            if error.kind.is_transient() {
                transient_failures = transient_failures.saturating_add(1);
            }
            match self.retry.next_step(&error, transient_failures, rate_limit_retried) {
                RetryStep::GiveUp => return Err(error),
                RetryStep::RetryAfter(delay) => {
                    if matches!(error.kind, RemoteErrorKind::RateLimited { .. }) {
                        rate_limit_retried = true;
                    }
                    if Instant::now() + delay >= deadline {
                        return Err(RemoteError::timeout(format!(
                            "retry wait of {} ms exceeds request deadline after {error}",
                            delay.as_millis()
                        )));
                    }
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
