// crates/passport-gate/src/client/tests.rs
// ============================================================================
// Module: Decision Client Tests
// Description: Unit tests for retries, rate limiting, and deadlines.
// Purpose: Verify attempt counts and timing under paused tokio time.
// Dependencies: passport-gate, tokio
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use passport_gate_config::RetryConfig;
use passport_gate_core::ActionContext;
use passport_gate_core::AgentId;
use passport_gate_core::Decision;
use passport_gate_core::DecisionId;
use passport_gate_core::PolicyId;
use time::OffsetDateTime;
use tokio::time::Instant;

use super::DecisionClient;
use crate::remote::RemoteError;
use crate::remote::RemoteErrorKind;
use crate::retry::RetryPolicy;
use crate::transport::DecisionRequest;
use crate::transport::PolicyService;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

struct ScriptedService {
    replies: Mutex<VecDeque<Result<Decision, RemoteError>>>,
    latency: Duration,
    calls: AtomicUsize,
}

impl ScriptedService {
    fn new(replies: Vec<Result<Decision, RemoteError>>, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            latency,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PolicyService for ScriptedService {
    async fn request_decision(&self, _request: &DecisionRequest) -> Result<Decision, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::unavailable("script exhausted")))
    }
}

fn allow(decision_id: &str) -> Decision {
    Decision {
        decision_id: DecisionId::new(decision_id),
        allow: true,
        reasons: Vec::new(),
        assurance_level: passport_gate_core::AssuranceLevel::L2,
        expires_in: 60,
        created_at: OffsetDateTime::now_utc(),
    }
}

fn request() -> DecisionRequest {
    DecisionRequest {
        agent_id: AgentId::new("ap_agent"),
        policy_id: PolicyId::new("finance.payment.refund.v1"),
        context: ActionContext::new().with("amount", 100),
        idempotency_key: None,
    }
}

fn retry(deadline_ms: u64, max_retry_after_ms: u64) -> RetryPolicy {
    RetryPolicy::from_config(&RetryConfig {
        max_attempts: 3,
        base_delay_ms: 100,
        max_delay_ms: 1_000,
        deadline_ms,
        default_retry_after_ms: 500,
        max_retry_after_ms,
    })
}

fn assert_elapsed(started: Instant, expected: Duration) {
    let elapsed = started.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(10),
        "elapsed {} ms, expected {} ms",
        elapsed.as_millis(),
        expected.as_millis()
    );
}

fn client(service: &Arc<ScriptedService>, policy: RetryPolicy) -> DecisionClient {
    DecisionClient::new(Arc::clone(service) as Arc<dyn PolicyService>, policy)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn transient_failures_back_off_then_succeed() {
    let service = ScriptedService::new(
        vec![
            Err(RemoteError::unavailable("down")),
            Err(RemoteError::timeout("slow")),
            Ok(allow("dec_ok")),
        ],
        Duration::ZERO,
    );
    let started = Instant::now();
    let decision = client(&service, retry(5_000, 2_000)).request(&request()).await.expect("decision");
    assert_eq!(decision.decision_id.as_str(), "dec_ok");
    assert_eq!(service.calls(), 3);
    assert_elapsed(started, Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn transient_failures_stop_at_max_attempts() {
    let service = ScriptedService::new(
        vec![
            Err(RemoteError::unavailable("down")),
            Err(RemoteError::unavailable("down")),
            Err(RemoteError::unavailable("still down")),
            Ok(allow("never")),
        ],
        Duration::ZERO,
    );
    let err = client(&service, retry(5_000, 2_000)).request(&request()).await.expect_err("error");
    assert_eq!(err.kind, RemoteErrorKind::ServiceUnavailable);
    assert_eq!(err.message, "still down");
    assert_eq!(service.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_honors_hint_and_retries_once() {
    let service = ScriptedService::new(
        vec![
            Err(RemoteError::rate_limited(Some(Duration::from_secs(1)), "slow down")),
            Ok(allow("dec_after_wait")),
        ],
        Duration::ZERO,
    );
    let started = Instant::now();
    let decision = client(&service, retry(5_000, 2_000)).request(&request()).await.expect("decision");
    assert_eq!(decision.decision_id.as_str(), "dec_after_wait");
    assert_elapsed(started, Duration::from_secs(1));

    let service = ScriptedService::new(
        vec![
            Err(RemoteError::rate_limited(None, "slow down")),
            Err(RemoteError::rate_limited(None, "slow down again")),
            Ok(allow("never")),
        ],
        Duration::ZERO,
    );
    let err = client(&service, retry(5_000, 2_000)).request(&request()).await.expect_err("error");
    assert!(matches!(err.kind, RemoteErrorKind::RateLimited { .. }));
    assert_eq!(service.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn client_defects_propagate_immediately() {
    for error in [RemoteError::http(400), RemoteError::http(404), RemoteError::malformed("bad")] {
        let expected = error.kind;
        let service = ScriptedService::new(vec![Err(error), Ok(allow("never"))], Duration::ZERO);
        let err = client(&service, retry(5_000, 2_000)).request(&request()).await.expect_err("error");
        assert_eq!(err.kind, expected);
        assert_eq!(service.calls(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn deadline_converts_in_flight_attempts_to_timeout() {
    let service = ScriptedService::new(vec![Ok(allow("too_late"))], Duration::from_secs(10));
    let started = Instant::now();
    let err = client(&service, retry(5_000, 2_000))
        .request_within(&request(), Duration::from_millis(500))
        .await
        .expect_err("timeout");
    assert_eq!(err.kind, RemoteErrorKind::Timeout);
    assert_elapsed(started, Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn wait_past_deadline_ends_early_with_timeout() {
    let service = ScriptedService::new(
        vec![Err(RemoteError::rate_limited(Some(Duration::from_secs(3)), "slow down"))],
        Duration::ZERO,
    );
    let started = Instant::now();
    let err = client(&service, retry(1_500, 5_000)).request(&request()).await.expect_err("timeout");
    assert_eq!(err.kind, RemoteErrorKind::Timeout);
    assert_eq!(service.calls(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}
