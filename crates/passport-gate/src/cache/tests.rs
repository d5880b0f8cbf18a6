// crates/passport-gate/src/cache/tests.rs
// ============================================================================
// Module: Decision Cache Tests
// Description: Unit tests for coalescing, expiry, and eviction.
// Purpose: Pin the single-flight and reuse-window contracts.
// Dependencies: passport-gate, tokio
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use passport_gate_core::ActionContext;
use passport_gate_core::AgentId;
use passport_gate_core::AssuranceLevel;
use passport_gate_core::Decision;
use passport_gate_core::DecisionId;
use passport_gate_core::Fingerprint;
use passport_gate_core::PolicyId;
use time::OffsetDateTime;

use super::CacheSource;
use super::DecisionCache;
use crate::remote::RemoteError;
use crate::remote::RemoteErrorKind;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn fingerprint(amount: i64) -> Fingerprint {
    Fingerprint::derive(
        &AgentId::new("ap_agent"),
        &PolicyId::new("finance.payment.refund.v1"),
        None,
        &ActionContext::new().with("amount", amount),
    )
    .expect("fingerprint")
}

fn decision(decision_id: &str, expires_in: u64) -> Decision {
    issued_decision(decision_id, expires_in, OffsetDateTime::now_utc())
}

fn issued_decision(decision_id: &str, expires_in: u64, created_at: OffsetDateTime) -> Decision {
    Decision {
        decision_id: DecisionId::new(decision_id),
        allow: true,
        reasons: Vec::new(),
        assurance_level: AssuranceLevel::L1,
        expires_in,
        created_at,
    }
}

/// Returns a compute closure that counts invocations and resolves after `latency`.
fn counted(
    calls: &Arc<AtomicUsize>,
    latency: Duration,
    outcome: Result<Decision, RemoteError>,
) -> impl FnOnce() -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Decision, RemoteError>> + Send>,
> + use<> {
    let calls = Arc::clone(calls);
    move || {
        let number = calls.fetch_add(1, Ordering::SeqCst) + 1;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            outcome.map(|mut decision| {
                decision.decision_id = DecisionId::new(format!("{}#{number}", decision.decision_id));
                decision
            })
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn second_lookup_is_a_hit_with_the_same_instance() {
    let cache = DecisionCache::new(Duration::from_secs(60), 16);
    let calls = Arc::new(AtomicUsize::new(0));
    let key = fingerprint(1);
    let first = cache
        .get_or_compute(&key, counted(&calls, Duration::ZERO, Ok(decision("dec", 30))))
        .await
        .expect("first");
    let second = cache
        .get_or_compute(&key, counted(&calls, Duration::ZERO, Ok(decision("dec", 30))))
        .await
        .expect("second");
    assert_eq!(first.source, CacheSource::Computed);
    assert_eq!(second.source, CacheSource::Hit);
    assert!(Arc::ptr_eq(&first.decision, &second.decision));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_lookups_coalesce_into_one_computation() {
    let cache = DecisionCache::new(Duration::from_secs(60), 16);
    let calls = Arc::new(AtomicUsize::new(0));
    let key = fingerprint(2);
    let (left, right, third) = tokio::join!(
        cache.get_or_compute(&key, counted(&calls, Duration::from_millis(100), Ok(decision("dec", 30)))),
        cache.get_or_compute(&key, counted(&calls, Duration::from_millis(100), Ok(decision("dec", 30)))),
        cache.get_or_compute(&key, counted(&calls, Duration::from_millis(100), Ok(decision("dec", 30)))),
    );
    let (left, right, third) = (left.expect("left"), right.expect("right"), third.expect("third"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(left.source, CacheSource::Computed);
    assert_eq!(right.source, CacheSource::Coalesced);
    assert_eq!(third.source, CacheSource::Coalesced);
    assert!(Arc::ptr_eq(&left.decision, &right.decision));
    assert!(Arc::ptr_eq(&left.decision, &third.decision));
}

#[tokio::test(start_paused = true)]
async fn decision_window_shorter_than_ttl_governs() {
    let cache = DecisionCache::new(Duration::from_secs(60), 16);
    let calls = Arc::new(AtomicUsize::new(0));
    let key = fingerprint(3);
    cache
        .get_or_compute(&key, counted(&calls, Duration::ZERO, Ok(decision("dec", 5))))
        .await
        .expect("first");
    tokio::time::advance(Duration::from_millis(4_999)).await;
    assert!(cache.peek(&key).is_some());
    tokio::time::advance(Duration::from_millis(5)).await;
    assert!(cache.peek(&key).is_none());
    let again = cache
        .get_or_compute(&key, counted(&calls, Duration::ZERO, Ok(decision("dec", 5))))
        .await
        .expect("again");
    assert_eq!(again.source, CacheSource::Computed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn stale_decision_is_not_reused() {
    let cache = DecisionCache::new(Duration::from_secs(60), 16);
    let calls = Arc::new(AtomicUsize::new(0));
    let key = fingerprint(14);
    let an_hour_ago = OffsetDateTime::now_utc() - time::Duration::hours(1);
    let stale = || Ok(issued_decision("dec", 60, an_hour_ago));

    let first = cache.get_or_compute(&key, counted(&calls, Duration::ZERO, stale())).await;
    assert!(first.expect("first").expires_at.is_none());
    assert!(cache.is_empty());
    let second = cache.get_or_compute(&key, counted(&calls, Duration::ZERO, stale())).await;
    assert_eq!(second.expect("second").source, CacheSource::Computed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn aged_decision_keeps_only_its_remaining_window() {
    let cache = DecisionCache::new(Duration::from_secs(60), 16);
    let calls = Arc::new(AtomicUsize::new(0));
    let key = fingerprint(15);
    let issued = OffsetDateTime::now_utc() - time::Duration::seconds(20);
    let first = cache
        .get_or_compute(&key, counted(&calls, Duration::ZERO, Ok(issued_decision("dec", 30, issued))))
        .await
        .expect("first");
    let remaining = first.expires_at.expect("stored") - tokio::time::Instant::now();
    assert!(remaining <= Duration::from_secs(10) && remaining > Duration::from_secs(9));
    tokio::time::advance(Duration::from_secs(11)).await;
    assert!(cache.peek(&key).is_none());
}

#[tokio::test(start_paused = true)]
async fn ttl_shorter_than_decision_window_governs() {
    let cache = DecisionCache::new(Duration::from_secs(2), 16);
    let calls = Arc::new(AtomicUsize::new(0));
    let key = fingerprint(4);
    let first = cache
        .get_or_compute(&key, counted(&calls, Duration::ZERO, Ok(decision("dec", 600))))
        .await
        .expect("first");
    let remaining = first.expires_at.expect("stored") - tokio::time::Instant::now();
    assert!(remaining <= Duration::from_secs(2) && remaining > Duration::from_millis(1_990));
    tokio::time::advance(Duration::from_millis(2_010)).await;
    assert_eq!(cache.purge_expired(), 1);
    assert!(cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn zero_window_decisions_are_not_stored() {
    let cache = DecisionCache::new(Duration::from_secs(60), 16);
    let calls = Arc::new(AtomicUsize::new(0));
    let key = fingerprint(5);
    let first = cache
        .get_or_compute(&key, counted(&calls, Duration::ZERO, Ok(decision("dec", 0))))
        .await
        .expect("first");
    assert!(first.expires_at.is_none());
    assert!(cache.is_empty());
    cache
        .get_or_compute(&key, counted(&calls, Duration::ZERO, Ok(decision("dec", 0))))
        .await
        .expect("second");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn failures_reach_every_waiter_and_are_not_stored() {
    let cache = DecisionCache::new(Duration::from_secs(60), 16);
    let calls = Arc::new(AtomicUsize::new(0));
    let key = fingerprint(6);
    let failure = || Err(RemoteError::unavailable("down"));
    let (left, right) = tokio::join!(
        cache.get_or_compute(&key, counted(&calls, Duration::from_millis(50), failure())),
        cache.get_or_compute(&key, counted(&calls, Duration::from_millis(50), failure())),
    );
    assert_eq!(left.expect_err("left").kind, RemoteErrorKind::ServiceUnavailable);
    assert_eq!(right.expect_err("right").kind, RemoteErrorKind::ServiceUnavailable);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.is_empty());
    let recovered = cache
        .get_or_compute(&key, counted(&calls, Duration::ZERO, Ok(decision("dec", 30))))
        .await
        .expect("recovered");
    assert_eq!(recovered.source, CacheSource::Computed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn abandoned_caller_still_populates_the_cache() {
    let cache = DecisionCache::new(Duration::from_secs(60), 16);
    let calls = Arc::new(AtomicUsize::new(0));
    let key = fingerprint(7);
    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        cache.get_or_compute(&key, counted(&calls, Duration::from_millis(100), Ok(decision("dec", 30)))),
    )
    .await;
    assert!(abandoned.is_err());
    tokio::time::sleep(Duration::from_millis(200)).await;
    let late = cache
        .get_or_compute(&key, counted(&calls, Duration::ZERO, Ok(decision("dec", 30))))
        .await
        .expect("late");
    assert_eq!(late.source, CacheSource::Hit);
    assert_eq!(late.decision.decision_id.as_str(), "dec#1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn full_cache_evicts_earliest_expiry() {
    let cache = DecisionCache::new(Duration::from_secs(60), 2);
    let calls = Arc::new(AtomicUsize::new(0));
    for (amount, expires_in) in [(10, 50), (11, 5), (12, 40)] {
        cache
            .get_or_compute(
                &fingerprint(amount),
                counted(&calls, Duration::ZERO, Ok(decision("dec", expires_in))),
            )
            .await
            .expect("insert");
    }
    assert_eq!(cache.len(), 2);
    assert!(cache.peek(&fingerprint(10)).is_some());
    assert!(cache.peek(&fingerprint(11)).is_none());
    assert!(cache.peek(&fingerprint(12)).is_some());
}

#[tokio::test(start_paused = true)]
async fn invalidated_in_flight_result_is_not_stored() {
    let cache = DecisionCache::new(Duration::from_secs(60), 16);
    let calls = Arc::new(AtomicUsize::new(0));
    let key = fingerprint(13);
    let pending = {
        let cache = cache.clone();
        let key = key.clone();
        let compute = counted(&calls, Duration::from_millis(100), Ok(decision("dec", 30)));
        tokio::spawn(async move { cache.get_or_compute(&key, compute).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(cache.invalidate(&key));
    let resolved = pending.await.expect("join").expect("lookup");
    assert_eq!(resolved.source, CacheSource::Computed);
    assert!(cache.peek(&key).is_none());
}
