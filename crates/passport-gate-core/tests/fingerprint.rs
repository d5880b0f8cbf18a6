//! Fingerprint derivation tests for Passport Gate core.
// crates/passport-gate-core/tests/fingerprint.rs
// ============================================================================
// Module: Fingerprint Tests
// Description: Determinism and sensitivity of request fingerprints.
// Purpose: Ensure identical requests collide and any field change separates.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use passport_gate_core::ActionContext;
use passport_gate_core::AgentId;
use passport_gate_core::Fingerprint;
use passport_gate_core::IdempotencyKey;
use passport_gate_core::PolicyId;
use proptest::prelude::*;
use serde_json::json;

fn refund(amount: i64) -> ActionContext {
    ActionContext::new()
        .with("amount", amount)
        .with("currency", "USD")
        .with("customer_id", "cust_123")
}

fn derive(key: Option<&str>, context: &ActionContext) -> Fingerprint {
    let key = key.map(IdempotencyKey::new);
    Fingerprint::derive(
        &AgentId::new("ap_agent"),
        &PolicyId::new("finance.payment.refund.v1"),
        key.as_ref(),
        context,
    )
    .expect("fingerprint")
}

#[test]
fn identical_requests_share_a_fingerprint() {
    assert_eq!(derive(Some("k1"), &refund(5000)), derive(Some("k1"), &refund(5000)));
    assert_eq!(derive(None, &refund(5000)), derive(None, &refund(5000)));
}

#[test]
fn insertion_order_does_not_matter() {
    let forward = ActionContext::new().with("a", 1).with("b", json!({"x": 1, "y": 2}));
    let reverse = ActionContext::new().with("b", json!({"y": 2, "x": 1})).with("a", 1);
    assert_eq!(derive(None, &forward), derive(None, &reverse));
}

#[test]
fn same_key_with_different_context_separates() {
    assert_ne!(derive(Some("k1"), &refund(5000)), derive(Some("k1"), &refund(5001)));
}

#[test]
fn key_presence_separates() {
    assert_ne!(derive(Some("k1"), &refund(5000)), derive(None, &refund(5000)));
    assert_ne!(derive(Some("k1"), &refund(5000)), derive(Some("k2"), &refund(5000)));
}

#[test]
fn agent_and_policy_bind_the_fingerprint() {
    let context = refund(100);
    let base = derive(None, &context);
    let other_agent = Fingerprint::derive(
        &AgentId::new("ap_other"),
        &PolicyId::new("finance.payment.refund.v1"),
        None,
        &context,
    )
    .expect("fingerprint");
    let other_policy = Fingerprint::derive(
        &AgentId::new("ap_agent"),
        &PolicyId::new("data.export.create.v1"),
        None,
        &context,
    )
    .expect("fingerprint");
    assert_ne!(base, other_agent);
    assert_ne!(base, other_policy);
    assert_eq!(base.as_str().len(), 64);
}

proptest! {
    #[test]
    fn distinct_amounts_never_collide(left in 0i64..1_000_000, right in 0i64..1_000_000) {
        prop_assume!(left != right);
        prop_assert_ne!(derive(None, &refund(left)), derive(None, &refund(right)));
    }
}
