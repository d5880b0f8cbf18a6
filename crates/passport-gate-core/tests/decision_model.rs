//! Decision and context model tests for Passport Gate core.
// crates/passport-gate-core/tests/decision_model.rs
// ============================================================================
// Module: Decision Model Tests
// Description: Wire decoding of decisions and known-field context checks.
// Purpose: Pin the service payload shape and local context validation.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::time::Duration;

use passport_gate_core::ActionContext;
use passport_gate_core::AssuranceLevel;
use passport_gate_core::ContextError;
use passport_gate_core::Decision;
use passport_gate_core::ReasonSeverity;
use serde_json::json;
use time::OffsetDateTime;

#[test]
fn decision_decodes_service_payload() {
    let decision: Decision = serde_json::from_value(json!({
        "decision_id": "dec_01",
        "allow": false,
        "reasons": [
            {"code": "oap.limit_exceeded", "message": "amount above cap", "severity": "error"},
            {"code": "oap.note"}
        ],
        "assurance_level": "L4KYC",
        "expires_in": 5,
        "created_at": "2026-01-01T00:00:00Z"
    }))
    .expect("decision");
    assert!(!decision.allow);
    assert_eq!(decision.reason_codes(), vec!["oap.limit_exceeded", "oap.note"]);
    assert_eq!(decision.reasons[1].severity, ReasonSeverity::Error);
    assert_eq!(decision.assurance_level, AssuranceLevel::L4Kyc);
    assert_eq!(decision.validity(), Duration::from_secs(5));
}

#[test]
fn decision_defaults_optional_fields() {
    let decision: Decision = serde_json::from_value(json!({
        "decision_id": "dec_02",
        "allow": true,
        "created_at": "2026-01-01T00:00:00+00:00"
    }))
    .expect("decision");
    assert!(decision.reasons.is_empty());
    assert_eq!(decision.assurance_level, AssuranceLevel::L0);
    assert_eq!(decision.expires_in, 0);
}

#[test]
fn remaining_validity_counts_from_creation() {
    let mut decision: Decision = serde_json::from_value(json!({
        "decision_id": "dec_03",
        "allow": true,
        "expires_in": 60,
        "created_at": "1970-01-01T00:00:00Z"
    }))
    .expect("decision");
    let ttl = Duration::from_secs(300);
    let issued = OffsetDateTime::UNIX_EPOCH;

    assert_eq!(decision.remaining_validity(issued, ttl), Duration::from_secs(60));
    let later = issued + time::Duration::seconds(20);
    assert_eq!(decision.remaining_validity(later, ttl), Duration::from_secs(40));
    assert_eq!(decision.remaining_validity(later, Duration::from_secs(30)), Duration::from_secs(10));
    let stale = issued + time::Duration::hours(1);
    assert_eq!(decision.remaining_validity(stale, ttl), Duration::ZERO);

    decision.created_at = issued + time::Duration::seconds(5);
    assert_eq!(decision.remaining_validity(issued, ttl), Duration::from_secs(60));
}

#[test]
fn decision_requires_identifier_and_timestamp() {
    assert!(serde_json::from_value::<Decision>(json!({"allow": true})).is_err());
    assert!(
        serde_json::from_value::<Decision>(json!({
            "decision_id": "dec_03",
            "allow": true,
            "created_at": "yesterday"
        }))
        .is_err()
    );
}

#[test]
fn assurance_levels_are_ordered() {
    assert!(AssuranceLevel::L4Fin.meets(AssuranceLevel::L4Kyc));
    assert!(AssuranceLevel::L2.meets(AssuranceLevel::L2));
    assert!(!AssuranceLevel::L1.meets(AssuranceLevel::L3));
    assert_eq!(serde_json::to_value(AssuranceLevel::L4Fin).expect("encode"), json!("L4FIN"));
}

#[test]
fn typed_accessors_read_known_fields() {
    let context = ActionContext::new()
        .with("amount_minor", 4250)
        .with("currency", "EUR")
        .with("region", "DE")
        .with("table_name", "users")
        .with("row_limit", 1000)
        .with("include_pii", false)
        .with("custom_field", json!({"nested": true}));
    assert_eq!(context.amount(), Some(4250));
    assert_eq!(context.currency(), Some("EUR"));
    assert_eq!(context.region(), Some("DE"));
    assert_eq!(context.table_name(), Some("users"));
    assert_eq!(context.row_limit(), Some(1000));
    assert_eq!(context.include_pii(), Some(false));
    assert_eq!(context.get("custom_field"), Some(&json!({"nested": true})));
    assert!(context.validate_known_fields().is_ok());
}

#[test]
fn known_field_validation_rejects_bad_shapes() {
    let cases = [
        (ActionContext::new().with("amount", "5000"), "amount"),
        (ActionContext::new().with("amount", -1), "amount"),
        (ActionContext::new().with("currency", "usd"), "currency"),
        (ActionContext::new().with("row_limit", -5), "row_limit"),
        (ActionContext::new().with("include_pii", "no"), "include_pii"),
        (ActionContext::new().with("mcp_tools", json!(["a", 1])), "mcp_tools"),
        (ActionContext::new().with("mcp_session", 7), "mcp_session"),
    ];
    for (context, field) in cases {
        let err = context.validate_known_fields().expect_err("invalid context");
        let named = match &err {
            ContextError::WrongType {
                field, ..
            }
            | ContextError::InvalidValue {
                field, ..
            } => *field,
        };
        assert_eq!(named, field, "unexpected error {err}");
    }
}

#[test]
fn unknown_fields_are_not_validated() {
    let context = ActionContext::new().with("anything", json!([1, {"x": null}]));
    assert!(context.validate_known_fields().is_ok());
}
