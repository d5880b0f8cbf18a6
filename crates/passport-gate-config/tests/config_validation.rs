//! Validation tests for passport-gate-config.
// crates/passport-gate-config/tests/config_validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Range, cross-field, and strict parsing checks.
// Purpose: Ensure invalid configuration fails closed with a named field.
// =============================================================================

use passport_gate_config::AuditSinkKind;
use passport_gate_config::FailureMode;
use passport_gate_config::GatewayConfig;

mod common;

use common::assert_invalid;

type TestResult = Result<(), String>;

// ============================================================================
// SECTION: Service
// ============================================================================

#[test]
fn base_url_is_required() -> TestResult {
    let config = common::config_from_toml("").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "service.base_url is required")
}

#[test]
fn base_url_rejects_other_schemes() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.service.base_url = "ftp://api.aport.io".to_string();
    assert_invalid(config.validate(), "http or https")
}

#[test]
fn base_url_rejects_query() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.service.base_url = "https://api.aport.io/?token=1".to_string();
    assert_invalid(config.validate(), "query or fragment")
}

#[test]
fn api_key_rejects_whitespace() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.service.api_key = Some("sk live".to_string());
    assert_invalid(config.validate(), "service.api_key")?;
    config.service.api_key = Some("   ".to_string());
    assert_invalid(config.validate(), "service.api_key")
}

#[test]
fn request_timeout_bounds() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.service.request_timeout_ms = 50;
    assert_invalid(config.validate(), "service.request_timeout_ms")?;
    config.service.request_timeout_ms = 30_001;
    assert_invalid(config.validate(), "service.request_timeout_ms")
}

// ============================================================================
// SECTION: Retry
// ============================================================================

#[test]
fn retry_attempts_bounds() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.retry.max_attempts = 0;
    assert_invalid(config.validate(), "retry.max_attempts")?;
    config.retry.max_attempts = 11;
    assert_invalid(config.validate(), "retry.max_attempts")
}

#[test]
fn max_delay_must_cover_base_delay() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.retry.base_delay_ms = 500;
    config.retry.max_delay_ms = 100;
    assert_invalid(config.validate(), "retry.max_delay_ms")
}

#[test]
fn deadline_must_cover_one_attempt() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.service.request_timeout_ms = 2_000;
    config.retry.deadline_ms = 1_000;
    assert_invalid(config.validate(), "retry.deadline_ms")
}

#[test]
fn retry_after_cap_must_fit_deadline() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.retry.max_retry_after_ms = config.retry.deadline_ms + 1;
    assert_invalid(config.validate(), "retry.max_retry_after_ms")?;
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.retry.default_retry_after_ms = config.retry.max_retry_after_ms + 1;
    assert_invalid(config.validate(), "retry.default_retry_after_ms")
}

// ============================================================================
// SECTION: Cache and Passport
// ============================================================================

#[test]
fn cache_bounds() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.cache.ttl_seconds = 0;
    assert_invalid(config.validate(), "cache.ttl_seconds")?;
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.cache.max_entries = 0;
    assert_invalid(config.validate(), "cache.max_entries")
}

#[test]
fn passport_cache_may_be_disabled() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.passport.cache_ttl_seconds = 0;
    config.validate().map_err(|err| err.to_string())?;
    config.passport.cache_ttl_seconds = 3_601;
    assert_invalid(config.validate(), "passport.cache_ttl_seconds")
}

// ============================================================================
// SECTION: Enforcement
// ============================================================================

#[test]
fn fail_open_requires_acknowledgement() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.enforcement.failure_mode = FailureMode::FailOpen;
    assert_invalid(config.validate(), "allow_fail_open")?;
    config.enforcement.allow_fail_open = true;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn minimum_assurance_parses_wire_labels() -> TestResult {
    let result = GatewayConfig::from_toml(
        r#"
[service]
base_url = "https://api.aport.io"

[enforcement]
minimum_assurance = "L4KYC"
"#,
    );
    let config = result.map_err(|err| err.to_string())?;
    if config.enforcement.minimum_assurance != Some(passport_gate_core::AssuranceLevel::L4Kyc) {
        return Err("minimum assurance not parsed".to_string());
    }
    Ok(())
}

#[test]
fn empty_policy_target_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.policies.tools.insert("refund".to_string(), " ".to_string());
    assert_invalid(config.validate(), "policies.tools.refund")
}

// ============================================================================
// SECTION: Audit
// ============================================================================

#[test]
fn file_sink_requires_path() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.audit.sink = AuditSinkKind::File;
    assert_invalid(config.validate(), "audit.path")?;
    config.audit.path = Some("audit.jsonl".to_string());
    config.validate().map_err(|err| err.to_string())?;
    config.audit.sink = AuditSinkKind::Stderr;
    assert_invalid(config.validate(), "only allowed when sink=file")
}

// ============================================================================
// SECTION: Strict Parsing
// ============================================================================

#[test]
fn unknown_keys_are_rejected() -> TestResult {
    assert_invalid(
        GatewayConfig::from_toml("[service]\nbase_url = \"https://a.io\"\nretries = 3\n"),
        "config parse error",
    )?;
    assert_invalid(GatewayConfig::from_toml("[unknown]\n"), "config parse error")
}

#[test]
fn unknown_failure_mode_is_rejected() -> TestResult {
    assert_invalid(
        GatewayConfig::from_toml(
            "[service]\nbase_url = \"https://a.io\"\n[enforcement]\nfailure_mode = \"maybe\"\n",
        ),
        "config parse error",
    )
}
