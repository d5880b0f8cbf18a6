// crates/passport-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and operator onboarding.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `passport-gate.toml`. Kept in sync with the config model
//! by a parse test; values mirror the built-in defaults except where noted.

/// Returns a canonical example `passport-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[service]
base_url = "https://api.aport.io"
# api_key = "set via PASSPORT_GATE_API_KEY"
connect_timeout_ms = 500
request_timeout_ms = 800

[retry]
max_attempts = 3
base_delay_ms = 100
max_delay_ms = 2000
deadline_ms = 5000
default_retry_after_ms = 1000
max_retry_after_ms = 5000

[cache]
ttl_seconds = 60
max_entries = 10000

[passport]
cache_ttl_seconds = 30
local_mcp_validation = true
missing_allowlist = "deny_all"

[enforcement]
failure_mode = "fail_closed"
allow_fail_open = false
unmapped_tools = "deny"
# minimum_assurance = "L2"

[policies]
include_defaults = true

[policies.tools]
issue_credit = "finance.payment.refund.v1"

[audit]
sink = "stderr"
"#,
    )
}
