// crates/passport-gate-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for passport-gate-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use passport_gate_config::ConfigError;
use passport_gate_config::GatewayConfig;

/// Parses a TOML string into a `GatewayConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<GatewayConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a config with defaults and a valid service base URL.
pub fn minimal_config() -> Result<GatewayConfig, toml::de::Error> {
    config_from_toml("[service]\nbase_url = \"https://api.aport.io\"\n")
}

/// Assert that a validation result is an error containing a specific substring.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
