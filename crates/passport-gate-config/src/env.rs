// crates/passport-gate-config/src/env.rs
// ============================================================================
// Module: Environment Overrides
// Description: Typed view over PASSPORT_GATE_* environment variables.
// Purpose: Let deployments override core settings without editing TOML.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Overrides are captured once into an [`EnvOverrides`] snapshot so that
//! parsing is deterministic and testable without mutating process state.
//! Blank values are ignored; malformed numbers or modes are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;

use crate::config::ConfigError;
use crate::config::FailureMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Service base URL override.
pub const ENV_BASE_URL: &str = "PASSPORT_GATE_BASE_URL";
/// Service API key override.
pub const ENV_API_KEY: &str = "PASSPORT_GATE_API_KEY";
/// Per-attempt request timeout override in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "PASSPORT_GATE_TIMEOUT_MS";
/// Decision cache TTL override in seconds.
pub const ENV_CACHE_TTL_SECONDS: &str = "PASSPORT_GATE_CACHE_TTL_SECONDS";
/// Failure mode override (`fail_closed` or `fail_open`).
pub const ENV_FAILURE_MODE: &str = "PASSPORT_GATE_FAILURE_MODE";

/// Every recognized override variable.
const OVERRIDE_VARS: [&str; 5] =
    [ENV_BASE_URL, ENV_API_KEY, ENV_TIMEOUT_MS, ENV_CACHE_TTL_SECONDS, ENV_FAILURE_MODE];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Snapshot of recognized environment override values.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    /// Non-blank values keyed by variable name.
    values: BTreeMap<String, String>,
}

impl EnvOverrides {
    /// Captures overrides from the process environment.
    #[must_use]
    pub fn process() -> Self {
        Self::from_pairs(
            OVERRIDE_VARS
                .iter()
                .filter_map(|name| env::var(name).ok().map(|value| (*name, value))),
        )
    }

    /// Builds a snapshot from explicit name/value pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value.into().trim().to_string()))
            .filter(|(name, value)| !value.is_empty() && OVERRIDE_VARS.contains(&name.as_str()))
            .collect();
        Self {
            values,
        }
    }

    /// Returns true when no override is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the base URL override.
    #[must_use]
    pub fn base_url(&self) -> Option<String> {
        self.values.get(ENV_BASE_URL).cloned()
    }

    /// Returns the API key override.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        self.values.get(ENV_API_KEY).cloned()
    }

    /// Returns the request timeout override.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is not an integer.
    pub fn request_timeout_ms(&self) -> Result<Option<u64>, ConfigError> {
        self.parse_u64(ENV_TIMEOUT_MS)
    }

    /// Returns the cache TTL override.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is not an integer.
    pub fn cache_ttl_seconds(&self) -> Result<Option<u64>, ConfigError> {
        self.parse_u64(ENV_CACHE_TTL_SECONDS)
    }

    /// Returns the failure mode override.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is not a known mode.
    pub fn failure_mode(&self) -> Result<Option<FailureMode>, ConfigError> {
        let Some(value) = self.values.get(ENV_FAILURE_MODE) else {
            return Ok(None);
        };
        match value.to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_closed" | "closed" => Ok(Some(FailureMode::FailClosed)),
            "fail_open" | "open" => Ok(Some(FailureMode::FailOpen)),
            _ => Err(ConfigError::Invalid(format!(
                "{ENV_FAILURE_MODE} must be fail_closed or fail_open"
            ))),
        }
    }

    /// Parses an unsigned integer override.
    fn parse_u64(&self, name: &str) -> Result<Option<u64>, ConfigError> {
        self.values
            .get(name)
            .map(|value| {
                value
                    .parse::<u64>()
                    .map_err(|_| ConfigError::Invalid(format!("{name} must be an integer")))
            })
            .transpose()
    }
}
