// crates/passport-gate-config/src/config.rs
// ============================================================================
// Module: Passport Gate Configuration
// Description: Configuration loading and validation for the action gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: passport-gate-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits,
//! then environment overrides are applied, then the whole model is validated.
//! Unknown keys are rejected. Fail-open enforcement requires two explicit
//! settings; every other default is the conservative one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use passport_gate_core::AssuranceLevel;
use passport_gate_core::MissingAllowlistPolicy;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::env::EnvOverrides;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "passport-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PASSPORT_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the service API key.
pub(crate) const MAX_API_KEY_LENGTH: usize = 512;
/// Minimum connect timeout in milliseconds.
pub(crate) const MIN_CONNECT_TIMEOUT_MS: u64 = 100;
/// Maximum connect timeout in milliseconds.
pub(crate) const MAX_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Minimum per-attempt request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 100;
/// Maximum per-attempt request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Maximum number of attempts for retryable failures.
pub(crate) const MAX_RETRY_ATTEMPTS: u32 = 10;
/// Maximum backoff delay in milliseconds.
pub(crate) const MAX_BACKOFF_DELAY_MS: u64 = 60_000;
/// Maximum request-scoped deadline in milliseconds.
pub(crate) const MAX_DEADLINE_MS: u64 = 120_000;
/// Maximum decision cache TTL in seconds.
pub(crate) const MAX_CACHE_TTL_SECONDS: u64 = 86_400;
/// Maximum decision cache entries.
pub(crate) const MAX_CACHE_ENTRIES: usize = 1_000_000;
/// Maximum passport allowlist cache TTL in seconds.
pub(crate) const MAX_PASSPORT_CACHE_TTL_SECONDS: u64 = 3_600;
/// Maximum number of tool policy mappings.
pub(crate) const MAX_TOOL_POLICIES: usize = 1_024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Passport Gate configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Remote policy service settings.
    #[serde(default)]
    pub service: ServiceConfig,
    /// Retry and deadline settings for the decision client.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Decision cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Passport allowlist lookup settings.
    #[serde(default)]
    pub passport: PassportConfig,
    /// Enforcement posture.
    #[serde(default)]
    pub enforcement: EnforcementConfig,
    /// Tool to policy pack routing.
    #[serde(default)]
    pub policies: PolicyRoutingConfig,
    /// Audit event sink.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl GatewayConfig {
    /// Loads configuration from disk, applies environment overrides, and validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::parse(content)?;
        config.apply_overrides(&EnvOverrides::process())?;
        config.validate()?;
        Ok(config)
    }

    /// Builds configuration from defaults and environment overrides only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an override is malformed or the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(&EnvOverrides::process())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates TOML content without consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses TOML content without validation.
    fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides on top of parsed values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an override value cannot be parsed.
    pub fn apply_overrides(&mut self, overrides: &EnvOverrides) -> Result<(), ConfigError> {
        if let Some(base_url) = overrides.base_url() {
            self.service.base_url = base_url;
        }
        if let Some(api_key) = overrides.api_key() {
            self.service.api_key = Some(api_key);
        }
        if let Some(timeout_ms) = overrides.request_timeout_ms()? {
            self.service.request_timeout_ms = timeout_ms;
        }
        if let Some(ttl_seconds) = overrides.cache_ttl_seconds()? {
            self.cache.ttl_seconds = ttl_seconds;
        }
        if let Some(mode) = overrides.failure_mode()? {
            self.enforcement.failure_mode = mode;
            if mode == FailureMode::FailOpen {
                self.enforcement.allow_fail_open = true;
            }
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()?;
        self.retry.validate(self.service.request_timeout_ms)?;
        self.cache.validate()?;
        self.passport.validate()?;
        self.enforcement.validate()?;
        self.policies.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Remote policy service configuration.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Base URL of the policy/passport service (no trailing slash required).
    #[serde(default)]
    pub base_url: String,
    /// Optional bearer API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Per-attempt request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl ServiceConfig {
    /// Returns the connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the per-attempt request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validates service settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::Invalid("service.base_url is required".to_string()));
        }
        let parsed = Url::parse(base_url)
            .map_err(|err| ConfigError::Invalid(format!("service.base_url is invalid: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(
                "service.base_url must use http or https".to_string(),
            ));
        }
        if parsed.host_str().is_none() {
            return Err(ConfigError::Invalid("service.base_url must include a host".to_string()));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(ConfigError::Invalid(
                "service.base_url must not include a query or fragment".to_string(),
            ));
        }
        if let Some(api_key) = &self.api_key {
            if api_key.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "service.api_key must be non-empty when set".to_string(),
                ));
            }
            if api_key.len() > MAX_API_KEY_LENGTH {
                return Err(ConfigError::Invalid("service.api_key exceeds max length".to_string()));
            }
            if !api_key.bytes().all(|byte| byte.is_ascii_graphic()) {
                return Err(ConfigError::Invalid(
                    "service.api_key must be visible ascii without whitespace".to_string(),
                ));
            }
        }
        validate_range(
            "service.connect_timeout_ms",
            self.connect_timeout_ms,
            MIN_CONNECT_TIMEOUT_MS,
            MAX_CONNECT_TIMEOUT_MS,
        )?;
        validate_range(
            "service.request_timeout_ms",
            self.request_timeout_ms,
            MIN_REQUEST_TIMEOUT_MS,
            MAX_REQUEST_TIMEOUT_MS,
        )?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Retry
// ============================================================================

/// Retry and deadline configuration for decision requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Maximum attempts for timeouts and unavailability (including the first).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Initial backoff delay in milliseconds; doubles per retry.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff delay cap in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Request-scoped deadline covering every attempt and wait.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    /// Wait used for a rate-limited retry when the service gives no hint.
    #[serde(default = "default_retry_after_ms")]
    pub default_retry_after_ms: u64,
    /// Largest retry-after hint that will be honored.
    #[serde(default = "default_max_retry_after_ms")]
    pub max_retry_after_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            deadline_ms: default_deadline_ms(),
            default_retry_after_ms: default_retry_after_ms(),
            max_retry_after_ms: default_max_retry_after_ms(),
        }
    }
}

impl RetryConfig {
    /// Validates retry settings against the per-attempt timeout.
    fn validate(&self, request_timeout_ms: u64) -> Result<(), ConfigError> {
        validate_range(
            "retry.max_attempts",
            u64::from(self.max_attempts),
            1,
            u64::from(MAX_RETRY_ATTEMPTS),
        )?;
        validate_range("retry.base_delay_ms", self.base_delay_ms, 1, MAX_BACKOFF_DELAY_MS)?;
        validate_range(
            "retry.max_delay_ms",
            self.max_delay_ms,
            self.base_delay_ms,
            MAX_BACKOFF_DELAY_MS,
        )?;
        validate_range("retry.deadline_ms", self.deadline_ms, request_timeout_ms, MAX_DEADLINE_MS)?;
        validate_range(
            "retry.max_retry_after_ms",
            self.max_retry_after_ms,
            1,
            self.deadline_ms,
        )?;
        validate_range(
            "retry.default_retry_after_ms",
            self.default_retry_after_ms,
            0,
            self.max_retry_after_ms,
        )?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Decision cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Upper bound on decision reuse in seconds.
    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Maximum cached decisions.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl_seconds(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl CacheConfig {
    /// Returns the configured TTL.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Validates cache settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_range("cache.ttl_seconds", self.ttl_seconds, 1, MAX_CACHE_TTL_SECONDS)?;
        if self.max_entries == 0 || self.max_entries > MAX_CACHE_ENTRIES {
            return Err(ConfigError::Invalid(format!(
                "cache.max_entries must be between 1 and {MAX_CACHE_ENTRIES}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Passport
// ============================================================================

/// Passport allowlist lookup configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PassportConfig {
    /// Allowlist cache TTL in seconds; zero disables allowlist caching.
    #[serde(default = "default_passport_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    /// Whether MCP usage is checked locally before the remote decision.
    #[serde(default = "default_local_mcp_validation")]
    pub local_mcp_validation: bool,
    /// Treatment of allowlist dimensions the passport does not configure.
    #[serde(default)]
    pub missing_allowlist: MissingAllowlistPolicy,
}

impl Default for PassportConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_passport_cache_ttl_seconds(),
            local_mcp_validation: default_local_mcp_validation(),
            missing_allowlist: MissingAllowlistPolicy::default(),
        }
    }
}

impl PassportConfig {
    /// Returns the allowlist cache TTL.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Validates passport settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_range(
            "passport.cache_ttl_seconds",
            self.cache_ttl_seconds,
            0,
            MAX_PASSPORT_CACHE_TTL_SECONDS,
        )
    }
}

// ============================================================================
// SECTION: Enforcement
// ============================================================================

/// Behavior when no decision can be obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Deny when the decision is unavailable.
    #[default]
    FailClosed,
    /// Allow with a warning when the decision is unavailable.
    FailOpen,
}

impl FailureMode {
    /// Returns a stable label for the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FailClosed => "fail_closed",
            Self::FailOpen => "fail_open",
        }
    }
}

/// Behavior for tool calls with no mapped policy pack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedToolPolicy {
    /// Deny unmapped tools.
    #[default]
    Deny,
    /// Let unmapped tools run without authorization.
    Skip,
}

/// Enforcement posture configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnforcementConfig {
    /// Failure mode when the decision is unavailable.
    #[serde(default)]
    pub failure_mode: FailureMode,
    /// Explicit acknowledgement required for `fail_open`.
    #[serde(default)]
    pub allow_fail_open: bool,
    /// Handling of tool calls with no mapped policy.
    #[serde(default)]
    pub unmapped_tools: UnmappedToolPolicy,
    /// Minimum assurance level required for an allow to stand.
    #[serde(default)]
    pub minimum_assurance: Option<AssuranceLevel>,
}

impl EnforcementConfig {
    /// Validates enforcement settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_mode == FailureMode::FailOpen && !self.allow_fail_open {
            return Err(ConfigError::Invalid(
                "enforcement.failure_mode=fail_open requires enforcement.allow_fail_open=true"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Policy Routing
// ============================================================================

/// Tool name to policy pack routing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyRoutingConfig {
    /// Whether built-in tool mappings are included.
    #[serde(default = "default_include_builtin_policies")]
    pub include_defaults: bool,
    /// Tool name to policy pack overrides.
    #[serde(default)]
    pub tools: BTreeMap<String, String>,
}

impl Default for PolicyRoutingConfig {
    fn default() -> Self {
        Self {
            include_defaults: default_include_builtin_policies(),
            tools: BTreeMap::new(),
        }
    }
}

impl PolicyRoutingConfig {
    /// Validates routing entries.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.tools.len() > MAX_TOOL_POLICIES {
            return Err(ConfigError::Invalid(format!(
                "policies.tools exceeds {MAX_TOOL_POLICIES} entries"
            )));
        }
        for (tool, policy) in &self.tools {
            if tool.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "policies.tools keys must be non-empty".to_string(),
                ));
            }
            if policy.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "policies.tools.{tool} must name a policy pack"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard audit events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// File path when `sink = "file"`.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.sink=file requires audit.path".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path only allowed when sink=file".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid("config path component too long".to_string()));
    }
    Ok(())
}

/// Validates a configured path string.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    if Path::new(trimmed)
        .components()
        .any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid(format!("{field} path component too long")));
    }
    Ok(())
}

/// Validates an inclusive numeric range.
fn validate_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}

/// Default connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    500
}

/// Default per-attempt request timeout.
const fn default_request_timeout_ms() -> u64 {
    800
}

/// Default maximum attempts.
const fn default_max_attempts() -> u32 {
    3
}

/// Default initial backoff.
const fn default_base_delay_ms() -> u64 {
    100
}

/// Default backoff cap.
const fn default_max_delay_ms() -> u64 {
    2_000
}

/// Default request-scoped deadline.
const fn default_deadline_ms() -> u64 {
    5_000
}

/// Default rate-limit wait when no hint is provided.
const fn default_retry_after_ms() -> u64 {
    1_000
}

/// Default cap on honored retry-after hints.
const fn default_max_retry_after_ms() -> u64 {
    5_000
}

/// Default decision cache TTL.
const fn default_cache_ttl_seconds() -> u64 {
    60
}

/// Default decision cache size.
const fn default_cache_max_entries() -> usize {
    10_000
}

/// Default allowlist cache TTL.
const fn default_passport_cache_ttl_seconds() -> u64 {
    30
}

/// Local MCP validation is on by default.
const fn default_local_mcp_validation() -> bool {
    true
}

/// Built-in tool mappings are included by default.
const fn default_include_builtin_policies() -> bool {
    true
}
