// crates/passport-gate-core/src/decision.rs
// ============================================================================
// Module: Authorization Decisions
// Description: Decision records returned by the remote policy service.
// Purpose: Model allow/deny verdicts, reasons, and assurance levels.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A [`Decision`] is produced by the external policy service and is immutable
//! once received. It may be reused until `created_at` plus the smaller of
//! its `expires_in` and the gateway's configured TTL.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::identifiers::DecisionId;

// ============================================================================
// SECTION: Reason Codes
// ============================================================================

/// Stable machine-readable reason codes emitted by the gateway itself.
pub mod reason_codes {
    /// One or more MCP servers are not on the agent allowlist.
    pub const MCP_SERVER_NOT_ALLOWED: &str = "mcp_server_not_allowed";
    /// One or more MCP tools are not on the agent allowlist.
    pub const MCP_TOOL_NOT_ALLOWED: &str = "mcp_tool_not_allowed";
    /// A known context field failed local validation.
    pub const INVALID_CONTEXT: &str = "invalid_context";
    /// Remote denial that carried no reasons of its own.
    pub const POLICY_DENIED: &str = "policy_denied";
    /// The decision could not be obtained and the gate failed closed.
    pub const DECISION_UNAVAILABLE: &str = "decision_unavailable";
    /// The decision could not be obtained and the gate failed open.
    pub const FAIL_OPEN_OVERRIDE: &str = "fail_open_override";
    /// The decision allowed the action below the required assurance level.
    pub const ASSURANCE_LEVEL_INSUFFICIENT: &str = "assurance_level_insufficient";
    /// No policy pack is mapped for the requested tool.
    pub const UNMAPPED_TOOL: &str = "unmapped_tool";
    /// The protected action already ran for this fingerprint.
    pub const DUPLICATE_EXECUTION: &str = "duplicate_execution";
}

// ============================================================================
// SECTION: Reasons
// ============================================================================

/// Severity attached to a decision reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonSeverity {
    /// Informational annotation.
    Info,
    /// Non-blocking warning.
    Warning,
    /// Blocking error.
    #[default]
    Error,
}

/// Machine-readable reason plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionReason {
    /// Stable reason code.
    pub code: String,
    /// Human-readable explanation.
    #[serde(default)]
    pub message: String,
    /// Reason severity.
    #[serde(default)]
    pub severity: ReasonSeverity,
}

impl DecisionReason {
    /// Builds a blocking reason.
    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity: ReasonSeverity::Error,
        }
    }

    /// Builds a warning reason.
    #[must_use]
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity: ReasonSeverity::Warning,
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

// ============================================================================
// SECTION: Assurance Levels
// ============================================================================

/// Identity assurance level attested for the agent, weakest first.
///
/// # Invariants
/// - Variant order is the assurance order used by [`AssuranceLevel::meets`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssuranceLevel {
    /// Self-asserted.
    #[default]
    L0,
    /// Email verified.
    L1,
    /// GitHub or domain verified.
    L2,
    /// Organization verified.
    L3,
    /// Individual KYC completed.
    #[serde(rename = "L4KYC")]
    L4Kyc,
    /// Financial-grade KYC completed.
    #[serde(rename = "L4FIN")]
    L4Fin,
}

impl AssuranceLevel {
    /// Returns true when this level satisfies the required level.
    #[must_use]
    pub fn meets(self, required: Self) -> bool {
        self >= required
    }

    /// Returns the wire label for the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::L0 => "L0",
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
            Self::L4Kyc => "L4KYC",
            Self::L4Fin => "L4FIN",
        }
    }
}

impl fmt::Display for AssuranceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Authorization decision issued by the policy service.
///
/// # Invariants
/// - `decision_id` is globally unique and never rewritten locally.
/// - `reasons` preserves the service's ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Decision identifier used for audit correlation.
    pub decision_id: DecisionId,
    /// Whether the action is allowed.
    pub allow: bool,
    /// Ordered reasons attached to the verdict.
    #[serde(default)]
    pub reasons: Vec<DecisionReason>,
    /// Assurance level the verdict was issued under.
    #[serde(default)]
    pub assurance_level: AssuranceLevel,
    /// Validity window in seconds; zero means the decision must not be reused.
    #[serde(default)]
    pub expires_in: u64,
    /// Issue timestamp reported by the service.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Decision {
    /// Returns the service-declared validity window.
    #[must_use]
    pub const fn validity(&self) -> Duration {
        Duration::from_secs(self.expires_in)
    }

    /// Returns how long the decision may still be reused at `now`.
    ///
    /// The window is `min(ttl, expires_in)` counted from `created_at`. A
    /// `created_at` in the future counts as zero age.
    #[must_use]
    pub fn remaining_validity(&self, now: OffsetDateTime, ttl: Duration) -> Duration {
        let age = Duration::try_from(now - self.created_at).unwrap_or(Duration::ZERO);
        ttl.min(self.validity()).saturating_sub(age)
    }

    /// Returns the reasons as `code` strings.
    #[must_use]
    pub fn reason_codes(&self) -> Vec<&str> {
        self.reasons.iter().map(|reason| reason.code.as_str()).collect()
    }
}
