// crates/passport-gate-core/src/allowlist.rs
// ============================================================================
// Module: MCP Allowlist Validator
// Description: Local fast-fail check of MCP usage against a passport allowlist.
// Purpose: Reject disallowed servers/tools before any remote round trip.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Servers and tools are validated independently. A dimension with no claimed
//! entries passes trivially. A failed dimension reports every offending value
//! together with the full allowed set so the denial message is actionable.
//!
//! A local pass is not an allow: the remote evaluator re-validates MCP usage
//! and remains authoritative. A local failure is terminal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;

use crate::decision::DecisionReason;
use crate::decision::reason_codes;
use crate::mcp::McpContext;

// ============================================================================
// SECTION: Allowlist Types
// ============================================================================

/// Per-agent MCP allowlist taken from the passport record.
///
/// `None` for a dimension means the passport does not configure it; how that
/// is treated depends on [`MissingAllowlistPolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAllowlist {
    /// Allowed MCP servers.
    #[serde(default)]
    pub servers: Option<Vec<String>>,
    /// Allowed MCP tools.
    #[serde(default)]
    pub tools: Option<Vec<String>>,
}

/// Treatment of a dimension the passport does not configure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAllowlistPolicy {
    /// Any claimed entry is denied.
    #[default]
    DenyAll,
    /// The dimension is unrestricted.
    Unrestricted,
}

/// MCP dimension under validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpDimension {
    /// MCP servers.
    Servers,
    /// MCP tools.
    Tools,
}

impl McpDimension {
    /// Returns the reason code for a violation in this dimension.
    #[must_use]
    pub const fn reason_code(self) -> &'static str {
        match self {
            Self::Servers => reason_codes::MCP_SERVER_NOT_ALLOWED,
            Self::Tools => reason_codes::MCP_TOOL_NOT_ALLOWED,
        }
    }

    /// Returns a human label for messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Servers => "servers",
            Self::Tools => "tools",
        }
    }
}

// ============================================================================
// SECTION: Validation Results
// ============================================================================

/// A failed dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionViolation {
    /// Dimension that failed.
    pub dimension: McpDimension,
    /// Claimed entries that are not allowed, in claim order.
    pub offending: Vec<String>,
    /// The complete allowed set (empty when unconfigured).
    pub allowed: Vec<String>,
}

impl DimensionViolation {
    /// Converts the violation into a blocking decision reason.
    #[must_use]
    pub fn to_reason(&self) -> DecisionReason {
        let allowed =
            if self.allowed.is_empty() { "none".to_string() } else { self.allowed.join(", ") };
        DecisionReason::error(
            self.dimension.reason_code(),
            format!(
                "mcp {} not in passport allowlist: {} (allowed: {allowed})",
                self.dimension.label(),
                self.offending.join(", "),
            ),
        )
    }
}

/// Outcome of validating one MCP context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllowlistReport {
    /// Server violation, if any.
    pub servers: Option<DimensionViolation>,
    /// Tool violation, if any.
    pub tools: Option<DimensionViolation>,
}

impl AllowlistReport {
    /// Returns true when both dimensions passed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        self.servers.is_none() && self.tools.is_none()
    }

    /// Iterates over violations, servers first.
    pub fn violations(&self) -> impl Iterator<Item = &DimensionViolation> {
        self.servers.iter().chain(self.tools.iter())
    }

    /// Returns one blocking reason per failed dimension.
    #[must_use]
    pub fn reasons(&self) -> Vec<DecisionReason> {
        self.violations().map(DimensionViolation::to_reason).collect()
    }
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Validates MCP contexts against agent allowlists.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowlistValidator {
    /// Treatment of unconfigured dimensions.
    missing: MissingAllowlistPolicy,
}

impl AllowlistValidator {
    /// Builds a validator with the given missing-allowlist policy.
    #[must_use]
    pub const fn new(missing: MissingAllowlistPolicy) -> Self {
        Self {
            missing,
        }
    }

    /// Returns the configured missing-allowlist policy.
    #[must_use]
    pub const fn missing_policy(&self) -> MissingAllowlistPolicy {
        self.missing
    }

    /// Validates a context; `None` means the agent has no allowlist at all.
    #[must_use]
    pub fn validate(
        &self,
        context: &McpContext,
        allowlist: Option<&AgentAllowlist>,
    ) -> AllowlistReport {
        let allowed_servers = allowlist.and_then(|list| list.servers.as_deref());
        let allowed_tools = allowlist.and_then(|list| list.tools.as_deref());
        AllowlistReport {
            servers: self.check(McpDimension::Servers, &context.servers, allowed_servers),
            tools: self.check(McpDimension::Tools, &context.tools, allowed_tools),
        }
    }

    /// Validates a single dimension.
    fn check(
        &self,
        dimension: McpDimension,
        claimed: &[String],
        allowed: Option<&[String]>,
    ) -> Option<DimensionViolation> {
        if claimed.is_empty() {
            return None;
        }
        let allowed = match (allowed, self.missing) {
            (Some(allowed), _) => allowed,
            (None, MissingAllowlistPolicy::Unrestricted) => return None,
            (None, MissingAllowlistPolicy::DenyAll) => &[],
        };
        let allowed_set: HashSet<&str> = allowed.iter().map(String::as_str).collect();
        let offending: Vec<String> =
            claimed.iter().filter(|entry| !allowed_set.contains(entry.as_str())).cloned().collect();
        if offending.is_empty() {
            return None;
        }
        Some(DimensionViolation {
            dimension,
            offending,
            allowed: allowed.to_vec(),
        })
    }
}
