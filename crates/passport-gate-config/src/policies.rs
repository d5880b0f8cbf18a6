// crates/passport-gate-config/src/policies.rs
// ============================================================================
// Module: Built-in Tool Policies
// Description: Default tool name to policy pack mappings.
// Purpose: Resolve the effective routing table from defaults and overrides.
// Dependencies: crate::config
// ============================================================================

//! ## Overview
//! Tool names are matched case-insensitively, so the resolved table is keyed
//! by lowercased, trimmed names. Configured entries replace built-in ones.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::config::PolicyRoutingConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Built-in tool mappings.
pub const DEFAULT_TOOL_POLICIES: &[(&str, &str)] = &[
    ("refund", "finance.payment.refund.v1"),
    ("process_refund", "finance.payment.refund.v1"),
    ("execute_refund", "finance.payment.refund.v1"),
    ("export_data", "data.export.create.v1"),
    ("create_export", "data.export.create.v1"),
    ("merge_pull_request", "code.repository.merge.v1"),
    ("deploy", "code.deployment.create.v1"),
    ("send_message", "messaging.message.send.v1"),
];

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Normalizes a tool name for lookup.
#[must_use]
pub fn normalize_tool_name(tool: &str) -> String {
    tool.trim().to_ascii_lowercase()
}

impl PolicyRoutingConfig {
    /// Returns the effective routing table keyed by normalized tool name.
    #[must_use]
    pub fn resolved(&self) -> BTreeMap<String, String> {
        let mut table = BTreeMap::new();
        if self.include_defaults {
            for (tool, policy) in DEFAULT_TOOL_POLICIES {
                table.insert((*tool).to_string(), (*policy).to_string());
            }
        }
        for (tool, policy) in &self.tools {
            table.insert(normalize_tool_name(tool), policy.trim().to_string());
        }
        table
    }
}
