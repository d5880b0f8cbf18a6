// crates/passport-gate/src/routing.rs
// ============================================================================
// Module: Tool Routing
// Description: Maps tool and function names to policy packs.
// Purpose: Let tool-call integrations gate actions by name.
// Dependencies: passport-gate-config, passport-gate-core
// ============================================================================

//! ## Overview
//! Tool names are matched case-insensitively after trimming. A tool with no
//! mapping is denied unless the routing was built with
//! [`UnmappedToolPolicy::Skip`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use passport_gate_config::DEFAULT_TOOL_POLICIES;
use passport_gate_config::PolicyRoutingConfig;
use passport_gate_config::UnmappedToolPolicy;
use passport_gate_config::normalize_tool_name;
use passport_gate_core::PolicyId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Routing outcome for a tool name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRoute {
    /// Authorize against this policy pack.
    Policy(PolicyId),
    /// No mapping; run without authorization.
    Skip,
    /// No mapping; deny.
    Deny,
}

/// Tool name to policy pack table.
#[derive(Debug, Clone)]
pub struct ToolPolicyMap {
    /// Policies keyed by normalized tool name.
    table: BTreeMap<String, PolicyId>,
    /// Handling of unmapped tools.
    unmapped: UnmappedToolPolicy,
}

impl Default for ToolPolicyMap {
    fn default() -> Self {
        let table = DEFAULT_TOOL_POLICIES
            .iter()
            .map(|(tool, policy)| (normalize_tool_name(tool), PolicyId::new(*policy)))
            .collect();
        Self {
            table,
            unmapped: UnmappedToolPolicy::Deny,
        }
    }
}

impl ToolPolicyMap {
    /// Creates an empty table.
    #[must_use]
    pub const fn empty(unmapped: UnmappedToolPolicy) -> Self {
        Self {
            table: BTreeMap::new(),
            unmapped,
        }
    }

    /// Builds the table from routing configuration.
    #[must_use]
    pub fn from_config(config: &PolicyRoutingConfig, unmapped: UnmappedToolPolicy) -> Self {
        let table = config
            .resolved()
            .into_iter()
            .map(|(tool, policy)| (tool, PolicyId::new(policy)))
            .collect();
        Self {
            table,
            unmapped,
        }
    }

    /// Adds or replaces a mapping.
    #[must_use]
    pub fn with_tool(mut self, tool: &str, policy_id: PolicyId) -> Self {
        self.table.insert(normalize_tool_name(tool), policy_id);
        self
    }

    /// Returns the policy mapped to `tool`, if any.
    #[must_use]
    pub fn policy_for(&self, tool: &str) -> Option<&PolicyId> {
        self.table.get(&normalize_tool_name(tool))
    }

    /// Resolves the route for `tool`.
    #[must_use]
    pub fn resolve(&self, tool: &str) -> ToolRoute {
        match (self.policy_for(tool), self.unmapped) {
            (Some(policy_id), _) => ToolRoute::Policy(policy_id.clone()),
            (None, UnmappedToolPolicy::Skip) => ToolRoute::Skip,
            (None, UnmappedToolPolicy::Deny) => ToolRoute::Deny,
        }
    }

    /// Returns the number of mapped tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true when no tool is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
