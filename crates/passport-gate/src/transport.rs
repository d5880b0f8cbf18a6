// crates/passport-gate/src/transport.rs
// ============================================================================
// Module: Service Transport
// Description: Single-attempt interfaces to the policy and passport service.
// Purpose: Separate wire access from retry, caching, and enforcement.
// Dependencies: async-trait, passport-gate-core, serde
// ============================================================================

//! ## Overview
//! [`PolicyService`] issues exactly one decision request per call and
//! [`PassportDirectory`] reads one agent's allowlist. Implementations never
//! retry; the decision client owns retry and deadline policy. The HTTP
//! implementation lives in [`crate::http`]; tests substitute scripted fakes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use passport_gate_core::ActionContext;
use passport_gate_core::AgentAllowlist;
use passport_gate_core::AgentId;
use passport_gate_core::Decision;
use passport_gate_core::IdempotencyKey;
use passport_gate_core::PolicyId;
use serde::Serialize;

use crate::remote::RemoteError;

// ============================================================================
// SECTION: Request
// ============================================================================

/// Decision request payload sent to the policy service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRequest {
    /// Agent requesting the action.
    pub agent_id: AgentId,
    /// Policy pack evaluating the action.
    pub policy_id: PolicyId,
    /// Canonicalized action context.
    pub context: ActionContext,
    /// Caller-supplied idempotency key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<IdempotencyKey>,
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Policy evaluation service, one attempt per call.
#[async_trait]
pub trait PolicyService: Send + Sync {
    /// Requests a decision for the action.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the attempt fails.
    async fn request_decision(&self, request: &DecisionRequest) -> Result<Decision, RemoteError>;
}

/// Passport store exposing per-agent MCP allowlists.
#[async_trait]
pub trait PassportDirectory: Send + Sync {
    /// Fetches the agent's allowlist; `None` when the passport has no MCP section.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the passport cannot be read.
    async fn fetch_allowlist(&self, agent_id: &AgentId)
    -> Result<Option<AgentAllowlist>, RemoteError>;
}
