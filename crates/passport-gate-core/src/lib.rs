// crates/passport-gate-core/src/lib.rs
// ============================================================================
// Module: Passport Gate Core Library
// Description: Public API surface for the Passport Gate core.
// Purpose: Expose the action/decision model and local enforcement checks.
// Dependencies: crate::{allowlist, context, decision, fingerprint, mcp}
// ============================================================================

//! ## Overview
//! Passport Gate core holds everything the action authorization gateway can
//! decide without I/O: the open [`ActionContext`], remote [`Decision`]
//! records, MCP normalization, local allowlist validation, and the canonical
//! [`Fingerprint`] used to deduplicate decisions. Network access, caching,
//! and enforcement orchestration live in the `passport-gate` crate.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod allowlist;
pub mod context;
pub mod decision;
pub mod fingerprint;
pub mod hashing;
pub mod identifiers;
pub mod mcp;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use allowlist::AgentAllowlist;
pub use allowlist::AllowlistReport;
pub use allowlist::AllowlistValidator;
pub use allowlist::DimensionViolation;
pub use allowlist::McpDimension;
pub use allowlist::MissingAllowlistPolicy;
pub use context::ActionContext;
pub use context::ContextError;
pub use decision::AssuranceLevel;
pub use decision::Decision;
pub use decision::DecisionReason;
pub use decision::ReasonSeverity;
pub use decision::reason_codes;
pub use fingerprint::Fingerprint;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::AgentId;
pub use identifiers::DecisionId;
pub use identifiers::IdempotencyKey;
pub use identifiers::PolicyId;
pub use mcp::McpContext;
pub use mcp::McpValue;
pub use mcp::RawMcpFields;
