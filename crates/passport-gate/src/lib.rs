// crates/passport-gate/src/lib.rs
// ============================================================================
// Module: Passport Gate
// Description: Action authorization gateway runtime.
// Purpose: Obtain, cache, and enforce policy decisions for agent actions.
// Dependencies: passport-gate-config, passport-gate-core, reqwest, tokio
// ============================================================================

//! ## Overview
//! Passport Gate intercepts an agent's side-effecting action, resolves a
//! decision from the external policy service, and enforces it fail-closed.
//! The [`EnforcementGate`] composes local MCP allowlist checks, the shared
//! [`DecisionCache`] with request coalescing, and the retrying
//! [`DecisionClient`]. [`ProtectedAction`] wraps an action so it only runs
//! after an allow, once per valid decision.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod cache;
pub mod client;
pub mod gate;
pub mod guard;
pub mod http;
pub mod passport;
pub mod remote;
pub mod retry;
pub mod routing;
pub mod telemetry;
pub mod transport;
pub mod verdict;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::GateAuditEvent;
pub use audit::GateAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::audit_sink_from_config;
pub use cache::CacheLookup;
pub use cache::CacheSource;
pub use cache::DecisionCache;
pub use client::DecisionClient;
pub use gate::ActionRequest;
pub use gate::EnforcementGate;
pub use gate::GateBuildError;
pub use gate::GateOptions;
pub use gate::ToolAuthorization;
pub use guard::ActionFuture;
pub use guard::ExecutionClaim;
pub use guard::ExecutionLedger;
pub use guard::GuardError;
pub use guard::ProtectedAction;
pub use http::HttpPolicyService;
pub use http::HttpServiceError;
pub use passport::PassportAllowlists;
pub use remote::RemoteError;
pub use remote::RemoteErrorKind;
pub use retry::RetryPolicy;
pub use retry::RetryStep;
pub use routing::ToolPolicyMap;
pub use routing::ToolRoute;
pub use telemetry::GATE_LATENCY_BUCKETS_MS;
pub use telemetry::GateMetricEvent;
pub use telemetry::GateMetrics;
pub use telemetry::latency_bucket_ms;
pub use telemetry::NoopMetrics;
pub use transport::DecisionRequest;
pub use transport::PassportDirectory;
pub use transport::PolicyService;
pub use verdict::AuthorizationError;
pub use verdict::DenialKind;
pub use verdict::GateOutcome;
pub use verdict::GateState;
pub use verdict::Verdict;
