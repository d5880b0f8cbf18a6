// crates/passport-gate/src/verdict.rs
// ============================================================================
// Module: Gate Verdicts
// Description: Gate states, terminal outcomes, verdicts, and denial errors.
// Purpose: Carry everything a caller or auditor needs about one gate run.
// Dependencies: passport-gate-core, serde, thiserror, tokio
// ============================================================================

//! ## Overview
//! A gate run walks `PENDING → LOCAL_VALIDATING → (REMOTE_CHECKING |
//! LOCAL_DENIED) → (ALLOWED | DENIED | FAIL_CLOSED_DENIED)` and records each
//! visited state in a [`Verdict`]. `LOCAL_VALIDATING` is omitted when no
//! local check ran. Every non-allowed verdict converts into
//! an [`AuthorizationError`] with at least one reason.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use passport_gate_core::AgentId;
use passport_gate_core::AssuranceLevel;
use passport_gate_core::Decision;
use passport_gate_core::DecisionId;
use passport_gate_core::DecisionReason;
use passport_gate_core::Fingerprint;
use passport_gate_core::PolicyId;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::cache::CacheSource;
use crate::remote::RemoteError;

// ============================================================================
// SECTION: States
// ============================================================================

/// Enforcement gate state.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// Request received.
    Pending,
    /// Context normalized; checking locally.
    LocalValidating,
    /// Consulting the decision cache and service.
    RemoteChecking,
    /// Rejected locally; no remote call was made.
    LocalDenied,
    /// Action permitted.
    Allowed,
    /// Policy denied the action.
    Denied,
    /// No decision could be obtained; denied by posture.
    FailClosedDenied,
}

impl GateState {
    /// Returns a stable label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::LocalValidating => "local_validating",
            Self::RemoteChecking => "remote_checking",
            Self::LocalDenied => "local_denied",
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::FailClosedDenied => "fail_closed_denied",
        }
    }

    /// Returns true for terminal states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::LocalDenied | Self::Allowed | Self::Denied | Self::FailClosedDenied)
    }
}

/// Terminal outcome of a gate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    /// Action permitted.
    Allowed,
    /// Rejected locally.
    LocalDenied,
    /// Policy denied.
    Denied,
    /// Decision unavailable under fail-closed posture.
    FailClosedDenied,
}

impl GateOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.state().as_str()
    }

    /// Returns the terminal state for the outcome.
    #[must_use]
    pub const fn state(self) -> GateState {
        match self {
            Self::Allowed => GateState::Allowed,
            Self::LocalDenied => GateState::LocalDenied,
            Self::Denied => GateState::Denied,
            Self::FailClosedDenied => GateState::FailClosedDenied,
        }
    }

    /// Returns the denial kind, `None` when allowed.
    #[must_use]
    pub const fn denial_kind(self) -> Option<DenialKind> {
        match self {
            Self::Allowed => None,
            Self::LocalDenied => Some(DenialKind::LocalValidation),
            Self::Denied => Some(DenialKind::PolicyDenied),
            Self::FailClosedDenied => Some(DenialKind::FailClosed),
        }
    }
}

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// Result of one gate run.
#[derive(Debug, Clone)]
pub struct Verdict {
    /// Terminal outcome.
    pub outcome: GateOutcome,
    /// Visited states, ending with the terminal one.
    pub trail: Vec<GateState>,
    /// Agent requesting the action.
    pub agent_id: AgentId,
    /// Policy pack consulted.
    pub policy_id: PolicyId,
    /// Request fingerprint when one could be derived.
    pub fingerprint: Option<Fingerprint>,
    /// Shared decision when one was obtained.
    pub decision: Option<Arc<Decision>>,
    /// Reasons surfaced to the caller.
    pub reasons: Vec<DecisionReason>,
    /// How the decision was obtained.
    pub cache_source: Option<CacheSource>,
    /// Remote failure behind a fail-closed or fail-open outcome.
    pub remote_error: Option<RemoteError>,
    /// Instant after which an allow must not be acted on again.
    pub valid_until: Option<Instant>,
}

impl Verdict {
    /// Returns true when the action may run.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self.outcome, GateOutcome::Allowed)
    }

    /// Returns the decision identifier when a decision was obtained.
    #[must_use]
    pub fn decision_id(&self) -> Option<&DecisionId> {
        self.decision.as_ref().map(|decision| &decision.decision_id)
    }

    /// Returns the decision's assurance level when a decision was obtained.
    #[must_use]
    pub fn assurance_level(&self) -> Option<AssuranceLevel> {
        self.decision.as_ref().map(|decision| decision.assurance_level)
    }

    /// Returns the reason codes.
    #[must_use]
    pub fn reason_codes(&self) -> Vec<&str> {
        self.reasons.iter().map(|reason| reason.code.as_str()).collect()
    }

    /// Returns the authorization error for a non-allowed verdict.
    #[must_use]
    pub fn to_error(&self) -> Option<AuthorizationError> {
        self.outcome.denial_kind().map(|kind| AuthorizationError {
            kind,
            decision_id: self.decision_id().cloned(),
            reasons: self.reasons.clone(),
        })
    }

    /// Converts the verdict into a result.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError`] unless the action is allowed.
    pub fn into_result(self) -> Result<Self, AuthorizationError> {
        match self.to_error() {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Why an action was not allowed.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// Local validation rejected the request.
    LocalValidation,
    /// The policy service denied the action.
    PolicyDenied,
    /// No decision could be obtained.
    FailClosed,
}

impl DenialKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalValidation => "local_validation",
            Self::PolicyDenied => "policy_denied",
            Self::FailClosed => "fail_closed",
        }
    }
}

impl fmt::Display for DenialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error surfaced to callers for every non-allowed terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("action not authorized ({kind}): {}", render_reasons(.reasons))]
pub struct AuthorizationError {
    /// Denial classification.
    pub kind: DenialKind,
    /// Decision identifier for remote denials.
    pub decision_id: Option<DecisionId>,
    /// Machine-readable reasons, at least one.
    pub reasons: Vec<DecisionReason>,
}

impl AuthorizationError {
    /// Returns the reason codes.
    #[must_use]
    pub fn reason_codes(&self) -> Vec<&str> {
        self.reasons.iter().map(|reason| reason.code.as_str()).collect()
    }
}

/// Joins reasons for display.
fn render_reasons(reasons: &[DecisionReason]) -> String {
    reasons.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
