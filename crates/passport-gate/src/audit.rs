// crates/passport-gate/src/audit.rs
// ============================================================================
// Module: Gate Audit Logging
// Description: Structured audit events for authorization verdicts.
// Purpose: Emit redacted audit records for every terminal gate state.
// Dependencies: passport-gate-config, serde, serde_json
// ============================================================================

//! ## Overview
//! Every gate run, allowed or not, produces one [`GateAuditEvent`] carrying
//! identifiers, the state trail, and reason codes. Raw action context is
//! never logged; the request fingerprint stands in for it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use passport_gate_config::AuditConfig;
use passport_gate_config::AuditSinkKind;
use passport_gate_core::AgentId;
use passport_gate_core::DecisionReason;
use serde::Serialize;

use crate::cache::CacheSource;
use crate::verdict::GateOutcome;
use crate::verdict::GateState;
use crate::verdict::Verdict;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Event label for gate verdicts.
pub const EVENT_GATE_VERDICT: &str = "gate_verdict";
/// Event label for blocked duplicate executions.
pub const EVENT_DUPLICATE_EXECUTION: &str = "duplicate_execution";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Gate audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct GateAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Agent requesting the action.
    pub agent_id: String,
    /// Policy pack consulted; `None` when the tool had no mapping.
    pub policy_id: Option<String>,
    /// Tool name when the action was routed by tool.
    pub tool: Option<String>,
    /// Request fingerprint when one could be derived.
    pub fingerprint: Option<String>,
    /// Terminal outcome.
    pub outcome: GateOutcome,
    /// Visited gate states.
    pub trail: Vec<GateState>,
    /// Decision identifier when a decision was obtained.
    pub decision_id: Option<String>,
    /// Assurance level of the decision.
    pub assurance_level: Option<&'static str>,
    /// Reason codes surfaced to the caller.
    pub reason_codes: Vec<String>,
    /// How the decision was obtained.
    pub cache_source: Option<CacheSource>,
    /// Normalized remote error kind label.
    pub error_kind: Option<&'static str>,
    /// End-to-end gate latency in milliseconds.
    pub latency_ms: u128,
}

impl GateAuditEvent {
    /// Builds a verdict event.
    #[must_use]
    pub fn from_verdict(verdict: &Verdict, tool: Option<&str>, latency: Duration) -> Self {
        Self {
            event: EVENT_GATE_VERDICT,
            timestamp_ms: now_ms(),
            agent_id: verdict.agent_id.to_string(),
            policy_id: Some(verdict.policy_id.to_string()),
            tool: tool.map(str::to_string),
            fingerprint: verdict.fingerprint.as_ref().map(ToString::to_string),
            outcome: verdict.outcome,
            trail: verdict.trail.clone(),
            decision_id: verdict.decision_id().map(ToString::to_string),
            assurance_level: verdict.assurance_level().map(|level| level.as_str()),
            reason_codes: verdict.reason_codes().into_iter().map(str::to_string).collect(),
            cache_source: verdict.cache_source,
            error_kind: verdict.remote_error.as_ref().map(|err| err.kind.as_str()),
            latency_ms: latency.as_millis(),
        }
    }

    /// Builds the event for a tool rejected because it has no policy mapping.
    #[must_use]
    pub fn unmapped_tool(agent_id: &AgentId, tool: &str, reasons: &[DecisionReason]) -> Self {
        Self {
            event: EVENT_GATE_VERDICT,
            timestamp_ms: now_ms(),
            agent_id: agent_id.to_string(),
            policy_id: None,
            tool: Some(tool.to_string()),
            fingerprint: None,
            outcome: GateOutcome::LocalDenied,
            trail: vec![GateState::Pending, GateState::LocalValidating, GateState::LocalDenied],
            decision_id: None,
            assurance_level: None,
            reason_codes: reasons.iter().map(|reason| reason.code.clone()).collect(),
            cache_source: None,
            error_kind: None,
            latency_ms: 0,
        }
    }

    /// Relabels the event.
    #[must_use]
    pub const fn with_event(mut self, event: &'static str) -> Self {
        self.event = event;
        self
    }
}

/// Returns the current wall-clock time in milliseconds.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for gate events.
pub trait GateAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &GateAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl GateAuditSink for StderrAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl GateAuditSink for FileAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl GateAuditSink for NoopAuditSink {
    fn record(&self, _event: &GateAuditEvent) {}
}

/// Builds the audit sink selected by configuration.
///
/// # Errors
///
/// Returns an error if the file sink cannot be opened.
pub fn audit_sink_from_config(config: &AuditConfig) -> io::Result<Arc<dyn GateAuditSink>> {
    Ok(match (config.sink, config.path.as_deref()) {
        (AuditSinkKind::None, _) => Arc::new(NoopAuditSink),
        (AuditSinkKind::Stderr, _) => Arc::new(StderrAuditSink),
        (AuditSinkKind::File, Some(path)) => Arc::new(FileAuditSink::new(Path::new(path))?),
        (AuditSinkKind::File, None) => {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "audit file sink requires a path"));
        }
    })
}
