// crates/passport-gate/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Scripted policy service, passport directory, and audit sink.
// Purpose: Drive the enforcement gate deterministically without a network.
// Dependencies: passport-gate, passport-gate-core, tokio
// ============================================================================

//! ## Overview
//! Shared fixtures for gate integration tests. The scripted service counts
//! calls and can be slowed down so concurrent callers overlap under paused
//! tokio time.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only fixtures use expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use passport_gate::DecisionCache;
use passport_gate::DecisionClient;
use passport_gate::DecisionRequest;
use passport_gate::EnforcementGate;
use passport_gate::GateAuditEvent;
use passport_gate::GateAuditSink;
use passport_gate::PassportAllowlists;
use passport_gate::PassportDirectory;
use passport_gate::PolicyService;
use passport_gate::RemoteError;
use passport_gate::RetryPolicy;
use passport_gate_core::AgentAllowlist;
use passport_gate_core::AgentId;
use passport_gate_core::AssuranceLevel;
use passport_gate_core::Decision;
use passport_gate_core::DecisionId;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Policy Service
// ============================================================================

/// Policy service replaying scripted replies in order.
pub struct ScriptedService {
    replies: Mutex<VecDeque<Result<Decision, RemoteError>>>,
    fallback: Option<RemoteError>,
    latency: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<DecisionRequest>>,
}

impl ScriptedService {
    pub fn new(replies: Vec<Result<Decision, RemoteError>>) -> Arc<Self> {
        Self::build(replies, None, Duration::ZERO)
    }

    pub fn slow(replies: Vec<Result<Decision, RemoteError>>, latency: Duration) -> Arc<Self> {
        Self::build(replies, None, latency)
    }

    /// Service that fails every call with `error`.
    pub fn failing(error: RemoteError) -> Arc<Self> {
        Self::build(Vec::new(), Some(error), Duration::ZERO)
    }

    fn build(
        replies: Vec<Result<Decision, RemoteError>>,
        fallback: Option<RemoteError>,
        latency: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            fallback,
            latency,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<DecisionRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl PolicyService for ScriptedService {
    async fn request_decision(&self, request: &DecisionRequest) -> Result<Decision, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("requests lock").push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.replies.lock().expect("replies lock").pop_front();
        next.unwrap_or_else(|| {
            Err(self.fallback.clone().unwrap_or_else(|| RemoteError::unavailable("script exhausted")))
        })
    }
}

/// Builds a decision with assurance `L2`.
pub fn decision(id: &str, allow: bool, expires_in: u64) -> Decision {
    Decision {
        decision_id: DecisionId::new(id),
        allow,
        reasons: Vec::new(),
        assurance_level: AssuranceLevel::L2,
        expires_in,
        created_at: OffsetDateTime::now_utc(),
    }
}

// ============================================================================
// SECTION: Passport Directory
// ============================================================================

/// Passport directory serving one fixed allowlist.
pub struct StaticDirectory {
    allowlist: Option<AgentAllowlist>,
    failing: AtomicBool,
    fetches: AtomicUsize,
}

impl StaticDirectory {
    pub fn new(allowlist: Option<AgentAllowlist>) -> Arc<Self> {
        Arc::new(Self {
            allowlist,
            failing: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn with_lists(servers: &[&str], tools: &[&str]) -> Arc<Self> {
        let owned = |items: &[&str]| Some(items.iter().map(|item| (*item).to_string()).collect());
        Self::new(Some(AgentAllowlist {
            servers: owned(servers),
            tools: owned(tools),
        }))
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PassportDirectory for StaticDirectory {
    async fn fetch_allowlist(
        &self,
        _agent_id: &AgentId,
    ) -> Result<Option<AgentAllowlist>, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::unavailable("passport store down"));
        }
        Ok(self.allowlist.clone())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink keeping events in memory.
#[derive(Default)]
pub struct RecordingAudit {
    events: Mutex<Vec<GateAuditEvent>>,
}

impl RecordingAudit {
    pub fn events(&self) -> Vec<GateAuditEvent> {
        self.events.lock().expect("events lock").clone()
    }
}

impl GateAuditSink for RecordingAudit {
    fn record(&self, event: &GateAuditEvent) {
        self.events.lock().expect("events lock").push(event.clone());
    }
}

// ============================================================================
// SECTION: Gate Builders
// ============================================================================

/// Fail-closed gate with a 60 s cache and the given retry policy.
pub fn gate_with_retry(service: &Arc<ScriptedService>, retry: RetryPolicy) -> EnforcementGate {
    let client = DecisionClient::new(Arc::clone(service) as Arc<dyn PolicyService>, retry);
    EnforcementGate::new(client, DecisionCache::new(Duration::from_secs(60), 1_000))
}

/// Fail-closed gate with a 60 s cache and no retries.
pub fn gate(service: &Arc<ScriptedService>) -> EnforcementGate {
    gate_with_retry(service, RetryPolicy::no_retry(Duration::from_secs(5)))
}

/// Gate that validates MCP usage against `directory` before remote calls.
pub fn gate_with_passports(
    service: &Arc<ScriptedService>,
    directory: &Arc<StaticDirectory>,
) -> EnforcementGate {
    let passports = PassportAllowlists::new(
        Arc::clone(directory) as Arc<dyn PassportDirectory>,
        Duration::from_secs(30),
    );
    gate(service).with_passports(passports)
}
