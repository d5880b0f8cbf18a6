// crates/passport-gate/src/gate.rs
// ============================================================================
// Module: Enforcement Gate
// Description: Orchestrates local validation, decision lookup, and posture.
// Purpose: Turn an action request into an auditable allow or deny verdict.
// Dependencies: passport-gate-config, passport-gate-core, thiserror, tokio
// ============================================================================

//! ## Overview
//! [`EnforcementGate::authorize`] runs one request through the gate states:
//! validate and normalize the context, fast-fail on MCP allowlist violations
//! when the agent's passport is at hand, then consult the shared
//! [`DecisionCache`], which calls the policy service on a miss.
//!
//! Security posture: fail-closed by default. A remote failure becomes
//! `FAIL_CLOSED_DENIED` unless fail-open was explicitly configured, and a
//! local pass never implies a remote allow.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::sync::Arc;
use std::time::Duration;

use passport_gate_config::FailureMode;
use passport_gate_config::GatewayConfig;
use passport_gate_core::ActionContext;
use passport_gate_core::AgentId;
use passport_gate_core::AllowlistReport;
use passport_gate_core::AllowlistValidator;
use passport_gate_core::AssuranceLevel;
use passport_gate_core::DecisionReason;
use passport_gate_core::Fingerprint;
use passport_gate_core::IdempotencyKey;
use passport_gate_core::McpContext;
use passport_gate_core::MissingAllowlistPolicy;
use passport_gate_core::PolicyId;
use passport_gate_core::reason_codes;
use thiserror::Error;
use tokio::time::Instant;

use crate::audit::EVENT_DUPLICATE_EXECUTION;
use crate::audit::GateAuditEvent;
use crate::audit::GateAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::audit_sink_from_config;
use crate::cache::CacheLookup;
use crate::cache::DecisionCache;
use crate::client::DecisionClient;
use crate::http::HttpPolicyService;
use crate::http::HttpServiceError;
use crate::passport::PassportAllowlists;
use crate::remote::RemoteError;
use crate::retry::RetryPolicy;
use crate::routing::ToolPolicyMap;
use crate::routing::ToolRoute;
use crate::telemetry::GateMetricEvent;
use crate::telemetry::GateMetrics;
use crate::telemetry::NoopMetrics;
use crate::transport::DecisionRequest;
use crate::verdict::AuthorizationError;
use crate::verdict::DenialKind;
use crate::verdict::GateOutcome;
use crate::verdict::GateState;
use crate::verdict::Verdict;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// One action awaiting authorization.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    /// Agent requesting the action.
    agent_id: AgentId,
    /// Policy pack to evaluate.
    policy_id: PolicyId,
    /// Proposed action.
    context: ActionContext,
    /// Caller-supplied idempotency key.
    idempotency_key: Option<IdempotencyKey>,
    /// MCP context taken from transport headers.
    mcp_headers: Option<McpContext>,
    /// Per-request minimum assurance level.
    minimum_assurance: Option<AssuranceLevel>,
    /// Per-request time budget.
    deadline: Option<Duration>,
}

impl ActionRequest {
    /// Creates a request without key, headers, or deadline.
    #[must_use]
    pub fn new(
        agent_id: impl Into<AgentId>,
        policy_id: impl Into<PolicyId>,
        context: ActionContext,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            policy_id: policy_id.into(),
            context,
            idempotency_key: None,
            mcp_headers: None,
            minimum_assurance: None,
            deadline: None,
        }
    }

    /// Sets the idempotency key.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: impl Into<IdempotencyKey>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Supplies MCP usage read from `X-MCP-*` headers.
    ///
    /// Non-empty header dimensions replace the ones in the context.
    #[must_use]
    pub fn with_mcp_headers<'a, I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.mcp_headers = Some(McpContext::from_headers(headers));
        self
    }

    /// Requires at least `level` on top of the gate-wide minimum.
    #[must_use]
    pub const fn with_minimum_assurance(mut self, level: AssuranceLevel) -> Self {
        self.minimum_assurance = Some(level);
        self
    }

    /// Bounds the whole gate run, retries included.
    #[must_use]
    pub const fn with_deadline(mut self, budget: Duration) -> Self {
        self.deadline = Some(budget);
        self
    }

    /// Returns the agent identifier.
    #[must_use]
    pub const fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// Returns the policy identifier.
    #[must_use]
    pub const fn policy_id(&self) -> &PolicyId {
        &self.policy_id
    }

    /// Returns the action context as submitted.
    #[must_use]
    pub const fn context(&self) -> &ActionContext {
        &self.context
    }

    /// Returns the idempotency key.
    #[must_use]
    pub const fn idempotency_key(&self) -> Option<&IdempotencyKey> {
        self.idempotency_key.as_ref()
    }
}

/// Result of authorizing a call by tool name.
#[derive(Debug, Clone)]
pub enum ToolAuthorization {
    /// The tool mapped to a policy pack and was gated.
    Gated(Verdict),
    /// The tool has no mapping and unmapped tools are denied.
    Unmapped(AuthorizationError),
    /// The tool has no mapping and runs ungated.
    Ungated,
}

impl ToolAuthorization {
    /// Returns true when the tool may run.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        match self {
            Self::Gated(verdict) => verdict.is_allowed(),
            Self::Unmapped(_) => false,
            Self::Ungated => true,
        }
    }

    /// Converts into a result; the verdict is `None` for ungated tools.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError`] unless the tool may run.
    pub fn into_result(self) -> Result<Option<Verdict>, AuthorizationError> {
        match self {
            Self::Gated(verdict) => verdict.into_result().map(Some),
            Self::Unmapped(error) => Err(error),
            Self::Ungated => Ok(None),
        }
    }
}

// ============================================================================
// SECTION: Options
// ============================================================================

/// Enforcement behavior knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOptions {
    /// Posture when no decision can be obtained.
    pub failure_mode: FailureMode,
    /// Whether MCP usage is checked against passports before remote calls.
    pub local_mcp_validation: bool,
    /// Treatment of passports without an allowlist.
    pub missing_allowlist: MissingAllowlistPolicy,
    /// Gate-wide minimum assurance level.
    pub minimum_assurance: Option<AssuranceLevel>,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            failure_mode: FailureMode::FailClosed,
            local_mcp_validation: true,
            missing_allowlist: MissingAllowlistPolicy::DenyAll,
            minimum_assurance: None,
        }
    }
}

impl GateOptions {
    /// Reads the options from a validated configuration.
    #[must_use]
    pub const fn from_config(config: &GatewayConfig) -> Self {
        Self {
            failure_mode: config.enforcement.failure_mode,
            local_mcp_validation: config.passport.local_mcp_validation,
            missing_allowlist: config.passport.missing_allowlist,
            minimum_assurance: config.enforcement.minimum_assurance,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures building a gate from configuration.
#[derive(Debug, Error)]
pub enum GateBuildError {
    /// The HTTP service client could not be built.
    #[error(transparent)]
    Service(#[from] HttpServiceError),
    /// The audit sink could not be opened.
    #[error("audit sink error: {0}")]
    Audit(#[from] io::Error),
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Action authorization gate.
///
/// # Invariants
/// - Every run ends in exactly one terminal state and emits one audit event.
/// - A local denial never reaches the policy service.
#[derive(Clone)]
pub struct EnforcementGate {
    /// Decision client used on cache misses.
    client: DecisionClient,
    /// Process-wide decision cache.
    cache: DecisionCache,
    /// Passport allowlist lookup; `None` skips local MCP validation.
    passports: Option<PassportAllowlists>,
    /// Tool name to policy routing.
    routing: ToolPolicyMap,
    /// Enforcement options.
    options: GateOptions,
    /// Audit sink.
    audit: Arc<dyn GateAuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn GateMetrics>,
}

impl EnforcementGate {
    /// Creates a fail-closed gate with default routing and no passport lookup.
    #[must_use]
    pub fn new(client: DecisionClient, cache: DecisionCache) -> Self {
        Self {
            client,
            cache,
            passports: None,
            routing: ToolPolicyMap::default(),
            options: GateOptions::default(),
            audit: Arc::new(NoopAuditSink),
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Builds the gate described by a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GateBuildError`] when the HTTP client or audit sink cannot
    /// be created.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GateBuildError> {
        let service = Arc::new(HttpPolicyService::from_config(&config.service)?);
        let client = DecisionClient::new(service.clone(), RetryPolicy::from_config(&config.retry));
        let mut gate = Self::new(client, DecisionCache::from_config(&config.cache))
            .with_options(GateOptions::from_config(config))
            .with_routing(ToolPolicyMap::from_config(
                &config.policies,
                config.enforcement.unmapped_tools,
            ))
            .with_audit(audit_sink_from_config(&config.audit)?);
        if config.passport.local_mcp_validation {
            gate = gate.with_passports(PassportAllowlists::from_config(service, &config.passport));
        }
        Ok(gate)
    }

    /// Enables local MCP validation against passport allowlists.
    #[must_use]
    pub fn with_passports(mut self, passports: PassportAllowlists) -> Self {
        self.passports = Some(passports);
        self
    }

    /// Replaces the enforcement options.
    #[must_use]
    pub const fn with_options(mut self, options: GateOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the tool routing table.
    #[must_use]
    pub fn with_routing(mut self, routing: ToolPolicyMap) -> Self {
        self.routing = routing;
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn GateAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn GateMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Returns the decision cache.
    #[must_use]
    pub const fn cache(&self) -> &DecisionCache {
        &self.cache
    }

    /// Returns the enforcement options.
    #[must_use]
    pub const fn options(&self) -> &GateOptions {
        &self.options
    }

    /// Returns the tool routing table.
    #[must_use]
    pub const fn routing(&self) -> &ToolPolicyMap {
        &self.routing
    }

    /// Runs the request through the gate.
    pub async fn authorize(&self, request: ActionRequest) -> Verdict {
        self.run(request, None).await
    }

    /// Runs the request through the gate and fails unless allowed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError`] for every non-allowed terminal state.
    pub async fn enforce(&self, request: ActionRequest) -> Result<Verdict, AuthorizationError> {
        self.authorize(request).await.into_result()
    }

    /// Authorizes a call to `tool` using the routing table.
    pub async fn authorize_tool(
        &self,
        tool: &str,
        agent_id: impl Into<AgentId>,
        context: ActionContext,
        idempotency_key: Option<IdempotencyKey>,
    ) -> ToolAuthorization {
        let agent_id = agent_id.into();
        match self.routing.resolve(tool) {
            ToolRoute::Policy(policy_id) => {
                let mut request = ActionRequest::new(agent_id, policy_id, context);
                request.idempotency_key = idempotency_key;
                ToolAuthorization::Gated(self.run(request, Some(tool)).await)
            }
            ToolRoute::Skip => ToolAuthorization::Ungated,
            ToolRoute::Deny => {
                let reasons = vec![DecisionReason::error(
                    reason_codes::UNMAPPED_TOOL,
                    format!("tool {tool:?} has no policy mapping"),
                )];
                self.audit.record(&GateAuditEvent::unmapped_tool(&agent_id, tool, &reasons));
                ToolAuthorization::Unmapped(AuthorizationError {
                    kind: DenialKind::LocalValidation,
                    decision_id: None,
                    reasons,
                })
            }
        }
    }

    /// Audits a blocked repeat execution of an allowed verdict.
    pub(crate) fn audit_duplicate(&self, verdict: &Verdict) {
        let mut event = GateAuditEvent::from_verdict(verdict, None, Duration::ZERO)
            .with_event(EVENT_DUPLICATE_EXECUTION);
        event.reason_codes.push(reason_codes::DUPLICATE_EXECUTION.to_string());
        self.audit.record(&event);
    }

    /// Walks the gate states for one request.
    ///
    /// `LOCAL_VALIDATING` enters the trail only when a local check ran: a
    /// malformed context or an allowlist that could be read.
    async fn run(&self, request: ActionRequest, tool: Option<&str>) -> Verdict {
        let started = Instant::now();
        let ActionRequest {
            agent_id,
            policy_id,
            mut context,
            idempotency_key,
            mcp_headers,
            minimum_assurance,
            deadline,
        } = request;
        let deadline = deadline.map(|budget| started + budget);
        let mut verdict = Verdict {
            outcome: GateOutcome::LocalDenied,
            trail: vec![GateState::Pending],
            agent_id,
            policy_id,
            fingerprint: None,
            decision: None,
            reasons: Vec::new(),
            cache_source: None,
            remote_error: None,
            valid_until: None,
        };

        if let Err(err) = context.validate_known_fields() {
            verdict.trail.push(GateState::LocalValidating);
            verdict.reasons.push(DecisionReason::error(reason_codes::INVALID_CONTEXT, err.to_string()));
            return self.finish(verdict, GateOutcome::LocalDenied, tool, started);
        }
        let mcp = merge_mcp(context.mcp_context(), mcp_headers);
        context.apply_mcp(&mcp);
        let fingerprint = match Fingerprint::derive(
            &verdict.agent_id,
            &verdict.policy_id,
            idempotency_key.as_ref(),
            &context,
        ) {
            Ok(fingerprint) => fingerprint,
            Err(err) => {
                verdict.trail.push(GateState::LocalValidating);
                verdict
                    .reasons
                    .push(DecisionReason::error(reason_codes::INVALID_CONTEXT, err.to_string()));
                return self.finish(verdict, GateOutcome::LocalDenied, tool, started);
            }
        };
        verdict.fingerprint = Some(fingerprint.clone());

        if let Some(report) = self.check_allowlist(&verdict.agent_id, &mcp, deadline).await {
            verdict.trail.push(GateState::LocalValidating);
            if !report.is_allowed() {
                verdict.reasons = report.reasons();
                return self.finish(verdict, GateOutcome::LocalDenied, tool, started);
            }
        }

        verdict.trail.push(GateState::RemoteChecking);
        let request = DecisionRequest {
            agent_id: verdict.agent_id.clone(),
            policy_id: verdict.policy_id.clone(),
            context,
            idempotency_key,
        };
        let outcome = match self.lookup(request, &fingerprint, deadline).await {
            Ok(lookup) => self.judge(&mut verdict, lookup, minimum_assurance),
            Err(error) => self.degrade(&mut verdict, error),
        };
        self.finish(verdict, outcome, tool, started)
    }

    /// Checks MCP usage against the agent's allowlist when one can be read.
    ///
    /// Returns `None` when the check is skipped.
    async fn check_allowlist(
        &self,
        agent_id: &AgentId,
        mcp: &McpContext,
        deadline: Option<Instant>,
    ) -> Option<AllowlistReport> {
        if !self.options.local_mcp_validation || mcp.is_empty() {
            return None;
        }
        let passports = self.passports.as_ref()?;
        let fetched = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, passports.allowlist(agent_id))
                .await
                .ok()?,
            None => passports.allowlist(agent_id).await,
        };
        let allowlist = fetched.ok()?;
        let validator = AllowlistValidator::new(self.options.missing_allowlist);
        Some(validator.validate(mcp, allowlist.as_ref()))
    }

    /// Obtains the decision through the cache within the request deadline.
    async fn lookup(
        &self,
        request: DecisionRequest,
        fingerprint: &Fingerprint,
        deadline: Option<Instant>,
    ) -> Result<CacheLookup, RemoteError> {
        let budget = deadline.map_or_else(
            || self.client.retry_policy().deadline(),
            |deadline| deadline.saturating_duration_since(Instant::now()),
        );
        let client = self.client.clone();
        let metrics = Arc::clone(&self.metrics);
        let lookup = self.cache.get_or_compute(fingerprint, move || async move {
            let started = Instant::now();
            let result = client.request_within(&request, budget).await;
            let error_kind = result.as_ref().err().map(|err| err.kind.as_str());
            metrics.record_remote_latency(&request.policy_id, error_kind, started.elapsed());
            result
        });
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, lookup).await.unwrap_or_else(|_| {
                Err(RemoteError::timeout(format!(
                    "gate deadline of {} ms exceeded",
                    budget.as_millis()
                )))
            }),
            None => lookup.await,
        }
    }

    /// Applies a decision to the verdict and returns the outcome.
    fn judge(
        &self,
        verdict: &mut Verdict,
        lookup: CacheLookup,
        minimum_assurance: Option<AssuranceLevel>,
    ) -> GateOutcome {
        let decision = lookup.decision;
        verdict.cache_source = Some(lookup.source);
        verdict.valid_until = lookup.expires_at;
        verdict.reasons.clone_from(&decision.reasons);
        let required = minimum_assurance.into_iter().chain(self.options.minimum_assurance).max();
        let outcome = if !decision.allow {
            if verdict.reasons.is_empty() {
                verdict.reasons.push(DecisionReason::error(
                    reason_codes::POLICY_DENIED,
                    "policy denied the action",
                ));
            }
            GateOutcome::Denied
        } else if let Some(required) = required
            && !decision.assurance_level.meets(required)
        {
            verdict.reasons.push(DecisionReason::error(
                reason_codes::ASSURANCE_LEVEL_INSUFFICIENT,
                format!(
                    "decision assurance {} is below required {required}",
                    decision.assurance_level
                ),
            ));
            GateOutcome::Denied
        } else {
            GateOutcome::Allowed
        };
        verdict.decision = Some(decision);
        outcome
    }

    /// Applies the failure posture to a remote error and returns the outcome.
    fn degrade(&self, verdict: &mut Verdict, error: RemoteError) -> GateOutcome {
        let outcome = match self.options.failure_mode {
            FailureMode::FailClosed => {
                verdict.reasons.push(DecisionReason::error(
                    reason_codes::DECISION_UNAVAILABLE,
                    format!("authorization decision unavailable: {error}"),
                ));
                GateOutcome::FailClosedDenied
            }
            FailureMode::FailOpen => {
                verdict.reasons.push(DecisionReason::warning(
                    reason_codes::FAIL_OPEN_OVERRIDE,
                    format!("allowed without a decision under fail-open: {error}"),
                ));
                GateOutcome::Allowed
            }
        };
        verdict.remote_error = Some(error);
        outcome
    }

    /// Records the terminal state, audits, and emits metrics.
    fn finish(
        &self,
        mut verdict: Verdict,
        outcome: GateOutcome,
        tool: Option<&str>,
        started: Instant,
    ) -> Verdict {
        verdict.outcome = outcome;
        verdict.trail.push(outcome.state());
        let latency = started.elapsed();
        self.audit.record(&GateAuditEvent::from_verdict(&verdict, tool, latency));
        let event = GateMetricEvent {
            policy_id: verdict.policy_id.clone(),
            outcome,
            cache_source: verdict.cache_source,
            error_kind: verdict.remote_error.as_ref().map(|err| err.kind.as_str()),
        };
        self.metrics.record_outcome(&event, latency);
        verdict
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Overlays non-empty header dimensions onto the context's MCP usage.
fn merge_mcp(from_context: McpContext, headers: Option<McpContext>) -> McpContext {
    let Some(headers) = headers else {
        return from_context;
    };
    McpContext {
        servers: if headers.servers.is_empty() { from_context.servers } else { headers.servers },
        tools: if headers.tools.is_empty() { from_context.tools } else { headers.tools },
        session: headers.session.or(from_context.session),
    }
}
