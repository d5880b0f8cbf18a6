// crates/passport-gate/src/telemetry.rs
// ============================================================================
// Module: Gate Telemetry
// Description: Observability hooks for gate outcomes and remote latency.
// Purpose: Provide metric events and latency buckets without hard deps.
// Dependencies: passport-gate-core
// ============================================================================

//! ## Overview
//! A thin metrics interface for gate outcome counters and latency
//! histograms. Deployments plug in Prometheus or OpenTelemetry behind
//! [`GateMetrics`]. Labels never carry action context values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use passport_gate_core::PolicyId;

use crate::cache::CacheSource;
use crate::verdict::GateOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for gate histograms.
pub const GATE_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000];

/// Returns the upper bound of the latency bucket holding `latency`.
///
/// Latencies beyond the last bound return `None`, the overflow bucket.
#[must_use]
pub fn latency_bucket_ms(latency: Duration) -> Option<u64> {
    let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
    GATE_LATENCY_BUCKETS_MS.iter().copied().find(|bound| millis <= *bound)
}

// ============================================================================
// SECTION: Metric Events
// ============================================================================

/// Gate outcome metric event payload.
///
/// # Invariants
/// - Optional fields are `None` when the metadata is unavailable.
#[derive(Debug, Clone)]
pub struct GateMetricEvent {
    /// Policy pack consulted.
    pub policy_id: PolicyId,
    /// Terminal outcome.
    pub outcome: GateOutcome,
    /// How the decision was obtained.
    pub cache_source: Option<CacheSource>,
    /// Normalized remote error kind label.
    pub error_kind: Option<&'static str>,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for gate outcomes and remote calls.
pub trait GateMetrics: Send + Sync {
    /// Records a terminal outcome with its end-to-end latency.
    fn record_outcome(&self, event: &GateMetricEvent, latency: Duration);
    /// Records the latency of one remote decision request.
    fn record_remote_latency(
        &self,
        policy_id: &PolicyId,
        error_kind: Option<&'static str>,
        latency: Duration,
    );
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
pub struct NoopMetrics;

impl GateMetrics for NoopMetrics {
    fn record_outcome(&self, _event: &GateMetricEvent, _latency: Duration) {}

    fn record_remote_latency(
        &self,
        _policy_id: &PolicyId,
        _error_kind: Option<&'static str>,
        _latency: Duration,
    ) {
    }
}
