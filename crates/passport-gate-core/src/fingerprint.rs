// crates/passport-gate-core/src/fingerprint.rs
// ============================================================================
// Module: Decision Fingerprints
// Description: Deterministic cache keys for authorization requests.
// Purpose: Deduplicate identical action attempts across retries and callers.
// Dependencies: serde, crate::hashing
// ============================================================================

//! ## Overview
//! A fingerprint is the SHA-256 of the canonical JSON of the agent, the
//! policy pack, the optional idempotency key, and a digest of the full
//! [`ActionContext`]. Binding the context digest even when a key is present
//! means a reused key with different content never replays a stale decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::context::ActionContext;
use crate::hashing::HashDigest;
use crate::hashing::HashError;
use crate::hashing::hash_canonical_json;
use crate::identifiers::AgentId;
use crate::identifiers::IdempotencyKey;
use crate::identifiers::PolicyId;

// ============================================================================
// SECTION: Fingerprint
// ============================================================================

/// Canonical request fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(HashDigest);

/// Canonical material hashed into a fingerprint.
#[derive(Serialize)]
struct FingerprintMaterial<'a> {
    /// Agent identifier.
    agent_id: &'a AgentId,
    /// Policy pack identifier.
    policy_id: &'a PolicyId,
    /// Idempotency key, omitted when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    idempotency_key: Option<&'a IdempotencyKey>,
    /// Digest of the canonical action context.
    context_digest: HashDigest,
}

impl Fingerprint {
    /// Derives the fingerprint for one authorization request.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the context cannot be canonicalized.
    pub fn derive(
        agent_id: &AgentId,
        policy_id: &PolicyId,
        idempotency_key: Option<&IdempotencyKey>,
        context: &ActionContext,
    ) -> Result<Self, HashError> {
        let material = FingerprintMaterial {
            agent_id,
            policy_id,
            idempotency_key,
            context_digest: hash_canonical_json(context)?,
        };
        hash_canonical_json(&material).map(Self)
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
