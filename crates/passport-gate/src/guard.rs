// crates/passport-gate/src/guard.rs
// ============================================================================
// Module: Protected Actions
// Description: Wraps side-effecting actions behind the enforcement gate.
// Purpose: Run an action only after an allow, once per valid decision.
// Dependencies: passport-gate-core, thiserror, tokio
// ============================================================================

//! ## Overview
//! [`ProtectedAction`] composes a context builder, an optional
//! idempotency-key builder, and the action itself. Each call builds the
//! context from the arguments, enforces it, and runs the action only on
//! `ALLOWED`. The [`ExecutionLedger`] blocks a second run for the same
//! fingerprint while the decision stays valid; a failed run releases its
//! claim so the caller may retry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use passport_gate_core::ActionContext;
use passport_gate_core::AgentId;
use passport_gate_core::Fingerprint;
use passport_gate_core::IdempotencyKey;
use passport_gate_core::PolicyId;
use thiserror::Error;
use tokio::time::Instant;

use crate::gate::ActionRequest;
use crate::gate::EnforcementGate;
use crate::verdict::AuthorizationError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Boxed future returned by a protected action.
pub type ActionFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// Builds the action context from call arguments.
type ContextBuilder<A> = Box<dyn Fn(&A) -> ActionContext + Send + Sync>;
/// Derives an idempotency key from call arguments.
type KeyBuilder<A> = Box<dyn Fn(&A) -> Option<IdempotencyKey> + Send + Sync>;
/// Type-erased protected action.
type ActionFn<A, T, E> = Box<dyn Fn(A) -> ActionFuture<T, E> + Send + Sync>;

/// Errors returned by a protected action call.
#[derive(Debug, Error)]
pub enum GuardError<E> {
    /// The gate did not allow the action.
    #[error(transparent)]
    Denied(#[from] AuthorizationError),
    /// The action already ran under the still-valid decision.
    #[error("action already executed for fingerprint {fingerprint}")]
    DuplicateExecution {
        /// Fingerprint of the repeated request.
        fingerprint: Fingerprint,
    },
    /// The action ran and failed.
    #[error("protected action failed: {0}")]
    Action(E),
}

// ============================================================================
// SECTION: Execution Ledger
// ============================================================================

/// Ledger entry for one fingerprint.
#[derive(Debug, Clone, Copy)]
enum Execution {
    /// The action is running.
    Running,
    /// The action finished; repeats are blocked until the instant passes.
    Completed(Instant),
}

/// Tracks which fingerprints have executed under their current decision.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLedger {
    /// Executions keyed by fingerprint.
    entries: Arc<Mutex<HashMap<Fingerprint, Execution>>>,
}

impl ExecutionLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the right to execute `fingerprint`.
    ///
    /// Returns `None` while another execution is running or a completed one
    /// is still covered by its decision.
    #[must_use]
    pub fn claim(
        &self,
        fingerprint: &Fingerprint,
        valid_until: Option<Instant>,
    ) -> Option<ExecutionClaim> {
        let now = Instant::now();
        let mut entries = self.lock();
        entries.retain(|_, execution| match execution {
            Execution::Running => true,
            Execution::Completed(until) => now <= *until,
        });
        if entries.contains_key(fingerprint) {
            return None;
        }
        entries.insert(fingerprint.clone(), Execution::Running);
        Some(ExecutionClaim {
            ledger: self.clone(),
            fingerprint: fingerprint.clone(),
            valid_until,
            settled: false,
        })
    }

    /// Returns true when `fingerprint` is running or blocked.
    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        let now = Instant::now();
        match self.lock().get(fingerprint) {
            Some(Execution::Running) => true,
            Some(Execution::Completed(until)) => now <= *until,
            None => false,
        }
    }

    /// Forgets `fingerprint`, allowing it to run again.
    pub fn release(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().remove(fingerprint).is_some()
    }

    /// Locks the entry map, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, HashMap<Fingerprint, Execution>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive right to run one fingerprint; released on drop unless completed.
#[derive(Debug)]
pub struct ExecutionClaim {
    /// Owning ledger.
    ledger: ExecutionLedger,
    /// Claimed fingerprint.
    fingerprint: Fingerprint,
    /// End of the decision's validity.
    valid_until: Option<Instant>,
    /// Whether the claim was completed.
    settled: bool,
}

impl ExecutionClaim {
    /// Marks the execution successful, blocking repeats until the decision expires.
    pub fn complete(mut self) {
        self.settled = true;
        let now = Instant::now();
        let mut entries = self.ledger.lock();
        match self.valid_until {
            Some(until) if now <= until => {
                entries.insert(self.fingerprint.clone(), Execution::Completed(until));
            }
            _ => {
                entries.remove(&self.fingerprint);
            }
        }
    }
}

impl Drop for ExecutionClaim {
    fn drop(&mut self) {
        if !self.settled {
            self.ledger.lock().remove(&self.fingerprint);
        }
    }
}

// ============================================================================
// SECTION: Protected Action
// ============================================================================

/// Side-effecting action gated by an [`EnforcementGate`].
pub struct ProtectedAction<A, T, E> {
    /// Gate enforcing each call.
    gate: EnforcementGate,
    /// Agent performing the action.
    agent_id: AgentId,
    /// Policy pack evaluating the action.
    policy_id: PolicyId,
    /// Context builder.
    build_context: ContextBuilder<A>,
    /// Optional idempotency-key builder.
    build_key: Option<KeyBuilder<A>>,
    /// Wrapped action.
    action: ActionFn<A, T, E>,
    /// Once-only execution ledger.
    ledger: ExecutionLedger,
}

impl<A, T, E> ProtectedAction<A, T, E> {
    /// Wraps `action` so it only runs after the gate allows the built context.
    pub fn new<C, F, Fut>(
        gate: EnforcementGate,
        agent_id: impl Into<AgentId>,
        policy_id: impl Into<PolicyId>,
        build_context: C,
        action: F,
    ) -> Self
    where
        C: Fn(&A) -> ActionContext + Send + Sync + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            gate,
            agent_id: agent_id.into(),
            policy_id: policy_id.into(),
            build_context: Box::new(build_context),
            build_key: None,
            action: Box::new(move |args| -> ActionFuture<T, E> { Box::pin(action(args)) }),
            ledger: ExecutionLedger::new(),
        }
    }

    /// Derives idempotency keys from call arguments.
    #[must_use]
    pub fn with_idempotency_key<K>(mut self, build_key: K) -> Self
    where
        K: Fn(&A) -> Option<IdempotencyKey> + Send + Sync + 'static,
    {
        self.build_key = Some(Box::new(build_key));
        self
    }

    /// Shares an execution ledger with other wrappers.
    #[must_use]
    pub fn with_ledger(mut self, ledger: ExecutionLedger) -> Self {
        self.ledger = ledger;
        self
    }

    /// Returns the execution ledger.
    #[must_use]
    pub const fn ledger(&self) -> &ExecutionLedger {
        &self.ledger
    }

    /// Authorizes and, when allowed, runs the action.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Denied`] for any non-allowed verdict,
    /// [`GuardError::DuplicateExecution`] for a repeat under the same
    /// decision, and [`GuardError::Action`] when the action fails.
    pub async fn call(&self, args: A) -> Result<T, GuardError<E>> {
        let mut request = ActionRequest::new(
            self.agent_id.clone(),
            self.policy_id.clone(),
            (self.build_context)(&args),
        );
        if let Some(key) = self.build_key.as_ref().and_then(|build| build(&args)) {
            request = request.with_idempotency_key(key);
        }
        let verdict = self.gate.enforce(request).await?;
        let claim = match &verdict.fingerprint {
            Some(fingerprint) => {
                if let Some(claim) = self.ledger.claim(fingerprint, verdict.valid_until) {
                    Some(claim)
                } else {
                    self.gate.audit_duplicate(&verdict);
                    return Err(GuardError::DuplicateExecution {
                        fingerprint: fingerprint.clone(),
                    });
                }
            }
            None => None,
        };
        let value = (self.action)(args).await.map_err(GuardError::Action)?;
        if let Some(claim) = claim {
            claim.complete();
        }
        Ok(value)
    }
}
