// crates/passport-gate/src/cache.rs
// ============================================================================
// Module: Decision Cache
// Description: Fingerprint-keyed decision memoization with request coalescing.
// Purpose: Make duplicate and retried action attempts idempotent and cheap.
// Dependencies: passport-gate-core, time, tokio
// ============================================================================

//! ## Overview
//! [`DecisionCache`] maps a request [`Fingerprint`] to either an in-flight
//! computation or a resolved decision. The first caller for a fingerprint
//! spawns the computation; concurrent callers wait on the same watch channel
//! and observe the same `Arc<Decision>`. The map lock is never held across
//! an await.
//!
//! A resolved decision is reusable until `created_at + min(ttl, expires_in)`.
//! Decisions with a zero window and all failures are handed to waiters but
//! never stored. Computations are detached from callers: a caller that gives
//! up does not cancel the request, and a late result still fills the cache.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use passport_gate_config::CacheConfig;
use passport_gate_core::Decision;
use passport_gate_core::Fingerprint;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::remote::RemoteError;

// ============================================================================
// SECTION: Public Types
// ============================================================================

/// How a lookup obtained its decision.
///
/// # Invariants
/// - Variants are stable for audit and telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    /// A stored, unexpired decision.
    Hit,
    /// Joined another caller's in-flight computation.
    Coalesced,
    /// This caller started the computation.
    Computed,
}

impl CacheSource {
    /// Returns a stable label for the source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Coalesced => "coalesced",
            Self::Computed => "computed",
        }
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    /// Shared decision instance.
    pub decision: Arc<Decision>,
    /// How the decision was obtained.
    pub source: CacheSource,
    /// Instant after which the decision must not be reused; `None` for a zero window.
    pub expires_at: Option<Instant>,
}

/// Process-scoped decision cache; cloning shares the same entries.
#[derive(Clone)]
pub struct DecisionCache {
    /// Shared cache state.
    state: Arc<CacheState>,
}

// ============================================================================
// SECTION: Internal Types
// ============================================================================

/// Outcome published to waiters.
type Published = Option<Result<Resolved, RemoteError>>;

/// Decision resolved by a computation.
#[derive(Debug, Clone)]
struct Resolved {
    /// Shared decision instance.
    decision: Arc<Decision>,
    /// Expiry when stored.
    expires_at: Option<Instant>,
}

/// Cache slot for one fingerprint.
enum Slot {
    /// Computation in flight.
    Pending {
        /// Identifies the computation that owns the slot.
        generation: u64,
        /// Channel the computation publishes to.
        receiver: watch::Receiver<Published>,
    },
    /// Stored decision.
    Ready {
        /// Shared decision instance.
        decision: Arc<Decision>,
        /// Reuse bound.
        expires_at: Instant,
    },
}

/// Shared cache state.
struct CacheState {
    /// Upper bound on reuse.
    ttl: Duration,
    /// Maximum stored entries.
    max_entries: usize,
    /// Slots keyed by fingerprint.
    slots: Mutex<HashMap<Fingerprint, Slot>>,
    /// Generation counter for pending slots.
    generations: AtomicU64,
}

/// What a lookup must do after releasing the lock.
enum Step {
    /// Wait on an existing computation.
    Join(u64, watch::Receiver<Published>),
    /// Start a computation and publish on the sender.
    Lead(u64, watch::Sender<Published>, watch::Receiver<Published>),
}

// ============================================================================
// SECTION: Cache
// ============================================================================

impl DecisionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            state: Arc::new(CacheState {
                ttl,
                max_entries: max_entries.max(1),
                slots: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
            }),
        }
    }

    /// Creates an empty cache from the cache configuration section.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.max_entries)
    }

    /// Returns the configured TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.state.ttl
    }

    /// Returns the number of slots, pending ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    /// Returns true when no slot exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the stored decision for `fingerprint` when still reusable.
    #[must_use]
    pub fn peek(&self, fingerprint: &Fingerprint) -> Option<Arc<Decision>> {
        let now = Instant::now();
        match self.state.lock().get(fingerprint) {
            Some(Slot::Ready {
                decision,
                expires_at,
            }) if now <= *expires_at => Some(Arc::clone(decision)),
            _ => None,
        }
    }

    /// Drops the slot for `fingerprint`; an in-flight result will not be stored.
    pub fn invalidate(&self, fingerprint: &Fingerprint) -> bool {
        self.state.lock().remove(fingerprint).is_some()
    }

    /// Removes every expired decision and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.state.lock();
        let before = slots.len();
        CacheState::retain_live(&mut slots, now);
        before - slots.len()
    }

    /// Returns the decision for `fingerprint`, computing it at most once at a time.
    ///
    /// `compute` runs only when no reusable or in-flight entry exists. Its
    /// future is spawned onto the runtime, so dropping this call does not
    /// cancel it.
    ///
    /// # Errors
    ///
    /// Returns the computation's [`RemoteError`], shared with every waiter.
    pub async fn get_or_compute<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        compute: F,
    ) -> Result<CacheLookup, RemoteError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Decision, RemoteError>> + Send + 'static,
    {
        let step = {
            let now = Instant::now();
            let mut slots = self.state.lock();
            match slots.get(fingerprint) {
                Some(Slot::Ready {
                    decision,
                    expires_at,
                }) if now <= *expires_at => {
                    return Ok(CacheLookup {
                        decision: Arc::clone(decision),
                        source: CacheSource::Hit,
                        expires_at: Some(*expires_at),
                    });
                }
                Some(Slot::Pending {
                    generation,
                    receiver,
                }) => Step::Join(*generation, receiver.clone()),
                _ => {
                    let generation = self.state.generations.fetch_add(1, Ordering::Relaxed);
                    let (sender, receiver) = watch::channel(None);
                    slots.insert(
                        fingerprint.clone(),
                        Slot::Pending {
                            generation,
                            receiver: receiver.clone(),
                        },
                    );
                    Step::Lead(generation, sender, receiver)
                }
            }
        };
        match step {
            Step::Join(generation, receiver) => {
                self.wait(fingerprint, generation, receiver, CacheSource::Coalesced).await
            }
            Step::Lead(generation, sender, receiver) => {
                let future = compute();
                let state = Arc::clone(&self.state);
                let key = fingerprint.clone();
                tokio::spawn(async move {
                    let outcome = future.await;
                    let published = state.complete(&key, generation, outcome);
                    sender.send_replace(Some(published));
                });
                self.wait(fingerprint, generation, receiver, CacheSource::Computed).await
            }
        }
    }

    /// Waits for a computation to publish its outcome.
    async fn wait(
        &self,
        fingerprint: &Fingerprint,
        generation: u64,
        mut receiver: watch::Receiver<Published>,
        source: CacheSource,
    ) -> Result<CacheLookup, RemoteError> {
        let published = match receiver.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        match published {
            Some(Ok(resolved)) => Ok(CacheLookup {
                decision: resolved.decision,
                source,
                expires_at: resolved.expires_at,
            }),
            Some(Err(error)) => Err(error),
            None => {
                self.state.release(fingerprint, generation);
                Err(RemoteError::unavailable("decision computation ended without a result"))
            }
        }
    }
}

// ============================================================================
// SECTION: State
// ============================================================================

impl CacheState {
    /// Locks the slot map, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, HashMap<Fingerprint, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a finished computation and returns what waiters receive.
    fn complete(
        &self,
        fingerprint: &Fingerprint,
        generation: u64,
        outcome: Result<Decision, RemoteError>,
    ) -> Result<Resolved, RemoteError> {
        let now = Instant::now();
        let mut slots = self.lock();
        let owns_slot = matches!(
            slots.get(fingerprint),
            Some(Slot::Pending { generation: current, .. }) if *current == generation
        );
        if owns_slot {
            slots.remove(fingerprint);
        }
        let decision = Arc::new(outcome?);
        let lifetime = decision.remaining_validity(OffsetDateTime::now_utc(), self.ttl);
        if lifetime.is_zero() {
            return Ok(Resolved {
                decision,
                expires_at: None,
            });
        }
        let expires_at = now + lifetime;
        if owns_slot {
            self.make_room(&mut slots, now);
            slots.insert(
                fingerprint.clone(),
                Slot::Ready {
                    decision: Arc::clone(&decision),
                    expires_at,
                },
            );
        }
        Ok(Resolved {
            decision,
            expires_at: Some(expires_at),
        })
    }

    /// Frees a pending slot whose computation vanished.
    fn release(&self, fingerprint: &Fingerprint, generation: u64) {
        let mut slots = self.lock();
        if matches!(
            slots.get(fingerprint),
            Some(Slot::Pending { generation: current, .. }) if *current == generation
        ) {
            slots.remove(fingerprint);
        }
    }

    /// Evicts until one more entry fits: expired first, then earliest expiry.
    fn make_room(&self, slots: &mut HashMap<Fingerprint, Slot>, now: Instant) {
        if slots.len() < self.max_entries {
            return;
        }
        Self::retain_live(slots, now);
        while slots.len() >= self.max_entries {
            let victim = slots
                .iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Ready {
                        expires_at, ..
                    } => Some((key, *expires_at)),
                    Slot::Pending {
                        ..
                    } => None,
                })
                .min_by_key(|(_, expires_at)| *expires_at)
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    slots.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Drops expired decisions, keeping pending computations.
    fn retain_live(slots: &mut HashMap<Fingerprint, Slot>, now: Instant) {
        slots.retain(|_, slot| match slot {
            Slot::Ready {
                expires_at, ..
            } => now <= *expires_at,
            Slot::Pending {
                ..
            } => true,
        });
    }
}

#[cfg(test)]
mod tests;
