// crates/passport-gate/src/passport.rs
// ============================================================================
// Module: Passport Allowlists
// Description: Short-lived cache of per-agent MCP allowlists.
// Purpose: Avoid a passport read on every gated action.
// Dependencies: passport-gate-config, passport-gate-core, tokio
// ============================================================================

//! ## Overview
//! [`PassportAllowlists`] wraps a [`PassportDirectory`] with its own TTL,
//! independent of the decision cache. A TTL of zero disables caching.
//! Failed fetches are never cached. Absent allowlists are cached like
//! present ones, since the passport itself said so.
//!
//! Concurrent misses for one agent share a single detached fetch; waiters
//! subscribe to the same watch channel and the map lock is never held
//! across an await.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use passport_gate_config::PassportConfig;
use passport_gate_core::AgentAllowlist;
use passport_gate_core::AgentId;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::remote::RemoteError;
use crate::transport::PassportDirectory;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum cached passports.
const MAX_CACHED_PASSPORTS: usize = 4_096;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Fetch outcome published to waiters.
type Published = Option<Result<Option<AgentAllowlist>, RemoteError>>;

/// Slot map keyed by agent.
type Slots = Mutex<HashMap<AgentId, Slot>>;

/// Allowlist slot for one agent.
enum Slot {
    /// Fetch in flight.
    Pending {
        /// Identifies the fetch that owns the slot.
        generation: u64,
        /// Channel the fetch publishes to.
        receiver: watch::Receiver<Published>,
    },
    /// Cached allowlist.
    Ready {
        /// Allowlist, `None` when the passport configures none.
        allowlist: Option<AgentAllowlist>,
        /// Reuse bound.
        expires_at: Instant,
    },
}

/// Per-agent allowlist lookup with a short TTL.
#[derive(Clone)]
pub struct PassportAllowlists {
    /// Passport source.
    directory: Arc<dyn PassportDirectory>,
    /// Cache TTL; zero disables caching.
    ttl: Duration,
    /// Slots keyed by agent.
    slots: Arc<Slots>,
    /// Generation counter for pending slots.
    generations: Arc<AtomicU64>,
}

impl PassportAllowlists {
    /// Creates a lookup over `directory`.
    #[must_use]
    pub fn new(directory: Arc<dyn PassportDirectory>, ttl: Duration) -> Self {
        Self {
            directory,
            ttl,
            slots: Arc::new(Mutex::new(HashMap::new())),
            generations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a lookup using the passport configuration section.
    #[must_use]
    pub fn from_config(directory: Arc<dyn PassportDirectory>, config: &PassportConfig) -> Self {
        Self::new(directory, config.cache_ttl())
    }

    /// Returns the agent's allowlist, reading the passport on a miss.
    ///
    /// Concurrent callers for the same agent share one passport read.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] when the passport cannot be read.
    pub async fn allowlist(
        &self,
        agent_id: &AgentId,
    ) -> Result<Option<AgentAllowlist>, RemoteError> {
        let (generation, mut receiver, leader) = {
            let now = Instant::now();
            let mut slots = lock(&self.slots);
            match slots.get(agent_id) {
                Some(Slot::Ready {
                    allowlist,
                    expires_at,
                }) if now <= *expires_at => return Ok(allowlist.clone()),
                Some(Slot::Pending {
                    generation,
                    receiver,
                }) => (*generation, receiver.clone(), None),
                _ => {
                    let generation = self.generations.fetch_add(1, Ordering::Relaxed);
                    let (sender, receiver) = watch::channel(None);
                    slots.insert(
                        agent_id.clone(),
                        Slot::Pending {
                            generation,
                            receiver: receiver.clone(),
                        },
                    );
                    (generation, receiver, Some(sender))
                }
            }
        };
        if let Some(sender) = leader {
            self.spawn_fetch(agent_id.clone(), generation, sender);
        }
        let published = match receiver.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        published.unwrap_or_else(|| {
            settle(&self.slots, agent_id, generation, None);
            Err(RemoteError::unavailable("passport read ended without a result"))
        })
    }

    /// Drops the cached allowlist for `agent_id`.
    ///
    /// An in-flight read for the agent still answers its waiters but is not
    /// stored.
    pub fn invalidate(&self, agent_id: &AgentId) -> bool {
        lock(&self.slots).remove(agent_id).is_some()
    }

    /// Starts the detached passport read that owns `generation`.
    fn spawn_fetch(&self, agent_id: AgentId, generation: u64, sender: watch::Sender<Published>) {
        let directory = Arc::clone(&self.directory);
        let slots = Arc::clone(&self.slots);
        let ttl = self.ttl;
        tokio::spawn(async move {
            let outcome = directory.fetch_allowlist(&agent_id).await;
            let stored = match &outcome {
                Ok(allowlist) if !ttl.is_zero() => Some((allowlist.clone(), ttl)),
                _ => None,
            };
            settle(&slots, &agent_id, generation, stored);
            sender.send_replace(Some(outcome));
        });
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Locks the slot map, recovering from poisoning.
fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<AgentId, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Replaces the pending slot owned by `generation` with `stored`, or frees it.
fn settle(
    slots: &Slots,
    agent_id: &AgentId,
    generation: u64,
    stored: Option<(Option<AgentAllowlist>, Duration)>,
) {
    let now = Instant::now();
    let mut slots = lock(slots);
    let owns_slot = matches!(
        slots.get(agent_id),
        Some(Slot::Pending { generation: current, .. }) if *current == generation
    );
    if !owns_slot {
        return;
    }
    slots.remove(agent_id);
    let Some((allowlist, ttl)) = stored else {
        return;
    };
    if slots.len() >= MAX_CACHED_PASSPORTS {
        slots.retain(|_, slot| match slot {
            Slot::Ready {
                expires_at, ..
            } => now <= *expires_at,
            Slot::Pending {
                ..
            } => true,
        });
        if slots.len() >= MAX_CACHED_PASSPORTS {
            slots.retain(|_, slot| matches!(slot, Slot::Pending { .. }));
        }
    }
    slots.insert(
        agent_id.clone(),
        Slot::Ready {
            allowlist,
            expires_at: now + ttl,
        },
    );
}
