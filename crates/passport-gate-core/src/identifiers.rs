// crates/passport-gate-core/src/identifiers.rs
// ============================================================================
// Module: Passport Gate Identifiers
// Description: Opaque identifiers for agents, policy packs, and decisions.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque strings that serialize transparently. Presence and
//! emptiness checks happen at the gate boundary; these wrappers only keep the
//! different identifier kinds from being mixed up.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares an opaque string identifier with the shared accessor surface.
macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true when the identifier is empty after trimming.
            #[must_use]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

opaque_id!(
    /// Agent passport identifier (for example `ap_a2d10232c653`).
    AgentId
);

opaque_id!(
    /// Policy pack identifier (for example `finance.payment.refund.v1`).
    PolicyId
);

opaque_id!(
    /// Caller-supplied token identifying one logical action attempt.
    IdempotencyKey
);

opaque_id!(
    /// Globally unique decision identifier issued by the policy service.
    DecisionId
);
