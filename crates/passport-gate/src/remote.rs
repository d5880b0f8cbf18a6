// crates/passport-gate/src/remote.rs
// ============================================================================
// Module: Remote Errors
// Description: Normalized failures from the policy and passport service.
// Purpose: Give retry and enforcement logic one stable error taxonomy.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every transport failure is folded into a [`RemoteError`] with a
//! [`RemoteErrorKind`]. Errors are `Clone` so a single coalesced failure can
//! be delivered to every caller waiting on the same fingerprint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Classification of a remote failure.
///
/// # Invariants
/// - Variants are stable for retry decisions and audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The attempt or the request-scoped deadline elapsed.
    Timeout,
    /// The service asked the caller to slow down.
    RateLimited {
        /// Wait hint provided by the service, when present.
        retry_after: Option<Duration>,
    },
    /// Connection failure or 5xx response.
    ServiceUnavailable,
    /// A 2xx response whose body is not a decision.
    MalformedResponse,
    /// Any other non-success status.
    HttpError {
        /// HTTP status code.
        status: u16,
    },
}

impl RemoteErrorKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::RateLimited {
                ..
            } => "rate_limited",
            Self::ServiceUnavailable => "service_unavailable",
            Self::MalformedResponse => "malformed_response",
            Self::HttpError {
                ..
            } => "http_error",
        }
    }

    /// Returns true when backoff retries apply.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Timeout | Self::ServiceUnavailable)
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpError {
                status,
            } => write!(f, "http_error({status})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Failure talking to the policy or passport service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    /// Failure classification.
    pub kind: RemoteErrorKind,
    /// Human-readable detail; never contains credentials.
    pub message: String,
}

impl RemoteError {
    /// Builds an error of the given kind.
    #[must_use]
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Builds a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Timeout, message)
    }

    /// Builds a rate-limited error.
    #[must_use]
    pub fn rate_limited(retry_after: Option<Duration>, message: impl Into<String>) -> Self {
        Self::new(
            RemoteErrorKind::RateLimited {
                retry_after,
            },
            message,
        )
    }

    /// Builds a service-unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::ServiceUnavailable, message)
    }

    /// Builds a malformed-response error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::MalformedResponse, message)
    }

    /// Builds an HTTP status error.
    #[must_use]
    pub fn http(status: u16) -> Self {
        Self::new(
            RemoteErrorKind::HttpError {
                status,
            },
            format!("unexpected status {status}"),
        )
    }
}
