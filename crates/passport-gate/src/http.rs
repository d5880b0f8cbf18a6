// crates/passport-gate/src/http.rs
// ============================================================================
// Module: HTTP Policy Service
// Description: reqwest-backed decision and passport endpoints.
// Purpose: Map the service's HTTP surface onto the transport traits.
// Dependencies: passport-gate-config, passport-gate-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`HttpPolicyService`] issues `POST {base}/api/verify/policy/{policy_id}`
//! for decisions and `GET {base}/api/verify/{agent_id}` for passports. Each
//! call is a single attempt bounded by the client's connect and request
//! timeouts; status codes are mapped onto [`RemoteErrorKind`] here so the
//! retry layer never inspects HTTP details.
//!
//! Security posture: the API key is only ever placed in a sensitive header
//! and never appears in error messages.
//!
//! [`RemoteErrorKind`]: crate::remote::RemoteErrorKind

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use passport_gate_config::ServiceConfig;
use passport_gate_core::AgentAllowlist;
use passport_gate_core::AgentId;
use passport_gate_core::Decision;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::RETRY_AFTER;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::remote::RemoteError;
use crate::transport::DecisionRequest;
use crate::transport::PassportDirectory;
use crate::transport::PolicyService;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted response body size in bytes.
const MAX_RESPONSE_BYTES: usize = 1024 * 1024;
/// Maximum error body size read for retry-after hints.
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;
/// Header carrying the caller's idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

// ============================================================================
// SECTION: Types
// ============================================================================

/// HTTP client for the policy and passport service.
///
/// # Invariants
/// - `base_url` can carry path segments (not a cannot-be-a-base URL).
pub struct HttpPolicyService {
    /// Service base URL.
    base_url: Url,
    /// Precomputed bearer authorization header.
    authorization: Option<HeaderValue>,
    /// HTTP client configured with timeouts.
    client: Client,
}

impl HttpPolicyService {
    /// Builds a new HTTP policy service client.
    ///
    /// # Errors
    ///
    /// Returns [`HttpServiceError`] when the URL, key, or client is invalid.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, HttpServiceError> {
        let base_url = Url::parse(base_url.trim().trim_end_matches('/'))
            .map_err(|err| HttpServiceError::InvalidBaseUrl(err.to_string()))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(HttpServiceError::InvalidBaseUrl(
                "base url must be an http(s) url".to_string(),
            ));
        }
        let authorization = match api_key {
            Some(key) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", key.trim()))
                    .map_err(|_| HttpServiceError::InvalidApiKey)?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|err| HttpServiceError::Client(err.to_string()))?;
        Ok(Self {
            base_url,
            authorization,
            client,
        })
    }

    /// Builds a client from the service configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`HttpServiceError`] when the configuration cannot be applied.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, HttpServiceError> {
        Self::new(
            &config.base_url,
            config.api_key.as_deref(),
            config.connect_timeout(),
            config.request_timeout(),
        )
    }

    /// Returns the endpoint URL for the given path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Builds headers shared by every request.
    fn build_headers(&self, request: Option<&DecisionRequest>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = &self.authorization {
            headers.insert(AUTHORIZATION, value.clone());
        }
        if let Some(key) = request.and_then(|request| request.idempotency_key.as_ref())
            && let Ok(value) = HeaderValue::from_str(key.as_str())
        {
            headers.insert(IDEMPOTENCY_KEY_HEADER, value);
        }
        headers
    }
}

#[async_trait]
impl PolicyService for HttpPolicyService {
    async fn request_decision(&self, request: &DecisionRequest) -> Result<Decision, RemoteError> {
        let url = self.endpoint(&["api", "verify", "policy", request.policy_id.as_str()]);
        let response = self
            .client
            .post(url)
            .headers(self.build_headers(Some(request)))
            .json(request)
            .send()
            .await
            .map_err(classify_transport)?;
        let body = read_success_body(response).await?;
        decode_decision(&body)
    }
}

#[async_trait]
impl PassportDirectory for HttpPolicyService {
    async fn fetch_allowlist(
        &self,
        agent_id: &AgentId,
    ) -> Result<Option<AgentAllowlist>, RemoteError> {
        let url = self.endpoint(&["api", "verify", agent_id.as_str()]);
        let response = self
            .client
            .get(url)
            .headers(self.build_headers(None))
            .send()
            .await
            .map_err(classify_transport)?;
        let body = read_success_body(response).await?;
        decode_allowlist(&body)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// HTTP client construction failures.
#[derive(Debug, Error)]
pub enum HttpServiceError {
    /// Base URL is not a usable http(s) URL.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    /// API key cannot be carried in an HTTP header.
    #[error("invalid api key")]
    InvalidApiKey,
    /// The HTTP client could not be built.
    #[error("http client error: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Response Handling
// ============================================================================

/// Wire shape of the passport view, reduced to the MCP section.
#[derive(Deserialize)]
struct PassportView {
    /// MCP allowlist section.
    #[serde(default)]
    mcp: Option<PassportMcp>,
}

/// MCP allowlist section of a passport.
#[derive(Deserialize)]
struct PassportMcp {
    /// Allowed MCP servers.
    #[serde(default)]
    servers: Option<Vec<String>>,
    /// Allowed MCP tools.
    #[serde(default)]
    tools: Option<Vec<String>>,
}

/// Maps reqwest transport failures onto remote error kinds.
fn classify_transport(err: reqwest::Error) -> RemoteError {
    let is_timeout = err.is_timeout();
    let is_decode = err.is_decode();
    let message = err.without_url().to_string();
    if is_timeout {
        RemoteError::timeout(message)
    } else if is_decode {
        RemoteError::malformed(message)
    } else {
        RemoteError::unavailable(message)
    }
}

/// Returns the body of a 2xx response or the mapped status error.
async fn read_success_body(mut response: reqwest::Response) -> Result<Vec<u8>, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return read_body_limited(&mut response, MAX_RESPONSE_BYTES).await;
    }
    let headers = response.headers().clone();
    let body = read_body_limited(&mut response, MAX_ERROR_BODY_BYTES).await.unwrap_or_default();
    Err(status_error(status, &headers, &body))
}

/// Reads at most `max_bytes` of the body, rejecting larger or truncated ones.
async fn read_body_limited(
    response: &mut reqwest::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, RemoteError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| RemoteError::malformed("response size limit exceeds u64"))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(RemoteError::malformed("response body exceeds size limit"));
    }
    let mut buf = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(classify_transport)? {
        if buf.len().saturating_add(chunk.len()) > max_bytes {
            return Err(RemoteError::malformed("response body exceeds size limit"));
        }
        buf.extend_from_slice(&chunk);
    }
    if let Some(expected) = expected_len {
        let expected = usize::try_from(expected)
            .map_err(|_| RemoteError::malformed("invalid response length"))?;
        if buf.len() < expected {
            return Err(RemoteError::malformed("response body truncated"));
        }
    }
    Ok(buf)
}

/// Maps a non-success status onto a remote error.
fn status_error(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> RemoteError {
    match status {
        StatusCode::REQUEST_TIMEOUT => RemoteError::timeout("service reported request timeout"),
        StatusCode::TOO_MANY_REQUESTS => {
            RemoteError::rate_limited(retry_after_hint(headers, body), "service rate limited")
        }
        status if status.is_server_error() => {
            RemoteError::unavailable(format!("service returned status {}", status.as_u16()))
        }
        status => RemoteError::http(status.as_u16()),
    }
}

/// Extracts a retry-after hint from the header or the JSON body.
fn retry_after_hint(headers: &HeaderMap, body: &[u8]) -> Option<Duration> {
    let from_header = headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .and_then(seconds_to_duration);
    if from_header.is_some() {
        return from_header;
    }
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .get("retry_after")
        .or_else(|| value.get("retryAfter"))
        .and_then(Value::as_f64)
        .and_then(seconds_to_duration)
}

/// Converts a non-negative finite seconds value into a duration.
fn seconds_to_duration(seconds: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(seconds).ok()
}

/// Decodes a decision, accepting a bare object or a `{"decision": ...}` wrapper.
pub(crate) fn decode_decision(body: &[u8]) -> Result<Decision, RemoteError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| RemoteError::malformed(format!("invalid json: {err}")))?;
    let payload = match value {
        Value::Object(mut map) if map.get("decision").is_some_and(Value::is_object) => {
            map.remove("decision").unwrap_or(Value::Null)
        }
        other => other,
    };
    let decision: Decision = serde_json::from_value(payload)
        .map_err(|err| RemoteError::malformed(format!("invalid decision: {err}")))?;
    if decision.decision_id.is_blank() {
        return Err(RemoteError::malformed("decision_id must be non-empty"));
    }
    Ok(decision)
}

/// Decodes the MCP allowlist from a passport view, optionally wrapped.
pub(crate) fn decode_allowlist(body: &[u8]) -> Result<Option<AgentAllowlist>, RemoteError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| RemoteError::malformed(format!("invalid json: {err}")))?;
    let payload = match value {
        Value::Object(mut map) if map.get("passport").is_some_and(Value::is_object) => {
            map.remove("passport").unwrap_or(Value::Null)
        }
        other => other,
    };
    let view: PassportView = serde_json::from_value(payload)
        .map_err(|err| RemoteError::malformed(format!("invalid passport: {err}")))?;
    Ok(view.mcp.map(|mcp| AgentAllowlist {
        servers: mcp.servers,
        tools: mcp.tools,
    }))
}
