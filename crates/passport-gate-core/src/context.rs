// crates/passport-gate-core/src/context.rs
// ============================================================================
// Module: Action Context
// Description: Open field map describing a proposed side-effecting action.
// Purpose: Typed accessors for known fields with a generic JSON fallback.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An [`ActionContext`] is an open mapping from field name to JSON value.
//! Unknown fields pass through untouched for forward compatibility; the
//! fields the gateway itself inspects have typed accessors and are checked by
//! [`ActionContext::validate_known_fields`] before any remote call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::mcp::McpContext;
use crate::mcp::McpValue;
use crate::mcp::RawMcpFields;

// ============================================================================
// SECTION: Field Names
// ============================================================================

/// Well-known context field names.
pub mod fields {
    /// Amount in minor currency units.
    pub const AMOUNT: &str = "amount";
    /// Alternate spelling of the amount field.
    pub const AMOUNT_MINOR: &str = "amount_minor";
    /// ISO 4217 currency code.
    pub const CURRENCY: &str = "currency";
    /// Customer identifier.
    pub const CUSTOMER_ID: &str = "customer_id";
    /// Order identifier.
    pub const ORDER_ID: &str = "order_id";
    /// Region or country code.
    pub const REGION: &str = "region";
    /// Table name for data exports.
    pub const TABLE_NAME: &str = "table_name";
    /// Row limit for data exports.
    pub const ROW_LIMIT: &str = "row_limit";
    /// Whether an export includes PII.
    pub const INCLUDE_PII: &str = "include_pii";
    /// Plural MCP servers field.
    pub const MCP_SERVERS: &str = "mcp_servers";
    /// Legacy singular MCP server field.
    pub const MCP_SERVER: &str = "mcp_server";
    /// Plural MCP tools field.
    pub const MCP_TOOLS: &str = "mcp_tools";
    /// Legacy singular MCP tool field.
    pub const MCP_TOOL: &str = "mcp_tool";
    /// MCP session field.
    pub const MCP_SESSION: &str = "mcp_session";
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Known-field validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// Field has the wrong JSON type.
    #[error("context field {field} must be {expected}")]
    WrongType {
        /// Field name.
        field: &'static str,
        /// Expected type description.
        expected: &'static str,
    },
    /// Field has the right type but an unacceptable value.
    #[error("context field {field} is invalid: {detail}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Failure detail.
        detail: String,
    },
}

// ============================================================================
// SECTION: Action Context
// ============================================================================

/// Field map describing a proposed action.
///
/// # Invariants
/// - Keys are kept sorted so serialization is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionContext(BTreeMap<String, Value>);

impl ActionContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, returning the context for chaining.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Inserts or replaces a field.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Removes a field, returning its previous value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Returns the raw value for any field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Iterates over all fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no fields are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the amount in minor units from `amount` or `amount_minor`.
    #[must_use]
    pub fn amount(&self) -> Option<i64> {
        self.get(fields::AMOUNT).or_else(|| self.get(fields::AMOUNT_MINOR)).and_then(Value::as_i64)
    }

    /// Returns the currency code.
    #[must_use]
    pub fn currency(&self) -> Option<&str> {
        self.str_field(fields::CURRENCY)
    }

    /// Returns the customer identifier.
    #[must_use]
    pub fn customer_id(&self) -> Option<&str> {
        self.str_field(fields::CUSTOMER_ID)
    }

    /// Returns the order identifier.
    #[must_use]
    pub fn order_id(&self) -> Option<&str> {
        self.str_field(fields::ORDER_ID)
    }

    /// Returns the region code.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.str_field(fields::REGION)
    }

    /// Returns the export table name.
    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        self.str_field(fields::TABLE_NAME)
    }

    /// Returns the export row limit.
    #[must_use]
    pub fn row_limit(&self) -> Option<u64> {
        self.get(fields::ROW_LIMIT).and_then(Value::as_u64)
    }

    /// Returns whether the export includes PII.
    #[must_use]
    pub fn include_pii(&self) -> Option<bool> {
        self.get(fields::INCLUDE_PII).and_then(Value::as_bool)
    }

    /// Collects the MCP fields in whatever shape the caller used.
    #[must_use]
    pub fn raw_mcp_fields(&self) -> RawMcpFields {
        let value = |field: &str| self.get(field).and_then(McpValue::from_json);
        RawMcpFields {
            servers: value(fields::MCP_SERVERS),
            server: value(fields::MCP_SERVER),
            tools: value(fields::MCP_TOOLS),
            tool: value(fields::MCP_TOOL),
            session: self.str_field(fields::MCP_SESSION).map(str::to_string),
        }
    }

    /// Returns the normalized MCP context claimed by this action.
    #[must_use]
    pub fn mcp_context(&self) -> McpContext {
        McpContext::normalize(&self.raw_mcp_fields())
    }

    /// Rewrites the MCP fields in canonical form.
    ///
    /// Plural fields carry arrays; singular fields carry the first entry for
    /// callers that predate multi-value support. Empty dimensions are removed.
    pub fn apply_mcp(&mut self, mcp: &McpContext) {
        for field in [
            fields::MCP_SERVERS,
            fields::MCP_SERVER,
            fields::MCP_TOOLS,
            fields::MCP_TOOL,
            fields::MCP_SESSION,
        ] {
            self.0.remove(field);
        }
        if let Some(first) = mcp.server() {
            self.insert(fields::MCP_SERVER, first);
            self.insert(fields::MCP_SERVERS, mcp.servers.clone());
        }
        if let Some(first) = mcp.tool() {
            self.insert(fields::MCP_TOOL, first);
            self.insert(fields::MCP_TOOLS, mcp.tools.clone());
        }
        if let Some(session) = &mcp.session {
            self.insert(fields::MCP_SESSION, session.clone());
        }
    }

    /// Validates the types and shapes of fields the gateway understands.
    ///
    /// Absent fields are accepted; whether a field is required is the remote
    /// policy's call.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] for the first known field that is malformed.
    pub fn validate_known_fields(&self) -> Result<(), ContextError> {
        for field in [fields::AMOUNT, fields::AMOUNT_MINOR] {
            if let Some(value) = self.get(field) {
                let amount = value.as_i64().ok_or(ContextError::WrongType {
                    field,
                    expected: "an integer amount in minor units",
                })?;
                if amount < 0 {
                    return Err(ContextError::InvalidValue {
                        field,
                        detail: "amount must not be negative".to_string(),
                    });
                }
            }
        }
        if let Some(value) = self.get(fields::CURRENCY) {
            let currency = value.as_str().ok_or(ContextError::WrongType {
                field: fields::CURRENCY,
                expected: "a string",
            })?;
            if currency.len() != 3 || !currency.bytes().all(|byte| byte.is_ascii_uppercase()) {
                return Err(ContextError::InvalidValue {
                    field: fields::CURRENCY,
                    detail: format!("{currency:?} is not an ISO 4217 code"),
                });
            }
        }
        if let Some(value) = self.get(fields::ROW_LIMIT)
            && value.as_u64().is_none()
        {
            return Err(ContextError::WrongType {
                field: fields::ROW_LIMIT,
                expected: "a non-negative integer",
            });
        }
        if let Some(value) = self.get(fields::INCLUDE_PII)
            && !value.is_boolean()
        {
            return Err(ContextError::WrongType {
                field: fields::INCLUDE_PII,
                expected: "a boolean",
            });
        }
        for field in [fields::MCP_SERVERS, fields::MCP_SERVER, fields::MCP_TOOLS, fields::MCP_TOOL] {
            if let Some(value) = self.get(field)
                && !is_string_or_string_array(value)
            {
                return Err(ContextError::WrongType {
                    field,
                    expected: "a string or an array of strings",
                });
            }
        }
        if let Some(value) = self.get(fields::MCP_SESSION)
            && !value.is_string()
        {
            return Err(ContextError::WrongType {
                field: fields::MCP_SESSION,
                expected: "a string",
            });
        }
        Ok(())
    }

    /// Returns a string field.
    fn str_field(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }
}

impl FromIterator<(String, Value)> for ActionContext {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Returns true for a string or an array whose elements are all strings.
fn is_string_or_string_array(value: &Value) -> bool {
    match value {
        Value::String(_) => true,
        Value::Array(items) => items.iter().all(Value::is_string),
        _ => false,
    }
}
