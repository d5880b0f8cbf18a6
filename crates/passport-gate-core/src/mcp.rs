// crates/passport-gate-core/src/mcp.rs
// ============================================================================
// Module: MCP Context Normalizer
// Description: Canonicalizes MCP server/tool identifiers from mixed inputs.
// Purpose: Make single, comma-list, and array inputs compare identically.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Callers describe MCP usage as a single value, a comma-separated string, or
//! an array, under plural (`servers`, `tools`) or legacy singular (`server`,
//! `tool`) names. [`McpContext::normalize`] folds every shape into one
//! canonical, order-preserving, deduplicated form. Normalization never fails;
//! missing fields simply yield empty sequences.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Header Names
// ============================================================================

/// Plural MCP servers header.
pub const HEADER_MCP_SERVERS: &str = "x-mcp-servers";
/// Legacy single MCP server header.
pub const HEADER_MCP_SERVER: &str = "x-mcp-server";
/// Plural MCP tools header.
pub const HEADER_MCP_TOOLS: &str = "x-mcp-tools";
/// Legacy single MCP tool header.
pub const HEADER_MCP_TOOL: &str = "x-mcp-tool";
/// MCP session header.
pub const HEADER_MCP_SESSION: &str = "x-mcp-session";

// ============================================================================
// SECTION: Raw Inputs
// ============================================================================

/// Raw MCP field value before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpValue {
    /// A single string, possibly comma-separated or a JSON array literal.
    Single(String),
    /// An explicit array of entries.
    List(Vec<String>),
}

impl McpValue {
    /// Interprets a JSON value as an MCP field.
    ///
    /// Strings become [`McpValue::Single`]; arrays keep their string
    /// elements. Any other JSON shape carries no MCP information.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::Single(text.clone())),
            Value::Array(items) => Some(Self::List(
                items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            )),
            _ => None,
        }
    }

    /// Returns the normalized entries for this value.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        match self {
            Self::List(items) => canonical_entries(items.iter().map(String::as_str)),
            Self::Single(text) => match parse_array_literal(text) {
                Some(items) => canonical_entries(items.iter().map(String::as_str)),
                None => canonical_entries(text.split(',')),
            },
        }
    }
}

/// MCP fields as supplied by the caller, in any accepted shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMcpFields {
    /// Plural servers field.
    pub servers: Option<McpValue>,
    /// Legacy singular server field.
    pub server: Option<McpValue>,
    /// Plural tools field.
    pub tools: Option<McpValue>,
    /// Legacy singular tool field.
    pub tool: Option<McpValue>,
    /// Optional MCP session identifier.
    pub session: Option<String>,
}

// ============================================================================
// SECTION: Canonical Context
// ============================================================================

/// Canonical MCP usage claimed by an action.
///
/// # Invariants
/// - Every entry is non-empty and has no surrounding whitespace.
/// - Entries are unique (case-sensitive) and keep first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpContext {
    /// MCP servers in use.
    pub servers: Vec<String>,
    /// MCP tools in use.
    pub tools: Vec<String>,
    /// MCP session identifier, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl McpContext {
    /// Normalizes raw fields into the canonical context.
    ///
    /// The plural field wins whenever it yields at least one entry; the
    /// singular field is only consulted as a fallback.
    #[must_use]
    pub fn normalize(raw: &RawMcpFields) -> Self {
        Self {
            servers: pick_dimension(raw.servers.as_ref(), raw.server.as_ref()),
            tools: pick_dimension(raw.tools.as_ref(), raw.tool.as_ref()),
            session: raw
                .session
                .as_deref()
                .map(str::trim)
                .filter(|session| !session.is_empty())
                .map(str::to_string),
        }
    }

    /// Extracts and normalizes MCP headers; header names match case-insensitively.
    #[must_use]
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut raw = RawMcpFields::default();
        for (name, value) in headers {
            let single = || Some(McpValue::Single(value.to_string()));
            match name.to_ascii_lowercase().as_str() {
                HEADER_MCP_SERVERS => raw.servers = single(),
                HEADER_MCP_SERVER => raw.server = single(),
                HEADER_MCP_TOOLS => raw.tools = single(),
                HEADER_MCP_TOOL => raw.tool = single(),
                HEADER_MCP_SESSION => raw.session = Some(value.to_string()),
                _ => {}
            }
        }
        Self::normalize(&raw)
    }

    /// Returns the first server for callers that only understand one.
    #[must_use]
    pub fn server(&self) -> Option<&str> {
        self.servers.first().map(String::as_str)
    }

    /// Returns the first tool for callers that only understand one.
    #[must_use]
    pub fn tool(&self) -> Option<&str> {
        self.tools.first().map(String::as_str)
    }

    /// Returns true when no MCP usage is claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty() && self.tools.is_empty()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Chooses the plural entries when present, otherwise the singular ones.
fn pick_dimension(plural: Option<&McpValue>, singular: Option<&McpValue>) -> Vec<String> {
    let entries = plural.map(McpValue::entries).unwrap_or_default();
    if entries.is_empty() { singular.map(McpValue::entries).unwrap_or_default() } else { entries }
}

/// Parses a JSON array-of-strings literal such as `["a", "b"]`.
fn parse_array_literal(text: &str) -> Option<Vec<String>> {
    let trimmed = text.trim();
    if !trimmed.starts_with('[') {
        return None;
    }
    serde_json::from_str::<Vec<String>>(trimmed).ok()
}

/// Trims, drops empties, and deduplicates while keeping first occurrences.
fn canonical_entries<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items.map(str::trim).filter(|item| !item.is_empty()) {
        if seen.insert(item) {
            out.push(item.to_string());
        }
    }
    out
}
