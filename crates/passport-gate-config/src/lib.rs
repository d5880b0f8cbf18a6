// crates/passport-gate-config/src/lib.rs
// ============================================================================
// Module: Passport Gate Config Library
// Description: Canonical config model, validation, and environment overrides.
// Purpose: Single source of truth for passport-gate.toml semantics.
// Dependencies: passport-gate-core, serde, toml, url
// ============================================================================

//! ## Overview
//! `passport-gate-config` defines the configuration model for the action
//! authorization gateway. It provides strict, fail-closed validation,
//! `PASSPORT_GATE_*` environment overrides, and the built-in tool routing
//! table.
//!
//! Security posture: config inputs are untrusted and the API key is redacted
//! from debug output.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;
pub mod examples;
pub mod policies;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::EnvOverrides;
pub use examples::config_toml_example;
pub use policies::DEFAULT_TOOL_POLICIES;
pub use policies::normalize_tool_name;
