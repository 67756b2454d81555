// crates/issue-monitor-config/src/lib.rs
// ============================================================================
// Module: Issue Monitor Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for issue-monitor.toml semantics.
// Dependencies: issue-monitor-core, issue-monitor-sources, serde, toml
// ============================================================================

//! ## Overview
//! `issue-monitor-config` defines the configuration model for the issue
//! monitor: identifier store, discovery log, run limits, audit sink, and the
//! ordered list of upstream sources. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
