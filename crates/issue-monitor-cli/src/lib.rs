// crates/issue-monitor-cli/src/lib.rs
// ============================================================================
// Module: Issue Monitor CLI Library
// Description: Wiring of configuration into stores, sources, and runs.
// Purpose: Keep command behavior testable without spawning the binary.
// Dependencies: issue-monitor-config, issue-monitor-core, issue-monitor-log
// ============================================================================

//! ## Overview
//! The binary parses arguments and renders output; everything between a
//! loaded configuration and a finished command lives in [`app`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod app;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use app::AppError;
pub use app::MonitorApp;
pub use app::aborted_run_record;
pub use app::build_audit_sink;
pub use app::build_sources;
pub use app::run_pass;
