// crates/issue-monitor-log/src/lib.rs
// ============================================================================
// Module: File Discovery Log
// Description: Durable DiscoveryLog backend using a date-grouped text file.
// Purpose: Provide the human-readable discovery log for the Issue Monitor.
// Dependencies: issue-monitor-core, fs2, tempfile
// ============================================================================

//! ## Overview
//! This crate provides a file-backed [`DiscoveryLog`]. Entries live under
//! `## YYYY-MM-DD` headers in order of first use, each line carrying the
//! notification token shared with the identifier store. Appends never edit
//! existing lines, and writers in separate processes serialize on a sidecar
//! lock file.
//!
//! [`DiscoveryLog`]: issue_monitor_core::DiscoveryLog

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod format;
pub mod log;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use format::ParsedLog;
pub use format::parse_log;
pub use format::render_entry;
pub use format::render_header;
pub use log::FileDiscoveryLog;
pub use log::FileLogConfig;
pub use log::FileLogError;
pub use log::MAX_LOG_BYTES;
