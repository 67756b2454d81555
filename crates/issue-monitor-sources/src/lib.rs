// crates/issue-monitor-sources/src/lib.rs
// ============================================================================
// Module: Issue Monitor Sources
// Description: Built-in source adapters and the adapter registry.
// Purpose: Fetch candidate issues from upstream trackers with strict limits.
// Dependencies: issue-monitor-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! This crate ships the built-in [`SourceAdapter`] implementations: a GitHub
//! issues adapter over the REST API and a JSON file adapter for offline use.
//! Adapters are read-only, return malformed entries as per-candidate
//! warnings, and fail closed with [`SourceError::Unavailable`] on transport or
//! size-limit failures.
//!
//! [`SourceAdapter`]: issue_monitor_core::SourceAdapter
//! [`SourceError::Unavailable`]: issue_monitor_core::SourceError::Unavailable

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod file;
pub mod github;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use file::FileSource;
pub use file::FileSourceConfig;
pub use file::parse_candidate_file;
pub use github::GITHUB_API_BASE;
pub use github::GithubIssuesSource;
pub use github::GithubSourceConfig;
pub use github::IssueState;
pub use github::parse_issue_page;
pub use registry::SourceDefinition;
pub use registry::SourceSetupError;
pub use registry::build_source;
