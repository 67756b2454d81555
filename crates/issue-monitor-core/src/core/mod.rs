// crates/issue-monitor-core/src/core/mod.rs
// ============================================================================
// Module: Issue Monitor Core Types
// Description: Canonical identifiers, issue records, and run summaries.
// Purpose: Provide stable, serializable types shared by every Issue Monitor crate.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Core types describe what the monitor knows about an upstream issue at each
//! stage of its life: a fetched [`CandidateIssue`], a [`DiscoveredIssue`] the
//! delta engine classified as new, the durable [`SeenRecord`], and the
//! immutable [`LogEntry`] visible in the discovery log. Run summaries live in
//! [`run`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod hashing;
pub mod identifiers;
pub mod issue;
pub mod run;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEvent;
pub use audit::AuditEventKind;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use identifiers::ExternalId;
pub use identifiers::IssueIdentifier;
pub use identifiers::IssueReference;
pub use identifiers::NotificationToken;
pub use identifiers::REFERENCE_SEPARATOR;
pub use identifiers::SourceId;
pub use issue::CandidateIssue;
pub use issue::DateGroup;
pub use issue::DiscoveredIssue;
pub use issue::LogEntry;
pub use issue::NewSeenRecord;
pub use issue::SeenRecord;
pub use run::IntegrityIssue;
pub use run::IntegrityIssueKind;
pub use run::IntegrityReport;
pub use run::PhaseTransition;
pub use run::ReconcileMode;
pub use run::RunPhase;
pub use run::RunRecord;
pub use run::RunStatus;
pub use run::RunTotals;
pub use run::SourceOutcome;
pub use run::SourceReport;
pub use time::DiscoveryDate;
pub use time::Timestamp;
