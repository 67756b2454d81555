// crates/issue-monitor-core/src/lib.rs
// ============================================================================
// Module: Issue Monitor Core Library
// Description: Public API surface for the Issue Monitor core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Issue Monitor core provides incremental discovery and deduplication for
//! issues fetched from upstream trackers. It computes the delta between a
//! fresh candidate batch and the durable set of previously seen identifiers,
//! commits each new identifier exactly once, and appends it to a date-grouped
//! discovery log. It is backend-agnostic and integrates through explicit
//! interfaces for stores, logs, sources, clocks, and audit sinks.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::DiscoveryLog;
pub use interfaces::FetchBatch;
pub use interfaces::IdentifierStore;
pub use interfaces::LogError;
pub use interfaces::RunAuditSink;
pub use interfaces::RunClock;
pub use interfaces::RunHistory;
pub use interfaces::SourceAdapter;
pub use interfaces::SourceError;
pub use interfaces::SourceWarning;
pub use interfaces::StoreError;
pub use runtime::BatchWriter;
pub use runtime::CommitError;
pub use runtime::CommitOutcome;
pub use runtime::Delta;
pub use runtime::DeltaEngine;
pub use runtime::FileAuditSink;
pub use runtime::FixedClock;
pub use runtime::InMemoryDiscoveryLog;
pub use runtime::InMemoryIdentifierStore;
pub use runtime::InMemoryRunHistory;
pub use runtime::IntegrityReconciler;
pub use runtime::MemoryAuditSink;
pub use runtime::NoopAuditSink;
pub use runtime::ReconcileError;
pub use runtime::RunCoordinator;
pub use runtime::RunCoordinatorConfig;
pub use runtime::RunError;
pub use runtime::ScheduledSource;
pub use runtime::StderrAuditSink;
pub use runtime::SystemClock;
