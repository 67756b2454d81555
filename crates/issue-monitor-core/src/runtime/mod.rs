// crates/issue-monitor-core/src/runtime/mod.rs
// ============================================================================
// Module: Issue Monitor Runtime
// Description: Delta engine, batch writer, integrity reconciler, and run coordinator.
// Purpose: Execute monitoring passes against sources, stores, and discovery logs.
// Dependencies: crate::{core, interfaces}, tokio
// ============================================================================

//! ## Overview
//! Runtime modules implement one monitoring pass: the [`DeltaEngine`]
//! classifies candidates, the [`BatchWriter`] commits each new identifier as
//! a store write plus a log append, the [`IntegrityReconciler`] repairs
//! half-finished commits, and the [`RunCoordinator`] drives the whole pass.
//! In-memory backends, clocks, and audit sinks are provided for tests and
//! local demos.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod clock;
pub mod coordinator;
pub mod delta;
pub mod reconcile;
pub mod store;
pub mod writer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use clock::FixedClock;
pub use clock::SystemClock;
pub use coordinator::RunCoordinator;
pub use coordinator::RunCoordinatorConfig;
pub use coordinator::RunError;
pub use coordinator::ScheduledSource;
pub use delta::Delta;
pub use delta::DeltaEngine;
pub use reconcile::IntegrityReconciler;
pub use reconcile::ReconcileError;
pub use store::InMemoryDiscoveryLog;
pub use store::InMemoryIdentifierStore;
pub use store::InMemoryRunHistory;
pub use writer::BatchWriter;
pub use writer::CommitError;
pub use writer::CommitOutcome;
