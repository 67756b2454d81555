// crates/issue-monitor-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Identifier Store
// Description: Durable IdentifierStore and RunHistory backends using SQLite WAL.
// Purpose: Provide production-grade persistence for the Issue Monitor.
// Dependencies: issue-monitor-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`IdentifierStore`] whose atomic
//! insert-if-absent is the single mutual-exclusion point for deduplication,
//! plus a [`RunHistory`] that persists hashed canonical run records.
//! Database contents are treated as untrusted and loads fail closed.
//!
//! [`IdentifierStore`]: issue_monitor_core::IdentifierStore
//! [`RunHistory`]: issue_monitor_core::RunHistory

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_RUN_RECORD_BYTES;
pub use store::SqliteIdentifierStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
