// crates/issue-monitor-core/src/interfaces/mod.rs
// ============================================================================
// Module: Issue Monitor Interfaces
// Description: Backend-agnostic interfaces for stores, logs, sources, and clocks.
// Purpose: Define the contract surfaces used by the Issue Monitor runtime.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how Issue Monitor integrates with durable storage,
//! upstream trackers, and the host clock without embedding backend-specific
//! details. The identifier store's atomic [`IdentifierStore::record`] is the
//! only mutual-exclusion point the runtime relies on for deduplication.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::AuditEvent;
use crate::core::CandidateIssue;
use crate::core::DateGroup;
use crate::core::DiscoveryDate;
use crate::core::IssueIdentifier;
use crate::core::LogEntry;
use crate::core::NewSeenRecord;
use crate::core::NotificationToken;
use crate::core::RunRecord;
use crate::core::SeenRecord;
use crate::core::SourceId;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Identifier Store
// ============================================================================

/// Identifier store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - [`StoreError::AlreadyExists`] is the expected race outcome of
///   [`IdentifierStore::record`]; every other variant means the store is
///   unavailable for the rest of the run.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Identifier was already recorded.
    #[error("identifier already recorded: {0}")]
    AlreadyExists(IssueIdentifier),
    /// Identifier was not found.
    #[error("identifier not found: {0}")]
    NotFound(IssueIdentifier),
    /// Identifier's derived token is already held by another identifier.
    #[error("notification token {token} for {identifier} is already assigned")]
    TokenCollision {
        /// Identifier that could not be recorded.
        identifier: IssueIdentifier,
        /// Token held by the earlier identifier.
        token: NotificationToken,
    },
    /// Store I/O error.
    #[error("identifier store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("identifier store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("identifier store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("identifier store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("identifier store error: {0}")]
    Store(String),
}

/// Durable set of previously seen identifiers.
pub trait IdentifierStore: Send + Sync {
    /// Returns true when the identifier has a committed seen record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn contains(&self, identifier: &IssueIdentifier) -> Result<bool, StoreError>;

    /// Registers a new identifier and returns its notification token.
    ///
    /// # Invariants
    /// - Atomic per identifier: of any number of concurrent calls for one
    ///   identifier, exactly one returns a token.
    /// - A token is never held by two identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] when the identifier is present,
    /// [`StoreError::TokenCollision`] when another identifier holds the same
    /// token, or another [`StoreError`] when the write fails.
    fn record(&self, record: &NewSeenRecord) -> Result<NotificationToken, StoreError>;

    /// Marks an identifier's log entry as durable. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the identifier is unknown, or
    /// another [`StoreError`] when the write fails.
    fn mark_logged(&self, identifier: &IssueIdentifier) -> Result<(), StoreError>;

    /// Returns seen records whose log entry is not yet confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn pending(&self) -> Result<Vec<SeenRecord>, StoreError>;

    /// Exports seen records, optionally restricted to one source, ordered by
    /// first-seen date then identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn records(&self, source: Option<&SourceId>) -> Result<Vec<SeenRecord>, StoreError>;

    /// Reports store readiness.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Run History
// ============================================================================

/// Persistent history of completed run records.
pub trait RunHistory: Send + Sync {
    /// Returns the run number for the next run (count of saved runs).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the history cannot be read.
    fn next_run_number(&self) -> Result<u64, StoreError>;

    /// Persists a run record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the record cannot be saved.
    fn save_run(&self, record: &RunRecord) -> Result<(), StoreError>;

    /// Loads the most recently saved run record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the history cannot be read or fails integrity checks.
    fn latest_run(&self) -> Result<Option<RunRecord>, StoreError>;
}

// ============================================================================
// SECTION: Discovery Log
// ============================================================================

/// Discovery log errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum LogError {
    /// Log I/O error.
    #[error("discovery log io error: {0}")]
    Io(String),
    /// Log contents could not be parsed.
    #[error("discovery log corruption: {0}")]
    Corrupt(String),
    /// Entry cannot be represented in the log.
    #[error("discovery log invalid entry: {0}")]
    Invalid(String),
    /// Log reported an error.
    #[error("discovery log error: {0}")]
    Log(String),
}

/// Append-only, date-grouped discovery log.
pub trait DiscoveryLog: Send + Sync {
    /// Appends an entry to its date group and returns whether it was written.
    ///
    /// # Invariants
    /// - A missing date group is created after every existing group.
    /// - Appending a token already present is a no-op returning `false`.
    /// - Existing entries are never edited.
    ///
    /// # Errors
    ///
    /// Returns [`LogError`] when the append is not durable.
    fn append(&self, entry: &LogEntry) -> Result<bool, LogError>;

    /// Returns every date group in log order.
    ///
    /// # Errors
    ///
    /// Returns [`LogError`] when the log cannot be read.
    fn groups(&self) -> Result<Vec<DateGroup>, LogError>;

    /// Returns true when an entry with the token exists.
    ///
    /// # Errors
    ///
    /// Returns [`LogError`] when the log cannot be read.
    fn contains_token(&self, token: &NotificationToken) -> Result<bool, LogError> {
        Ok(self
            .groups()?
            .iter()
            .flat_map(|group| group.entries.iter())
            .any(|entry| entry.token == *token))
    }

    /// Reports log readiness.
    ///
    /// # Errors
    ///
    /// Returns [`LogError`] when the log is unavailable.
    fn readiness(&self) -> Result<(), LogError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Source Adapters
// ============================================================================

/// Source adapter errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Source could not be reached or returned an unusable response.
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Per-candidate warning reported alongside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceWarning {
    /// Upstream identifier when it could be read.
    pub external_id: Option<String>,
    /// Reason the candidate was skipped.
    pub detail: String,
}

impl SourceWarning {
    /// Creates a warning for a malformed candidate.
    #[must_use]
    pub fn malformed(external_id: Option<String>, detail: impl Into<String>) -> Self {
        Self {
            external_id,
            detail: detail.into(),
        }
    }
}

/// Candidate batch returned by one fetch.
///
/// # Invariants
/// - A batch with warnings is a partial success scoped to its source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchBatch {
    /// Parsed candidates in source order.
    pub candidates: Vec<CandidateIssue>,
    /// Candidates skipped as malformed.
    pub warnings: Vec<SourceWarning>,
}

/// Upstream issue source.
pub trait SourceAdapter: Send + Sync {
    /// Returns the source identifier this adapter serves.
    fn source_id(&self) -> &SourceId;

    /// Fetches the current candidate batch.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unavailable`] when the source cannot be fetched.
    fn fetch(&self) -> Result<FetchBatch, SourceError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Injectable source of run dates and observation timestamps.
pub trait RunClock: Send + Sync {
    /// Returns the discovery date for a run starting now.
    fn today(&self) -> DiscoveryDate;

    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink for run events.
pub trait RunAuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &AuditEvent);
}
