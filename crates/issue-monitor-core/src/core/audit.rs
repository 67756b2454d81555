// crates/issue-monitor-core/src/core/audit.rs
// ============================================================================
// Module: Issue Monitor Audit Events
// Description: Structured audit event payloads emitted during runs.
// Purpose: Describe run activity as JSON-serializable records for audit sinks.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Audit events are JSON-line records describing what a run did: which
//! sources were fetched, skipped, or failed, which identifiers were
//! committed, and what the integrity reconciler repaired. Sinks live in
//! [`crate::runtime::audit`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::identifiers::ExternalId;
use crate::core::identifiers::NotificationToken;
use crate::core::identifiers::SourceId;
use crate::core::run::IntegrityIssueKind;
use crate::core::run::ReconcileMode;
use crate::core::run::RunStatus;
use crate::core::time::DiscoveryDate;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Run number when the event belongs to a run.
    pub run_number: Option<u64>,
    /// Event-specific payload.
    #[serde(flatten)]
    pub kind: AuditEventKind,
}

/// Event-specific audit payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEventKind {
    /// A run began.
    RunStarted {
        /// Discovery date of the run.
        run_date: DiscoveryDate,
    },
    /// An integrity reconciliation pass finished.
    IntegrityChecked {
        /// Reconciliation scope.
        mode: ReconcileMode,
        /// Seen records examined.
        records_checked: usize,
        /// Inconsistencies repaired.
        repaired: usize,
        /// Inconsistencies left for manual review.
        warnings: usize,
    },
    /// A source returned a batch.
    SourceFetched {
        /// Source identifier.
        source: SourceId,
        /// Candidates accepted.
        candidates: usize,
        /// Candidates skipped as malformed.
        malformed: usize,
    },
    /// A source fetch failed or timed out.
    SourceFailed {
        /// Source identifier.
        source: SourceId,
        /// Failure message.
        error: String,
    },
    /// A source was not due this run.
    SourceSkipped {
        /// Source identifier.
        source: SourceId,
        /// Configured cadence.
        every_n_runs: u32,
    },
    /// A candidate was skipped as malformed.
    CandidateMalformed {
        /// Source identifier.
        source: SourceId,
        /// Reason the candidate was rejected.
        detail: String,
    },
    /// An identifier was committed and appended.
    IssueCommitted {
        /// Source identifier.
        source: SourceId,
        /// Upstream identifier.
        external_id: ExternalId,
        /// Assigned notification token.
        token: NotificationToken,
        /// Date group appended to.
        date: DiscoveryDate,
    },
    /// A concurrent writer claimed the identifier first.
    IssueAlreadyClaimed {
        /// Source identifier.
        source: SourceId,
        /// Upstream identifier.
        external_id: ExternalId,
    },
    /// The reconciler repaired an inconsistency.
    IntegrityRepaired {
        /// Token involved.
        token: NotificationToken,
        /// Repair performed.
        kind: IntegrityIssueKind,
    },
    /// The reconciler found an inconsistency it will not repair.
    IntegrityWarning {
        /// Token involved.
        token: NotificationToken,
        /// Inconsistency kind.
        kind: IntegrityIssueKind,
        /// Reason the inconsistency was left in place.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    /// A run reached a terminal status.
    RunFinished {
        /// Terminal status.
        status: RunStatus,
        /// Identifiers newly committed.
        new: usize,
        /// Candidates already seen.
        known: usize,
        /// Sources that failed to fetch.
        sources_failed: usize,
    },
}

impl AuditEventKind {
    /// Returns the stable event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::IntegrityChecked { .. } => "integrity_checked",
            Self::SourceFetched { .. } => "source_fetched",
            Self::SourceFailed { .. } => "source_failed",
            Self::SourceSkipped { .. } => "source_skipped",
            Self::CandidateMalformed { .. } => "candidate_malformed",
            Self::IssueCommitted { .. } => "issue_committed",
            Self::IssueAlreadyClaimed { .. } => "issue_already_claimed",
            Self::IntegrityRepaired { .. } => "integrity_repaired",
            Self::IntegrityWarning { .. } => "integrity_warning",
            Self::RunFinished { .. } => "run_finished",
        }
    }
}

impl AuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(run_number: Option<u64>, kind: AuditEventKind) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            timestamp_ms,
            run_number,
            kind,
        }
    }
}
