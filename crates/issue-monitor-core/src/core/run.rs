// crates/issue-monitor-core/src/core/run.rs
// ============================================================================
// Module: Issue Monitor Run Records
// Description: Run phases, per-source reports, integrity reports, and run summaries.
// Purpose: Describe the outcome of one monitoring pass in a serializable form.
// Dependencies: serde, crate::core::{identifiers, issue, time}
// ============================================================================

//! ## Overview
//! A [`RunRecord`] is produced by every pass, including aborted ones. It
//! carries one [`SourceReport`] per configured source, aggregate
//! [`RunTotals`], and the [`IntegrityReport`] from the startup reconciliation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::IssueIdentifier;
use crate::core::identifiers::NotificationToken;
use crate::core::identifiers::SourceId;
use crate::core::issue::LogEntry;
use crate::core::time::DiscoveryDate;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Run Lifecycle
// ============================================================================

/// Phase of the run state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// No pass in progress.
    Idle,
    /// Source adapters are being invoked.
    FetchingSources,
    /// Deltas are being computed and committed.
    Reconciling,
    /// The run record is being assembled.
    Reporting,
}

/// Timestamped entry into a run phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    /// Phase entered.
    pub phase: RunPhase,
    /// Time the phase was entered.
    pub at: Timestamp,
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Reconciliation ran for every fetched source; warnings may be present.
    Completed,
    /// At least one source was attempted and none fetched.
    Failed,
    /// The identifier store or discovery log was unavailable.
    Aborted,
}

impl RunStatus {
    /// Returns true when the run completed.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Completed)
    }
}

// ============================================================================
// SECTION: Source Reports
// ============================================================================

/// Outcome of one source within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOutcome {
    /// Batch fetched and reconciled.
    Fetched,
    /// Fetch failed or timed out; retried on a later run.
    Unavailable,
    /// Not due this run under its cadence.
    Skipped,
    /// Not reached because the run aborted first.
    NotAttempted,
}

/// Per-source summary within a run record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    /// Source identifier.
    pub source: SourceId,
    /// Source outcome.
    pub outcome: SourceOutcome,
    /// Failure message for unavailable sources.
    pub error: Option<String>,
    /// Candidates accepted from the fetch.
    pub fetched: usize,
    /// Identifiers newly committed by this run.
    pub new: usize,
    /// Candidates already present in the identifier store.
    pub known: usize,
    /// Identifiers claimed by a concurrent writer during commit.
    pub already_claimed: usize,
    /// Candidates skipped as malformed.
    pub malformed: usize,
    /// Human-readable warnings.
    pub warnings: Vec<String>,
    /// Log entries committed for this source, in append order.
    pub entries: Vec<LogEntry>,
}

impl SourceReport {
    /// Creates an empty report with the given outcome.
    #[must_use]
    pub const fn new(source: SourceId, outcome: SourceOutcome) -> Self {
        Self {
            source,
            outcome,
            error: None,
            fetched: 0,
            new: 0,
            known: 0,
            already_claimed: 0,
            malformed: 0,
            warnings: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Creates a report for a source whose fetch failed.
    #[must_use]
    pub fn unavailable(source: SourceId, error: impl Into<String>) -> Self {
        let mut report = Self::new(source, SourceOutcome::Unavailable);
        report.error = Some(error.into());
        report
    }

    /// Returns true when the source was attempted this run.
    #[must_use]
    pub const fn attempted(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Fetched | SourceOutcome::Unavailable)
    }
}

/// Aggregate counters across all sources of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    /// Sources attempted.
    pub sources_attempted: usize,
    /// Sources that failed to fetch.
    pub sources_failed: usize,
    /// Sources skipped by cadence.
    pub sources_skipped: usize,
    /// Identifiers newly committed.
    pub new: usize,
    /// Candidates already seen.
    pub known: usize,
    /// Identifiers lost to concurrent writers.
    pub already_claimed: usize,
    /// Candidates skipped as malformed.
    pub malformed: usize,
    /// Warnings across sources.
    pub warnings: usize,
}

impl RunTotals {
    /// Aggregates totals from per-source reports.
    #[must_use]
    pub fn from_reports(reports: &[SourceReport]) -> Self {
        reports.iter().fold(Self::default(), |mut totals, report| {
            if report.attempted() {
                totals.sources_attempted += 1;
            }
            match report.outcome {
                SourceOutcome::Unavailable => totals.sources_failed += 1,
                SourceOutcome::Skipped => totals.sources_skipped += 1,
                SourceOutcome::Fetched | SourceOutcome::NotAttempted => {}
            }
            totals.new += report.new;
            totals.known += report.known;
            totals.already_claimed += report.already_claimed;
            totals.malformed += report.malformed;
            totals.warnings += report.warnings.len();
            totals
        })
    }
}

// ============================================================================
// SECTION: Integrity Reports
// ============================================================================

/// Scope of an integrity reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    /// Checks only pending seen records.
    Pending,
    /// Checks every seen record and every log entry.
    Full,
}

/// Kind of inconsistency found by the integrity reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityIssueKind {
    /// Pending record whose entry was already in the log; marked logged.
    MarkedLogged,
    /// Seen record without a log entry; re-appended with its stored token.
    Reappended,
    /// Log entry whose token matches no seen record; requires manual review.
    UnknownLogEntry,
    /// Seen record whose entry the log refuses; left pending for manual review.
    Unrepairable,
    /// New identifier whose token another identifier already holds; not
    /// recorded and reported on every run until resolved by hand.
    TokenCollision,
}

impl IntegrityIssueKind {
    /// Returns true when the issue was repaired automatically.
    #[must_use]
    pub const fn is_repaired(self) -> bool {
        matches!(self, Self::MarkedLogged | Self::Reappended)
    }
}

/// One inconsistency found by the integrity reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityIssue {
    /// Issue kind.
    pub kind: IntegrityIssueKind,
    /// Token involved.
    pub token: NotificationToken,
    /// Identifier involved, when a seen record exists.
    pub identifier: Option<IssueIdentifier>,
    /// Date group involved.
    pub date: DiscoveryDate,
    /// Reason the issue could not be repaired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Result of one integrity reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Reconciliation scope.
    pub mode: ReconcileMode,
    /// Seen records examined.
    pub records_checked: usize,
    /// Log entries examined.
    pub log_entries_checked: usize,
    /// Inconsistencies found.
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    /// Creates an empty report for a mode.
    #[must_use]
    pub const fn empty(mode: ReconcileMode) -> Self {
        Self {
            mode,
            records_checked: 0,
            log_entries_checked: 0,
            issues: Vec::new(),
        }
    }

    /// Returns the number of repaired inconsistencies.
    #[must_use]
    pub fn repaired(&self) -> usize {
        self.issues.iter().filter(|issue| issue.kind.is_repaired()).count()
    }

    /// Returns the number of inconsistencies needing manual review.
    #[must_use]
    pub fn warnings(&self) -> usize {
        self.issues.iter().filter(|issue| !issue.kind.is_repaired()).count()
    }

    /// Returns true when nothing was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

// ============================================================================
// SECTION: Run Record
// ============================================================================

/// Summary of one monitoring pass.
///
/// # Invariants
/// - Produced for every pass, including aborted ones.
/// - `sources` follows configuration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Zero-based run number from the run history.
    pub run_number: u64,
    /// Discovery date of the run.
    pub run_date: DiscoveryDate,
    /// Phase transitions in order.
    pub phases: Vec<PhaseTransition>,
    /// Terminal status.
    pub status: RunStatus,
    /// Reason the run aborted, if it did.
    pub abort_reason: Option<String>,
    /// Integrity report from the startup reconciliation.
    pub integrity: Option<IntegrityReport>,
    /// Per-source reports.
    pub sources: Vec<SourceReport>,
    /// Aggregate totals.
    pub totals: RunTotals,
}
