// crates/issue-monitor-core/src/core/issue.rs
// ============================================================================
// Module: Issue Monitor Issue Records
// Description: Candidate, discovered, seen, and logged issue records.
// Purpose: Model each stage of an upstream issue's life inside the monitor.
// Dependencies: serde, crate::core::{identifiers, time}
// ============================================================================

//! ## Overview
//! An upstream issue moves through four shapes. Source adapters produce
//! ephemeral [`CandidateIssue`] values. The delta engine turns the unseen
//! ones into [`DiscoveredIssue`] values stamped with the run's discovery
//! date. The batch writer registers each as a [`NewSeenRecord`], which the
//! identifier store persists as a [`SeenRecord`], and appends a matching
//! [`LogEntry`] to its [`DateGroup`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ExternalId;
use crate::core::identifiers::IssueIdentifier;
use crate::core::identifiers::IssueReference;
use crate::core::identifiers::NotificationToken;
use crate::core::identifiers::SourceId;
use crate::core::time::DiscoveryDate;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Candidate Issues
// ============================================================================

/// Issue observed by a source adapter during one fetch.
///
/// # Invariants
/// - Ephemeral: produced fresh each run and never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateIssue {
    /// Source the candidate was fetched from.
    pub source: SourceId,
    /// Identifier assigned by the upstream system.
    pub external_id: ExternalId,
    /// Human-readable locator.
    pub reference: IssueReference,
    /// Issue title at fetch time.
    pub title: String,
    /// Issue URL at fetch time.
    pub url: String,
    /// Observation timestamp reported by the source.
    pub observed_at: Timestamp,
}

impl CandidateIssue {
    /// Returns the stable identifier for this candidate.
    #[must_use]
    pub fn identifier(&self) -> IssueIdentifier {
        IssueIdentifier {
            source: self.source.clone(),
            external_id: self.external_id.clone(),
        }
    }
}

/// Candidate the delta engine classified as new for the current run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredIssue {
    /// Stable identifier.
    pub identifier: IssueIdentifier,
    /// Human-readable locator.
    pub reference: IssueReference,
    /// Issue title.
    pub title: String,
    /// Issue URL.
    pub url: String,
    /// Observation timestamp carried from the candidate.
    pub observed_at: Timestamp,
    /// Discovery date of the current run.
    pub discovery_date: DiscoveryDate,
}

impl DiscoveredIssue {
    /// Builds a discovered issue from a candidate and the run's discovery date.
    #[must_use]
    pub fn from_candidate(candidate: CandidateIssue, discovery_date: DiscoveryDate) -> Self {
        let identifier = candidate.identifier();
        Self {
            identifier,
            reference: candidate.reference,
            title: candidate.title,
            url: candidate.url,
            observed_at: candidate.observed_at,
            discovery_date,
        }
    }

    /// Returns the seen record to register for this issue.
    #[must_use]
    pub fn to_new_record(&self) -> NewSeenRecord {
        NewSeenRecord {
            identifier: self.identifier.clone(),
            reference: self.reference.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            first_seen_date: self.discovery_date,
        }
    }
}

// ============================================================================
// SECTION: Seen Records
// ============================================================================

/// Seen record submitted to an identifier store for registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSeenRecord {
    /// Stable identifier.
    pub identifier: IssueIdentifier,
    /// Human-readable locator at first sighting.
    pub reference: IssueReference,
    /// Title at first sighting.
    pub title: String,
    /// URL at first sighting.
    pub url: String,
    /// Discovery date used for log grouping.
    pub first_seen_date: DiscoveryDate,
}

/// Persisted fact that an identifier has been reported.
///
/// # Invariants
/// - Created exactly once per identifier.
/// - The only permitted mutation is `logged` moving from `false` to `true`.
/// - A record with `logged == false` is pending: its log entry has not been
///   confirmed and the integrity reconciler owns its repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    /// Stable identifier.
    pub identifier: IssueIdentifier,
    /// Human-readable locator at first sighting.
    pub reference: IssueReference,
    /// Title at first sighting.
    pub title: String,
    /// URL at first sighting.
    pub url: String,
    /// Discovery date used for log grouping.
    pub first_seen_date: DiscoveryDate,
    /// Token assigned when the record was created.
    pub notification_token: NotificationToken,
    /// Whether the matching log entry is confirmed durable.
    pub logged: bool,
}

impl SeenRecord {
    /// Returns the log entry this record corresponds to.
    #[must_use]
    pub fn log_entry(&self) -> LogEntry {
        LogEntry {
            date: self.first_seen_date,
            token: self.notification_token.clone(),
            reference: self.reference.clone(),
            title: self.title.clone(),
        }
    }
}

// ============================================================================
// SECTION: Log Entries
// ============================================================================

/// Externally visible discovery log entry.
///
/// # Invariants
/// - Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Date group the entry belongs to.
    pub date: DiscoveryDate,
    /// Notification token assigned at commit time.
    pub token: NotificationToken,
    /// Human-readable locator.
    pub reference: IssueReference,
    /// Issue title.
    pub title: String,
}

impl LogEntry {
    /// Builds the log entry for a freshly committed issue.
    #[must_use]
    pub fn for_discovered(issue: &DiscoveredIssue, token: NotificationToken) -> Self {
        Self {
            date: issue.discovery_date,
            token,
            reference: issue.reference.clone(),
            title: issue.title.clone(),
        }
    }
}

/// Ordered entries sharing one discovery date.
///
/// # Invariants
/// - Groups appear in the log in order of first use.
/// - Entries keep their append order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateGroup {
    /// Discovery date heading the group.
    pub date: DiscoveryDate,
    /// Entries in append order.
    pub entries: Vec<LogEntry>,
}
