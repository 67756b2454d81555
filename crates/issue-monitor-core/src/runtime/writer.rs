// crates/issue-monitor-core/src/runtime/writer.rs
// ============================================================================
// Module: Issue Monitor Batch Writer
// Description: Commits new identifiers as store write plus log append units.
// Purpose: Persist each discovery exactly once with write-ahead recovery.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The batch writer commits discovered issues one identifier at a time:
//! record the identifier (the write-ahead step), append the log entry under
//! the discovery date with the returned token, then mark the record logged.
//! A record left unlogged by a failed append is repaired by the
//! [`crate::runtime::IntegrityReconciler`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::AuditEvent;
use crate::core::AuditEventKind;
use crate::core::DiscoveredIssue;
use crate::core::IntegrityIssueKind;
use crate::core::IssueIdentifier;
use crate::core::LogEntry;
use crate::interfaces::DiscoveryLog;
use crate::interfaces::IdentifierStore;
use crate::interfaces::LogError;
use crate::interfaces::RunAuditSink;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of committing one batch.
#[derive(Debug, Default)]
pub struct CommitOutcome {
    /// Log entries written, in commit order.
    pub entries: Vec<LogEntry>,
    /// Identifiers a concurrent writer recorded first.
    pub already_claimed: Vec<IssueIdentifier>,
    /// Identifiers left unrecorded because their token is already taken.
    pub collisions: Vec<IssueIdentifier>,
    /// Log failure that stopped the batch early, if any.
    pub interrupted: Option<LogError>,
}

/// Errors that stop a commit and abort the run.
#[derive(Debug, Error)]
pub enum CommitError {
    /// Identifier store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Batch Writer
// ============================================================================

/// Commits discovered issues to an identifier store and discovery log.
pub struct BatchWriter<'a, S: ?Sized, L: ?Sized> {
    /// Identifier store receiving seen records.
    store: &'a S,
    /// Discovery log receiving entries.
    log: &'a L,
    /// Audit sink for commit events.
    audit: &'a dyn RunAuditSink,
    /// Run number attached to audit events.
    run_number: Option<u64>,
}

impl<'a, S, L> BatchWriter<'a, S, L>
where
    S: IdentifierStore + ?Sized,
    L: DiscoveryLog + ?Sized,
{
    /// Creates a batch writer.
    #[must_use]
    pub fn new(
        store: &'a S,
        log: &'a L,
        audit: &'a dyn RunAuditSink,
        run_number: Option<u64>,
    ) -> Self {
        Self {
            store,
            log,
            audit,
            run_number,
        }
    }

    /// Commits `issues` in order.
    ///
    /// # Invariants
    /// - An identifier that loses the `record` race produces no log entry.
    /// - A token collision skips only the colliding identifier.
    /// - A log failure stops the batch; the failed identifier stays pending
    ///   and later identifiers stay undiscovered.
    ///
    /// # Errors
    ///
    /// Returns [`CommitError::Store`] when the identifier store fails for any
    /// reason other than [`StoreError::AlreadyExists`] or
    /// [`StoreError::TokenCollision`].
    pub fn commit(&self, issues: &[DiscoveredIssue]) -> Result<CommitOutcome, CommitError> {
        let mut outcome = CommitOutcome::default();
        for issue in issues {
            let token = match self.store.record(&issue.to_new_record()) {
                Ok(token) => token,
                Err(StoreError::AlreadyExists(identifier)) => {
                    self.emit(AuditEventKind::IssueAlreadyClaimed {
                        source: identifier.source.clone(),
                        external_id: identifier.external_id.clone(),
                    });
                    outcome.already_claimed.push(identifier);
                    continue;
                }
                Err(StoreError::TokenCollision {
                    identifier,
                    token,
                }) => {
                    let detail = format!("{identifier} collides with an earlier identifier");
                    self.emit(AuditEventKind::IntegrityWarning {
                        token,
                        kind: IntegrityIssueKind::TokenCollision,
                        detail: Some(detail),
                    });
                    outcome.collisions.push(identifier);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let entry = LogEntry::for_discovered(issue, token);
            if let Err(err) = self.log.append(&entry) {
                outcome.interrupted = Some(err);
                break;
            }
            self.store.mark_logged(&issue.identifier)?;
            self.emit(AuditEventKind::IssueCommitted {
                source: issue.identifier.source.clone(),
                external_id: issue.identifier.external_id.clone(),
                token: entry.token.clone(),
                date: entry.date,
            });
            outcome.entries.push(entry);
        }
        Ok(outcome)
    }

    /// Records an audit event for this run.
    fn emit(&self, kind: AuditEventKind) {
        self.audit.record(&AuditEvent::new(self.run_number, kind));
    }
}
