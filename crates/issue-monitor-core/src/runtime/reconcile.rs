// crates/issue-monitor-core/src/runtime/reconcile.rs
// ============================================================================
// Module: Issue Monitor Integrity Reconciler
// Description: Detects and repairs drift between seen records and the log.
// Purpose: Finish half-committed identifiers and surface orphaned log entries.
// Dependencies: crate::core, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! A seen record whose log append never completed is pending. The reconciler
//! finishes each pending record: when its token is already in the log it is
//! marked logged, otherwise the entry is re-appended under the record's
//! original date with its stored token. Full mode also re-checks logged
//! records and reports log entries that no seen record accounts for. Nothing
//! is ever deleted.
//!
//! A record whose entry the log refuses (an unwritable reference, or a log
//! at its size limit) is reported as unrepairable and left pending; only an
//! unavailable log stops the pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::AuditEvent;
use crate::core::AuditEventKind;
use crate::core::IntegrityIssue;
use crate::core::IntegrityIssueKind;
use crate::core::IntegrityReport;
use crate::core::NotificationToken;
use crate::core::ReconcileMode;
use crate::core::SeenRecord;
use crate::interfaces::DiscoveryLog;
use crate::interfaces::IdentifierStore;
use crate::interfaces::LogError;
use crate::interfaces::RunAuditSink;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that stop a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Identifier store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Discovery log failed.
    #[error(transparent)]
    Log(#[from] LogError),
}

// ============================================================================
// SECTION: Reconciler
// ============================================================================

/// Result of re-appending one seen record.
enum Reappend {
    /// Entry is now in the log.
    Written,
    /// Log refused this entry; the reason is kept for manual review.
    Refused(String),
}

/// Integrity reconciler over an identifier store and discovery log.
pub struct IntegrityReconciler<'a, S: ?Sized, L: ?Sized> {
    /// Identifier store holding seen records.
    store: &'a S,
    /// Discovery log holding entries.
    log: &'a L,
    /// Audit sink for repair events.
    audit: &'a dyn RunAuditSink,
    /// Run number attached to audit events.
    run_number: Option<u64>,
}

impl<'a, S, L> IntegrityReconciler<'a, S, L>
where
    S: IdentifierStore + ?Sized,
    L: DiscoveryLog + ?Sized,
{
    /// Creates a reconciler.
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

    /// Runs one reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when the store or log fails.
    pub fn reconcile(&self, mode: ReconcileMode) -> Result<IntegrityReport, ReconcileError> {
        let mut report = IntegrityReport::empty(mode);
        let mut logged_tokens: BTreeSet<NotificationToken> = BTreeSet::new();
        for group in self.log.groups()? {
            for entry in group.entries {
                report.log_entries_checked += 1;
                logged_tokens.insert(entry.token);
            }
        }

        let pending = self.store.pending()?;
        report.records_checked = pending.len();
        for record in &pending {
            self.finish_pending(record, &mut logged_tokens, &mut report)?;
        }

        if mode == ReconcileMode::Full {
            let records = self.store.records(None)?;
            report.records_checked = records.len();
            for record in records.iter().filter(|record| record.logged) {
                if logged_tokens.contains(&record.notification_token) {
                    continue;
                }
                match self.reappend(record, &mut logged_tokens)? {
                    Reappend::Written => {
                        self.note(&mut report, record, IntegrityIssueKind::Reappended);
                    }
                    Reappend::Refused(detail) => self.refuse(&mut report, record, detail),
                }
            }
            self.flag_unknown_entries(&records, &mut report)?;
        }

        self.audit.record(&AuditEvent::new(
            self.run_number,
            AuditEventKind::IntegrityChecked {
                mode,
                records_checked: report.records_checked,
                repaired: report.repaired(),
                warnings: report.warnings(),
            },
        ));
        Ok(report)
    }

    /// Completes one pending record.
    fn finish_pending(
        &self,
        record: &SeenRecord,
        logged_tokens: &mut BTreeSet<NotificationToken>,
        report: &mut IntegrityReport,
    ) -> Result<(), ReconcileError> {
        let kind = if logged_tokens.contains(&record.notification_token) {
            IntegrityIssueKind::MarkedLogged
        } else {
            if let Reappend::Refused(detail) = self.reappend(record, logged_tokens)? {
                self.refuse(report, record, detail);
                return Ok(());
            }
            IntegrityIssueKind::Reappended
        };
        self.store.mark_logged(&record.identifier)?;
        self.note(report, record, kind);
        Ok(())
    }

    /// Re-appends the entry for `record` with its stored token.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Log`] when the log itself is unavailable.
    fn reappend(
        &self,
        record: &SeenRecord,
        logged_tokens: &mut BTreeSet<NotificationToken>,
    ) -> Result<Reappend, ReconcileError> {
        match self.log.append(&record.log_entry()) {
            Ok(_) => {
                logged_tokens.insert(record.notification_token.clone());
                Ok(Reappend::Written)
            }
            Err(err @ (LogError::Invalid(_) | LogError::Log(_))) => {
                Ok(Reappend::Refused(err.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Reports log entries whose token matches no seen record.
    fn flag_unknown_entries(
        &self,
        records: &[SeenRecord],
        report: &mut IntegrityReport,
    ) -> Result<(), ReconcileError> {
        let known: BTreeSet<&NotificationToken> =
            records.iter().map(|record| &record.notification_token).collect();
        for group in self.log.groups()? {
            for entry in group.entries {
                if known.contains(&entry.token) {
                    continue;
                }
                self.audit.record(&AuditEvent::new(
                    self.run_number,
                    AuditEventKind::IntegrityWarning {
                        token: entry.token.clone(),
                        kind: IntegrityIssueKind::UnknownLogEntry,
                        detail: None,
                    },
                ));
                report.issues.push(IntegrityIssue {
                    kind: IntegrityIssueKind::UnknownLogEntry,
                    token: entry.token,
                    identifier: None,
                    date: group.date,
                    detail: None,
                });
            }
        }
        Ok(())
    }

    /// Records a repair in the report and the audit trail.
    fn note(&self, report: &mut IntegrityReport, record: &SeenRecord, kind: IntegrityIssueKind) {
        self.audit.record(&AuditEvent::new(
            self.run_number,
            AuditEventKind::IntegrityRepaired {
                token: record.notification_token.clone(),
                kind,
            },
        ));
        report.issues.push(IntegrityIssue {
            kind,
            token: record.notification_token.clone(),
            identifier: Some(record.identifier.clone()),
            date: record.first_seen_date,
            detail: None,
        });
    }

    /// Records a seen record the log refused; the record stays as it is.
    fn refuse(&self, report: &mut IntegrityReport, record: &SeenRecord, detail: String) {
        self.audit.record(&AuditEvent::new(
            self.run_number,
            AuditEventKind::IntegrityWarning {
                token: record.notification_token.clone(),
                kind: IntegrityIssueKind::Unrepairable,
                detail: Some(detail.clone()),
            },
        ));
        report.issues.push(IntegrityIssue {
            kind: IntegrityIssueKind::Unrepairable,
            token: record.notification_token.clone(),
            identifier: Some(record.identifier.clone()),
            date: record.first_seen_date,
            detail: Some(detail),
        });
    }
}
