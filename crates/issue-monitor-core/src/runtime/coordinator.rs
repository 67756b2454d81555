// crates/issue-monitor-core/src/runtime/coordinator.rs
// ============================================================================
// Module: Issue Monitor Run Coordinator
// Description: Orchestrates one monitoring pass over every configured source.
// Purpose: Fetch concurrently, reconcile deterministically, and report every run.
// Dependencies: tokio, crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! A pass moves through `Idle -> FetchingSources -> Reconciling -> Reporting
//! -> Idle`. Before fetching, the coordinator checks the identifier store
//! and discovery log and finishes pending commits through the integrity
//! reconciler. Due sources are fetched concurrently under a semaphore and a
//! per-fetch timeout, then reconciled one at a time in configuration order
//! so log order is deterministic. Source failures are scoped to their
//! source; store failures abort the pass. Every pass yields a [`RunRecord`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::AuditEvent;
use crate::core::AuditEventKind;
use crate::core::DiscoveryDate;
use crate::core::IntegrityReport;
use crate::core::PhaseTransition;
use crate::core::ReconcileMode;
use crate::core::RunPhase;
use crate::core::RunRecord;
use crate::core::RunStatus;
use crate::core::RunTotals;
use crate::core::SourceOutcome;
use crate::core::SourceReport;
use crate::interfaces::DiscoveryLog;
use crate::interfaces::FetchBatch;
use crate::interfaces::IdentifierStore;
use crate::interfaces::LogError;
use crate::interfaces::RunAuditSink;
use crate::interfaces::RunClock;
use crate::interfaces::RunHistory;
use crate::interfaces::SourceAdapter;
use crate::interfaces::SourceError;
use crate::interfaces::StoreError;
use crate::runtime::audit::NoopAuditSink;
use crate::runtime::delta::DeltaEngine;
use crate::runtime::reconcile::IntegrityReconciler;
use crate::runtime::reconcile::ReconcileError;
use crate::runtime::writer::BatchWriter;
use crate::runtime::writer::CommitError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default number of concurrent source fetches.
pub const DEFAULT_CONCURRENCY: usize = 4;
/// Default per-fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Run coordinator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunCoordinatorConfig {
    /// Maximum concurrent source fetches (at least one).
    pub concurrency: usize,
    /// Time budget for one source fetch.
    pub fetch_timeout: Duration,
}

impl Default for RunCoordinatorConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Source adapter plus its scheduling limits.
#[derive(Clone)]
pub struct ScheduledSource {
    /// Adapter producing candidates.
    adapter: Arc<dyn SourceAdapter>,
    /// Source is due when `run_number % every_n_runs == 0`.
    every_n_runs: u32,
    /// Maximum candidates kept from one fetch.
    max_candidates: Option<usize>,
}

impl ScheduledSource {
    /// Schedules an adapter on every run with no candidate cap.
    #[must_use]
    pub fn new(adapter: Arc<dyn SourceAdapter>) -> Self {
        Self {
            adapter,
            every_n_runs: 1,
            max_candidates: None,
        }
    }

    /// Sets the run cadence. Zero is treated as one.
    #[must_use]
    pub fn every_n_runs(mut self, every_n_runs: u32) -> Self {
        self.every_n_runs = every_n_runs.max(1);
        self
    }

    /// Caps the number of candidates kept from one fetch.
    #[must_use]
    pub const fn max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = Some(max_candidates);
        self
    }

    /// Returns true when the source should be fetched on `run_number`.
    #[must_use]
    pub fn is_due(&self, run_number: u64) -> bool {
        run_number % u64::from(self.every_n_runs.max(1)) == 0
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Conditions that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Identifier store or run history is unavailable.
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
    /// Discovery log is unavailable.
    #[error("discovery log unavailable: {0}")]
    Log(#[from] LogError),
}

impl From<ReconcileError> for RunError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Store(err) => Self::Store(err),
            ReconcileError::Log(err) => Self::Log(err),
        }
    }
}

impl From<CommitError> for RunError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::Store(err) => Self::Store(err),
        }
    }
}

// ============================================================================
// SECTION: Run Coordinator
// ============================================================================

/// Orchestrates monitoring passes.
pub struct RunCoordinator<S, L, H, C> {
    /// Identifier store.
    store: S,
    /// Discovery log.
    log: L,
    /// Run history.
    history: H,
    /// Run clock.
    clock: C,
    /// Sources in configuration order.
    sources: Vec<ScheduledSource>,
    /// Audit sink.
    audit: Arc<dyn RunAuditSink>,
    /// Coordinator configuration.
    config: RunCoordinatorConfig,
}

/// Mutable bookkeeping for one pass.
struct RunState {
    /// Run number, once known.
    run_number: u64,
    /// Run discovery date.
    run_date: DiscoveryDate,
    /// Phase transitions so far.
    phases: Vec<PhaseTransition>,
    /// Startup integrity report.
    integrity: Option<IntegrityReport>,
    /// Per-source reports in configuration order.
    reports: Vec<SourceReport>,
}

impl<S, L, H, C> RunCoordinator<S, L, H, C>
where
    S: IdentifierStore,
    L: DiscoveryLog,
    H: RunHistory,
    C: RunClock,
{
    /// Creates a coordinator with a no-op audit sink.
    #[must_use]
    pub fn new(
        store: S,
        log: L,
        history: H,
        clock: C,
        sources: Vec<ScheduledSource>,
        config: RunCoordinatorConfig,
    ) -> Self {
        Self {
            store,
            log,
            history,
            clock,
            sources,
            audit: Arc::new(NoopAuditSink),
            config,
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn RunAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the identifier store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the discovery log.
    #[must_use]
    pub const fn log(&self) -> &L {
        &self.log
    }

    /// Returns the run history.
    #[must_use]
    pub const fn history(&self) -> &H {
        &self.history
    }

    /// Executes one monitoring pass.
    ///
    /// # Invariants
    /// - Always returns a record, including for aborted passes.
    /// - The record is saved to the run history when the history is reachable.
    pub async fn run(&self) -> RunRecord {
        let mut state = RunState {
            run_number: 0,
            run_date: self.clock.today(),
            phases: Vec::new(),
            integrity: None,
            reports: self
                .sources
                .iter()
                .map(|slot| {
                    SourceReport::new(slot.adapter.source_id().clone(), SourceOutcome::NotAttempted)
                })
                .collect(),
        };
        let result = self.execute(&mut state).await;
        let (status, abort_reason) = match result {
            Ok(()) => (classify(&state.reports), None),
            Err(err) => (RunStatus::Aborted, Some(err.to_string())),
        };
        self.enter(&mut state, RunPhase::Reporting);
        let totals = RunTotals::from_reports(&state.reports);
        self.emit(
            state.run_number,
            AuditEventKind::RunFinished {
                status,
                new: totals.new,
                known: totals.known,
                sources_failed: totals.sources_failed,
            },
        );
        self.enter(&mut state, RunPhase::Idle);
        let mut record = RunRecord {
            run_number: state.run_number,
            run_date: state.run_date,
            phases: state.phases,
            status,
            abort_reason,
            integrity: state.integrity,
            sources: state.reports,
            totals,
        };
        if let Err(err) = self.history.save_run(&record)
            && record.status != RunStatus::Aborted
        {
            record.status = RunStatus::Aborted;
            record.abort_reason = Some(RunError::Store(err).to_string());
        }
        record
    }

    /// Runs every phase up to reporting.
    async fn execute(&self, state: &mut RunState) -> Result<(), RunError> {
        self.store.readiness()?;
        self.log.readiness()?;
        state.run_number = self.history.next_run_number()?;
        state.reports =
            self.sources.iter().map(|slot| pending_report(slot, state.run_number)).collect();
        self.emit(
            state.run_number,
            AuditEventKind::RunStarted {
                run_date: state.run_date,
            },
        );

        let reconciler = IntegrityReconciler::new(
            &self.store,
            &self.log,
            self.audit.as_ref(),
            Some(state.run_number),
        );
        state.integrity = Some(reconciler.reconcile(ReconcileMode::Pending)?);

        self.enter(state, RunPhase::FetchingSources);
        let fetched = self.fetch_due(state.run_number).await;

        self.enter(state, RunPhase::Reconciling);
        for (index, result) in fetched.into_iter().enumerate() {
            let Some(result) = result else {
                continue;
            };
            let Some(slot) = self.sources.get(index) else {
                continue;
            };
            let report = match result {
                Ok(batch) => self.reconcile_source(slot, batch, state)?,
                Err(err) => {
                    self.emit(
                        state.run_number,
                        AuditEventKind::SourceFailed {
                            source: slot.adapter.source_id().clone(),
                            error: err.to_string(),
                        },
                    );
                    SourceReport::unavailable(slot.adapter.source_id().clone(), err.to_string())
                }
            };
            if let Some(entry) = state.reports.get_mut(index) {
                *entry = report;
            }
        }
        Ok(())
    }

    /// Fetches every due source concurrently.
    ///
    /// Returns one slot per configured source; `None` marks sources that
    /// were not due this run.
    async fn fetch_due(&self, run_number: u64) -> Vec<Option<Result<FetchBatch, SourceError>>> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let timeout = self.config.fetch_timeout;
        let mut tasks = JoinSet::new();
        let mut results: Vec<Option<Result<FetchBatch, SourceError>>> =
            self.sources.iter().map(|_| None).collect();

        for (index, slot) in self.sources.iter().enumerate() {
            if !slot.is_due(run_number) {
                self.emit(
                    run_number,
                    AuditEventKind::SourceSkipped {
                        source: slot.adapter.source_id().clone(),
                        every_n_runs: slot.every_n_runs,
                    },
                );
                continue;
            }
            let adapter = Arc::clone(&slot.adapter);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => fetch_with_timeout(adapter, timeout).await,
                    Err(_) => Err(SourceError::Unavailable("fetch limiter closed".to_string())),
                };
                (index, result)
            });
            if let Some(entry) = results.get_mut(index) {
                *entry = Some(Err(SourceError::Unavailable(
                    "fetch task did not complete".to_string(),
                )));
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Ok((index, result)) = joined
                && let Some(entry) = results.get_mut(index)
            {
                *entry = Some(result);
            }
        }
        results
    }

    /// Runs the delta engine and batch writer for one fetched source.
    fn reconcile_source(
        &self,
        slot: &ScheduledSource,
        batch: FetchBatch,
        state: &RunState,
    ) -> Result<SourceReport, RunError> {
        let source = slot.adapter.source_id().clone();
        let mut report = SourceReport::new(source.clone(), SourceOutcome::Fetched);
        let FetchBatch {
            mut candidates,
            warnings,
        } = batch;
        if let Some(limit) = slot.max_candidates {
            candidates.truncate(limit);
        }
        report.fetched = candidates.len();
        report.malformed = warnings.len();
        self.emit(
            state.run_number,
            AuditEventKind::SourceFetched {
                source: source.clone(),
                candidates: candidates.len(),
                malformed: warnings.len(),
            },
        );

        let delta = DeltaEngine::new(&self.store).compute(&source, candidates, state.run_date)?;
        for warning in warnings.iter().chain(delta.rejected.iter()) {
            self.emit(
                state.run_number,
                AuditEventKind::CandidateMalformed {
                    source: source.clone(),
                    detail: warning.detail.clone(),
                },
            );
            report.warnings.push(format!("malformed candidate: {}", warning.detail));
        }
        report.malformed += delta.rejected.len();
        report.known = delta.known.len();

        let writer =
            BatchWriter::new(&self.store, &self.log, self.audit.as_ref(), Some(state.run_number));
        let outcome = writer.commit(&delta.new)?;
        report.new = outcome.entries.len();
        report.already_claimed = outcome.already_claimed.len();
        for identifier in &outcome.collisions {
            report.warnings.push(format!("token collision: {identifier} not recorded"));
        }
        if let Some(err) = outcome.interrupted {
            report.warnings.push(format!("commit interrupted: {err}"));
        }
        report.entries = outcome.entries;
        Ok(report)
    }

    /// Records a phase transition.
    fn enter(&self, state: &mut RunState, phase: RunPhase) {
        state.phases.push(PhaseTransition {
            phase,
            at: self.clock.now(),
        });
    }

    /// Records an audit event for a run.
    fn emit(&self, run_number: u64, kind: AuditEventKind) {
        self.audit.record(&AuditEvent::new(Some(run_number), kind));
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runs one blocking fetch under a timeout.
async fn fetch_with_timeout(
    adapter: Arc<dyn SourceAdapter>,
    timeout: Duration,
) -> Result<FetchBatch, SourceError> {
    let task = tokio::task::spawn_blocking(move || adapter.fetch());
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => Err(SourceError::Unavailable(format!("fetch task failed: {err}"))),
        Err(_) => Err(SourceError::Unavailable(format!(
            "fetch timed out after {} ms",
            timeout.as_millis()
        ))),
    }
}

/// Returns the report a source carries before reconciliation reaches it.
fn pending_report(slot: &ScheduledSource, run_number: u64) -> SourceReport {
    let outcome = if slot.is_due(run_number) {
        SourceOutcome::NotAttempted
    } else {
        SourceOutcome::Skipped
    };
    SourceReport::new(slot.adapter.source_id().clone(), outcome)
}

/// Derives the terminal status of a pass that did not abort.
fn classify(reports: &[SourceReport]) -> RunStatus {
    let attempted = reports.iter().filter(|report| report.attempted()).count();
    let fetched =
        reports.iter().filter(|report| report.outcome == SourceOutcome::Fetched).count();
    if attempted > 0 && fetched == 0 { RunStatus::Failed } else { RunStatus::Completed }
}
