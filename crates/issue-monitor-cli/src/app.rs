// crates/issue-monitor-cli/src/app.rs
// ============================================================================
// Module: Monitor Application
// Description: Builds backends and sources from configuration.
// Purpose: Execute monitoring passes and maintenance commands.
// Dependencies: issue-monitor-config, issue-monitor-core, issue-monitor-log,
//               issue-monitor-sources, issue-monitor-store-sqlite, thiserror
// ============================================================================

//! ## Overview
//! [`MonitorApp`] owns the `SQLite` identifier store (which also holds the
//! run history) and the file discovery log for one configuration. Sources
//! and the audit sink are built per command so a bad source definition only
//! fails the commands that fetch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::sync::Arc;

use issue_monitor_config::AuditConfig;
use issue_monitor_config::AuditSinkKind;
use issue_monitor_config::ConfigError;
use issue_monitor_config::IssueMonitorConfig;
use issue_monitor_core::FileAuditSink;
use issue_monitor_core::IdentifierStore;
use issue_monitor_core::IntegrityReconciler;
use issue_monitor_core::IntegrityReport;
use issue_monitor_core::NoopAuditSink;
use issue_monitor_core::PhaseTransition;
use issue_monitor_core::ReconcileError;
use issue_monitor_core::ReconcileMode;
use issue_monitor_core::RunAuditSink;
use issue_monitor_core::RunClock;
use issue_monitor_core::RunCoordinator;
use issue_monitor_core::RunHistory;
use issue_monitor_core::RunPhase;
use issue_monitor_core::RunRecord;
use issue_monitor_core::RunStatus;
use issue_monitor_core::RunTotals;
use issue_monitor_core::ScheduledSource;
use issue_monitor_core::SeenRecord;
use issue_monitor_core::SourceId;
use issue_monitor_core::SourceOutcome;
use issue_monitor_core::SourceReport;
use issue_monitor_core::StderrAuditSink;
use issue_monitor_core::StoreError;
use issue_monitor_log::FileDiscoveryLog;
use issue_monitor_log::FileLogError;
use issue_monitor_sources::SourceSetupError;
use issue_monitor_sources::build_source;
use issue_monitor_store_sqlite::SqliteIdentifierStore;
use issue_monitor_store_sqlite::SqliteStoreError;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Application errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Identifier store could not be opened.
    #[error("identifier store unavailable: {0}")]
    StoreOpen(#[from] SqliteStoreError),
    /// Identifier store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Discovery log could not be opened or read.
    #[error("discovery log unavailable: {0}")]
    Log(#[from] FileLogError),
    /// Source definition could not be turned into an adapter.
    #[error("source {id}: {source}")]
    Source {
        /// Offending source identifier.
        id: String,
        /// Underlying setup error.
        source: SourceSetupError,
    },
    /// Audit sink could not be opened.
    #[error("audit sink unavailable: {0}")]
    Audit(String),
    /// Integrity reconciliation failed.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

// ============================================================================
// SECTION: Application
// ============================================================================

/// Backends opened for one configuration.
pub struct MonitorApp {
    /// Validated configuration.
    config: IssueMonitorConfig,
    /// Identifier store and run history.
    store: SqliteIdentifierStore,
    /// Discovery log.
    log: FileDiscoveryLog,
}

impl MonitorApp {
    /// Opens the identifier store and discovery log named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when the configuration is invalid or a backend
    /// cannot be opened.
    pub fn open(config: IssueMonitorConfig) -> Result<Self, AppError> {
        config.validate()?;
        let store = SqliteIdentifierStore::new(&config.store.sqlite_config())?;
        let log = FileDiscoveryLog::open(&config.log.file_log_config())?;
        Ok(Self {
            config,
            store,
            log,
        })
    }

    /// Returns the configuration the application was opened with.
    #[must_use]
    pub const fn config(&self) -> &IssueMonitorConfig {
        &self.config
    }

    /// Executes one monitoring pass and returns its run record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when sources, the clock, or the audit sink cannot
    /// be built. Failures during the pass are reported in the record.
    pub async fn run_once(&self) -> Result<RunRecord, AppError> {
        let sources = build_sources(&self.config)?;
        let audit = build_audit_sink(&self.config.audit)?;
        let clock = self.config.run.clock()?;
        let coordinator = RunCoordinator::new(
            self.store.clone(),
            self.log.clone(),
            self.store.clone(),
            clock,
            sources,
            self.config.run.coordinator_config(),
        )
        .with_audit(audit);
        Ok(coordinator.run().await)
    }

    /// Runs the integrity reconciler outside a monitoring pass.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when the audit sink cannot be opened or a
    /// backend fails.
    pub fn reconcile(&self, mode: ReconcileMode) -> Result<IntegrityReport, AppError> {
        let audit = build_audit_sink(&self.config.audit)?;
        let reconciler = IntegrityReconciler::new(&self.store, &self.log, audit.as_ref(), None);
        Ok(reconciler.reconcile(mode)?)
    }

    /// Lists seen records, optionally restricted to one source.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] when the store cannot be read.
    pub fn seen(&self, source: Option<&SourceId>) -> Result<Vec<SeenRecord>, AppError> {
        Ok(self.store.records(source)?)
    }

    /// Lists seen records whose log entries are not yet confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] when the store cannot be read.
    pub fn pending(&self) -> Result<Vec<SeenRecord>, AppError> {
        Ok(self.store.pending()?)
    }

    /// Returns the most recently saved run record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] when the history cannot be read.
    pub fn latest_run(&self) -> Result<Option<RunRecord>, AppError> {
        Ok(self.store.latest_run()?)
    }

    /// Returns the discovery log text.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Log`] when the log cannot be read.
    pub fn log_text(&self) -> Result<String, AppError> {
        Ok(self.log.read_text()?)
    }
}

// ============================================================================
// SECTION: Monitoring Passes
// ============================================================================

/// Opens the backends for `config` and executes one monitoring pass.
///
/// # Invariants
/// - A store or log that cannot be opened yields an aborted record rather
///   than an error, so every pass over a valid configuration is reported.
///
/// # Errors
///
/// Returns [`AppError`] when the configuration is invalid or the pass cannot
/// be set up.
pub async fn run_pass(config: IssueMonitorConfig) -> Result<RunRecord, AppError> {
    config.validate()?;
    match MonitorApp::open(config.clone()) {
        Ok(app) => app.run_once().await,
        Err(err @ (AppError::StoreOpen(_) | AppError::Store(_) | AppError::Log(_))) => {
            aborted_run_record(&config, &err)
        }
        Err(err) => Err(err),
    }
}

/// Builds the record of a pass aborted before its backends were opened.
///
/// # Invariants
/// - Every configured source is reported as not attempted.
/// - The run number is zero because the run history was never reached.
///
/// # Errors
///
/// Returns [`AppError::Config`] when the configured clock is invalid.
pub fn aborted_run_record(
    config: &IssueMonitorConfig,
    reason: &AppError,
) -> Result<RunRecord, AppError> {
    let clock = config.run.clock()?;
    let sources: Vec<SourceReport> = config
        .sources
        .iter()
        .map(|source| SourceReport::new(source.source_id(), SourceOutcome::NotAttempted))
        .collect();
    let phases = [RunPhase::Reporting, RunPhase::Idle]
        .into_iter()
        .map(|phase| PhaseTransition {
            phase,
            at: clock.now(),
        })
        .collect();
    Ok(RunRecord {
        run_number: 0,
        run_date: clock.today(),
        phases,
        status: RunStatus::Aborted,
        abort_reason: Some(reason.to_string()),
        integrity: None,
        totals: RunTotals::from_reports(&sources),
        sources,
    })
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds scheduled sources in configuration order.
///
/// # Errors
///
/// Returns [`AppError::Source`] for the first source that cannot be built.
pub fn build_sources(config: &IssueMonitorConfig) -> Result<Vec<ScheduledSource>, AppError> {
    config
        .sources
        .iter()
        .map(|source| {
            let adapter =
                build_source(source.source_id(), source.definition.clone()).map_err(|err| {
                    AppError::Source {
                        id: source.id.clone(),
                        source: err,
                    }
                })?;
            Ok(ScheduledSource::new(adapter)
                .every_n_runs(source.every_n_runs)
                .max_candidates(source.max_candidates))
        })
        .collect()
}

/// Builds the configured audit sink.
///
/// # Errors
///
/// Returns [`AppError::Audit`] when the audit file cannot be opened.
pub fn build_audit_sink(config: &AuditConfig) -> Result<Arc<dyn RunAuditSink>, AppError> {
    match config.sink {
        AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
        AuditSinkKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                AppError::Audit("file audit sink requires audit.path".to_string())
            })?;
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).map_err(|err| AppError::Audit(err.to_string()))?;
            }
            let sink = FileAuditSink::new(path).map_err(|err| AppError::Audit(err.to_string()))?;
            Ok(Arc::new(sink))
        }
    }
}
