// crates/issue-monitor-core/tests/common/mod.rs
// =============================================================================
// Module: Core Test Helpers
// Description: Shared fixtures for delta, writer, reconciler, and run tests.
// Purpose: Reduce duplication across integration tests for issue-monitor-core.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use issue_monitor_core::CandidateIssue;
use issue_monitor_core::DateGroup;
use issue_monitor_core::DiscoveryDate;
use issue_monitor_core::DiscoveryLog;
use issue_monitor_core::ExternalId;
use issue_monitor_core::FetchBatch;
use issue_monitor_core::IdentifierStore;
use issue_monitor_core::InMemoryDiscoveryLog;
use issue_monitor_core::InMemoryIdentifierStore;
use issue_monitor_core::IssueIdentifier;
use issue_monitor_core::IssueReference;
use issue_monitor_core::LogEntry;
use issue_monitor_core::LogError;
use issue_monitor_core::NewSeenRecord;
use issue_monitor_core::NotificationToken;
use issue_monitor_core::SeenRecord;
use issue_monitor_core::SourceAdapter;
use issue_monitor_core::SourceError;
use issue_monitor_core::SourceId;
use issue_monitor_core::StoreError;
use issue_monitor_core::Timestamp;

/// Returns a fixed discovery date.
pub fn date(year: i32, month: u8, day: u8) -> DiscoveryDate {
    DiscoveryDate::from_ymd(year, month, day).expect("valid date")
}

/// Returns the default test run date.
pub fn today() -> DiscoveryDate {
    date(2026, 10, 15)
}

/// Builds a candidate `source#number` observed at logical time `observed`.
pub fn candidate(source: &str, number: u64, observed: u64) -> CandidateIssue {
    CandidateIssue {
        source: SourceId::new(source),
        external_id: ExternalId::from(number),
        reference: IssueReference::new(format!("{source}#{number}")),
        title: format!("Issue {number}"),
        url: format!("https://example.test/{source}/issues/{number}"),
        observed_at: Timestamp::Logical(observed),
    }
}

/// Records `source#number` with `reference` directly in `store`, leaving it
/// pending.
pub fn record_with_reference<S: IdentifierStore + ?Sized>(
    store: &S,
    number: u64,
    reference: &str,
    first_seen: DiscoveryDate,
) -> NotificationToken {
    store
        .record(&NewSeenRecord {
            identifier: IssueIdentifier::new("repoX", number),
            reference: IssueReference::new(reference),
            title: format!("Issue {number}"),
            url: format!("https://example.test/repoX/issues/{number}"),
            first_seen_date: first_seen,
        })
        .unwrap()
}

/// Returns the token string of every entry in log order.
pub fn logged_references(groups: &[DateGroup]) -> Vec<String> {
    groups
        .iter()
        .flat_map(|group| group.entries.iter())
        .map(|entry| entry.reference.as_str().to_string())
        .collect()
}

// ============================================================================
// SECTION: Sources
// ============================================================================

/// Source that always returns the same batch.
pub struct StaticSource {
    /// Source identifier.
    pub id: SourceId,
    /// Batch to return.
    pub batch: FetchBatch,
    /// Number of fetches performed.
    pub fetches: Mutex<usize>,
}

impl StaticSource {
    /// Creates a source returning `candidates`.
    pub fn new(id: &str, candidates: Vec<CandidateIssue>) -> Arc<Self> {
        Arc::new(Self {
            id: SourceId::new(id),
            batch: FetchBatch {
                candidates,
                warnings: Vec::new(),
            },
            fetches: Mutex::new(0),
        })
    }

    /// Creates a source returning a prepared batch.
    pub fn with_batch(id: &str, batch: FetchBatch) -> Arc<Self> {
        Arc::new(Self {
            id: SourceId::new(id),
            batch,
            fetches: Mutex::new(0),
        })
    }

    /// Returns how many times the source was fetched.
    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

impl SourceAdapter for StaticSource {
    fn source_id(&self) -> &SourceId {
        &self.id
    }

    fn fetch(&self) -> Result<FetchBatch, SourceError> {
        *self.fetches.lock().unwrap() += 1;
        Ok(self.batch.clone())
    }
}

/// Source that always fails.
pub struct DownSource {
    /// Source identifier.
    pub id: SourceId,
}

impl DownSource {
    /// Creates a failing source.
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: SourceId::new(id),
        })
    }
}

impl SourceAdapter for DownSource {
    fn source_id(&self) -> &SourceId {
        &self.id
    }

    fn fetch(&self) -> Result<FetchBatch, SourceError> {
        Err(SourceError::Unavailable("connection refused".to_string()))
    }
}

/// Source that sleeps before answering.
pub struct SlowSource {
    /// Source identifier.
    pub id: SourceId,
    /// Delay before returning.
    pub delay: Duration,
}

impl SourceAdapter for SlowSource {
    fn source_id(&self) -> &SourceId {
        &self.id
    }

    fn fetch(&self) -> Result<FetchBatch, SourceError> {
        thread::sleep(self.delay);
        Ok(FetchBatch::default())
    }
}

// ============================================================================
// SECTION: Faulty Backends
// ============================================================================

/// Log wrapper that fails appends after a number of successes.
#[derive(Clone)]
pub struct FlakyLog {
    /// Wrapped log.
    pub inner: InMemoryDiscoveryLog,
    /// Remaining successful appends; `None` means unlimited.
    pub remaining: Arc<Mutex<Option<usize>>>,
}

impl FlakyLog {
    /// Creates a log that accepts `successes` appends before failing.
    pub fn failing_after(successes: usize) -> Self {
        Self {
            inner: InMemoryDiscoveryLog::new(),
            remaining: Arc::new(Mutex::new(Some(successes))),
        }
    }

    /// Lets every later append succeed.
    pub fn heal(&self) {
        *self.remaining.lock().unwrap() = None;
    }
}

impl DiscoveryLog for FlakyLog {
    fn append(&self, entry: &LogEntry) -> Result<bool, LogError> {
        let mut remaining = self.remaining.lock().unwrap();
        if let Some(left) = remaining.as_mut() {
            if *left == 0 {
                return Err(LogError::Io("disk full".to_string()));
            }
            *left -= 1;
        }
        drop(remaining);
        self.inner.append(entry)
    }

    fn groups(&self) -> Result<Vec<DateGroup>, LogError> {
        self.inner.groups()
    }
}

/// Log that refuses entries the file log cannot render.
#[derive(Clone)]
pub struct StrictLog {
    /// Wrapped log.
    pub inner: InMemoryDiscoveryLog,
    /// When set, every append fails as if the log hit its size limit.
    pub full: Arc<Mutex<bool>>,
}

impl StrictLog {
    /// Creates an empty strict log.
    pub fn new() -> Self {
        Self {
            inner: InMemoryDiscoveryLog::new(),
            full: Arc::new(Mutex::new(false)),
        }
    }

    /// Makes every later append fail with a size-limit error.
    pub fn fill(&self) {
        *self.full.lock().unwrap() = true;
    }
}

impl DiscoveryLog for StrictLog {
    fn append(&self, entry: &LogEntry) -> Result<bool, LogError> {
        if *self.full.lock().unwrap() {
            return Err(LogError::Log("log exceeds size limit".to_string()));
        }
        if !entry.reference.is_loggable() {
            return Err(LogError::Invalid(format!(
                "reference cannot be written to the log: '{}'",
                entry.reference
            )));
        }
        self.inner.append(entry)
    }

    fn groups(&self) -> Result<Vec<DateGroup>, LogError> {
        self.inner.groups()
    }
}

/// Log that is never ready.
pub struct DeadLog;

impl DiscoveryLog for DeadLog {
    fn append(&self, _entry: &LogEntry) -> Result<bool, LogError> {
        Err(LogError::Io("log offline".to_string()))
    }

    fn groups(&self) -> Result<Vec<DateGroup>, LogError> {
        Err(LogError::Io("log offline".to_string()))
    }

    fn readiness(&self) -> Result<(), LogError> {
        Err(LogError::Io("log offline".to_string()))
    }
}

/// Store that reports one identifier's token as held by another identifier.
pub struct CollidingStore {
    /// Wrapped store.
    pub inner: InMemoryIdentifierStore,
    /// Identifier whose token is treated as taken.
    pub colliding: IssueIdentifier,
}

impl IdentifierStore for CollidingStore {
    fn contains(&self, identifier: &IssueIdentifier) -> Result<bool, StoreError> {
        self.inner.contains(identifier)
    }

    fn record(&self, record: &NewSeenRecord) -> Result<NotificationToken, StoreError> {
        if record.identifier == self.colliding {
            return Err(StoreError::TokenCollision {
                identifier: record.identifier.clone(),
                token: NotificationToken::derive(&record.identifier).unwrap(),
            });
        }
        self.inner.record(record)
    }

    fn mark_logged(&self, identifier: &IssueIdentifier) -> Result<(), StoreError> {
        self.inner.mark_logged(identifier)
    }

    fn pending(&self) -> Result<Vec<SeenRecord>, StoreError> {
        self.inner.pending()
    }

    fn records(&self, source: Option<&SourceId>) -> Result<Vec<SeenRecord>, StoreError> {
        self.inner.records(source)
    }
}

/// Identifier store that is never ready.
pub struct DeadStore;

impl IdentifierStore for DeadStore {
    fn contains(&self, _identifier: &IssueIdentifier) -> Result<bool, StoreError> {
        Err(StoreError::Io("store offline".to_string()))
    }

    fn record(&self, _record: &NewSeenRecord) -> Result<NotificationToken, StoreError> {
        Err(StoreError::Io("store offline".to_string()))
    }

    fn mark_logged(&self, _identifier: &IssueIdentifier) -> Result<(), StoreError> {
        Err(StoreError::Io("store offline".to_string()))
    }

    fn pending(&self) -> Result<Vec<SeenRecord>, StoreError> {
        Err(StoreError::Io("store offline".to_string()))
    }

    fn records(&self, _source: Option<&SourceId>) -> Result<Vec<SeenRecord>, StoreError> {
        Err(StoreError::Io("store offline".to_string()))
    }

    fn readiness(&self) -> Result<(), StoreError> {
        Err(StoreError::Io("store offline".to_string()))
    }
}
