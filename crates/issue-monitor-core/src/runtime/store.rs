// crates/issue-monitor-core/src/runtime/store.rs
// ============================================================================
// Module: Issue Monitor In-Memory Backends
// Description: In-memory identifier store, run history, and discovery log.
// Purpose: Provide deterministic backends for tests and local demos.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides in-memory implementations of [`IdentifierStore`],
//! [`RunHistory`], and [`DiscoveryLog`] for tests and local demos. Clones
//! share state, so one instance can be handed to several concurrent writers.
//! They are not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::DateGroup;
use crate::core::IssueIdentifier;
use crate::core::LogEntry;
use crate::core::NewSeenRecord;
use crate::core::NotificationToken;
use crate::core::RunRecord;
use crate::core::SeenRecord;
use crate::core::SourceId;
use crate::interfaces::DiscoveryLog;
use crate::interfaces::IdentifierStore;
use crate::interfaces::LogError;
use crate::interfaces::RunHistory;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Identifier Store
// ============================================================================

/// In-memory identifier store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryIdentifierStore {
    /// Seen records keyed by identifier.
    records: Arc<Mutex<BTreeMap<IssueIdentifier, SeenRecord>>>,
}

impl InMemoryIdentifierStore {
    /// Creates a new in-memory identifier store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Returns the number of seen records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    /// Returns true when no identifiers have been recorded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }

    /// Locks the record map.
    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<IssueIdentifier, SeenRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Store("identifier store mutex poisoned".to_string()))
    }
}

impl IdentifierStore for InMemoryIdentifierStore {
    fn contains(&self, identifier: &IssueIdentifier) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains_key(identifier))
    }

    fn record(&self, record: &NewSeenRecord) -> Result<NotificationToken, StoreError> {
        let token = NotificationToken::derive(&record.identifier)
            .map_err(|err| StoreError::Invalid(err.to_string()))?;
        let mut guard = self.lock()?;
        if !guard.contains_key(&record.identifier)
            && guard.values().any(|seen| seen.notification_token == token)
        {
            return Err(StoreError::TokenCollision {
                identifier: record.identifier.clone(),
                token,
            });
        }
        match guard.entry(record.identifier.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(record.identifier.clone())),
            Entry::Vacant(slot) => {
                slot.insert(SeenRecord {
                    identifier: record.identifier.clone(),
                    reference: record.reference.clone(),
                    title: record.title.clone(),
                    url: record.url.clone(),
                    first_seen_date: record.first_seen_date,
                    notification_token: token.clone(),
                    logged: false,
                });
                drop(guard);
                Ok(token)
            }
        }
    }

    fn mark_logged(&self, identifier: &IssueIdentifier) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let record =
            guard.get_mut(identifier).ok_or_else(|| StoreError::NotFound(identifier.clone()))?;
        record.logged = true;
        drop(guard);
        Ok(())
    }

    fn pending(&self) -> Result<Vec<SeenRecord>, StoreError> {
        let mut pending: Vec<SeenRecord> =
            self.lock()?.values().filter(|record| !record.logged).cloned().collect();
        sort_records(&mut pending);
        Ok(pending)
    }

    fn records(&self, source: Option<&SourceId>) -> Result<Vec<SeenRecord>, StoreError> {
        let mut records: Vec<SeenRecord> = self
            .lock()?
            .values()
            .filter(|record| source.is_none_or(|source| record.identifier.source == *source))
            .cloned()
            .collect();
        sort_records(&mut records);
        Ok(records)
    }
}

/// Sorts records by first-seen date, then identifier.
fn sort_records(records: &mut [SeenRecord]) {
    records.sort_by(|a, b| {
        a.first_seen_date.cmp(&b.first_seen_date).then_with(|| a.identifier.cmp(&b.identifier))
    });
}

// ============================================================================
// SECTION: Run History
// ============================================================================

/// In-memory run history for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRunHistory {
    /// Saved run records in save order.
    runs: Arc<Mutex<Vec<RunRecord>>>,
}

impl InMemoryRunHistory {
    /// Creates a new in-memory run history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns every saved run record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the history mutex is poisoned.
    pub fn runs(&self) -> Result<Vec<RunRecord>, StoreError> {
        Ok(self.lock()?.clone())
    }

    /// Locks the run list.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<RunRecord>>, StoreError> {
        self.runs.lock().map_err(|_| StoreError::Store("run history mutex poisoned".to_string()))
    }
}

impl RunHistory for InMemoryRunHistory {
    fn next_run_number(&self) -> Result<u64, StoreError> {
        let count = self.lock()?.len();
        u64::try_from(count).map_err(|_| StoreError::Invalid("run count overflow".to_string()))
    }

    fn save_run(&self, record: &RunRecord) -> Result<(), StoreError> {
        self.lock()?.push(record.clone());
        Ok(())
    }

    fn latest_run(&self) -> Result<Option<RunRecord>, StoreError> {
        Ok(self.lock()?.last().cloned())
    }
}

// ============================================================================
// SECTION: Discovery Log
// ============================================================================

/// In-memory discovery log for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDiscoveryLog {
    /// Date groups in order of first use.
    groups: Arc<Mutex<Vec<DateGroup>>>,
}

impl InMemoryDiscoveryLog {
    /// Creates a new, empty in-memory discovery log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Locks the group list.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<DateGroup>>, LogError> {
        self.groups.lock().map_err(|_| LogError::Log("discovery log mutex poisoned".to_string()))
    }
}

impl DiscoveryLog for InMemoryDiscoveryLog {
    fn append(&self, entry: &LogEntry) -> Result<bool, LogError> {
        let mut guard = self.lock()?;
        if guard.iter().flat_map(|group| group.entries.iter()).any(|e| e.token == entry.token) {
            return Ok(false);
        }
        if let Some(group) = guard.iter_mut().find(|group| group.date == entry.date) {
            group.entries.push(entry.clone());
        } else {
            guard.push(DateGroup {
                date: entry.date,
                entries: vec![entry.clone()],
            });
        }
        drop(guard);
        Ok(true)
    }

    fn groups(&self) -> Result<Vec<DateGroup>, LogError> {
        Ok(self.lock()?.clone())
    }
}
