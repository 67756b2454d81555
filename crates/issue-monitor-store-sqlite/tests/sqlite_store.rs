// crates/issue-monitor-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validate SQLite IdentifierStore and RunHistory behavior.
// Purpose: Ensure atomic registration, durable persistence, and integrity checks.
// Dependencies: issue-monitor-store-sqlite, issue-monitor-core, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed identifier store. Exercises the
//! insert-if-absent race across independent connections, pending tracking,
//! persistence across instances, and fail-closed loads of tampered rows.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;

use issue_monitor_core::CandidateIssue;
use issue_monitor_core::DiscoveredIssue;
use issue_monitor_core::DiscoveryDate;
use issue_monitor_core::ExternalId;
use issue_monitor_core::IdentifierStore;
use issue_monitor_core::InMemoryIdentifierStore;
use issue_monitor_core::IssueIdentifier;
use issue_monitor_core::IssueReference;
use issue_monitor_core::NewSeenRecord;
use issue_monitor_core::NotificationToken;
use issue_monitor_core::RunHistory;
use issue_monitor_core::RunRecord;
use issue_monitor_core::RunStatus;
use issue_monitor_core::RunTotals;
use issue_monitor_core::SourceId;
use issue_monitor_core::StoreError;
use issue_monitor_core::Timestamp;
use issue_monitor_store_sqlite::SqliteIdentifierStore;
use issue_monitor_store_sqlite::SqliteStoreConfig;
use issue_monitor_store_sqlite::SqliteStoreError;
use issue_monitor_store_sqlite::SqliteStoreMode;
use issue_monitor_store_sqlite::SqliteSyncMode;
use proptest::prelude::*;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn date(day: u8) -> DiscoveryDate {
    DiscoveryDate::from_ymd(2026, 10, day).unwrap()
}

fn new_record(source: &str, number: u64, day: u8) -> NewSeenRecord {
    let candidate = CandidateIssue {
        source: SourceId::new(source),
        external_id: ExternalId::from(number),
        reference: IssueReference::new(format!("{source}#{number}")),
        title: format!("Issue {number}"),
        url: format!("https://example.test/{source}/issues/{number}"),
        observed_at: Timestamp::Logical(number),
    };
    DiscoveredIssue::from_candidate(candidate, date(day)).to_new_record()
}

fn store_for(path: &Path) -> SqliteIdentifierStore {
    let config = SqliteStoreConfig {
        path: path.to_path_buf(),
        busy_timeout_ms: 5_000,
        journal_mode: SqliteStoreMode::Wal,
        sync_mode: SqliteSyncMode::Full,
    };
    SqliteIdentifierStore::new(&config).expect("store init")
}

fn run_record(run_number: u64) -> RunRecord {
    RunRecord {
        run_number,
        run_date: date(15),
        phases: Vec::new(),
        status: RunStatus::Completed,
        abort_reason: None,
        integrity: None,
        sources: Vec::new(),
        totals: RunTotals::default(),
    }
}

// ============================================================================
// SECTION: Identifier Store
// ============================================================================

#[test]
fn sqlite_store_records_and_finds_identifiers() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    let record = new_record("repoX", 1, 15);

    assert!(!store.contains(&record.identifier).unwrap());
    let token = store.record(&record).unwrap();

    assert!(store.contains(&record.identifier).unwrap());
    assert_eq!(token, NotificationToken::derive(&record.identifier).unwrap());
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn sqlite_store_rejects_second_record_of_same_identifier() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    let record = new_record("repoX", 1, 15);
    store.record(&record).unwrap();

    let mut retitled = record.clone();
    retitled.title = "Renamed upstream".to_string();
    let result = store.record(&retitled);

    assert!(matches!(result, Err(StoreError::AlreadyExists(id)) if id == record.identifier));
    assert_eq!(store.records(None).unwrap()[0].title, "Issue 1");
}

#[test]
fn sqlite_store_tracks_pending_until_marked() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    let first = new_record("repoX", 1, 15);
    let second = new_record("repoX", 2, 15);
    store.record(&first).unwrap();
    store.record(&second).unwrap();

    store.mark_logged(&first.identifier).unwrap();
    store.mark_logged(&first.identifier).unwrap();

    let pending = store.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].identifier, second.identifier);
    assert!(!pending[0].logged);
}

#[test]
fn sqlite_store_mark_logged_unknown_identifier_is_not_found() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    let unknown = IssueIdentifier::new("repoX", 404_u64);
    let result = store.mark_logged(&unknown);
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[test]
fn sqlite_store_filters_and_orders_records() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    store.record(&new_record("repoX", 10, 15)).unwrap();
    store.record(&new_record("repoX", 9, 15)).unwrap();
    store.record(&new_record("repoY", 1, 14)).unwrap();
    store.record(&new_record("repoX", 50, 13)).unwrap();

    let all: Vec<String> = store
        .records(None)
        .unwrap()
        .iter()
        .map(|record| record.reference.as_str().to_string())
        .collect();
    assert_eq!(all, vec!["repoX#50", "repoY#1", "repoX#9", "repoX#10"]);

    let only_y = store.records(Some(&SourceId::new("repoY"))).unwrap();
    assert_eq!(only_y.len(), 1);
    assert_eq!(only_y[0].first_seen_date, date(14));
}

#[test]
fn sqlite_store_persists_across_instances() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("store.sqlite");
    let record = new_record("repoX", 7, 15);
    {
        let store = store_for(&path);
        store.record(&record).unwrap();
        store.mark_logged(&record.identifier).unwrap();
    }
    let store = store_for(&path);
    let records = store.records(None).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].logged);
    assert_eq!(records[0].url, record.url);
    assert!(store.readiness().is_ok());
}

#[test]
fn sqlite_store_race_on_one_identifier_has_one_winner() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let _init = store_for(&path);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0 .. 2)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let store = store_for(&path);
                barrier.wait();
                store.record(&new_record("repoX", 5, 15))
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    let winners = results.iter().filter(|result| result.is_ok()).count();
    let losers = results
        .iter()
        .filter(|result| matches!(result, Err(StoreError::AlreadyExists(_))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(losers, 1);
    assert_eq!(store_for(&path).len().unwrap(), 1);
}

#[test]
fn sqlite_store_rejects_corrupt_token_rows() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let store = store_for(&path);
    store.record(&new_record("repoX", 1, 15)).unwrap();

    let connection = rusqlite::Connection::open(&path).unwrap();
    connection
        .execute("UPDATE seen_records SET notification_token = 'bogus'", rusqlite::params![])
        .unwrap();

    assert!(matches!(store.pending(), Err(StoreError::Corrupt(_))));
}

#[test]
fn sqlite_store_reports_token_held_by_another_identifier() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let store = store_for(&path);
    let first = new_record("repoX", 1, 15);
    let second = new_record("repoX", 2, 15);
    store.record(&first).unwrap();
    let taken = NotificationToken::derive(&second.identifier).unwrap();

    let connection = rusqlite::Connection::open(&path).unwrap();
    connection
        .execute(
            "UPDATE seen_records SET notification_token = ?1",
            rusqlite::params![taken.as_str()],
        )
        .unwrap();

    let Err(StoreError::TokenCollision {
        identifier,
        token,
    }) = store.record(&second)
    else {
        panic!("expected token collision");
    };
    assert_eq!(identifier, second.identifier);
    assert_eq!(token, taken);
    assert!(!store.contains(&second.identifier).unwrap());
    assert!(matches!(store.record(&first), Err(StoreError::AlreadyExists(_))));
    assert_eq!(store.len().unwrap(), 1);
}

// ============================================================================
// SECTION: Run History
// ============================================================================

#[test]
fn sqlite_history_numbers_runs_by_count() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("store.sqlite"));
    assert_eq!(store.next_run_number().unwrap(), 0);
    assert!(store.latest_run().unwrap().is_none());

    store.save_run(&run_record(0)).unwrap();
    store.save_run(&run_record(1)).unwrap();

    assert_eq!(store.next_run_number().unwrap(), 2);
    assert_eq!(store.latest_run().unwrap(), Some(run_record(1)));
}

#[test]
fn sqlite_history_detects_corrupt_hash() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let store = store_for(&path);
    store.save_run(&run_record(0)).unwrap();
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection
            .execute("UPDATE run_history SET record_hash = 'bad'", rusqlite::params![])
            .unwrap();
    }
    assert!(matches!(store.latest_run(), Err(StoreError::Corrupt(_))));
}

#[test]
fn sqlite_history_rejects_invalid_hash_algorithm() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let store = store_for(&path);
    store.save_run(&run_record(0)).unwrap();

    let connection = rusqlite::Connection::open(&path).unwrap();
    connection
        .execute("UPDATE run_history SET hash_algorithm = 'md5'", rusqlite::params![])
        .unwrap();

    assert!(matches!(store.latest_run(), Err(StoreError::Invalid(_))));
}

// ============================================================================
// SECTION: Open Validation
// ============================================================================

#[test]
fn sqlite_store_rejects_version_mismatch() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let _store = store_for(&path);

    let connection = rusqlite::Connection::open(&path).unwrap();
    connection.execute("UPDATE store_meta SET version = 999", rusqlite::params![]).unwrap();

    let result = SqliteIdentifierStore::new(&SqliteStoreConfig::new(path));
    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}

#[test]
fn sqlite_store_rejects_directory_path() {
    let temp = TempDir::new().unwrap();
    let result = SqliteIdentifierStore::new(&SqliteStoreConfig::new(temp.path()));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn sqlite_store_rejects_overlong_path_component() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a".repeat(300)).join("store.sqlite");
    let result = SqliteIdentifierStore::new(&SqliteStoreConfig::new(path));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn sqlite_order_matches_in_memory_order(
        entries in prop::collection::btree_set((0_u64 .. 200, 10_u8 .. 13), 0 .. 12),
    ) {
        let temp = TempDir::new().unwrap();
        let sqlite = store_for(&temp.path().join("store.sqlite"));
        let memory = InMemoryIdentifierStore::new();
        for (number, day) in &entries {
            let record = new_record("repoX", *number, *day);
            let sqlite_result = sqlite.record(&record);
            let memory_result = memory.record(&record);
            prop_assert_eq!(sqlite_result.is_ok(), memory_result.is_ok());
        }
        prop_assert_eq!(sqlite.records(None).unwrap(), memory.records(None).unwrap());
    }
}
