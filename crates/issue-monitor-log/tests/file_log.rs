// crates/issue-monitor-log/tests/file_log.rs
// ============================================================================
// Module: File Discovery Log Tests
// Description: Validate the on-disk discovery log format and append paths.
// Purpose: Ensure appends are durable, grouped by date, and never edit lines.
// Dependencies: issue-monitor-log, issue-monitor-core, tempfile
// ============================================================================

//! ## Overview
//! Exercises the text format, the tail-append and rewrite paths, duplicate
//! suppression, concurrent writers on separate handles, and repair of a
//! pending record through the integrity reconciler.

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

use issue_monitor_core::BatchWriter;
use issue_monitor_core::CandidateIssue;
use issue_monitor_core::DiscoveredIssue;
use issue_monitor_core::DiscoveryDate;
use issue_monitor_core::DiscoveryLog;
use issue_monitor_core::ExternalId;
use issue_monitor_core::IdentifierStore;
use issue_monitor_core::InMemoryIdentifierStore;
use issue_monitor_core::IntegrityIssueKind;
use issue_monitor_core::IntegrityReconciler;
use issue_monitor_core::IssueIdentifier;
use issue_monitor_core::IssueReference;
use issue_monitor_core::LogEntry;
use issue_monitor_core::LogError;
use issue_monitor_core::NewSeenRecord;
use issue_monitor_core::NoopAuditSink;
use issue_monitor_core::NotificationToken;
use issue_monitor_core::ReconcileMode;
use issue_monitor_core::SourceId;
use issue_monitor_core::Timestamp;
use issue_monitor_log::FileDiscoveryLog;
use issue_monitor_log::FileLogConfig;
use issue_monitor_log::FileLogError;
use issue_monitor_log::parse_log;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn date(day: u8) -> DiscoveryDate {
    DiscoveryDate::from_ymd(2026, 10, day).unwrap()
}

fn token(number: u64) -> NotificationToken {
    NotificationToken::derive(&IssueIdentifier::new("repoX", number)).unwrap()
}

fn entry(number: u64, day: u8) -> LogEntry {
    LogEntry {
        date: date(day),
        token: token(number),
        reference: IssueReference::new(format!("repoX#{number}")),
        title: format!("Issue {number}"),
    }
}

fn open_log(path: &Path) -> FileDiscoveryLog {
    FileDiscoveryLog::open(&FileLogConfig::new(path)).unwrap()
}

fn references(log: &FileDiscoveryLog) -> Vec<String> {
    log.groups()
        .unwrap()
        .iter()
        .flat_map(|group| group.entries.iter())
        .map(|entry| entry.reference.as_str().to_string())
        .collect()
}

// ============================================================================
// SECTION: Format
// ============================================================================

#[test]
fn first_append_writes_title_header_and_entry() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("discoveries.md");
    let log = FileDiscoveryLog::open(&FileLogConfig {
        path: path.clone(),
        title: Some("Upstream discoveries".to_string()),
    })
    .unwrap();

    assert!(log.append(&entry(1, 15)).unwrap());

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        text,
        format!("# Upstream discoveries\n\n## 2026-10-15\n\n- {} | repoX#1 | Issue 1\n", token(1))
    );
}

#[test]
fn same_day_entries_share_one_group_in_append_order() {
    let temp = TempDir::new().unwrap();
    let log = open_log(&temp.path().join("log.md"));

    log.append(&entry(2, 15)).unwrap();
    log.append(&entry(1, 15)).unwrap();

    let groups = log.groups().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(references(&log), vec!["repoX#2", "repoX#1"]);
}

#[test]
fn new_date_opens_a_group_after_existing_ones() {
    let temp = TempDir::new().unwrap();
    let log = open_log(&temp.path().join("log.md"));

    log.append(&entry(1, 15)).unwrap();
    log.append(&entry(2, 16)).unwrap();

    let groups = log.groups().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].date, date(15));
    assert_eq!(groups[1].date, date(16));
    let text = log.read_text().unwrap();
    assert!(text.contains(&format!("Issue 1\n\n## 2026-10-16\n\n- {}", token(2))));
}

#[test]
fn duplicate_token_is_not_written_twice() {
    let temp = TempDir::new().unwrap();
    let log = open_log(&temp.path().join("log.md"));
    assert!(log.append(&entry(1, 15)).unwrap());
    let before = log.read_text().unwrap();

    assert!(!log.append(&entry(1, 16)).unwrap());

    assert_eq!(log.read_text().unwrap(), before);
}

#[test]
fn earlier_group_append_preserves_every_existing_line() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("log.md");
    let original = format!(
        "# Notes kept by hand\nfree text\n\n## 2026-10-14\n\n- {} | repoX#1 | Issue 1\n\n\
         ## 2026-10-15\n\n- {} | repoX#3 | Issue 3\n",
        token(1),
        token(3)
    );
    std::fs::write(&path, &original).unwrap();
    let log = open_log(&path);

    assert!(log.append(&entry(2, 14)).unwrap());

    let text = log.read_text().unwrap();
    let expected = format!(
        "# Notes kept by hand\nfree text\n\n## 2026-10-14\n\n- {} | repoX#1 | Issue 1\n\
         - {} | repoX#2 | Issue 2\n\n## 2026-10-15\n\n- {} | repoX#3 | Issue 3\n",
        token(1),
        token(2),
        token(3)
    );
    assert_eq!(text, expected);
    assert_eq!(references(&log), vec!["repoX#1", "repoX#2", "repoX#3"]);
}

#[test]
fn entries_survive_reopening() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("log.md");
    {
        let log = open_log(&path);
        log.append(&entry(1, 15)).unwrap();
    }
    let log = open_log(&path);
    assert!(log.contains_token(&token(1)).unwrap());
    assert!(!log.contains_token(&token(2)).unwrap());
}

#[test]
fn corrupt_entry_fails_open() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("log.md");
    std::fs::write(&path, "## 2026-10-15\n\n- not-a-token | repoX#1 | Issue\n").unwrap();

    let result = FileDiscoveryLog::open(&FileLogConfig::new(&path));

    assert!(matches!(result, Err(FileLogError::Corrupt { line: 3, .. })));
}

#[test]
fn corrupt_log_reports_unready() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("log.md");
    let log = open_log(&path);
    std::fs::write(&path, "## 2026-10-15\n- broken\n").unwrap();
    assert!(matches!(log.readiness(), Err(LogError::Corrupt(_))));
}

#[test]
fn directory_path_is_rejected() {
    let temp = TempDir::new().unwrap();
    let result = FileDiscoveryLog::open(&FileLogConfig::new(temp.path()));
    assert!(matches!(result, Err(FileLogError::Invalid(_))));
}

#[test]
fn parsed_text_matches_groups() {
    let temp = TempDir::new().unwrap();
    let log = open_log(&temp.path().join("log.md"));
    log.append(&entry(1, 15)).unwrap();
    let parsed = parse_log(&log.read_text().unwrap()).unwrap();
    assert_eq!(parsed.groups, log.groups().unwrap());
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[test]
fn concurrent_handles_never_lose_or_duplicate_entries() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("log.md");
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0 .. 4_u64)
        .map(|worker| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let log = open_log(&path);
                barrier.wait();
                for offset in 0 .. 5 {
                    log.append(&entry(worker * 10 + offset, 15)).unwrap();
                    log.append(&entry(offset, 15)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut seen = references(&open_log(&path));
    assert_eq!(seen.len(), 20);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 20);
}

// ============================================================================
// SECTION: Runtime Integration
// ============================================================================

#[test]
fn pending_record_is_repaired_into_its_original_group() {
    let temp = TempDir::new().unwrap();
    let log = open_log(&temp.path().join("log.md"));
    let store = InMemoryIdentifierStore::new();
    let discovered = |number: u64, day: u8| {
        DiscoveredIssue::from_candidate(
            CandidateIssue {
                source: SourceId::new("repoX"),
                external_id: ExternalId::from(number),
                reference: IssueReference::new(format!("repoX#{number}")),
                title: format!("Issue {number}"),
                url: format!("https://example.test/repoX/issues/{number}"),
                observed_at: Timestamp::Logical(number),
            },
            date(day),
        )
    };
    BatchWriter::new(&store, &log, &NoopAuditSink, None).commit(&[discovered(1, 14)]).unwrap();
    store.record(&discovered(2, 14).to_new_record()).unwrap();
    BatchWriter::new(&store, &log, &NoopAuditSink, None).commit(&[discovered(3, 15)]).unwrap();

    let report = IntegrityReconciler::new(&store, &log, &NoopAuditSink, None)
        .reconcile(ReconcileMode::Pending)
        .unwrap();

    assert_eq!(report.repaired(), 1);
    let groups = log.groups().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].entries.len(), 2);
    assert_eq!(references(&log), vec!["repoX#1", "repoX#2", "repoX#3"]);
    assert!(store.pending().unwrap().is_empty());
}

#[test]
fn unwritable_pending_record_is_reported_without_stopping_repairs() {
    let temp = TempDir::new().unwrap();
    let log = open_log(&temp.path().join("log.md"));
    let store = InMemoryIdentifierStore::new();
    for (number, reference) in [(1_u64, "a|b"), (2, "repoX#2")] {
        store
            .record(&NewSeenRecord {
                identifier: IssueIdentifier::new("repoX", number),
                reference: IssueReference::new(reference),
                title: format!("Issue {number}"),
                url: String::new(),
                first_seen_date: date(14),
            })
            .unwrap();
    }
    let reconciler = IntegrityReconciler::new(&store, &log, &NoopAuditSink, None);

    let first = reconciler.reconcile(ReconcileMode::Pending).unwrap();
    let second = reconciler.reconcile(ReconcileMode::Full).unwrap();

    assert_eq!(first.repaired(), 1);
    assert_eq!(first.warnings(), 1);
    assert_eq!(second.warnings(), 1);
    assert_eq!(second.issues[0].kind, IntegrityIssueKind::Unrepairable);
    assert_eq!(references(&log), vec!["repoX#2"]);
    assert_eq!(store.pending().unwrap().len(), 1);
}
