// crates/issue-monitor-cli/tests/app.rs
// ============================================================================
// Module: Monitor Application Tests
// Description: End-to-end passes over on-disk backends and file sources.
// Purpose: Validate configuration wiring, cadence, caps, and maintenance.
// Dependencies: issue-monitor-cli, issue-monitor-config, tempfile, tokio
// ============================================================================

//! ## Overview
//! Builds real `SQLite` stores and text logs inside temporary directories,
//! drives monitoring passes through [`MonitorApp`], and checks the run
//! records, seen records, log text, and audit output they leave behind.

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

use std::fs;
use std::path::Path;

use issue_monitor_cli::AppError;
use issue_monitor_cli::MonitorApp;
use issue_monitor_cli::build_sources;
use issue_monitor_cli::run_pass;
use issue_monitor_config::IssueMonitorConfig;
use issue_monitor_core::ReconcileMode;
use issue_monitor_core::RunStatus;
use issue_monitor_core::SourceId;
use issue_monitor_core::SourceOutcome;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes a candidate feed with issues numbered `numbers`.
fn write_feed(path: &Path, numbers: &[u64]) {
    let items: Vec<_> = numbers
        .iter()
        .map(|number| {
            json!({
                "external_id": number,
                "title": format!("Issue {number}"),
                "url": format!("https://tracker.test/{number}"),
            })
        })
        .collect();
    fs::write(path, serde_json::Value::Array(items).to_string()).unwrap();
}

/// Builds a configuration rooted at `dir` with extra TOML appended.
fn config_in(dir: &Path, extra: &str) -> IssueMonitorConfig {
    let text = format!(
        "[store]\npath = '{}'\n[log]\npath = '{}'\ntitle = \"Discoveries\"\n[audit]\nsink = \
         \"none\"\n{extra}",
        dir.join("state").join("monitor.db").display(),
        dir.join("discoveries.md").display(),
    );
    toml::from_str(&text).unwrap()
}

/// Returns a `[[sources]]` block for a file source.
fn file_source(id: &str, path: &Path, extra: &str) -> String {
    format!("[[sources]]\nid = \"{id}\"\ntype = \"file\"\npath = '{}'\n{extra}\n", path.display())
}

// ============================================================================
// SECTION: Monitoring Passes
// ============================================================================

#[tokio::test]
async fn first_pass_logs_new_issues_and_second_pass_knows_them() {
    let temp = TempDir::new().unwrap();
    let feed = temp.path().join("feed.json");
    write_feed(&feed, &[2, 1]);
    let app = MonitorApp::open(config_in(temp.path(), &file_source("feed", &feed, ""))).unwrap();

    let first = app.run_once().await.unwrap();
    assert_eq!(first.status, RunStatus::Completed);
    assert_eq!(first.run_number, 0);
    assert_eq!(first.totals.new, 2);
    assert_eq!(first.sources[0].entries.len(), 2);

    let text = app.log_text().unwrap();
    assert!(text.starts_with("# Discoveries\n\n## "));
    assert!(text.contains("| feed#2 | Issue 2"));
    assert!(text.contains("| feed#1 | Issue 1"));

    let second = app.run_once().await.unwrap();
    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.run_number, 1);
    assert_eq!(second.totals.new, 0);
    assert_eq!(second.totals.known, 2);
    assert_eq!(app.log_text().unwrap(), text);

    assert_eq!(app.latest_run().unwrap().unwrap(), second);
    assert_eq!(app.seen(None).unwrap().len(), 2);
    assert!(app.pending().unwrap().is_empty());
}

#[tokio::test]
async fn new_candidates_are_appended_in_later_passes() {
    let temp = TempDir::new().unwrap();
    let feed = temp.path().join("feed.json");
    write_feed(&feed, &[1]);
    let app = MonitorApp::open(config_in(temp.path(), &file_source("feed", &feed, ""))).unwrap();
    app.run_once().await.unwrap();

    write_feed(&feed, &[3, 1]);
    let record = app.run_once().await.unwrap();

    assert_eq!(record.totals.new, 1);
    assert_eq!(record.totals.known, 1);
    let references: Vec<String> = app
        .seen(Some(&SourceId::new("feed")))
        .unwrap()
        .iter()
        .map(|record| record.reference.as_str().to_string())
        .collect();
    assert_eq!(references, vec!["feed#1", "feed#3"]);
}

#[tokio::test]
async fn cadence_skips_sources_between_due_runs() {
    let temp = TempDir::new().unwrap();
    let feed = temp.path().join("feed.json");
    write_feed(&feed, &[1]);
    let sources = file_source("slow", &feed, "every_n_runs = 2");
    let app = MonitorApp::open(config_in(temp.path(), &sources)).unwrap();

    let outcomes: Vec<SourceOutcome> = {
        let mut outcomes = Vec::new();
        for _ in 0 .. 3 {
            outcomes.push(app.run_once().await.unwrap().sources[0].outcome);
        }
        outcomes
    };

    assert_eq!(
        outcomes,
        vec![SourceOutcome::Fetched, SourceOutcome::Skipped, SourceOutcome::Fetched]
    );
}

#[tokio::test]
async fn candidate_cap_truncates_the_batch() {
    let temp = TempDir::new().unwrap();
    let feed = temp.path().join("feed.json");
    write_feed(&feed, &[5, 4, 3]);
    let sources = file_source("feed", &feed, "max_candidates = 2");
    let app = MonitorApp::open(config_in(temp.path(), &sources)).unwrap();

    let record = app.run_once().await.unwrap();

    assert_eq!(record.totals.new, 2);
    assert_eq!(app.seen(None).unwrap().len(), 2);
}

#[tokio::test]
async fn unreadable_only_source_fails_the_pass() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("absent.json");
    let app =
        MonitorApp::open(config_in(temp.path(), &file_source("feed", &missing, ""))).unwrap();

    let record = app.run_once().await.unwrap();

    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.sources[0].outcome, SourceOutcome::Unavailable);
    assert!(record.sources[0].error.is_some());
}

#[tokio::test]
async fn one_failing_source_does_not_block_the_others() {
    let temp = TempDir::new().unwrap();
    let feed = temp.path().join("feed.json");
    write_feed(&feed, &[1]);
    let sources = format!(
        "{}{}",
        file_source("broken", &temp.path().join("absent.json"), ""),
        file_source("feed", &feed, "")
    );
    let app = MonitorApp::open(config_in(temp.path(), &sources)).unwrap();

    let record = app.run_once().await.unwrap();

    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(record.totals.sources_failed, 1);
    assert_eq!(record.totals.new, 1);
}

#[tokio::test]
async fn unopenable_log_yields_an_aborted_run_record() {
    let temp = TempDir::new().unwrap();
    let feed = temp.path().join("feed.json");
    write_feed(&feed, &[1]);
    let log_path = temp.path().join("discoveries.md");
    fs::write(&log_path, "# Discoveries\n\n## 2026-10-15\n\n- nt-zz | x | y\n").unwrap();
    let config = config_in(temp.path(), &file_source("feed", &feed, ""));
    assert!(matches!(MonitorApp::open(config.clone()), Err(AppError::Log(_))));

    let record = run_pass(config.clone()).await.unwrap();

    assert_eq!(record.status, RunStatus::Aborted);
    assert!(record.abort_reason.as_deref().unwrap().contains("discovery log unavailable"));
    assert_eq!(record.sources.len(), 1);
    assert_eq!(record.sources[0].outcome, SourceOutcome::NotAttempted);
    assert_eq!(record.totals.sources_attempted, 0);

    fs::remove_file(&log_path).unwrap();
    let recovered = run_pass(config).await.unwrap();
    assert_eq!(recovered.status, RunStatus::Completed);
    assert_eq!(recovered.totals.new, 1);
}

#[tokio::test]
async fn invalid_configuration_is_not_reported_as_a_run() {
    let temp = TempDir::new().unwrap();
    let mut config = config_in(temp.path(), "");
    config.run.concurrency = 0;
    assert!(matches!(run_pass(config).await, Err(AppError::Config(_))));
}

// ============================================================================
// SECTION: Maintenance
// ============================================================================

#[tokio::test]
async fn reconcile_reports_consistent_state() {
    let temp = TempDir::new().unwrap();
    let feed = temp.path().join("feed.json");
    write_feed(&feed, &[1, 2]);
    let app = MonitorApp::open(config_in(temp.path(), &file_source("feed", &feed, ""))).unwrap();
    app.run_once().await.unwrap();

    let report = app.reconcile(ReconcileMode::Full).unwrap();

    assert_eq!(report.mode, ReconcileMode::Full);
    assert_eq!(report.records_checked, 2);
    assert_eq!(report.log_entries_checked, 2);
    assert!(report.issues.is_empty());
}

#[tokio::test]
async fn file_audit_sink_receives_run_events() {
    let temp = TempDir::new().unwrap();
    let feed = temp.path().join("feed.json");
    write_feed(&feed, &[1]);
    let audit_path = temp.path().join("audit").join("events.jsonl");
    let mut config = config_in(temp.path(), &file_source("feed", &feed, ""));
    config.audit = toml::from_str(&format!("sink = \"file\"\npath = '{}'\n", audit_path.display()))
        .unwrap();
    let app = MonitorApp::open(config).unwrap();

    app.run_once().await.unwrap();

    let events = fs::read_to_string(&audit_path).unwrap();
    assert!(events.lines().next().unwrap().contains("\"event\":\"run_started\""));
    assert!(events.contains("\"event\":\"issue_committed\""));
    assert!(events.lines().last().unwrap().contains("\"event\":\"run_finished\""));
}

#[test]
fn invalid_configuration_is_rejected_on_open() {
    let temp = TempDir::new().unwrap();
    let mut config = config_in(temp.path(), "");
    config.run.concurrency = 0;
    assert!(matches!(MonitorApp::open(config), Err(AppError::Config(_))));
}

#[test]
fn github_source_with_unset_token_fails_to_build() {
    let temp = TempDir::new().unwrap();
    let config = config_in(
        temp.path(),
        "[[sources]]\nid = \"gh\"\ntype = \"github\"\nowner = \"octo\"\nrepo = \"widgets\"\n\
         token_env = \"ISSUE_MONITOR_TEST_TOKEN_NEVER_SET\"\n",
    );
    let Err(AppError::Source {
        id, ..
    }) = build_sources(&config)
    else {
        panic!("expected source setup failure");
    };
    assert_eq!(id, "gh");
}
