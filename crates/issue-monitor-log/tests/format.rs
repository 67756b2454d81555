// crates/issue-monitor-log/tests/format.rs
// ============================================================================
// Module: Discovery Log Format Tests
// Description: Parser and renderer edge cases for the text log.
// Purpose: Pin down header recognition, field splitting, and sanitization.
// Dependencies: issue-monitor-log, issue-monitor-core
// ============================================================================

//! ## Overview
//! Validates that only date headings open groups, that malformed entry lines
//! fail closed with a line number, and that rendering collapses newlines.

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

use issue_monitor_core::DiscoveryDate;
use issue_monitor_core::IssueIdentifier;
use issue_monitor_core::IssueReference;
use issue_monitor_core::LogEntry;
use issue_monitor_core::NotificationToken;
use issue_monitor_log::FileLogError;
use issue_monitor_log::parse_log;
use issue_monitor_log::render_entry;
use issue_monitor_log::render_header;

fn token(number: u64) -> NotificationToken {
    NotificationToken::derive(&IssueIdentifier::new("repoX", number)).unwrap()
}

fn entry(reference: &str, title: &str) -> LogEntry {
    LogEntry {
        date: DiscoveryDate::from_ymd(2026, 10, 15).unwrap(),
        token: token(1),
        reference: IssueReference::new(reference),
        title: title.to_string(),
    }
}

#[test]
fn headings_that_are_not_dates_stay_in_the_preamble() {
    let text = format!(
        "# Discoveries\n\n## Notes\n- not an entry\n\n## 2026-10-15\n\n- {} | repoX#1 | One\n",
        token(1)
    );
    let parsed = parse_log(&text).unwrap();
    assert_eq!(parsed.groups.len(), 1);
    assert_eq!(parsed.groups[0].entries.len(), 1);
    assert_eq!(parsed.groups[0].entries[0].reference.as_str(), "repoX#1");
}

#[test]
fn bad_tokens_report_their_line() {
    let err = parse_log("## 2026-10-15\n- nt-zz | repoX#1 | One\n").unwrap_err();
    assert!(matches!(err, FileLogError::Corrupt { line: 2, .. }));
}

#[test]
fn titles_may_contain_the_separator() {
    let text = format!("## 2026-10-15\n- {} | repoX#1 | a | b\n", token(1));
    let parsed = parse_log(&text).unwrap();
    assert_eq!(parsed.groups[0].entries[0].title, "a | b");
}

#[test]
fn empty_titles_parse_after_trailing_whitespace_is_stripped() {
    let line = render_entry(&entry("repoX#1", "")).unwrap();
    assert!(line.ends_with('|'));
    let parsed = parse_log(&format!("{}\n{line}\n", render_header(entry("r", "").date))).unwrap();
    assert_eq!(parsed.groups[0].entries[0].title, "");
}

#[test]
fn rendering_collapses_newlines() {
    let line = render_entry(&entry("repoX#1", "multi\nline\r\n  title")).unwrap();
    assert_eq!(line, format!("- {} | repoX#1 | multi line title", token(1)));
}

#[test]
fn rendering_rejects_separator_in_reference() {
    assert!(matches!(render_entry(&entry("repo|X#1", "t")), Err(FileLogError::Invalid(_))));
}

#[test]
fn rendering_rejects_blank_references() {
    assert!(matches!(render_entry(&entry(" \r\n ", "t")), Err(FileLogError::Invalid(_))));
}

#[test]
fn insertion_lands_after_the_groups_last_entry() {
    let text = format!(
        "## 2026-10-14\n\n- {} | repoX#1 | One\n\n## 2026-10-15\n\n- {} | repoX#2 | Two\n",
        token(1),
        token(2)
    );
    let parsed = parse_log(&text).unwrap();
    let rewritten = parsed.insert_into_group(&text, 0, "- inserted").unwrap();
    let lines: Vec<&str> = rewritten.lines().collect();
    assert_eq!(lines[3], "- inserted");
    assert_eq!(lines[5], "## 2026-10-15");
    assert!(parsed.insert_into_group(&text, 2, "- nowhere").is_none());
}

#[test]
fn insertion_keeps_crlf_line_endings() {
    let text = format!(
        "# Discoveries\r\n\r\n## 2026-10-14\r\n\r\n- {} | repoX#1 | One\r\n\r\n## \
         2026-10-15\r\n\r\n- {} | repoX#2 | Two\r\n",
        token(1),
        token(2)
    );
    let parsed = parse_log(&text).unwrap();

    let rewritten = parsed.insert_into_group(&text, 0, "- inserted").unwrap();

    let (before, after) = text.split_at(text.find("\r\n\r\n## 2026-10-15").unwrap() + 2);
    assert_eq!(rewritten, format!("{before}- inserted\r\n{after}"));
    assert!(!rewritten.replace("\r\n", "").contains('\n'));
}

#[test]
fn insertion_after_an_unterminated_last_line_adds_a_line_break() {
    let text = format!("## 2026-10-14\n\n- {} | repoX#1 | One", token(1));
    let parsed = parse_log(&text).unwrap();

    let rewritten = parsed.insert_into_group(&text, 0, "- inserted").unwrap();

    assert_eq!(rewritten, format!("{text}\n- inserted\n"));
}
