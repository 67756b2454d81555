// crates/issue-monitor-log/src/format.rs
// ============================================================================
// Module: Discovery Log Format
// Description: Parser and renderer for the date-grouped text log.
// Purpose: Keep the on-disk log human-readable while remaining machine-parsable.
// Dependencies: issue-monitor-core
// ============================================================================

//! ## Overview
//! The log is UTF-8 text. Content before the first date header is a free-form
//! preamble and is never touched. Each date group starts with a
//! `## YYYY-MM-DD` header; entries inside it are lines of the form
//! `- <token> | <reference> | <title>`. Blank lines and headings that are
//! not dates carry no meaning and are preserved verbatim on rewrite.

// ============================================================================
// SECTION: Imports
// ============================================================================

use issue_monitor_core::DateGroup;
use issue_monitor_core::DiscoveryDate;
use issue_monitor_core::IssueReference;
use issue_monitor_core::LogEntry;
use issue_monitor_core::NotificationToken;
use issue_monitor_core::REFERENCE_SEPARATOR;

use crate::log::FileLogError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix of a date group header line.
const HEADER_PREFIX: &str = "## ";
/// Prefix of an entry line.
const ENTRY_PREFIX: &str = "- ";
/// Field separator inside an entry line.
const FIELD_SEPARATOR: char = REFERENCE_SEPARATOR;

// ============================================================================
// SECTION: Parsed Log
// ============================================================================

/// Parsed view of a discovery log file.
///
/// # Invariants
/// - `groups` follows file order.
/// - Each group has exactly one anchor: the zero-based index of its last
///   header or entry line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLog {
    /// Date groups in file order.
    pub groups: Vec<DateGroup>,
    /// Line index after which a new entry for each group is inserted.
    anchors: Vec<usize>,
}

impl ParsedLog {
    /// Returns true when any entry carries `token`.
    #[must_use]
    pub fn contains_token(&self, token: &NotificationToken) -> bool {
        self.groups.iter().flat_map(|group| group.entries.iter()).any(|entry| entry.token == *token)
    }

    /// Returns the index of the last group headed by `date`.
    #[must_use]
    pub fn group_index(&self, date: DiscoveryDate) -> Option<usize> {
        self.groups.iter().rposition(|group| group.date == date)
    }

    /// Returns `text` with `line` inserted at the end of group `index`.
    ///
    /// Existing lines keep their bytes, line endings included. The inserted
    /// line uses the anchor line's ending, or the file's when the anchor is
    /// an unterminated last line.
    ///
    /// Returns `None` when `index` is out of range.
    #[must_use]
    pub fn insert_into_group(&self, text: &str, index: usize, line: &str) -> Option<String> {
        let anchor = *self.anchors.get(index)?;
        let file_ending = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let mut rewritten = String::with_capacity(text.len() + line.len() + 2);
        let mut inserted = false;
        for (position, raw) in text.split_inclusive('\n').enumerate() {
            rewritten.push_str(raw);
            if position != anchor {
                continue;
            }
            let ending = if raw.ends_with("\r\n") {
                "\r\n"
            } else if raw.ends_with('\n') {
                "\n"
            } else {
                rewritten.push_str(file_ending);
                file_ending
            };
            rewritten.push_str(line);
            rewritten.push_str(ending);
            inserted = true;
        }
        inserted.then_some(rewritten)
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses discovery log text.
///
/// # Errors
///
/// Returns [`FileLogError::Corrupt`] when an entry line inside a date group
/// cannot be parsed.
pub fn parse_log(text: &str) -> Result<ParsedLog, FileLogError> {
    let mut parsed = ParsedLog::default();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim_end();
        if let Some(date) = parse_header(line) {
            parsed.groups.push(DateGroup {
                date,
                entries: Vec::new(),
            });
            parsed.anchors.push(index);
            continue;
        }
        let (Some(group), Some(anchor)) = (parsed.groups.last_mut(), parsed.anchors.last_mut())
        else {
            continue;
        };
        if let Some(body) = line.strip_prefix(ENTRY_PREFIX) {
            let entry = parse_entry(group.date, body).map_err(|reason| FileLogError::Corrupt {
                line: index + 1,
                reason,
            })?;
            group.entries.push(entry);
            *anchor = index;
        }
    }
    Ok(parsed)
}

/// Parses a date group header, ignoring headings that are not dates.
fn parse_header(line: &str) -> Option<DiscoveryDate> {
    line.strip_prefix(HEADER_PREFIX)?.trim().parse().ok()
}

/// Parses the body of an entry line.
fn parse_entry(date: DiscoveryDate, body: &str) -> Result<LogEntry, String> {
    let mut fields = body.splitn(3, FIELD_SEPARATOR).map(str::trim);
    let (Some(token), Some(reference), Some(title)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err("entry must have token, reference, and title fields".to_string());
    };
    let token = NotificationToken::parse(token)
        .ok_or_else(|| format!("invalid notification token: {token}"))?;
    if reference.is_empty() {
        return Err("entry reference is empty".to_string());
    }
    Ok(LogEntry {
        date,
        token,
        reference: IssueReference::new(reference),
        title: title.to_string(),
    })
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders the header line for a date group.
#[must_use]
pub fn render_header(date: DiscoveryDate) -> String {
    format!("{HEADER_PREFIX}{date}")
}

/// Renders an entry line. Whitespace runs in fields collapse to one space.
///
/// # Errors
///
/// Returns [`FileLogError::Invalid`] when the reference is empty or contains
/// the field separator.
pub fn render_entry(entry: &LogEntry) -> Result<String, FileLogError> {
    if !entry.reference.is_loggable() {
        return Err(FileLogError::Invalid(format!(
            "reference cannot be written to the log: '{}'",
            entry.reference
        )));
    }
    let reference = collapse_whitespace(entry.reference.as_str());
    let title = collapse_whitespace(&entry.title);
    let line = format!("{ENTRY_PREFIX}{} | {reference} | {title}", entry.token);
    Ok(line.trim_end().to_string())
}

/// Collapses newlines and whitespace runs into single spaces.
fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

