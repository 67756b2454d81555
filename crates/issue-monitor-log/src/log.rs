// crates/issue-monitor-log/src/log.rs
// ============================================================================
// Module: File Discovery Log
// Description: Durable DiscoveryLog backed by a date-grouped text file.
// Purpose: Append entries durably while never editing existing lines.
// Dependencies: issue-monitor-core, fs2, serde, tempfile, thiserror
// ============================================================================

//! ## Overview
//! [`FileDiscoveryLog`] appends to the tail date group or opens a new group by
//! writing to the end of the file and syncing it. When an entry belongs to an
//! earlier group (a repair of a pending record) the file is rewritten through
//! a synced temporary sibling and an atomic rename, so readers observe either
//! the old or the new contents. Writers serialize on an in-process mutex and
//! an exclusive advisory lock on `<log>.lock`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use fs2::FileExt;
use issue_monitor_core::DateGroup;
use issue_monitor_core::DiscoveryLog;
use issue_monitor_core::LogEntry;
use issue_monitor_core::LogError;
use serde::Deserialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::format::ParsedLog;
use crate::format::parse_log;
use crate::format::render_entry;
use crate::format::render_header;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum discovery log size accepted for reads and appends.
pub const MAX_LOG_BYTES: usize = 64 * 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Suffix appended to the log path to form the lock file path.
const LOCK_SUFFIX: &str = ".lock";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for the file discovery log.
#[derive(Debug, Clone, Deserialize)]
pub struct FileLogConfig {
    /// Path to the log file.
    pub path: PathBuf,
    /// Optional title written as the preamble of a new log.
    #[serde(default)]
    pub title: Option<String>,
}

impl FileLogConfig {
    /// Creates a configuration without a title.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            title: None,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// File discovery log errors.
#[derive(Debug, Error)]
pub enum FileLogError {
    /// Log I/O error.
    #[error("file log io error: {0}")]
    Io(String),
    /// Log contents could not be parsed.
    #[error("file log corruption at line {line}: {reason}")]
    Corrupt {
        /// One-based line number.
        line: usize,
        /// Parse failure reason.
        reason: String,
    },
    /// Entry or path cannot be used.
    #[error("file log invalid: {0}")]
    Invalid(String),
    /// Log exceeded the size limit.
    #[error("file log too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual size in bytes.
        actual_bytes: usize,
    },
}

impl From<FileLogError> for LogError {
    fn from(error: FileLogError) -> Self {
        match error {
            FileLogError::Io(message) => Self::Io(message),
            FileLogError::Corrupt {
                line,
                reason,
            } => Self::Corrupt(format!("line {line}: {reason}")),
            FileLogError::Invalid(message) => Self::Invalid(message),
            FileLogError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Log(format!(
                "log exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

// ============================================================================
// SECTION: Log
// ============================================================================

/// Advisory lock modes for the sidecar lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    /// Readers may share the lock.
    Shared,
    /// Writers hold the lock alone.
    Exclusive,
}

/// Date-grouped discovery log stored as a text file.
///
/// # Invariants
/// - Existing lines are never modified or removed.
/// - Each notification token appears at most once.
#[derive(Debug, Clone)]
pub struct FileDiscoveryLog {
    /// Log file path.
    path: PathBuf,
    /// Sidecar lock file path.
    lock_path: PathBuf,
    /// Preamble title for a new log.
    title: Option<String>,
    /// In-process writer serialization.
    writer: Arc<Mutex<()>>,
}

impl FileDiscoveryLog {
    /// Opens a discovery log, validating any existing contents.
    ///
    /// The file itself is created on the first append.
    ///
    /// # Errors
    ///
    /// Returns [`FileLogError`] when the path is unusable or the existing log
    /// cannot be parsed.
    pub fn open(config: &FileLogConfig) -> Result<Self, FileLogError> {
        validate_log_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut lock_name = config.path.as_os_str().to_os_string();
        lock_name.push(LOCK_SUFFIX);
        let log = Self {
            path: config.path.clone(),
            lock_path: PathBuf::from(lock_name),
            title: config.title.clone(),
            writer: Arc::new(Mutex::new(())),
        };
        log.load_groups()?;
        Ok(log)
    }

    /// Returns the log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the raw log text, or an empty string when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns [`FileLogError`] when the file cannot be read.
    pub fn read_text(&self) -> Result<String, FileLogError> {
        let _lock = self.acquire(LockMode::Shared)?;
        self.read_unlocked()
    }

    /// Reads and parses the log under a shared lock.
    fn load_groups(&self) -> Result<Vec<DateGroup>, FileLogError> {
        let text = self.read_text()?;
        Ok(parse_log(&text)?.groups)
    }

    /// Appends an entry under the writer locks.
    fn append_entry(&self, entry: &LogEntry) -> Result<bool, FileLogError> {
        let line = render_entry(entry)?;
        let _guard =
            self.writer.lock().map_err(|_| FileLogError::Io("log mutex poisoned".to_string()))?;
        let _lock = self.acquire(LockMode::Exclusive)?;
        let text = self.read_unlocked()?;
        let parsed = parse_log(&text)?;
        if parsed.contains_token(&entry.token) {
            return Ok(false);
        }
        let projected = text.len() + line.len() + 32;
        if projected > MAX_LOG_BYTES {
            return Err(FileLogError::TooLarge {
                max_bytes: MAX_LOG_BYTES,
                actual_bytes: projected,
            });
        }
        match parsed.group_index(entry.date) {
            Some(index) if index + 1 == parsed.groups.len() => {
                let mut chunk = line_break_prefix(&text).to_string();
                chunk.push_str(&line);
                chunk.push('\n');
                self.append_raw(&chunk)?;
            }
            Some(index) => self.rewrite(&parsed, &text, index, &line)?,
            None => {
                let chunk = self.new_group_chunk(&text, entry, &line);
                self.append_raw(&chunk)?;
            }
        }
        Ok(true)
    }

    /// Builds the text that opens a new date group at the end of the log.
    fn new_group_chunk(&self, text: &str, entry: &LogEntry, line: &str) -> String {
        let mut chunk = String::new();
        if text.is_empty() {
            if let Some(title) = &self.title {
                chunk.push_str("# ");
                chunk.push_str(title.trim());
                chunk.push_str("\n\n");
            }
        } else {
            // Date groups are separated by one blank line.
            let trailing = text.len() - text.trim_end_matches('\n').len();
            chunk.push_str(&"\n".repeat(2_usize.saturating_sub(trailing)));
        }
        chunk.push_str(&render_header(entry.date));
        chunk.push_str("\n\n");
        chunk.push_str(line);
        chunk.push('\n');
        chunk
    }

    /// Appends raw text to the end of the log and syncs it.
    fn append_raw(&self, chunk: &str) -> Result<(), FileLogError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| FileLogError::Io(err.to_string()))?;
        file.write_all(chunk.as_bytes()).map_err(|err| FileLogError::Io(err.to_string()))?;
        file.sync_all().map_err(|err| FileLogError::Io(err.to_string()))
    }

    /// Rewrites the log with `line` inserted into group `index`.
    fn rewrite(
        &self,
        parsed: &ParsedLog,
        text: &str,
        index: usize,
        line: &str,
    ) -> Result<(), FileLogError> {
        let contents = parsed
            .insert_into_group(text, index, line)
            .ok_or_else(|| FileLogError::Invalid(format!("date group {index} not found")))?;
        let parent = parent_dir(&self.path);
        let mut temp =
            NamedTempFile::new_in(parent).map_err(|err| FileLogError::Io(err.to_string()))?;
        temp.write_all(contents.as_bytes()).map_err(|err| FileLogError::Io(err.to_string()))?;
        temp.as_file().sync_all().map_err(|err| FileLogError::Io(err.to_string()))?;
        temp.persist(&self.path).map_err(|err| FileLogError::Io(err.to_string()))?;
        Ok(())
    }

    /// Reads the log without taking the file lock.
    fn read_unlocked(&self) -> Result<String, FileLogError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(String::new()),
            Err(err) => return Err(FileLogError::Io(err.to_string())),
        };
        if bytes.len() > MAX_LOG_BYTES {
            return Err(FileLogError::TooLarge {
                max_bytes: MAX_LOG_BYTES,
                actual_bytes: bytes.len(),
            });
        }
        String::from_utf8(bytes)
            .map_err(|_| FileLogError::Invalid("log is not valid utf-8".to_string()))
    }

    /// Opens and locks the sidecar lock file. The lock is held until the
    /// returned handle is dropped.
    fn acquire(&self, mode: LockMode) -> Result<File, FileLogError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|err| FileLogError::Io(err.to_string()))?;
        let locked = match mode {
            LockMode::Shared => file.lock_shared(),
            LockMode::Exclusive => file.lock_exclusive(),
        };
        locked.map_err(|err| FileLogError::Io(err.to_string()))?;
        Ok(file)
    }
}

impl DiscoveryLog for FileDiscoveryLog {
    fn append(&self, entry: &LogEntry) -> Result<bool, LogError> {
        self.append_entry(entry).map_err(LogError::from)
    }

    fn groups(&self) -> Result<Vec<DateGroup>, LogError> {
        self.load_groups().map_err(LogError::from)
    }

    fn readiness(&self) -> Result<(), LogError> {
        self.load_groups().map(|_| ()).map_err(LogError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the newline needed before appending a line to `text`.
fn line_break_prefix(text: &str) -> &'static str {
    if text.is_empty() || text.ends_with('\n') { "" } else { "\n" }
}

/// Returns the directory holding `path`, defaulting to the working directory.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Ensures the parent directory for the log exists.
fn ensure_parent_dir(path: &Path) -> Result<(), FileLogError> {
    std::fs::create_dir_all(parent_dir(path)).map_err(|err| FileLogError::Io(err.to_string()))
}

/// Validates log paths for safety limits.
fn validate_log_path(path: &Path) -> Result<(), FileLogError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(FileLogError::Invalid("log path must not be empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(FileLogError::Invalid("log path exceeds length limit".to_string()));
    }
    if path.components().any(|component| {
        component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH
    }) {
        return Err(FileLogError::Invalid("log path contains an overlong component".to_string()));
    }
    if path.is_dir() {
        return Err(FileLogError::Invalid("log path must be a file, not a directory".to_string()));
    }
    Ok(())
}
