// crates/issue-monitor-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Identifier Store
// Description: Durable IdentifierStore and RunHistory backed by SQLite WAL.
// Purpose: Persist seen records and run records with fail-closed loads.
// Dependencies: issue-monitor-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`IdentifierStore`] using `SQLite`. Seen
//! records are keyed by `(source, external_id)` and inserted with
//! `ON CONFLICT DO NOTHING`, so of any number of concurrent writers (threads
//! or processes sharing the database file) exactly one wins each identifier.
//! The only update ever issued against a seen record flips `logged` to true.
//!
//! Run records are stored as canonical JSON in an append-only history table
//! alongside their hash. Loads verify the hash and fail closed on mismatch.

// ============================================================================//
// SECTION: Imports
// ============================================================================//

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use issue_monitor_core::DEFAULT_HASH_ALGORITHM;
use issue_monitor_core::DiscoveryDate;
use issue_monitor_core::HashAlgorithm;
use issue_monitor_core::IdentifierStore;
use issue_monitor_core::IssueIdentifier;
use issue_monitor_core::IssueReference;
use issue_monitor_core::NewSeenRecord;
use issue_monitor_core::NotificationToken;
use issue_monitor_core::RunHistory;
use issue_monitor_core::RunRecord;
use issue_monitor_core::SeenRecord;
use issue_monitor_core::SourceId;
use issue_monitor_core::StoreError;
use issue_monitor_core::hashing::canonical_json_bytes;
use issue_monitor_core::hashing::hash_bytes;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================//
// SECTION: Constants
// ============================================================================//

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum serialized run record size accepted by the store.
pub const MAX_RUN_RECORD_BYTES: usize = 4 * 1024 * 1024;
/// Columns selected for every seen record query, in [`decode_seen_record`] order.
const SEEN_COLUMNS: &str =
    "source, external_id, reference, title, url, first_seen_date, notification_token, logged";

// ============================================================================//
// SECTION: Config
// ============================================================================//

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` identifier store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default durability settings.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================//
// SECTION: Errors
// ============================================================================//

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Identifier was already recorded.
    #[error("sqlite store identifier already recorded: {0}")]
    AlreadyExists(IssueIdentifier),
    /// Identifier was not found.
    #[error("sqlite store identifier not found: {0}")]
    NotFound(IssueIdentifier),
    /// Identifier's token is already held by another identifier.
    #[error("sqlite store token {token} for {identifier} is already assigned")]
    TokenCollision {
        /// Identifier that could not be recorded.
        identifier: IssueIdentifier,
        /// Token held by the earlier identifier.
        token: NotificationToken,
    },
    /// Run record payload exceeded the size limit.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::AlreadyExists(identifier) => Self::AlreadyExists(identifier),
            SqliteStoreError::NotFound(identifier) => Self::NotFound(identifier),
            SqliteStoreError::TokenCollision {
                identifier,
                token,
            } => Self::TokenCollision {
                identifier,
                token,
            },
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "run record exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

/// Maps a `rusqlite` error into a store error.
#[allow(clippy::needless_pass_by_value, reason = "Used as a map_err adapter.")]
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================//
// SECTION: Store
// ============================================================================//

/// `SQLite`-backed identifier store and run history with WAL support.
///
/// # Invariants
/// - At most one row per `(source, external_id)`.
/// - Notification tokens are unique across rows.
#[derive(Clone)]
pub struct SqliteIdentifierStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteIdentifierStore {
    /// Opens an `SQLite`-backed identifier store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the number of seen records.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the count query fails.
    pub fn len(&self) -> Result<u64, SqliteStoreError> {
        let guard = self.lock()?;
        let count: i64 = guard
            .query_row("SELECT COUNT(*) FROM seen_records", params![], |row| row.get(0))
            .map_err(db_error)?;
        drop(guard);
        u64::try_from(count)
            .map_err(|_| SqliteStoreError::Corrupt("negative seen record count".to_string()))
    }

    /// Returns true when no identifiers have been recorded.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the count query fails.
    pub fn is_empty(&self) -> Result<bool, SqliteStoreError> {
        Ok(self.len()? == 0)
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }
}

impl IdentifierStore for SqliteIdentifierStore {
    fn contains(&self, identifier: &IssueIdentifier) -> Result<bool, StoreError> {
        self.contains_identifier(identifier).map_err(StoreError::from)
    }

    fn record(&self, record: &NewSeenRecord) -> Result<NotificationToken, StoreError> {
        self.insert_record(record).map_err(StoreError::from)
    }

    fn mark_logged(&self, identifier: &IssueIdentifier) -> Result<(), StoreError> {
        self.set_logged(identifier).map_err(StoreError::from)
    }

    fn pending(&self) -> Result<Vec<SeenRecord>, StoreError> {
        self.select_records("WHERE logged = 0", None).map_err(StoreError::from)
    }

    fn records(&self, source: Option<&SourceId>) -> Result<Vec<SeenRecord>, StoreError> {
        match source {
            Some(source) => self
                .select_records("WHERE source = ?1", Some(source.as_str()))
                .map_err(StoreError::from),
            None => self.select_records("", None).map_err(StoreError::from),
        }
    }

    fn readiness(&self) -> Result<(), StoreError> {
        let guard = self.lock()?;
        let version: i64 = guard
            .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
            .map_err(db_error)?;
        drop(guard);
        if version != SCHEMA_VERSION {
            return Err(StoreError::VersionMismatch(format!(
                "unsupported schema version: {version}"
            )));
        }
        Ok(())
    }
}

impl SqliteIdentifierStore {
    /// Returns true when a seen record exists for the identifier.
    fn contains_identifier(&self, identifier: &IssueIdentifier) -> Result<bool, SqliteStoreError> {
        let guard = self.lock()?;
        let found: Option<i64> = guard
            .query_row(
                "SELECT 1 FROM seen_records WHERE source = ?1 AND external_id = ?2",
                params![identifier.source.as_str(), identifier.external_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        drop(guard);
        Ok(found.is_some())
    }

    /// Inserts a seen record if absent and returns its token.
    ///
    /// A skipped insert is attributed under the same lock: an existing row for
    /// the identifier means it was already recorded, otherwise the token
    /// belongs to another identifier.
    fn insert_record(&self, record: &NewSeenRecord) -> Result<NotificationToken, SqliteStoreError> {
        let token = NotificationToken::derive(&record.identifier)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let recorded_at = unix_millis();
        let guard = self.lock()?;
        let inserted = guard
            .execute(
                "INSERT INTO seen_records (source, external_id, reference, title, url, \
                 first_seen_date, notification_token, logged, recorded_at) VALUES (?1, ?2, ?3, \
                 ?4, ?5, ?6, ?7, 0, ?8) ON CONFLICT DO NOTHING",
                params![
                    record.identifier.source.as_str(),
                    record.identifier.external_id.as_str(),
                    record.reference.as_str(),
                    record.title,
                    record.url,
                    record.first_seen_date.to_string(),
                    token.as_str(),
                    recorded_at
                ],
            )
            .map_err(db_error)?;
        if inserted == 1 {
            drop(guard);
            return Ok(token);
        }
        let existing: Option<i64> = guard
            .query_row(
                "SELECT 1 FROM seen_records WHERE source = ?1 AND external_id = ?2",
                params![
                    record.identifier.source.as_str(),
                    record.identifier.external_id.as_str()
                ],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        drop(guard);
        if existing.is_some() {
            return Err(SqliteStoreError::AlreadyExists(record.identifier.clone()));
        }
        Err(SqliteStoreError::TokenCollision {
            identifier: record.identifier.clone(),
            token,
        })
    }

    /// Flips the `logged` flag for an identifier.
    fn set_logged(&self, identifier: &IssueIdentifier) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        let updated = guard
            .execute(
                "UPDATE seen_records SET logged = 1 WHERE source = ?1 AND external_id = ?2",
                params![identifier.source.as_str(), identifier.external_id.as_str()],
            )
            .map_err(db_error)?;
        drop(guard);
        if updated == 0 {
            return Err(SqliteStoreError::NotFound(identifier.clone()));
        }
        Ok(())
    }

    /// Selects seen records matching a filter, ordered by date then identifier.
    fn select_records(
        &self,
        filter: &str,
        source: Option<&str>,
    ) -> Result<Vec<SeenRecord>, SqliteStoreError> {
        let sql = format!("SELECT {SEEN_COLUMNS} FROM seen_records {filter}");
        let guard = self.lock()?;
        let mut statement = guard.prepare(&sql).map_err(db_error)?;
        let rows = match source {
            Some(source) => statement.query_map(params![source], read_seen_row),
            None => statement.query_map(params![], read_seen_row),
        }
        .map_err(db_error)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(decode_seen_record(row.map_err(db_error)?)?);
        }
        drop(statement);
        drop(guard);
        // External ids order numerically, which SQL text ordering cannot express.
        records.sort_by(|a, b| {
            a.first_seen_date.cmp(&b.first_seen_date).then_with(|| a.identifier.cmp(&b.identifier))
        });
        Ok(records)
    }
}

// ============================================================================//
// SECTION: Run History
// ============================================================================//

impl RunHistory for SqliteIdentifierStore {
    fn next_run_number(&self) -> Result<u64, StoreError> {
        self.count_runs().map_err(StoreError::from)
    }

    fn save_run(&self, record: &RunRecord) -> Result<(), StoreError> {
        self.insert_run(record).map_err(StoreError::from)
    }

    fn latest_run(&self) -> Result<Option<RunRecord>, StoreError> {
        self.load_latest_run().map_err(StoreError::from)
    }
}

impl SqliteIdentifierStore {
    /// Counts saved run records.
    fn count_runs(&self) -> Result<u64, SqliteStoreError> {
        let guard = self.lock()?;
        let count: i64 = guard
            .query_row("SELECT COUNT(*) FROM run_history", params![], |row| row.get(0))
            .map_err(db_error)?;
        drop(guard);
        u64::try_from(count)
            .map_err(|_| SqliteStoreError::Corrupt("negative run history count".to_string()))
    }

    /// Appends a run record to the history table.
    fn insert_run(&self, record: &RunRecord) -> Result<(), SqliteStoreError> {
        let canonical_json = canonical_json_bytes(record)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if canonical_json.len() > MAX_RUN_RECORD_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_RUN_RECORD_BYTES,
                actual_bytes: canonical_json.len(),
            });
        }
        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &canonical_json);
        let run_number = i64::try_from(record.run_number)
            .map_err(|_| SqliteStoreError::Invalid("run number overflow".to_string()))?;
        let saved_at = unix_millis();
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO run_history (run_number, record_json, record_hash, hash_algorithm, \
                 saved_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    run_number,
                    canonical_json,
                    digest.value,
                    digest.algorithm.label(),
                    saved_at
                ],
            )
            .map_err(db_error)?;
        drop(guard);
        Ok(())
    }

    /// Loads and verifies the most recently saved run record.
    fn load_latest_run(&self) -> Result<Option<RunRecord>, SqliteStoreError> {
        let row = {
            let mut guard = self.lock()?;
            let tx = guard.transaction().map_err(db_error)?;
            let metadata = tx
                .query_row(
                    "SELECT seq, length(record_json), record_hash, hash_algorithm FROM \
                     run_history ORDER BY seq DESC LIMIT 1",
                    params![],
                    |row| {
                        let seq: i64 = row.get(0)?;
                        let length: i64 = row.get(1)?;
                        let hash: String = row.get(2)?;
                        let algorithm: String = row.get(3)?;
                        Ok((seq, length, hash, algorithm))
                    },
                )
                .optional()
                .map_err(db_error)?;
            let row = if let Some((seq, length, hash, algorithm)) = metadata {
                let length = usize::try_from(length).map_err(|_| {
                    SqliteStoreError::Invalid(format!("negative run record length at seq {seq}"))
                })?;
                if length > MAX_RUN_RECORD_BYTES {
                    return Err(SqliteStoreError::TooLarge {
                        max_bytes: MAX_RUN_RECORD_BYTES,
                        actual_bytes: length,
                    });
                }
                let bytes: Vec<u8> = tx
                    .query_row(
                        "SELECT record_json FROM run_history WHERE seq = ?1",
                        params![seq],
                        |row| row.get(0),
                    )
                    .map_err(db_error)?;
                Some((bytes, hash, algorithm))
            } else {
                None
            };
            tx.commit().map_err(db_error)?;
            drop(guard);
            row
        };
        let Some((bytes, hash_value, hash_algorithm)) = row else {
            return Ok(None);
        };
        let algorithm = parse_hash_algorithm(&hash_algorithm)?;
        if hash_bytes(algorithm, &bytes).value != hash_value {
            return Err(SqliteStoreError::Corrupt(
                "hash mismatch for latest run record".to_string(),
            ));
        }
        let record: RunRecord = serde_json::from_slice(&bytes)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        Ok(Some(record))
    }
}

// ============================================================================//
// SECTION: Row Decoding
// ============================================================================//

/// Raw seen record columns as stored.
struct SeenRow {
    /// Source column.
    source: String,
    /// External id column.
    external_id: String,
    /// Reference column.
    reference: String,
    /// Title column.
    title: String,
    /// URL column.
    url: String,
    /// First-seen date column.
    first_seen_date: String,
    /// Notification token column.
    notification_token: String,
    /// Logged flag column.
    logged: bool,
}

/// Reads raw seen record columns from a row.
fn read_seen_row(row: &Row<'_>) -> rusqlite::Result<SeenRow> {
    Ok(SeenRow {
        source: row.get(0)?,
        external_id: row.get(1)?,
        reference: row.get(2)?,
        title: row.get(3)?,
        url: row.get(4)?,
        first_seen_date: row.get(5)?,
        notification_token: row.get(6)?,
        logged: row.get(7)?,
    })
}

/// Validates raw columns into a seen record.
fn decode_seen_record(row: SeenRow) -> Result<SeenRecord, SqliteStoreError> {
    let identifier = IssueIdentifier::new(row.source, row.external_id);
    let first_seen_date: DiscoveryDate = row.first_seen_date.parse().map_err(|_| {
        SqliteStoreError::Corrupt(format!("invalid first_seen_date for {identifier}"))
    })?;
    let notification_token = NotificationToken::parse(&row.notification_token).ok_or_else(|| {
        SqliteStoreError::Corrupt(format!("invalid notification token for {identifier}"))
    })?;
    Ok(SeenRecord {
        identifier,
        reference: IssueReference::new(row.reference),
        title: row.title,
        url: row.url,
        first_seen_date,
        notification_token,
        logged: row.logged,
    })
}

// ============================================================================//
// SECTION: Helpers
// ============================================================================//

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS seen_records (
                    source TEXT NOT NULL,
                    external_id TEXT NOT NULL,
                    reference TEXT NOT NULL,
                    title TEXT NOT NULL,
                    url TEXT NOT NULL,
                    first_seen_date TEXT NOT NULL,
                    notification_token TEXT NOT NULL UNIQUE,
                    logged INTEGER NOT NULL DEFAULT 0,
                    recorded_at INTEGER NOT NULL,
                    PRIMARY KEY (source, external_id)
                );
                CREATE INDEX IF NOT EXISTS idx_seen_records_pending
                    ON seen_records (logged);
                CREATE TABLE IF NOT EXISTS run_history (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    run_number INTEGER NOT NULL,
                    record_json BLOB NOT NULL,
                    record_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    saved_at INTEGER NOT NULL
                );",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

/// Parses a hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    HashAlgorithm::from_label(label)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("unsupported hash algorithm: {label}")))
}
