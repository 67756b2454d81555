// crates/issue-monitor-config/src/config.rs
// ============================================================================
// Module: Issue Monitor Configuration
// Description: Configuration loading and validation for the issue monitor.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: issue-monitor-core, issue-monitor-sources, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults except `[[sources]]`, which lists the upstream
//! sources in the order the run coordinator reports them. Missing or invalid
//! configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use issue_monitor_core::RunCoordinatorConfig;
use issue_monitor_core::SourceId;
use issue_monitor_core::SystemClock;
use issue_monitor_log::FileLogConfig;
use issue_monitor_sources::FileSourceConfig;
use issue_monitor_sources::GithubSourceConfig;
use issue_monitor_sources::SourceDefinition;
use issue_monitor_store_sqlite::SqliteStoreConfig;
use issue_monitor_store_sqlite::SqliteStoreMode;
use issue_monitor_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "issue-monitor.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "ISSUE_MONITOR_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default identifier store path.
const DEFAULT_STORE_PATH: &str = "issue-monitor.db";
/// Default discovery log path.
const DEFAULT_LOG_PATH: &str = "discoveries.md";
/// Default busy timeout for the identifier store in milliseconds.
const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum busy timeout for the identifier store in milliseconds.
const MAX_STORE_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Minimum concurrent source fetches.
const MIN_CONCURRENCY: usize = 1;
/// Maximum concurrent source fetches.
const MAX_CONCURRENCY: usize = 64;
/// Default concurrent source fetches.
const DEFAULT_CONCURRENCY: usize = 4;
/// Minimum per-fetch timeout in milliseconds.
const MIN_FETCH_TIMEOUT_MS: u64 = 100;
/// Maximum per-fetch timeout in milliseconds.
const MAX_FETCH_TIMEOUT_MS: u64 = 300_000;
/// Default per-fetch timeout in milliseconds.
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;
/// Largest absolute UTC offset in minutes.
const MAX_UTC_OFFSET_MINUTES: i16 = 1_440;
/// Maximum number of configured sources.
pub(crate) const MAX_SOURCES: usize = 256;
/// Maximum length of a source identifier.
pub(crate) const MAX_SOURCE_ID_LENGTH: usize = 128;
/// Default candidate cap per fetch.
const DEFAULT_MAX_CANDIDATES: usize = 50;
/// Largest candidate cap per fetch.
const MAX_MAX_CANDIDATES: usize = 1_000;
/// Largest response or file size a source may accept, in bytes.
const MAX_SOURCE_BYTES: usize = 64 * 1024 * 1024;
/// Minimum source request timeout in milliseconds.
const MIN_SOURCE_TIMEOUT_MS: u64 = 100;
/// Maximum source request timeout in milliseconds.
const MAX_SOURCE_TIMEOUT_MS: u64 = 300_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Issue monitor configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueMonitorConfig {
    /// Identifier store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Discovery log configuration.
    #[serde(default)]
    pub log: LogConfig,
    /// Run coordinator configuration.
    #[serde(default)]
    pub run: RunConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Upstream sources in report order.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl IssueMonitorConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from `path`, then [`CONFIG_ENV_VAR`], then
    /// `issue-monitor.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.log.validate()?;
        if self.store.path == self.log.path {
            return Err(ConfigError::Invalid(
                "store.path and log.path must name different files".to_string(),
            ));
        }
        self.run.validate()?;
        self.audit.validate()?;
        if self.sources.len() > MAX_SOURCES {
            return Err(ConfigError::Invalid(format!(
                "too many sources: {} > {MAX_SOURCES}",
                self.sources.len()
            )));
        }
        let mut ids = BTreeSet::new();
        for source in &self.sources {
            source.validate()?;
            if !ids.insert(source.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate source id: {}", source.id)));
            }
        }
        Ok(())
    }
}

/// Identifier store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// `SQLite` database path.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the backend configuration for the `SQLite` store.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }

    /// Validates identifier store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path.to_string_lossy())?;
        if self.busy_timeout_ms > MAX_STORE_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms must be at most {MAX_STORE_BUSY_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

/// Discovery log configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log file path.
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
    /// Optional title written when the log is created.
    #[serde(default)]
    pub title: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            title: None,
        }
    }
}

impl LogConfig {
    /// Returns the backend configuration for the file log.
    #[must_use]
    pub fn file_log_config(&self) -> FileLogConfig {
        FileLogConfig {
            path: self.path.clone(),
            title: self.title.clone(),
        }
    }

    /// Validates discovery log configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("log.path", &self.path.to_string_lossy())?;
        if let Some(title) = &self.title
            && title.lines().count() > 1
        {
            return Err(ConfigError::Invalid("log.title must be a single line".to_string()));
        }
        Ok(())
    }
}

/// Run coordinator configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RunConfig {
    /// Maximum concurrent source fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Time budget for one source fetch in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Offset east of UTC used to resolve the run date, in minutes.
    #[serde(default)]
    pub utc_offset_minutes: i16,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            utc_offset_minutes: 0,
        }
    }
}

impl RunConfig {
    /// Returns the coordinator configuration.
    #[must_use]
    pub const fn coordinator_config(&self) -> RunCoordinatorConfig {
        RunCoordinatorConfig {
            concurrency: self.concurrency,
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
        }
    }

    /// Returns the wall clock for run dates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the offset is out of range.
    pub fn clock(&self) -> Result<SystemClock, ConfigError> {
        SystemClock::with_offset_minutes(self.utc_offset_minutes).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "run.utc_offset_minutes must be within -{MAX_UTC_OFFSET_MINUTES} ..= \
                 {MAX_UTC_OFFSET_MINUTES}"
            ))
        })
    }

    /// Validates run configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CONCURRENCY ..= MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(ConfigError::Invalid(format!(
                "run.concurrency must be within {MIN_CONCURRENCY} ..= {MAX_CONCURRENCY}"
            )));
        }
        if !(MIN_FETCH_TIMEOUT_MS ..= MAX_FETCH_TIMEOUT_MS).contains(&self.fetch_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "run.fetch_timeout_ms must be within {MIN_FETCH_TIMEOUT_MS} ..= \
                 {MAX_FETCH_TIMEOUT_MS}"
            )));
        }
        self.clock().map(|_| ())
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard audit events.
    None,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink receiving audit events.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path when `sink = "file"`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => {
                validate_path_string("audit.path", &path.to_string_lossy())
            }
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires audit.path".to_string()))
            }
            (_, Some(_)) => Err(ConfigError::Invalid(
                "audit.path is only allowed with the file sink".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

/// One upstream source entry.
///
/// The adapter kind and its settings come from the inline `type` tag.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Unique source identifier.
    pub id: String,
    /// Fetch the source on every Nth run.
    #[serde(default = "default_every_n_runs")]
    pub every_n_runs: u32,
    /// Maximum candidates kept from one fetch.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// Adapter definition.
    #[serde(flatten)]
    pub definition: SourceDefinition,
}

impl SourceConfig {
    /// Returns the source identifier.
    #[must_use]
    pub fn source_id(&self) -> SourceId {
        SourceId::new(self.id.clone())
    }

    /// Validates one source entry.
    fn validate(&self) -> Result<(), ConfigError> {
        let id = self.id.as_str();
        if id.trim().is_empty() {
            return Err(ConfigError::Invalid("source id must be non-empty".to_string()));
        }
        if id.len() > MAX_SOURCE_ID_LENGTH {
            return Err(ConfigError::Invalid(format!("source id too long: {id}")));
        }
        if id.chars().any(|ch| ch.is_whitespace() || ch.is_control() || ch == '|') {
            return Err(ConfigError::Invalid(format!(
                "source id must not contain whitespace or '|': {id}"
            )));
        }
        if self.every_n_runs == 0 {
            return Err(ConfigError::Invalid(format!(
                "source {id}: every_n_runs must be greater than zero"
            )));
        }
        if !(1 ..= MAX_MAX_CANDIDATES).contains(&self.max_candidates) {
            return Err(ConfigError::Invalid(format!(
                "source {id}: max_candidates must be within 1 ..= {MAX_MAX_CANDIDATES}"
            )));
        }
        match &self.definition {
            SourceDefinition::Github(github) => validate_github(id, github),
            SourceDefinition::File(file) => validate_file(id, file),
        }
    }
}

/// Validates a GitHub source definition.
fn validate_github(id: &str, config: &GithubSourceConfig) -> Result<(), ConfigError> {
    for (field, value) in [("owner", &config.owner), ("repo", &config.repo)] {
        if value.trim().is_empty() || value.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "source {id}: {field} must be a single non-empty path segment"
            )));
        }
    }
    let scheme_ok = config.api_base.starts_with("https://")
        || (config.allow_http && config.api_base.starts_with("http://"));
    if !scheme_ok {
        return Err(ConfigError::Invalid(format!(
            "source {id}: api_base must use https (or http with allow_http)"
        )));
    }
    if let Some(name) = &config.token_env
        && name.trim().is_empty()
    {
        return Err(ConfigError::Invalid(format!("source {id}: token_env must be non-empty")));
    }
    if !(MIN_SOURCE_TIMEOUT_MS ..= MAX_SOURCE_TIMEOUT_MS).contains(&config.timeout_ms) {
        return Err(ConfigError::Invalid(format!(
            "source {id}: timeout_ms must be within {MIN_SOURCE_TIMEOUT_MS} ..= \
             {MAX_SOURCE_TIMEOUT_MS}"
        )));
    }
    validate_source_bytes(id, "max_response_bytes", config.max_response_bytes)
}

/// Validates a file source definition.
fn validate_file(id: &str, config: &FileSourceConfig) -> Result<(), ConfigError> {
    validate_path_string(&format!("source {id}: path"), &config.path.to_string_lossy())?;
    validate_source_bytes(id, "max_bytes", config.max_bytes)
}

/// Validates a per-source byte limit.
fn validate_source_bytes(id: &str, field: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_SOURCE_BYTES {
        return Err(ConfigError::Invalid(format!(
            "source {id}: {field} must be within 1 ..= {MAX_SOURCE_BYTES}"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error while reading config.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default store path for serde.
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Default log path for serde.
fn default_log_path() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_PATH)
}

/// Default store busy timeout for serde.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

/// Default concurrency for serde.
const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

/// Default fetch timeout for serde.
const fn default_fetch_timeout_ms() -> u64 {
    DEFAULT_FETCH_TIMEOUT_MS
}

/// Default source cadence for serde.
const fn default_every_n_runs() -> u32 {
    1
}

/// Default candidate cap for serde.
const fn default_max_candidates() -> usize {
    DEFAULT_MAX_CANDIDATES
}
