// crates/issue-monitor-sources/src/file.rs
// ============================================================================
// Module: File Source
// Description: Source adapter reading candidates from a local JSON file.
// Purpose: Provide an offline source for air-gapped runs and fixtures.
// Dependencies: issue-monitor-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The file source reads a JSON array of candidate objects on every fetch.
//! Each object carries `external_id` (string or non-negative integer),
//! `title`, and optionally `url`, `reference`, and `observed_at_ms`.
//! Objects without `observed_at_ms` are ordered by their array position.
//! An unreadable or oversized file makes the whole source unavailable;
//! individual bad objects become warnings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;

use issue_monitor_core::CandidateIssue;
use issue_monitor_core::ExternalId;
use issue_monitor_core::FetchBatch;
use issue_monitor_core::IssueReference;
use issue_monitor_core::SourceAdapter;
use issue_monitor_core::SourceError;
use issue_monitor_core::SourceId;
use issue_monitor_core::SourceWarning;
use issue_monitor_core::Timestamp;
use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default size limit for candidate files in bytes.
const DEFAULT_MAX_FILE_BYTES: usize = 4 * 1024 * 1024;

/// Configuration for the file source.
///
/// # Invariants
/// - `max_bytes` is a hard upper bound on the file size.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileSourceConfig {
    /// Path to the JSON candidate file.
    pub path: PathBuf,
    /// Maximum file size allowed, in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl FileSourceConfig {
    /// Creates a configuration with the default size limit.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Default size limit for serde.
const fn default_max_bytes() -> usize {
    DEFAULT_MAX_FILE_BYTES
}

// ============================================================================
// SECTION: Source Implementation
// ============================================================================

/// Source adapter backed by a local JSON file.
#[derive(Debug, Clone)]
pub struct FileSource {
    /// Source identifier this adapter serves.
    id: SourceId,
    /// Source configuration.
    config: FileSourceConfig,
}

impl FileSource {
    /// Creates a file source.
    #[must_use]
    pub const fn new(id: SourceId, config: FileSourceConfig) -> Self {
        Self {
            id,
            config,
        }
    }
}

impl SourceAdapter for FileSource {
    fn source_id(&self) -> &SourceId {
        &self.id
    }

    fn fetch(&self) -> Result<FetchBatch, SourceError> {
        let path = &self.config.path;
        let metadata = fs::metadata(path).map_err(|err| {
            SourceError::Unavailable(format!("candidate file {} unreadable: {err}", path.display()))
        })?;
        let max_bytes = u64::try_from(self.config.max_bytes).unwrap_or(u64::MAX);
        if metadata.len() > max_bytes {
            return Err(SourceError::Unavailable(format!(
                "candidate file exceeds size limit: {} > {max_bytes}",
                metadata.len()
            )));
        }
        let bytes = fs::read(path).map_err(|err| {
            SourceError::Unavailable(format!("candidate file {} unreadable: {err}", path.display()))
        })?;
        parse_candidate_file(&self.id, &bytes)
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// One candidate object as written in the file.
#[derive(Debug, Deserialize)]
struct FileCandidate {
    /// Source-scoped identifier.
    external_id: Option<Value>,
    /// Issue title.
    title: Option<String>,
    /// Browser link to the issue.
    #[serde(default)]
    url: String,
    /// Human-readable reference; defaults to `<source>#<external_id>`.
    reference: Option<String>,
    /// Observation time in unix milliseconds.
    observed_at_ms: Option<i64>,
}

/// Parses candidate file contents into a batch.
///
/// # Errors
///
/// Returns [`SourceError::Unavailable`] when the contents are not a JSON
/// array.
pub fn parse_candidate_file(source: &SourceId, bytes: &[u8]) -> Result<FetchBatch, SourceError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|err| SourceError::Unavailable(format!("candidate file is not json: {err}")))?;
    let Value::Array(items) = value else {
        return Err(SourceError::Unavailable("candidate file must be a json array".to_string()));
    };
    let mut batch = FetchBatch::default();
    for (position, item) in items.into_iter().enumerate() {
        let candidate: FileCandidate = match serde_json::from_value(item) {
            Ok(candidate) => candidate,
            Err(err) => {
                batch.warnings.push(SourceWarning::malformed(
                    None,
                    format!("entry {position} has unexpected shape: {err}"),
                ));
                continue;
            }
        };
        let Some(external_id) = candidate.external_id.as_ref().and_then(external_id_from_value)
        else {
            batch.warnings.push(SourceWarning::malformed(
                None,
                format!("entry {position} has no usable external_id"),
            ));
            continue;
        };
        let Some(title) = candidate.title else {
            batch.warnings.push(SourceWarning::malformed(
                Some(external_id.to_string()),
                "candidate is missing its title",
            ));
            continue;
        };
        let reference = IssueReference::new(
            candidate
                .reference
                .filter(|reference| !reference.trim().is_empty())
                .unwrap_or_else(|| format!("{source}#{external_id}")),
        );
        if !reference.is_loggable() {
            batch.warnings.push(SourceWarning::malformed(
                Some(external_id.to_string()),
                format!("candidate reference cannot be logged: '{reference}'"),
            ));
            continue;
        }
        let observed_at = candidate.observed_at_ms.map_or_else(
            || Timestamp::Logical(u64::try_from(position).unwrap_or(u64::MAX)),
            Timestamp::UnixMillis,
        );
        batch.candidates.push(CandidateIssue {
            source: source.clone(),
            external_id,
            reference,
            title,
            url: candidate.url,
            observed_at,
        });
    }
    Ok(batch)
}

/// Reads an external identifier from a string or non-negative integer.
fn external_id_from_value(value: &Value) -> Option<ExternalId> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(ExternalId::new(text.trim())),
        Value::Number(number) => number.as_u64().map(ExternalId::from),
        _ => None,
    }
}
