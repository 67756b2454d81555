// crates/issue-monitor-core/src/core/identifiers.rs
// ============================================================================
// Module: Issue Monitor Identifiers
// Description: Canonical identifiers for sources, upstream issues, and log tokens.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde, crate::core::hashing
// ============================================================================

//! ## Overview
//! This module defines the identifiers used throughout Issue Monitor. Source
//! and issue identifiers are opaque strings assigned by configuration or by
//! the upstream tracker. [`IssueIdentifier`] is the stable `(source,
//! external_id)` pair that deduplication keys on; the human-readable
//! [`IssueReference`] travels alongside it but never participates in identity.
//! [`NotificationToken`] is derived from the identifier and is the opaque
//! correlation key written into the discovery log.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix carried by every notification token.
pub const NOTIFICATION_TOKEN_PREFIX: &str = "nt-";
/// Number of hex digest characters kept in a notification token.
pub const NOTIFICATION_TOKEN_HEX_LEN: usize = 16;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Identifier of one watched upstream source (repository or tracker).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Creates a new source identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SourceId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Stable identifier assigned to an issue by its upstream system.
///
/// # Invariants
/// - Ordering is numeric when both values are plain decimal integers and
///   lexicographic otherwise; numeric values sort before non-numeric ones.
/// - Equal numeric values with different spellings (`"07"`, `"7"`) fall back
///   to lexicographic order so the ordering stays consistent with equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Creates a new external identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the numeric value when the identifier is a plain decimal integer.
    fn numeric(&self) -> Option<u128> {
        if self.0.is_empty() || !self.0.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }
}

impl Ord for ExternalId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(left), Some(right)) => left.cmp(&right).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ExternalId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ExternalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ExternalId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<u64> for ExternalId {
    fn from(value: u64) -> Self {
        Self::new(value.to_string())
    }
}

/// Field separator of discovery log lines; never valid inside a reference.
pub const REFERENCE_SEPARATOR: char = '|';

/// Human-readable locator for an issue (for example `org/repo#12`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueReference(String);

impl IssueReference {
    /// Creates a new issue reference.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the reference fits in one discovery log field.
    ///
    /// A loggable reference has visible characters and does not contain
    /// [`REFERENCE_SEPARATOR`].
    #[must_use]
    pub fn is_loggable(&self) -> bool {
        !self.0.trim().is_empty() && !self.0.contains(REFERENCE_SEPARATOR)
    }
}

impl fmt::Display for IssueReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for IssueReference {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for IssueReference {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Stable identity of one upstream issue.
///
/// # Invariants
/// - `(source, external_id)` is unique for the lifetime of an identifier store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IssueIdentifier {
    /// Source the issue belongs to.
    pub source: SourceId,
    /// Identifier assigned by the upstream system.
    pub external_id: ExternalId,
}

impl IssueIdentifier {
    /// Creates a new issue identifier.
    #[must_use]
    pub fn new(source: impl Into<SourceId>, external_id: impl Into<ExternalId>) -> Self {
        Self {
            source: source.into(),
            external_id: external_id.into(),
        }
    }
}

impl fmt::Display for IssueIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.external_id)
    }
}

// ============================================================================
// SECTION: Notification Token
// ============================================================================

/// Opaque token assigned to an identifier when it is first committed.
///
/// # Invariants
/// - Tokens are derived deterministically from the identifier, so a repair
///   re-append reuses the exact token the original commit would have written.
/// - String form is `nt-` followed by 16 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationToken(String);

impl NotificationToken {
    /// Derives the notification token for an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the identifier cannot be canonicalized.
    pub fn derive(identifier: &IssueIdentifier) -> Result<Self, HashError> {
        let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, identifier)?;
        let short: String = digest.value.chars().take(NOTIFICATION_TOKEN_HEX_LEN).collect();
        Ok(Self(format!("{NOTIFICATION_TOKEN_PREFIX}{short}")))
    }

    /// Parses a token from its string form, rejecting malformed values.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let hex = value.strip_prefix(NOTIFICATION_TOKEN_PREFIX)?;
        if hex.len() != NOTIFICATION_TOKEN_HEX_LEN
            || !hex.bytes().all(|byte| byte.is_ascii_digit() || (b'a' ..= b'f').contains(&byte))
        {
            return None;
        }
        Some(Self(value.to_string()))
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
