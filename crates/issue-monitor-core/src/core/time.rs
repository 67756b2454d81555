// crates/issue-monitor-core/src/core/time.rs
// ============================================================================
// Module: Issue Monitor Time Model
// Description: Fetch timestamps and calendar discovery dates.
// Purpose: Provide deterministic, replayable time values for ordering and grouping.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Two time values matter to the monitor. [`Timestamp`] records when a
//! candidate was observed and drives delta ordering. [`DiscoveryDate`] is the
//! calendar date of the run that first noticed an issue and is the log's
//! grouping key. The core never reads wall-clock time directly; hosts supply
//! dates through a [`crate::interfaces::RunClock`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use time::Date;
use time::OffsetDateTime;
use time::UtcOffset;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Timestamps
// ============================================================================

/// Observation timestamp reported alongside a candidate.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
/// - Ordering compares the variant first, then the value, so mixed batches stay
///   deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as logical time when available.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }
}

// ============================================================================
// SECTION: Discovery Dates
// ============================================================================

/// Canonical `YYYY-MM-DD` format for discovery dates.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Calendar date used as the discovery log grouping key.
///
/// # Invariants
/// - Serializes as a `YYYY-MM-DD` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiscoveryDate(Date);

impl DiscoveryDate {
    /// Wraps a calendar date.
    #[must_use]
    pub const fn new(date: Date) -> Self {
        Self(date)
    }

    /// Builds a date from year, month (1-12), and day components.
    #[must_use]
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Option<Self> {
        let month = time::Month::try_from(month).ok()?;
        Date::from_calendar_date(year, month, day).ok().map(Self)
    }

    /// Converts unix epoch milliseconds into the calendar date at `offset_minutes`
    /// east of UTC.
    #[must_use]
    pub fn from_unix_millis(millis: i64, offset_minutes: i16) -> Option<Self> {
        let nanos = i128::from(millis).checked_mul(1_000_000)?;
        let instant = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
        let offset = UtcOffset::from_whole_seconds(i32::from(offset_minutes) * 60).ok()?;
        Some(Self(instant.to_offset(offset).date()))
    }

    /// Returns the wrapped calendar date.
    #[must_use]
    pub const fn date(&self) -> Date {
        self.0
    }
}

impl fmt::Display for DiscoveryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.0.year(), u8::from(self.0.month()), self.0.day())
    }
}

impl FromStr for DiscoveryDate {
    type Err = time::error::Parse;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Date::parse(value, DATE_FORMAT).map(Self)
    }
}

impl Serialize for DiscoveryDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DiscoveryDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
