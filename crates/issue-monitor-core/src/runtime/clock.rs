// crates/issue-monitor-core/src/runtime/clock.rs
// ============================================================================
// Module: Issue Monitor Clocks
// Description: System and fixed implementations of the run clock.
// Purpose: Supply run dates from wall-clock time or from test fixtures.
// Dependencies: time, crate::interfaces
// ============================================================================

//! ## Overview
//! [`SystemClock`] reads wall-clock time and resolves the discovery date at a
//! fixed UTC offset. [`FixedClock`] returns a pinned date and a monotonic
//! logical timestamp so tests are reproducible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use time::OffsetDateTime;
use time::UtcOffset;

use crate::core::DiscoveryDate;
use crate::core::Timestamp;
use crate::interfaces::RunClock;

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// Wall-clock run clock with a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    /// Offset applied when resolving the calendar date.
    offset: UtcOffset,
}

impl SystemClock {
    /// Creates a clock that resolves dates in UTC.
    #[must_use]
    pub const fn utc() -> Self {
        Self {
            offset: UtcOffset::UTC,
        }
    }

    /// Creates a clock with an offset in minutes east of UTC.
    ///
    /// Returns `None` when the offset is outside `-1440..=1440`.
    #[must_use]
    pub fn with_offset_minutes(minutes: i16) -> Option<Self> {
        if !(-1440 ..= 1440).contains(&minutes) {
            return None;
        }
        let seconds = i32::from(minutes) * 60;
        UtcOffset::from_whole_seconds(seconds).ok().map(|offset| Self {
            offset,
        })
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl RunClock for SystemClock {
    fn today(&self) -> DiscoveryDate {
        DiscoveryDate::new(OffsetDateTime::now_utc().to_offset(self.offset).date())
    }

    fn now(&self) -> Timestamp {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        Timestamp::UnixMillis(i64::try_from(millis).unwrap_or(i64::MAX))
    }
}

// ============================================================================
// SECTION: Fixed Clock
// ============================================================================

/// Pinned run clock for tests.
///
/// # Invariants
/// - `today` always returns the configured date.
/// - `now` returns strictly increasing logical timestamps.
#[derive(Debug)]
pub struct FixedClock {
    /// Pinned discovery date.
    date: DiscoveryDate,
    /// Next logical tick.
    tick: AtomicU64,
}

impl FixedClock {
    /// Creates a clock pinned to `date`.
    #[must_use]
    pub const fn new(date: DiscoveryDate) -> Self {
        Self {
            date,
            tick: AtomicU64::new(0),
        }
    }
}

impl RunClock for FixedClock {
    fn today(&self) -> DiscoveryDate {
        self.date
    }

    fn now(&self) -> Timestamp {
        Timestamp::Logical(self.tick.fetch_add(1, Ordering::SeqCst))
    }
}
