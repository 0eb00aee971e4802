// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Injectable wall clock.
//!
//! Mutation timestamps define replay order, so the store reads time through
//! [`ClockSource`] instead of calling `Utc::now()` directly. Tests substitute a
//! [`ManualClock`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, Utc};

/// Trait for getting the current wall clock time.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> i64;

    /// Returns the current time as a UTC timestamp.
    fn now(&self) -> DateTime<Utc> {
        from_millis(self.now_ms())
    }
}

/// System clock implementation using `std::time::SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    time_ms: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `initial_ms`.
    pub fn new(initial_ms: i64) -> Self {
        ManualClock { time_ms: AtomicI64::new(initial_ms) }
    }

    /// Sets the current time.
    pub fn set(&self, ms: i64) {
        self.time_ms.store(ms, Ordering::SeqCst);
    }

    /// Moves the clock forward (or backward, for negative `ms`).
    pub fn advance(&self, ms: i64) {
        self.time_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> i64 {
        self.time_ms.load(Ordering::SeqCst)
    }
}

/// Converts milliseconds since epoch into a UTC timestamp, clamping
/// out-of-range values to the epoch.
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Canonical text form used for every timestamp written to the store.
///
/// Fixed-width millisecond precision in UTC, so lexicographic order equals
/// chronological order.
pub fn to_storage(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
