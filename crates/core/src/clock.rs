// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wall clock abstraction.
//!
//! Suppression windows and refresh cool-downs are measured against a
//! [`ClockSource`] so tests can drive time by hand.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local, NaiveDate};

/// Trait for getting the current wall clock time.
///
/// This allows injecting a mock clock for testing.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;
}

/// System clock implementation using `std::time::SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
    }
}

impl<C: ClockSource + ?Sized> ClockSource for Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Shared clock handle used across the engine components.
pub type SharedClock = Arc<dyn ClockSource>;

/// Returns a shared handle to the system clock.
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// Calendar day, in local time, of a clock reading.
///
/// Day passes are valid for one service day.
pub fn service_day(now_ms: u64) -> NaiveDate {
    DateTime::from_timestamp_millis(now_ms as i64)
        .map(|t| t.with_timezone(&Local).date_naive())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
