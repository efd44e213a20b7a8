// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic suppression of background overwrites.
//!
//! After a local mutation the affected vehicle is suppressed for a short
//! window. While the window is open, refresh results may not revert the
//! vehicle's locally-set status, position or seat counts. Expiry is lazy:
//! windows are checked (and dropped) when read, never swept.
//!
//! Plates are keyed case-insensitively, the way the store looks them up.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use tracing::trace;

use crate::clock::SharedClock;
use crate::entry::QueueEntry;
use crate::store::renumber;

/// Default suppression window.
pub const DEFAULT_SUPPRESSION: Duration = Duration::from_millis(2_500);

/// Canonical form of a plate for window and merge lookups.
pub fn plate_key(plate: &str) -> String {
    plate.to_ascii_uppercase()
}

pub struct SuppressionManager {
    clock: SharedClock,
    default_window: Duration,
    /// plate -> expiry in clock milliseconds
    windows: Mutex<HashMap<String, u64>>,
}

impl SuppressionManager {
    pub fn new(clock: SharedClock) -> Self {
        Self::with_default_window(clock, DEFAULT_SUPPRESSION)
    }

    pub fn with_default_window(clock: SharedClock, default_window: Duration) -> Self {
        SuppressionManager { clock, default_window, windows: Mutex::new(HashMap::new()) }
    }

    pub fn default_window(&self) -> Duration {
        self.default_window
    }

    fn windows(&self) -> std::sync::MutexGuard<'_, HashMap<String, u64>> {
        self.windows.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Opens (or extends) a window for `key`.
    ///
    /// A shorter request never shortens an already-open window.
    pub fn suppress(&self, key: &str, duration: Duration) {
        let expiry = self.clock.now_ms().saturating_add(duration.as_millis() as u64);
        let mut windows = self.windows();
        let slot = windows.entry(plate_key(key)).or_insert(expiry);
        if *slot < expiry {
            *slot = expiry;
        }
        trace!(key, expiry, "suppression window opened");
    }

    pub fn suppress_default(&self, key: &str) {
        self.suppress(key, self.default_window);
    }

    pub fn is_suppressed(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        let key = plate_key(key);
        let mut windows = self.windows();
        match windows.get(&key) {
            Some(expiry) if now < *expiry => true,
            Some(_) => {
                windows.remove(&key);
                false
            }
            None => false,
        }
    }

    /// Every key whose window is still open at this instant, in [`plate_key`] form.
    pub fn active_keys(&self) -> HashSet<String> {
        let now = self.clock.now_ms();
        let mut windows = self.windows();
        windows.retain(|_, expiry| now < *expiry);
        windows.keys().cloned().collect()
    }

    /// Number of windows currently held, expired or not.
    pub fn len(&self) -> usize {
        self.windows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Folds a fetched destination list into the local one.
///
/// For every suppressed plate:
/// - present locally and remotely: local status, position and seats win,
///   other fields come from the fetch
/// - present remotely only: withheld (a local removal is still in flight)
/// - present locally only: kept (a local admission is still in flight)
///
/// Unsuppressed entries are taken from the fetch. The result is renumbered
/// `1..=n`; when positions tie, the suppressed entry goes first.
pub fn merge_fetched(
    local: &[QueueEntry],
    fetched: Vec<QueueEntry>,
    suppressed: &HashSet<String>,
) -> Vec<QueueEntry> {
    if suppressed.is_empty() {
        let mut fetched = fetched;
        fetched.sort_by_key(|e| e.position);
        renumber(&mut fetched);
        return fetched;
    }

    let suppressed: HashSet<String> = suppressed.iter().map(|k| plate_key(k)).collect();
    let local_by_plate: HashMap<String, &QueueEntry> =
        local.iter().map(|e| (plate_key(&e.plate), e)).collect();
    let fetched_plates: HashSet<String> = fetched.iter().map(|e| plate_key(&e.plate)).collect();

    // (entry, suppressed) pairs
    let mut merged: Vec<(QueueEntry, bool)> = Vec::with_capacity(fetched.len());

    for remote in fetched {
        let key = plate_key(&remote.plate);
        if !suppressed.contains(&key) {
            merged.push((remote, false));
            continue;
        }
        match local_by_plate.get(&key) {
            Some(mine) => {
                let mut kept = remote;
                kept.status = mine.status;
                kept.position = mine.position;
                kept.available_seats = mine.available_seats;
                kept.total_seats = mine.total_seats;
                merged.push((kept, true));
            }
            None => trace!(plate = %remote.plate, "withholding entry removed locally"),
        }
    }

    for mine in local {
        let key = plate_key(&mine.plate);
        if suppressed.contains(&key) && !fetched_plates.contains(&key) {
            merged.push((mine.clone(), true));
        }
    }

    merged.sort_by(|(a, a_sup), (b, b_sup)| a.position.cmp(&b.position).then(b_sup.cmp(a_sup)));
    let mut entries: Vec<QueueEntry> = merged.into_iter().map(|(e, _)| e).collect();
    renumber(&mut entries);
    entries
}

#[cfg(test)]
#[path = "suppression_tests.rs"]
mod tests;
