// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Core queue types for the dispatch desk.
//!
//! This module contains the fundamental data types: QueueEntry, EntryStatus,
//! DestinationSummary and the companion VehicleRecord.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::price::Price;

/// Loading state of a vehicle in a destination queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    /// In line, no seats committed yet. Initial state for admitted vehicles.
    Waiting,
    /// At the head of the line, selling seats.
    Loading,
    /// Full (or declared full) and about to leave.
    Ready,
    /// Left the station.
    Departed,
}

impl EntryStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Waiting => "WAITING",
            EntryStatus::Loading => "LOADING",
            EntryStatus::Ready => "READY",
            EntryStatus::Departed => "DEPARTED",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "WAITING" => Ok(EntryStatus::Waiting),
            "LOADING" => Ok(EntryStatus::Loading),
            "READY" => Ok(EntryStatus::Ready),
            "DEPARTED" => Ok(EntryStatus::Departed),
            _ => Err(Error::ValidationFailure(format!(
                "invalid status: '{s}'\n  hint: valid statuses are: WAITING, LOADING, READY, DEPARTED"
            ))),
        }
    }
}

/// One vehicle's place in one destination's line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: String,
    pub destination_id: String,
    pub destination_name: String,
    pub plate: String,
    /// 1-based, contiguous within the destination.
    pub position: u32,
    pub available_seats: u32,
    pub total_seats: u32,
    pub status: EntryStatus,
    /// Fare per seat.
    pub base_price: Price,
}

impl QueueEntry {
    /// Creates a WAITING entry with every seat available.
    pub fn new(
        id: impl Into<String>,
        destination_id: impl Into<String>,
        destination_name: impl Into<String>,
        plate: impl Into<String>,
        position: u32,
        total_seats: u32,
    ) -> Self {
        QueueEntry {
            id: id.into(),
            destination_id: destination_id.into(),
            destination_name: destination_name.into(),
            plate: plate.into(),
            position,
            available_seats: total_seats,
            total_seats,
            status: EntryStatus::Waiting,
            base_price: Price::ZERO,
        }
    }

    pub fn with_status(mut self, status: EntryStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_available(mut self, available_seats: u32) -> Self {
        self.available_seats = available_seats;
        self
    }

    pub fn with_base_price(mut self, base_price: Price) -> Self {
        self.base_price = base_price;
        self
    }

    /// Seats already sold on this vehicle.
    pub fn booked_seats(&self) -> u32 {
        self.total_seats.saturating_sub(self.available_seats)
    }

    /// Checks the per-entry capacity invariant.
    pub fn validate_capacity(&self) -> Result<()> {
        if self.total_seats == 0 {
            return Err(Error::ValidationFailure(format!(
                "entry {} ({}) has no seats",
                self.id, self.plate
            )));
        }
        if self.available_seats > self.total_seats {
            return Err(Error::ValidationFailure(format!(
                "entry {} ({}) has {} available of {} seats",
                self.id, self.plate, self.available_seats, self.total_seats
            )));
        }
        Ok(())
    }
}

/// Partial update merged into one entry by [`crate::store::QueueStateStore::apply_patch`].
///
/// Positions are deliberately absent; they only change through a full replace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EntryStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_seats: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_seats: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<Price>,
}

impl EntryPatch {
    pub fn status(status: EntryStatus) -> Self {
        EntryPatch { status: Some(status), ..Default::default() }
    }

    pub fn available_seats(available_seats: u32) -> Self {
        EntryPatch { available_seats: Some(available_seats), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        *self == EntryPatch::default()
    }

    /// Returns a copy of `entry` with this patch applied.
    pub fn applied_to(&self, entry: &QueueEntry) -> QueueEntry {
        let mut patched = entry.clone();
        if let Some(status) = self.status {
            patched.status = status;
        }
        if let Some(available) = self.available_seats {
            patched.available_seats = available;
        }
        if let Some(total) = self.total_seats {
            patched.total_seats = total;
        }
        if let Some(price) = self.base_price {
            patched.base_price = price;
        }
        patched
    }
}

/// Aggregate view of one destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationSummary {
    pub destination_id: String,
    pub destination_name: String,
    pub vehicle_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governorate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegation: Option<String>,
}

impl DestinationSummary {
    pub fn new(
        destination_id: impl Into<String>,
        destination_name: impl Into<String>,
        vehicle_count: u32,
    ) -> Self {
        DestinationSummary {
            destination_id: destination_id.into(),
            destination_name: destination_name.into(),
            vehicle_count,
            governorate: None,
            delegation: None,
        }
    }

    pub fn with_region(mut self, governorate: &str, delegation: Option<&str>) -> Self {
        self.governorate = Some(governorate.to_string());
        self.delegation = delegation.map(str::to_string);
        self
    }
}

/// Geographic filter for summary listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governorate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegation: Option<String>,
}

impl SummaryFilter {
    /// Case-insensitive match on every field that is set.
    pub fn matches(&self, summary: &DestinationSummary) -> bool {
        fn field_matches(want: &Option<String>, have: &Option<String>) -> bool {
            match (want, have) {
                (None, _) => true,
                (Some(w), Some(h)) => w.eq_ignore_ascii_case(h),
                (Some(_), None) => false,
            }
        }
        field_matches(&self.governorate, &summary.governorate)
            && field_matches(&self.delegation, &summary.delegation)
    }
}

/// Companion vehicle list entry, carrying the cached day-pass flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub plate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    /// `None` until checked.
    #[serde(default)]
    pub has_day_pass: Option<bool>,
}

impl VehicleRecord {
    pub fn new(plate: impl Into<String>) -> Self {
        VehicleRecord { plate: plate.into(), vehicle_id: None, has_day_pass: None }
    }
}

/// New position for one entry in a batched reorder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionAssignment {
    pub entry_id: String,
    pub position: u32,
}

impl PositionAssignment {
    pub fn new(entry_id: impl Into<String>, position: u32) -> Self {
        PositionAssignment { entry_id: entry_id.into(), position }
    }
}

/// A destination a vehicle is licensed to serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedDestination {
    pub station_id: String,
    pub station_name: String,
    pub base_price: Price,
    pub is_default: bool,
    pub priority: u32,
}

/// Checks that positions form exactly `1..=n`.
pub fn positions_are_contiguous(entries: &[QueueEntry]) -> bool {
    let mut positions: Vec<u32> = entries.iter().map(|e| e.position).collect();
    positions.sort_unstable();
    positions.iter().enumerate().all(|(i, p)| *p as usize == i + 1)
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
