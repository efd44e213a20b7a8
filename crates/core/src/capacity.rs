// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Seat accounting and eligibility rules.
//!
//! The ledger is pure: it reads entries and answers whether a transition is
//! allowed. The engine performs the gateway call and the store mutation.

use crate::entry::{EntryStatus, QueueEntry};
use crate::error::{Error, RemovalAlternative, Result};
use crate::price::Price;
use crate::route::RouteTable;

/// Settlement of a finished trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripSettlement {
    pub entry_id: String,
    pub plate: String,
    pub booked_seats: u32,
    pub seat_price: Price,
    pub total: Price,
}

pub struct CapacityLedger;

impl CapacityLedger {
    pub fn booked_seats(entry: &QueueEntry) -> u32 {
        entry.booked_seats()
    }

    /// Direct removal is only allowed with no seats sold.
    pub fn can_remove(entry: &QueueEntry) -> bool {
        Self::booked_seats(entry) == 0
    }

    /// Only uncommitted WAITING/LOADING entries may be shifted.
    pub fn can_reorder(entry: &QueueEntry) -> bool {
        matches!(entry.status, EntryStatus::Waiting | EntryStatus::Loading)
            && Self::booked_seats(entry) == 0
    }

    /// Ok when the entry may leave directly, else the guided alternatives.
    pub fn removal_plan(entry: &QueueEntry) -> Result<()> {
        if Self::can_remove(entry) {
            return Ok(());
        }
        Err(Error::Conflict {
            plate: entry.plate.clone(),
            booked_seats: Self::booked_seats(entry),
            alternatives: vec![RemovalAlternative::TransferSeats, RemovalAlternative::EmergencyRemove],
        })
    }

    /// Checks that `seats` more can be sold on the entry.
    pub fn check_booking(entry: &QueueEntry, seats: u32) -> Result<u32> {
        if seats == 0 {
            return Err(Error::ValidationFailure("cannot book zero seats".to_string()));
        }
        if entry.status == EntryStatus::Departed {
            return Err(Error::ValidationFailure(format!("vehicle {} has departed", entry.plate)));
        }
        if seats > entry.available_seats {
            return Err(Error::ValidationFailure(format!(
                "vehicle {} has only {} seat(s) left",
                entry.plate, entry.available_seats
            )));
        }
        Ok(entry.available_seats - seats)
    }

    /// Computes what a trip is worth, rejecting trips with no bookings.
    ///
    /// The per-seat price comes from the entry, falling back to the route
    /// table when the entry carries none.
    pub fn settle_trip(entry: &QueueEntry, routes: &RouteTable) -> Result<TripSettlement> {
        let booked = Self::booked_seats(entry);
        if booked == 0 {
            return Err(Error::ValidationFailure(format!(
                "cannot end trip for {}: no seats booked",
                entry.plate
            )));
        }

        let seat_price = if entry.base_price.is_zero() {
            routes.price_for(&entry.destination_name).unwrap_or(Price::ZERO)
        } else {
            entry.base_price
        };
        let total = seat_price.checked_mul(booked).ok_or_else(|| {
            Error::ValidationFailure(format!("trip total overflows for {}", entry.plate))
        })?;

        Ok(TripSettlement {
            entry_id: entry.id.clone(),
            plate: entry.plate.clone(),
            booked_seats: booked,
            seat_price,
            total,
        })
    }
}

#[cfg(test)]
#[path = "capacity_tests.rs"]
mod tests;
