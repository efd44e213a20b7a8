// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical station data and the rules every desk request is checked against.
//!
//! [`Station`] is plain data: it serializes to the JSON snapshot as-is and
//! every request runs to completion under one lock held by the caller.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use station_core::entry::positions_are_contiguous;
use station_core::{
    AdmissionRequest, AuthorizedDestination, CapacityLedger, Confirmation, DestinationSummary,
    EmergencyRemoval, EntryStatus, GatewayError, GatewayResult, PositionAssignment, Price,
    PurchaseRequest, QueueEntry, Request, ResponseBody, SummaryFilter,
};
use tracing::{debug, info};

/// A destination served from this station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governorate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegation: Option<String>,
}

/// A registered vehicle and the routes it is licensed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub vehicle_id: String,
    pub capacity: u32,
    #[serde(default)]
    pub routes: Vec<AuthorizedDestination>,
}

/// A day pass sold at a desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassRecord {
    pub day: NaiveDate,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
}

/// A completed trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRecord {
    pub plate: String,
    pub destination_id: String,
    pub seats: u32,
    pub total: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
}

/// Result of one request: the reply and the destinations it changed.
#[derive(Debug)]
pub struct Applied {
    pub body: ResponseBody,
    pub changed: Vec<String>,
}

impl Applied {
    fn read(body: ResponseBody) -> Self {
        Applied { body, changed: Vec::new() }
    }

    fn changed(body: ResponseBody, destination_id: &str) -> Self {
        Applied { body, changed: vec![destination_id.to_string()] }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    #[serde(default)]
    pub destinations: BTreeMap<String, Destination>,
    #[serde(default)]
    pub vehicles: BTreeMap<String, Vehicle>,
    #[serde(default)]
    pub queues: BTreeMap<String, Vec<QueueEntry>>,
    #[serde(default)]
    pub passes: BTreeMap<String, PassRecord>,
    #[serde(default)]
    pub trips: Vec<TripRecord>,
    #[serde(default)]
    next_entry: u64,
}

fn not_found(what: impl Into<String>) -> GatewayError {
    GatewayError::NotFound(what.into())
}

fn rejected(why: impl Into<String>) -> GatewayError {
    GatewayError::Rejected(why.into())
}

fn locked(entry: &QueueEntry) -> GatewayError {
    rejected(format!(
        "vehicle {} is {} with {} booked seat(s) and must stay at position {}",
        entry.plate,
        entry.status,
        entry.booked_seats(),
        entry.position
    ))
}

fn renumber(queue: &mut [QueueEntry]) {
    for (i, entry) in queue.iter_mut().enumerate() {
        entry.position = i as u32 + 1;
    }
}

fn ok() -> ResponseBody {
    ResponseBody::Confirmation(Confirmation::default())
}

impl Station {
    pub fn add_destination(&mut self, id: &str, destination: Destination) {
        self.destinations.insert(id.to_string(), destination);
        self.queues.entry(id.to_string()).or_default();
    }

    pub fn add_vehicle(&mut self, plate: &str, vehicle: Vehicle) {
        self.vehicles.insert(plate.to_string(), vehicle);
    }

    /// Runs one request against the station. `today` decides day-pass validity.
    pub fn execute(&mut self, request: Request, today: NaiveDate) -> GatewayResult<Applied> {
        match request {
            Request::ListSummaries { filter } => {
                Ok(Applied::read(ResponseBody::Summaries { summaries: self.summaries(filter.as_ref()) }))
            }
            Request::GetQueue { destination_id } => {
                let entries = self
                    .queues
                    .get(&destination_id)
                    .cloned()
                    .ok_or_else(|| not_found(format!("destination {destination_id}")))?;
                Ok(Applied::read(ResponseBody::Queue { entries }))
            }
            Request::EnterQueue(admission) => self.enter_queue(admission, today),
            Request::ExitQueue { plate } => self.exit_queue(&plate),
            Request::TransferSeats { plate, destination_id } => {
                self.transfer_seats(&plate, &destination_id)
            }
            Request::EmergencyRemove { plate } => self.emergency_remove(&plate),
            Request::EndTrip { entry_id, staff_id } => self.end_trip(&entry_id, staff_id),
            Request::Reorder { destination_id, assignments } => {
                self.reorder(&destination_id, &assignments)
            }
            Request::MoveToFront { entry_id, destination_id } => {
                self.move_to_front(&entry_id, &destination_id)
            }
            Request::HasDayPass { plate } => {
                Ok(Applied::read(ResponseBody::DayPass { valid: self.has_pass(&plate, today) }))
            }
            Request::HasDayPassBatch { plates } => {
                let passes = plates
                    .into_iter()
                    .map(|plate| {
                        let valid = self.has_pass(&plate, today);
                        (plate, valid)
                    })
                    .collect();
                Ok(Applied::read(ResponseBody::DayPassBatch { passes }))
            }
            Request::PurchaseDayPass(purchase) => self.purchase(purchase, today),
            Request::AuthorizedDestinations { plate } => {
                let vehicle = self.vehicle(&plate)?;
                Ok(Applied::read(ResponseBody::Authorized { destinations: vehicle.routes.clone() }))
            }
            Request::BookSeats { entry_id, seats } => self.book_seats(&entry_id, seats),
            Request::Health => Ok(Applied::read(ResponseBody::Health { healthy: true })),
        }
    }

    pub fn summaries(&self, filter: Option<&SummaryFilter>) -> Vec<DestinationSummary> {
        self.destinations
            .iter()
            .map(|(id, d)| {
                let count = self.queues.get(id).map_or(0, Vec::len) as u32;
                DestinationSummary {
                    destination_id: id.clone(),
                    destination_name: d.name.clone(),
                    vehicle_count: count,
                    governorate: d.governorate.clone(),
                    delegation: d.delegation.clone(),
                }
            })
            .filter(|s| filter.is_none_or(|f| f.matches(s)))
            .collect()
    }

    fn vehicle(&self, plate: &str) -> GatewayResult<&Vehicle> {
        self.vehicles.get(plate).ok_or_else(|| not_found(format!("vehicle {plate}")))
    }

    fn has_pass(&self, plate: &str, today: NaiveDate) -> bool {
        self.passes.get(plate).is_some_and(|p| p.day == today)
    }

    /// Destination and index of the entry queued for `plate`.
    fn locate_plate(&self, plate: &str) -> GatewayResult<(String, usize)> {
        self.queues
            .iter()
            .find_map(|(dest, queue)| {
                queue.iter().position(|e| e.plate == plate).map(|i| (dest.clone(), i))
            })
            .ok_or_else(|| not_found(format!("vehicle {plate} is not queued")))
    }

    fn locate_entry(&self, entry_id: &str) -> GatewayResult<(String, usize)> {
        self.queues
            .iter()
            .find_map(|(dest, queue)| {
                queue.iter().position(|e| e.id == entry_id).map(|i| (dest.clone(), i))
            })
            .ok_or_else(|| not_found(format!("queue entry {entry_id}")))
    }

    fn queue_mut(&mut self, destination_id: &str) -> GatewayResult<&mut Vec<QueueEntry>> {
        self.queues
            .get_mut(destination_id)
            .ok_or_else(|| not_found(format!("destination {destination_id}")))
    }

    fn take(&mut self, destination_id: &str, index: usize) -> GatewayResult<QueueEntry> {
        let queue = self.queue_mut(destination_id)?;
        let entry = queue.remove(index);
        renumber(queue);
        Ok(entry)
    }

    fn enter_queue(&mut self, admission: AdmissionRequest, today: NaiveDate) -> GatewayResult<Applied> {
        let plate = admission.plate.trim();
        if plate.is_empty() {
            return Err(rejected("plate is required"));
        }
        let vehicle = self.vehicle(plate)?;
        let route = vehicle
            .routes
            .iter()
            .find(|r| r.station_id == admission.destination_id)
            .ok_or_else(|| {
                rejected(format!("vehicle {plate} not authorized for {}", admission.destination_id))
            })?;
        if !self.has_pass(plate, today) {
            return Err(rejected(format!("vehicle {plate} has no valid day pass")));
        }
        if let Ok((dest, _)) = self.locate_plate(plate) {
            return Err(rejected(format!("vehicle {plate} is already queued for {dest}")));
        }
        let destination_name = match self.destinations.get(&admission.destination_id) {
            Some(d) => d.name.clone(),
            None => return Err(not_found(format!("destination {}", admission.destination_id))),
        };

        let capacity = vehicle.capacity;
        let base_price = route.base_price;
        self.next_entry += 1;
        let id = format!("q{}", self.next_entry);
        let queue = self.queue_mut(&admission.destination_id)?;
        let entry = QueueEntry::new(
            id,
            admission.destination_id.clone(),
            destination_name,
            plate,
            queue.len() as u32 + 1,
            capacity,
        )
        .with_base_price(base_price);
        queue.push(entry.clone());

        info!(plate, destination = %admission.destination_id, position = entry.position, "vehicle admitted");
        Ok(Applied::changed(
            ResponseBody::Confirmation(Confirmation::with_entry(entry)),
            &admission.destination_id,
        ))
    }

    fn exit_queue(&mut self, plate: &str) -> GatewayResult<Applied> {
        let (dest, index) = self.locate_plate(plate)?;
        let booked = self.queues[&dest][index].booked_seats();
        if booked > 0 {
            return Err(GatewayError::BookedSeatsPresent {
                plate: plate.to_string(),
                booked_seats: booked,
            });
        }
        self.take(&dest, index)?;
        info!(plate, destination = %dest, "vehicle left the queue");
        Ok(Applied::changed(ok(), &dest))
    }

    /// Moves booked seats onto the following vehicles, then removes the source.
    fn transfer_seats(&mut self, plate: &str, destination_id: &str) -> GatewayResult<Applied> {
        let (dest, index) = self.locate_plate(plate)?;
        if dest != destination_id {
            return Err(rejected(format!("vehicle {plate} is queued for {dest}, not {destination_id}")));
        }
        let queue = self.queue_mut(&dest)?;
        let booked = queue[index].booked_seats();
        let spare: u32 = queue
            .iter()
            .enumerate()
            .filter(|(i, e)| *i != index && e.status != EntryStatus::Departed)
            .map(|(_, e)| e.available_seats)
            .sum();
        if spare < booked {
            return Err(rejected(format!(
                "only {spare} free seat(s) for {booked} booked passenger(s) on {dest}"
            )));
        }

        let mut left = booked;
        for (i, target) in queue.iter_mut().enumerate() {
            if left == 0 {
                break;
            }
            if i == index || target.status == EntryStatus::Departed {
                continue;
            }
            let moved = left.min(target.available_seats);
            if moved == 0 {
                continue;
            }
            target.available_seats -= moved;
            target.status = booked_status(target.status, target.available_seats);
            left -= moved;
            debug!(from = plate, to = %target.plate, seats = moved, "passengers transferred");
        }
        self.take(&dest, index)?;

        info!(plate, destination = %dest, seats = booked, "seats transferred, vehicle removed");
        let message = format!("{booked} seat(s) transferred");
        Ok(Applied::changed(ResponseBody::Confirmation(Confirmation::with_message(message)), &dest))
    }

    fn emergency_remove(&mut self, plate: &str) -> GatewayResult<Applied> {
        let (dest, index) = self.locate_plate(plate)?;
        let entry = self.take(&dest, index)?;
        let cancelled = entry.booked_seats();
        let total_refund = entry.base_price * cancelled;

        info!(plate, destination = %dest, cancelled, refund = %total_refund, "emergency removal");
        Ok(Applied::changed(
            ResponseBody::Removal(EmergencyRemoval { cancelled_bookings: cancelled, total_refund }),
            &dest,
        ))
    }

    fn end_trip(&mut self, entry_id: &str, staff_id: Option<String>) -> GatewayResult<Applied> {
        let (dest, index) = self.locate_entry(entry_id)?;
        let seats = self.queues[&dest][index].booked_seats();
        if seats == 0 {
            return Err(rejected(format!("entry {entry_id} has no seats booked")));
        }
        let entry = self.take(&dest, index)?;
        let total = entry.base_price * seats;
        self.trips.push(TripRecord {
            plate: entry.plate.clone(),
            destination_id: dest.clone(),
            seats,
            total,
            staff_id,
        });

        info!(plate = %entry.plate, destination = %dest, seats, total = %total, "trip ended");
        Ok(Applied::changed(ok(), &dest))
    }

    fn reorder(&mut self, destination_id: &str, assignments: &[PositionAssignment]) -> GatewayResult<Applied> {
        let queue = self.queue_mut(destination_id)?;
        let current: BTreeSet<&str> = queue.iter().map(|e| e.id.as_str()).collect();
        let requested: BTreeSet<&str> = assignments.iter().map(|a| a.entry_id.as_str()).collect();
        if requested.len() != assignments.len() || current != requested {
            return Err(rejected(format!(
                "reorder of {destination_id} must assign every queued entry exactly once"
            )));
        }

        let mut reordered = queue.clone();
        for entry in &mut reordered {
            if let Some(a) = assignments.iter().find(|a| a.entry_id == entry.id) {
                entry.position = a.position;
            }
        }
        if !positions_are_contiguous(&reordered) {
            return Err(rejected(format!("positions for {destination_id} must be 1..{}", reordered.len())));
        }
        let moved_locked = queue.iter().zip(&reordered).find(|(before, after)| {
            !CapacityLedger::can_reorder(before) && before.position != after.position
        });
        if let Some((entry, _)) = moved_locked {
            return Err(locked(entry));
        }
        reordered.sort_by_key(|e| e.position);
        *queue = reordered;

        debug!(destination = destination_id, count = assignments.len(), "queue reordered");
        Ok(Applied::changed(ok(), destination_id))
    }

    fn move_to_front(&mut self, entry_id: &str, destination_id: &str) -> GatewayResult<Applied> {
        let (dest, index) = self.locate_entry(entry_id)?;
        if dest != destination_id {
            return Err(rejected(format!("entry {entry_id} is not queued for {destination_id}")));
        }
        let queue = self.queue_mut(&dest)?;
        let target = &queue[index];
        if target.status != EntryStatus::Waiting {
            return Err(rejected(format!(
                "only WAITING vehicles can move to the front; {} is {}",
                target.plate, target.status
            )));
        }
        // The target and every entry ahead of it change position.
        if let Some(entry) = queue[..=index].iter().find(|e| !CapacityLedger::can_reorder(e)) {
            return Err(locked(entry));
        }
        let entry = queue.remove(index);
        queue.insert(0, entry);
        renumber(queue);
        Ok(Applied::changed(ok(), &dest))
    }

    fn purchase(&mut self, purchase: PurchaseRequest, today: NaiveDate) -> GatewayResult<Applied> {
        self.vehicle(&purchase.plate)?;
        if self.has_pass(&purchase.plate, today) {
            return Err(GatewayError::AlreadyHasDayPass(purchase.plate));
        }
        info!(plate = %purchase.plate, price = %purchase.price, "day pass sold");
        self.passes.insert(
            purchase.plate,
            PassRecord { day: today, price: purchase.price, staff_id: purchase.staff_id },
        );
        Ok(Applied::read(ok()))
    }

    fn book_seats(&mut self, entry_id: &str, seats: u32) -> GatewayResult<Applied> {
        let (dest, index) = self.locate_entry(entry_id)?;
        let queue = self.queue_mut(&dest)?;
        let entry = &mut queue[index];
        let remaining =
            CapacityLedger::check_booking(entry, seats).map_err(|e| rejected(e.to_string()))?;
        entry.available_seats = remaining;
        entry.status = booked_status(entry.status, remaining);
        debug!(entry = entry_id, seats, remaining, "seats booked");
        Ok(Applied::changed(ok(), &dest))
    }
}

/// Status after a sale leaves `remaining` seats.
fn booked_status(status: EntryStatus, remaining: u32) -> EntryStatus {
    match status {
        _ if remaining == 0 => EntryStatus::Ready,
        EntryStatus::Waiting => EntryStatus::Loading,
        other => other,
    }
}

#[cfg(test)]
#[path = "station_tests.rs"]
mod tests;
