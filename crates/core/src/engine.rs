// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch desk facade.
//!
//! [`DispatchEngine`] wires one store, one suppression manager and one
//! gateway into the scheduler and coordinators. Mutating actions resolve to
//! an [`ActionOutcome`] instead of an error; a successful action has already
//! registered its suppression window and triggers a refresh of the
//! destination it touched.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::capacity::CapacityLedger;
use crate::clock::{system_clock, SharedClock};
use crate::config::EngineConfig;
use crate::daypass::DayPassCoordinator;
use crate::entry::{AuthorizedDestination, DestinationSummary, EntryPatch, EntryStatus, QueueEntry};
use crate::error::{Error, RemovalAlternative, Result};
use crate::gateway::{AdmissionRequest, RemoteQueueGateway};
use crate::reorder::ReorderCoordinator;
use crate::route::RouteTable;
use crate::scheduler::{Health, SyncScheduler};
use crate::store::{SharedStore, StoreEvent};
use crate::suppression::SuppressionManager;

/// Result of a mutating desk action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    /// Guided alternatives when a removal was refused.
    pub alternatives: Vec<RemovalAlternative>,
}

impl ActionOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        ActionOutcome { success: true, message: message.into(), alternatives: Vec::new() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ActionOutcome { success: false, message: message.into(), alternatives: Vec::new() }
    }
}

impl From<Result<String>> for ActionOutcome {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(message) => ActionOutcome::ok(message),
            Err(e) => {
                let alternatives = match &e {
                    Error::Conflict { alternatives, .. } => alternatives.clone(),
                    _ => Vec::new(),
                };
                ActionOutcome { success: false, message: e.to_string(), alternatives }
            }
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub struct DispatchEngine<G> {
    gateway: Arc<G>,
    store: SharedStore,
    suppression: Arc<SuppressionManager>,
    scheduler: Arc<SyncScheduler<G>>,
    reorder: ReorderCoordinator<G>,
    passes: DayPassCoordinator<G>,
    routes: RouteTable,
    config: EngineConfig,
    staff_id: Option<String>,
}

impl<G: RemoteQueueGateway> DispatchEngine<G> {
    pub fn new(gateway: Arc<G>, config: EngineConfig) -> Self {
        Self::with_clock(gateway, config, system_clock())
    }

    pub fn with_clock(gateway: Arc<G>, config: EngineConfig, clock: SharedClock) -> Self {
        let store = SharedStore::default();
        let suppression =
            Arc::new(SuppressionManager::with_default_window(clock.clone(), config.suppression()));
        let scheduler = Arc::new(SyncScheduler::new(
            gateway.clone(),
            store.clone(),
            suppression.clone(),
            clock.clone(),
            config.cooldown(),
        ));
        let reorder = ReorderCoordinator::new(gateway.clone(), store.clone(), suppression.clone());
        let passes = DayPassCoordinator::new(
            gateway.clone(),
            store.clone(),
            suppression.clone(),
            clock,
            config.day_pass_price,
        );

        DispatchEngine {
            gateway,
            store,
            suppression,
            scheduler,
            reorder,
            passes,
            routes: config.route_table(),
            config,
            staff_id: None,
        }
    }

    /// Staff id attached to admissions, purchases and trip settlements.
    pub fn with_staff(mut self, staff_id: impl Into<String>) -> Self {
        self.staff_id = Some(staff_id.into());
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<SyncScheduler<G>> {
        &self.scheduler
    }

    pub fn day_passes(&self) -> &DayPassCoordinator<G> {
        &self.passes
    }

    /// Entries of one destination, ordered by position.
    pub fn snapshot(&self, destination_id: &str) -> Vec<QueueEntry> {
        self.store.get(destination_id)
    }

    pub fn summaries(&self) -> Vec<DestinationSummary> {
        self.store.summaries()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    pub fn health(&self) -> Health {
        self.scheduler.health()
    }

    fn staff(&self) -> Option<&str> {
        self.staff_id.as_deref()
    }

    fn finish(&self, action: &str, result: Result<String>) -> ActionOutcome {
        self.scheduler.observe(&result);
        if let Err(e) = &result {
            warn!(action, error = %e, "desk action failed");
        }
        result.into()
    }

    /// Refreshes the destination a mutation touched; failures only degrade health.
    async fn settle(&self, destination_id: &str) {
        if let Err(e) = self.scheduler.refresh_destination(destination_id).await {
            debug!(destination = destination_id, error = %e, "post-action refresh failed");
        }
    }

    fn queued(&self, plate: &str) -> Option<QueueEntry> {
        self.store.lock().find_by_plate(plate).cloned()
    }

    fn queued_entry(&self, entry_id: &str) -> Result<QueueEntry> {
        self.store
            .lock()
            .entry(entry_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("queue entry {entry_id}")))
    }

    /// Drops a removed vehicle locally and shields it from stale reads.
    fn forget(&self, plate: &str) {
        self.suppression.suppress_default(plate);
        self.store.lock().remove_plate(plate);
    }

    pub async fn enter_queue(
        &self,
        plate: &str,
        destination_id: &str,
        destination_name: Option<&str>,
    ) -> ActionOutcome {
        let result = self.try_enter_queue(plate, destination_id, destination_name).await;
        self.finish("enter_queue", result)
    }

    async fn try_enter_queue(
        &self,
        plate: &str,
        destination_id: &str,
        destination_name: Option<&str>,
    ) -> Result<String> {
        let request = AdmissionRequest {
            plate: plate.to_string(),
            destination_id: destination_id.to_string(),
            destination_name: destination_name.map(str::to_string),
            staff_id: self.staff_id.clone(),
        };
        let admission = self.passes.enter_queue(&request).await?;
        self.settle(destination_id).await;

        let position = self.queued(plate).map(|e| e.position);
        let mut message = match position {
            Some(p) => format!("{plate} entered the {destination_id} queue at position {p}"),
            None => format!("{plate} entered the {destination_id} queue"),
        };
        if admission.purchased_pass {
            message.push_str(&format!(" (day pass purchased for {})", self.passes.price()));
        }
        Ok(message)
    }

    /// Removes a vehicle with no booked seats.
    pub async fn exit_queue(&self, plate: &str) -> ActionOutcome {
        let result = self.try_exit_queue(plate).await;
        self.finish("exit_queue", result)
    }

    async fn try_exit_queue(&self, plate: &str) -> Result<String> {
        let entry = self.queued(plate);
        if let Some(entry) = &entry {
            CapacityLedger::removal_plan(entry)?;
        }

        self.gateway.exit_queue(plate).await?;
        self.forget(plate);
        if let Some(entry) = &entry {
            self.settle(&entry.destination_id).await;
        }
        Ok(format!("{plate} left the queue"))
    }

    /// Hands booked passengers to the next vehicle, then removes this one.
    pub async fn transfer_seats_and_remove(&self, plate: &str) -> ActionOutcome {
        let result = self.try_transfer(plate).await;
        self.finish("transfer_seats_and_remove", result)
    }

    async fn try_transfer(&self, plate: &str) -> Result<String> {
        let entry = self
            .queued(plate)
            .ok_or_else(|| Error::NotFound(format!("vehicle {plate} is not queued")))?;

        self.gateway.transfer_seats_and_remove(plate, &entry.destination_id).await?;
        self.forget(plate);
        self.settle(&entry.destination_id).await;
        Ok(format!("{} seat(s) transferred; {plate} left the queue", entry.booked_seats()))
    }

    /// Cancels every booking on a vehicle and removes it.
    pub async fn emergency_remove(&self, plate: &str) -> ActionOutcome {
        let result = self.try_emergency_remove(plate).await;
        self.finish("emergency_remove", result)
    }

    async fn try_emergency_remove(&self, plate: &str) -> Result<String> {
        let entry = self.queued(plate);
        let removal = self.gateway.emergency_remove(plate).await?;
        self.forget(plate);
        if let Some(entry) = &entry {
            self.settle(&entry.destination_id).await;
        }
        Ok(format!(
            "{plate} removed: {} booking(s) cancelled, {} refunded",
            removal.cancelled_bookings, removal.total_refund
        ))
    }

    /// Settles and removes a vehicle with booked seats. Not reversible.
    pub async fn end_trip(&self, entry_id: &str) -> ActionOutcome {
        let result = self.try_end_trip(entry_id).await;
        self.finish("end_trip", result)
    }

    async fn try_end_trip(&self, entry_id: &str) -> Result<String> {
        let entry = self.queued_entry(entry_id)?;
        let settlement = CapacityLedger::settle_trip(&entry, &self.routes)?;

        self.gateway.end_trip(entry_id, self.staff()).await?;
        self.forget(&entry.plate);
        self.settle(&entry.destination_id).await;
        Ok(format!(
            "trip ended for {}: {} seat(s) at {}, total {}",
            settlement.plate, settlement.booked_seats, settlement.seat_price, settlement.total
        ))
    }

    /// Sells seats on a queued vehicle.
    pub async fn book_seats(&self, entry_id: &str, seats: u32) -> ActionOutcome {
        let result = self.try_book_seats(entry_id, seats).await;
        self.finish("book_seats", result)
    }

    async fn try_book_seats(&self, entry_id: &str, seats: u32) -> Result<String> {
        let entry = self.queued_entry(entry_id)?;
        let remaining = CapacityLedger::check_booking(&entry, seats)?;

        self.gateway.book_seats(entry_id, seats).await?;

        let mut patch = EntryPatch::available_seats(remaining);
        patch.status = match entry.status {
            _ if remaining == 0 => Some(EntryStatus::Ready),
            EntryStatus::Waiting => Some(EntryStatus::Loading),
            _ => None,
        };
        self.suppression.suppress_default(&entry.plate);
        if let Err(e) = self.store.lock().apply_patch(entry_id, &patch) {
            debug!(entry = entry_id, error = %e, "booking not applied locally");
        }
        self.settle(&entry.destination_id).await;
        Ok(format!("{seats} seat(s) booked on {}, {remaining} left", entry.plate))
    }

    /// Applies a complete new order for a destination.
    pub async fn reorder(&self, destination_id: &str, ordered_ids: &[String]) -> ActionOutcome {
        let result = self.try_reorder(destination_id, ordered_ids).await;
        self.finish("reorder", result)
    }

    async fn try_reorder(&self, destination_id: &str, ordered_ids: &[String]) -> Result<String> {
        let assignments = self.reorder.reorder(destination_id, ordered_ids).await?;
        self.settle(destination_id).await;
        Ok(format!("{destination_id} reordered ({} vehicle(s))", assignments.len()))
    }

    pub async fn move_to_front(&self, entry_id: &str, destination_id: &str) -> ActionOutcome {
        let result = self.try_move_to_front(entry_id, destination_id).await;
        self.finish("move_to_front", result)
    }

    async fn try_move_to_front(&self, entry_id: &str, destination_id: &str) -> Result<String> {
        let assignments = self.reorder.move_to_front(entry_id, destination_id).await?;
        if assignments.is_empty() {
            return Ok(format!("{entry_id} is already at the front"));
        }
        self.settle(destination_id).await;
        Ok(format!("{entry_id} moved to the front of {destination_id}"))
    }

    /// Drops `dragged_id` onto the slot held by `target_id`.
    pub async fn drag(&self, destination_id: &str, dragged_id: &str, target_id: &str) -> ActionOutcome {
        let result = self.try_drag(destination_id, dragged_id, target_id).await;
        self.finish("drag", result)
    }

    async fn try_drag(&self, destination_id: &str, dragged_id: &str, target_id: &str) -> Result<String> {
        let assignments = self.reorder.drag(destination_id, dragged_id, target_id).await?;
        if assignments.is_empty() {
            return Ok(format!("{dragged_id} stays in place"));
        }
        self.settle(destination_id).await;
        Ok(format!("{dragged_id} moved in {destination_id}"))
    }

    /// Destinations a vehicle may serve, default first then by priority.
    pub async fn authorized_destinations(&self, plate: &str) -> Result<Vec<AuthorizedDestination>> {
        let result: Result<_> =
            self.gateway.get_authorized_destinations(plate).await.map_err(Into::into);
        self.scheduler.observe(&result);
        let mut destinations = result?;
        destinations.sort_by_key(|d| (!d.is_default, d.priority));
        Ok(destinations)
    }

    /// Loads summaries (and unloaded destinations) once.
    pub async fn refresh(&self) -> Result<()> {
        self.scheduler.refresh_summaries().await.map(|_| ())
    }

    /// Stops background refresh.
    pub fn stop(&self) {
        self.scheduler.stop();
    }
}

impl<G: RemoteQueueGateway + 'static> DispatchEngine<G> {
    /// Starts background summary refresh at the configured interval.
    pub fn start(&self) -> bool {
        self.scheduler.schedule_recurring(self.config.summary_interval())
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
