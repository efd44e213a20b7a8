// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers: entry builders, a manual clock and an in-memory gateway.

#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::clock::ClockSource;
use crate::entry::{
    AuthorizedDestination, DestinationSummary, PositionAssignment, QueueEntry, SummaryFilter,
};
use crate::gateway::{
    AdmissionRequest, Confirmation, EmergencyRemoval, GatewayError, GatewayFuture, GatewayResult,
    PurchaseRequest, RemoteQueueGateway,
};
use crate::price::Price;
use crate::store::renumber;

/// Create an entry for `destination` at `position` with an 8-seat vehicle.
pub fn make_entry(destination: &str, id: &str, position: u32) -> QueueEntry {
    QueueEntry::new(
        id,
        destination,
        capitalize(destination),
        format!("{position}{}{}", destination.to_uppercase(), 100 + position),
        position,
        8,
    )
    .with_base_price(Price::from_millimes(8_500))
}

/// Create `n` entries for `destination` with ids `{prefix}1..{prefix}n`.
pub fn make_queue(destination: &str, prefix: &str, n: u32) -> Vec<QueueEntry> {
    (1..=n).map(|i| make_entry(destination, &format!("{prefix}{i}"), i)).collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn ids(entries: &[QueueEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.id.as_str()).collect()
}

pub fn positions(entries: &[QueueEntry]) -> Vec<u32> {
    entries.iter().map(|e| e.position).collect()
}

/// Mock clock for testing with controllable time.
pub struct ManualClock {
    time_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(initial_ms: u64) -> Arc<Self> {
        Arc::new(ManualClock { time_ms: AtomicU64::new(initial_ms) })
    }

    pub fn set(&self, ms: u64) {
        self.time_ms.store(ms, AtomicOrdering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.time_ms.fetch_add(ms, AtomicOrdering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(AtomicOrdering::SeqCst)
    }
}

#[derive(Default)]
struct MockState {
    queues: BTreeMap<String, Vec<QueueEntry>>,
    summaries: Option<Vec<DestinationSummary>>,
    passes: HashMap<String, bool>,
    authorized: Vec<AuthorizedDestination>,
    calls: Vec<String>,
    reorders: Vec<(String, Vec<PositionAssignment>)>,
    purchases: Vec<PurchaseRequest>,
    unavailable: bool,
    purchase_error: Option<GatewayError>,
    enter_error: Option<GatewayError>,
    reorder_error: Option<GatewayError>,
    next_id: u32,
}

/// In-memory gateway with scripted failures and an optional read gate.
///
/// When the gate is armed, `get_queue`, `list_destination_summaries` and
/// `purchase_day_pass` do their work immediately and then wait for
/// [`MockGateway::release`], which models a slow call racing a later one.
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(MockGateway::default())
    }

    pub fn with_queue(self: Arc<Self>, destination: &str, entries: Vec<QueueEntry>) -> Arc<Self> {
        self.set_queue(destination, entries);
        self
    }

    pub fn set_queue(&self, destination: &str, entries: Vec<QueueEntry>) {
        self.state.lock().unwrap().queues.insert(destination.to_string(), entries);
    }

    pub fn queue(&self, destination: &str) -> Vec<QueueEntry> {
        self.state.lock().unwrap().queues.get(destination).cloned().unwrap_or_default()
    }

    pub fn set_summaries(&self, summaries: Vec<DestinationSummary>) {
        self.state.lock().unwrap().summaries = Some(summaries);
    }

    pub fn set_pass(&self, plate: &str, valid: bool) {
        self.state.lock().unwrap().passes.insert(plate.to_string(), valid);
    }

    pub fn set_authorized(&self, authorized: Vec<AuthorizedDestination>) {
        self.state.lock().unwrap().authorized = authorized;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    pub fn fail_purchase(&self, err: GatewayError) {
        self.state.lock().unwrap().purchase_error = Some(err);
    }

    pub fn fail_enter(&self, err: GatewayError) {
        self.state.lock().unwrap().enter_error = Some(err);
    }

    pub fn fail_reorder(&self, err: GatewayError) {
        self.state.lock().unwrap().reorder_error = Some(err);
    }

    /// Names of every gateway method called, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }

    pub fn reorders(&self) -> Vec<(String, Vec<PositionAssignment>)> {
        self.state.lock().unwrap().reorders.clone()
    }

    pub fn purchases(&self) -> Vec<PurchaseRequest> {
        self.state.lock().unwrap().purchases.clone()
    }

    /// Makes subsequent reads and purchases wait until [`MockGateway::release`].
    pub fn hold_reads(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    /// Releases every read waiting on the gate and disarms it.
    pub fn release(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.notify_waiters();
        }
    }

    fn current_gate(&self) -> Option<Arc<Notify>> {
        self.gate.lock().unwrap().clone()
    }

    /// Records the call and returns the unavailable error if switched off.
    fn enter(&self, name: &str) -> GatewayResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(name.to_string());
        if state.unavailable {
            return Err(GatewayError::Unavailable("mock offline".into()));
        }
        Ok(())
    }

    fn remove_where<F: Fn(&QueueEntry) -> bool>(&self, pred: F) -> Option<QueueEntry> {
        let mut state = self.state.lock().unwrap();
        for queue in state.queues.values_mut() {
            if let Some(i) = queue.iter().position(&pred) {
                let removed = queue.remove(i);
                renumber(queue);
                return Some(removed);
            }
        }
        None
    }

    fn find_plate(&self, plate: &str) -> Option<QueueEntry> {
        let state = self.state.lock().unwrap();
        state.queues.values().flatten().find(|e| e.plate == plate).cloned()
    }
}

impl RemoteQueueGateway for MockGateway {
    fn list_destination_summaries(
        &self,
        filter: Option<&SummaryFilter>,
    ) -> GatewayFuture<'_, Vec<DestinationSummary>> {
        let filter = filter.cloned();
        Box::pin(async move {
            self.enter("list_destination_summaries")?;
            let summaries = {
                let state = self.state.lock().unwrap();
                match &state.summaries {
                    Some(s) => s.clone(),
                    None => state
                        .queues
                        .iter()
                        .map(|(dest, q)| {
                            let name = q.first().map_or(dest.clone(), |e| e.destination_name.clone());
                            DestinationSummary::new(dest, name, q.len() as u32)
                        })
                        .collect(),
                }
            };
            if let Some(gate) = self.current_gate() {
                gate.notified().await;
            }
            Ok(summaries
                .into_iter()
                .filter(|s| filter.as_ref().map_or(true, |f| f.matches(s)))
                .collect())
        })
    }

    fn get_queue(&self, destination_id: &str) -> GatewayFuture<'_, Vec<QueueEntry>> {
        let destination_id = destination_id.to_string();
        Box::pin(async move {
            self.enter("get_queue")?;
            let entries = self.queue(&destination_id);
            if let Some(gate) = self.current_gate() {
                gate.notified().await;
            }
            Ok(entries)
        })
    }

    fn enter_queue(&self, request: &AdmissionRequest) -> GatewayFuture<'_, Confirmation> {
        let request = request.clone();
        Box::pin(async move {
            self.enter("enter_queue")?;
            let mut state = self.state.lock().unwrap();
            if let Some(err) = state.enter_error.clone() {
                return Err(err);
            }
            state.next_id += 1;
            let id = format!("m-{}", state.next_id);
            let queue = state.queues.entry(request.destination_id.clone()).or_default();
            let name = request.destination_name.clone().unwrap_or_else(|| request.destination_id.clone());
            let entry = QueueEntry::new(
                id,
                &request.destination_id,
                name,
                &request.plate,
                queue.len() as u32 + 1,
                8,
            );
            queue.push(entry.clone());
            Ok(Confirmation::with_entry(entry))
        })
    }

    fn exit_queue(&self, plate: &str) -> GatewayFuture<'_, Confirmation> {
        let plate = plate.to_string();
        Box::pin(async move {
            self.enter("exit_queue")?;
            let entry =
                self.find_plate(&plate).ok_or_else(|| GatewayError::NotFound(plate.clone()))?;
            if entry.booked_seats() > 0 {
                return Err(GatewayError::BookedSeatsPresent {
                    plate,
                    booked_seats: entry.booked_seats(),
                });
            }
            self.remove_where(|e| e.plate == plate);
            Ok(Confirmation::with_message("removed"))
        })
    }

    fn transfer_seats_and_remove(
        &self,
        plate: &str,
        _destination_id: &str,
    ) -> GatewayFuture<'_, Confirmation> {
        let plate = plate.to_string();
        Box::pin(async move {
            self.enter("transfer_seats_and_remove")?;
            self.remove_where(|e| e.plate == plate)
                .map(|_| Confirmation::with_message("transferred"))
                .ok_or(GatewayError::NotFound(plate))
        })
    }

    fn emergency_remove(&self, plate: &str) -> GatewayFuture<'_, EmergencyRemoval> {
        let plate = plate.to_string();
        Box::pin(async move {
            self.enter("emergency_remove")?;
            let entry = self
                .remove_where(|e| e.plate == plate)
                .ok_or_else(|| GatewayError::NotFound(plate.clone()))?;
            Ok(EmergencyRemoval {
                cancelled_bookings: entry.booked_seats(),
                total_refund: entry.base_price * entry.booked_seats(),
            })
        })
    }

    fn end_trip(&self, entry_id: &str, _staff_id: Option<&str>) -> GatewayFuture<'_, Confirmation> {
        let entry_id = entry_id.to_string();
        Box::pin(async move {
            self.enter("end_trip")?;
            self.remove_where(|e| e.id == entry_id)
                .map(|_| Confirmation::with_message("trip ended"))
                .ok_or(GatewayError::NotFound(entry_id))
        })
    }

    fn reorder(
        &self,
        destination_id: &str,
        assignments: &[PositionAssignment],
    ) -> GatewayFuture<'_, Confirmation> {
        let destination_id = destination_id.to_string();
        let assignments = assignments.to_vec();
        Box::pin(async move {
            self.enter("reorder")?;
            let mut state = self.state.lock().unwrap();
            if let Some(err) = state.reorder_error.clone() {
                return Err(err);
            }
            state.reorders.push((destination_id.clone(), assignments.clone()));
            if let Some(queue) = state.queues.get_mut(&destination_id) {
                for a in &assignments {
                    if let Some(e) = queue.iter_mut().find(|e| e.id == a.entry_id) {
                        e.position = a.position;
                    }
                }
                queue.sort_by_key(|e| e.position);
            }
            Ok(Confirmation::default())
        })
    }

    fn move_to_front(
        &self,
        _entry_id: &str,
        _destination_id: &str,
    ) -> GatewayFuture<'_, Confirmation> {
        Box::pin(async move {
            self.enter("move_to_front")?;
            Ok(Confirmation::default())
        })
    }

    fn has_valid_day_pass(&self, plate: &str) -> GatewayFuture<'_, bool> {
        let plate = plate.to_string();
        Box::pin(async move {
            self.enter("has_valid_day_pass")?;
            Ok(self.state.lock().unwrap().passes.get(&plate).copied().unwrap_or(false))
        })
    }

    fn has_valid_day_pass_batch(
        &self,
        plates: &[String],
    ) -> GatewayFuture<'_, BTreeMap<String, bool>> {
        let plates = plates.to_vec();
        Box::pin(async move {
            self.enter("has_valid_day_pass_batch")?;
            let state = self.state.lock().unwrap();
            Ok(plates
                .into_iter()
                .map(|p| {
                    let valid = state.passes.get(&p).copied().unwrap_or(false);
                    (p, valid)
                })
                .collect())
        })
    }

    fn purchase_day_pass(&self, request: &PurchaseRequest) -> GatewayFuture<'_, Confirmation> {
        let request = request.clone();
        Box::pin(async move {
            self.enter("purchase_day_pass")?;
            let result = {
                let mut state = self.state.lock().unwrap();
                state.purchases.push(request.clone());
                match state.purchase_error.clone() {
                    Some(err) => Err(err),
                    None => {
                        state.passes.insert(request.plate, true);
                        Ok(Confirmation::with_message("day pass purchased"))
                    }
                }
            };
            if let Some(gate) = self.current_gate() {
                gate.notified().await;
            }
            result
        })
    }

    fn get_authorized_destinations(
        &self,
        _plate: &str,
    ) -> GatewayFuture<'_, Vec<AuthorizedDestination>> {
        Box::pin(async move {
            self.enter("get_authorized_destinations")?;
            Ok(self.state.lock().unwrap().authorized.clone())
        })
    }

    fn book_seats(&self, entry_id: &str, seats: u32) -> GatewayFuture<'_, Confirmation> {
        let entry_id = entry_id.to_string();
        Box::pin(async move {
            self.enter("book_seats")?;
            let mut state = self.state.lock().unwrap();
            let entry = state
                .queues
                .values_mut()
                .flatten()
                .find(|e| e.id == entry_id)
                .ok_or_else(|| GatewayError::NotFound(entry_id.clone()))?;
            if seats > entry.available_seats {
                return Err(GatewayError::Rejected("not enough seats".into()));
            }
            entry.available_seats -= seats;
            Ok(Confirmation::default())
        })
    }

    fn health_check(&self) -> GatewayFuture<'_, bool> {
        Box::pin(async move {
            self.enter("health_check")?;
            Ok(true)
        })
    }
}
