// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical client-side queue state.
//!
//! [`QueueStateStore`] owns every destination's entries, the destination
//! summaries and the companion vehicle list. All mutation goes through its
//! methods, which enforce:
//! - positions within a destination are exactly `1..=n`
//! - ids and plates are unique within a destination
//! - `available_seats <= total_seats` and `total_seats > 0`
//!
//! Fetch results carry a per-destination sequence number. A result is only
//! applied when nothing fresher (a later fetch or a local replace) has been
//! applied since its request was issued.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::entry::{
    positions_are_contiguous, DestinationSummary, EntryPatch, QueueEntry, VehicleRecord,
};
use crate::error::{Error, Result};

/// Change notification emitted after every successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    QueueReplaced { destination_id: String },
    EntryAdmitted { destination_id: String, entry_id: String },
    EntryPatched { destination_id: String, entry_id: String },
    EntryRemoved { destination_id: String, entry_id: String },
    SummariesReplaced,
    VehicleUpdated { plate: String },
}

/// Proof that a fetch was issued, used to judge freshness on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    destination_id: String,
    seq: u64,
}

impl FetchTicket {
    pub fn destination_id(&self) -> &str {
        &self.destination_id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Issued/applied sequence pair for one fetch stream.
#[derive(Debug, Clone, Copy, Default)]
struct Freshness {
    issued: u64,
    applied: u64,
}

impl Freshness {
    fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Everything issued so far is now older than the applied state.
    fn supersede_in_flight(&mut self) {
        self.applied = self.issued;
    }
}

pub struct QueueStateStore {
    queues: BTreeMap<String, Vec<QueueEntry>>,
    summaries: BTreeMap<String, DestinationSummary>,
    vehicles: BTreeMap<String, VehicleRecord>,
    queue_freshness: HashMap<String, Freshness>,
    summary_freshness: Freshness,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for QueueStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueStateStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        QueueStateStore {
            queues: BTreeMap::new(),
            summaries: BTreeMap::new(),
            vehicles: BTreeMap::new(),
            queue_freshness: HashMap::new(),
            summary_freshness: Freshness::default(),
            events,
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    /// Entries of a destination ordered by position.
    pub fn get(&self, destination_id: &str) -> Vec<QueueEntry> {
        self.queues.get(destination_id).cloned().unwrap_or_default()
    }

    /// Number of entries loaded for a destination.
    pub fn loaded_count(&self, destination_id: &str) -> usize {
        self.queues.get(destination_id).map_or(0, Vec::len)
    }

    /// Destinations with loaded detail lists.
    pub fn destinations(&self) -> Vec<String> {
        self.queues.keys().cloned().collect()
    }

    pub fn entry(&self, entry_id: &str) -> Option<&QueueEntry> {
        self.queues.values().flatten().find(|e| e.id == entry_id)
    }

    pub fn find_by_plate(&self, plate: &str) -> Option<&QueueEntry> {
        self.queues.values().flatten().find(|e| e.plate.eq_ignore_ascii_case(plate))
    }

    /// Atomically swaps a destination's entry list.
    ///
    /// Invalid lists are rejected without touching state. A successful local
    /// replace supersedes every fetch issued before it.
    pub fn replace(&mut self, destination_id: &str, entries: Vec<QueueEntry>) -> Result<()> {
        let entries = validate_queue(destination_id, entries).inspect_err(|e| {
            warn!(destination = destination_id, error = %e, "rejected queue replace");
        })?;
        self.supersede_fetches(destination_id);
        self.install(destination_id, entries);
        Ok(())
    }

    /// Marks every fetch issued so far for a destination as stale.
    fn supersede_fetches(&mut self, destination_id: &str) {
        self.queue_freshness.entry(destination_id.to_string()).or_default().supersede_in_flight();
    }

    /// Issues a sequence number for a detail fetch of one destination.
    pub fn begin_fetch(&mut self, destination_id: &str) -> FetchTicket {
        let seq = self.queue_freshness.entry(destination_id.to_string()).or_default().issue();
        FetchTicket { destination_id: destination_id.to_string(), seq }
    }

    /// Applies a fetch result if it is still the freshest.
    ///
    /// `merge` receives the current local entries and returns the list to
    /// install. Returns `Ok(false)` when the ticket was superseded.
    pub fn commit_fetch<F>(&mut self, ticket: &FetchTicket, merge: F) -> Result<bool>
    where
        F: FnOnce(&[QueueEntry]) -> Vec<QueueEntry>,
    {
        let destination_id = ticket.destination_id.as_str();
        let freshness = self.queue_freshness.get(destination_id).copied().unwrap_or_default();
        if ticket.seq <= freshness.applied {
            debug!(
                destination = destination_id,
                seq = ticket.seq,
                applied = freshness.applied,
                "discarding superseded fetch"
            );
            return Ok(false);
        }

        let local = self.queues.get(destination_id).map(Vec::as_slice).unwrap_or(&[]);
        let merged = merge(local);
        let entries = validate_queue(destination_id, merged).inspect_err(|e| {
            warn!(destination = destination_id, error = %e, "rejected fetched queue");
        })?;

        if let Some(f) = self.queue_freshness.get_mut(destination_id) {
            f.applied = ticket.seq;
        }
        self.install(destination_id, entries);
        Ok(true)
    }

    fn install(&mut self, destination_id: &str, entries: Vec<QueueEntry>) {
        self.queues.insert(destination_id.to_string(), entries);
        self.recompute_summary(destination_id);
        self.emit(StoreEvent::QueueReplaced { destination_id: destination_id.to_string() });
    }

    /// Merges a partial update into one entry.
    ///
    /// Like every local mutation, this supersedes fetches already in flight.
    pub fn apply_patch(&mut self, entry_id: &str, patch: &EntryPatch) -> Result<QueueEntry> {
        let (destination_id, index) = self
            .locate(entry_id)
            .ok_or_else(|| Error::NotFound(format!("queue entry {entry_id}")))?;

        let queue = self.queues.get_mut(&destination_id).ok_or_else(|| {
            Error::NotFound(format!("destination {destination_id}"))
        })?;
        let patched = patch.applied_to(&queue[index]);
        patched.validate_capacity()?;
        queue[index] = patched.clone();
        self.supersede_fetches(&destination_id);

        self.emit(StoreEvent::EntryPatched { destination_id, entry_id: entry_id.to_string() });
        Ok(patched)
    }

    /// Removes an entry and closes the gap it leaves.
    pub fn remove(&mut self, entry_id: &str) -> Result<QueueEntry> {
        let (destination_id, index) = self
            .locate(entry_id)
            .ok_or_else(|| Error::NotFound(format!("queue entry {entry_id}")))?;

        let queue = self.queues.get_mut(&destination_id).ok_or_else(|| {
            Error::NotFound(format!("destination {destination_id}"))
        })?;
        let removed = queue.remove(index);
        renumber(queue);

        self.supersede_fetches(&destination_id);
        self.recompute_summary(&destination_id);
        self.emit(StoreEvent::EntryRemoved { destination_id, entry_id: entry_id.to_string() });
        Ok(removed)
    }

    /// Removes the entry for a plate, if queued anywhere.
    pub fn remove_plate(&mut self, plate: &str) -> Option<QueueEntry> {
        let entry_id = self.find_by_plate(plate)?.id.clone();
        self.remove(&entry_id).ok()
    }

    /// Admits an entry at the tail of its destination.
    pub fn append(&mut self, mut entry: QueueEntry) -> Result<QueueEntry> {
        if let Some(existing) = self.find_by_plate(&entry.plate) {
            return Err(Error::ValidationFailure(format!(
                "vehicle {} is already queued for {}",
                entry.plate, existing.destination_name
            )));
        }
        entry.validate_capacity()?;

        let queue = self.queues.entry(entry.destination_id.clone()).or_default();
        if queue.iter().any(|e| e.id == entry.id) {
            return Err(Error::ValidationFailure(format!("duplicate queue entry {}", entry.id)));
        }
        entry.position = queue.len() as u32 + 1;
        queue.push(entry.clone());

        let destination_id = entry.destination_id.clone();
        self.supersede_fetches(&destination_id);
        if !self.summaries.contains_key(&destination_id) {
            self.summaries.insert(
                destination_id.clone(),
                DestinationSummary::new(&destination_id, &entry.destination_name, 0),
            );
        }
        self.recompute_summary(&destination_id);
        self.emit(StoreEvent::EntryAdmitted { destination_id, entry_id: entry.id.clone() });
        Ok(entry)
    }

    fn locate(&self, entry_id: &str) -> Option<(String, usize)> {
        self.queues.iter().find_map(|(dest, entries)| {
            entries.iter().position(|e| e.id == entry_id).map(|i| (dest.clone(), i))
        })
    }

    fn recompute_summary(&mut self, destination_id: &str) {
        let count = self.loaded_count(destination_id) as u32;
        if let Some(summary) = self.summaries.get_mut(destination_id) {
            summary.vehicle_count = count;
        } else if let Some(first) = self.queues.get(destination_id).and_then(|q| q.first()) {
            let summary = DestinationSummary::new(destination_id, &first.destination_name, count);
            self.summaries.insert(destination_id.to_string(), summary);
        }
    }

    pub fn summaries(&self) -> Vec<DestinationSummary> {
        self.summaries.values().cloned().collect()
    }

    pub fn summary(&self, destination_id: &str) -> Option<&DestinationSummary> {
        self.summaries.get(destination_id)
    }

    /// Issues a sequence number for a summary fetch.
    pub fn begin_summary_fetch(&mut self) -> u64 {
        self.summary_freshness.issue()
    }

    /// Installs fetched summaries unless a fresher set was already applied.
    pub fn commit_summaries(&mut self, seq: u64, summaries: Vec<DestinationSummary>) -> bool {
        if seq <= self.summary_freshness.applied {
            debug!(seq, applied = self.summary_freshness.applied, "discarding superseded summaries");
            return false;
        }
        self.summary_freshness.applied = seq;
        self.summaries =
            summaries.into_iter().map(|s| (s.destination_id.clone(), s)).collect();
        self.emit(StoreEvent::SummariesReplaced);
        true
    }

    pub fn vehicle(&self, plate: &str) -> Option<&VehicleRecord> {
        self.vehicles.get(plate)
    }

    pub fn vehicles(&self) -> Vec<VehicleRecord> {
        self.vehicles.values().cloned().collect()
    }

    pub fn upsert_vehicle(&mut self, record: VehicleRecord) {
        let plate = record.plate.clone();
        self.vehicles.insert(plate.clone(), record);
        self.emit(StoreEvent::VehicleUpdated { plate });
    }

    /// Updates the cached day-pass flag, creating the record if needed.
    pub fn set_day_pass(&mut self, plate: &str, valid: bool) {
        let record =
            self.vehicles.entry(plate.to_string()).or_insert_with(|| VehicleRecord::new(plate));
        if record.has_day_pass == Some(valid) {
            return;
        }
        record.has_day_pass = Some(valid);
        self.emit(StoreEvent::VehicleUpdated { plate: plate.to_string() });
    }
}

/// Assigns positions `1..=n` in current order.
pub(crate) fn renumber(entries: &mut [QueueEntry]) {
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.position = i as u32 + 1;
    }
}

/// Validates a full destination list and returns it sorted by position.
fn validate_queue(destination_id: &str, mut entries: Vec<QueueEntry>) -> Result<Vec<QueueEntry>> {
    let mut ids = HashSet::new();
    let mut plates = HashSet::new();

    for entry in &entries {
        if entry.destination_id != destination_id {
            return Err(Error::ValidationFailure(format!(
                "entry {} belongs to {}, not {destination_id}",
                entry.id, entry.destination_id
            )));
        }
        if !ids.insert(entry.id.as_str()) {
            return Err(Error::ValidationFailure(format!("duplicate queue entry {}", entry.id)));
        }
        if !plates.insert(entry.plate.to_ascii_uppercase()) {
            return Err(Error::ValidationFailure(format!("duplicate plate {}", entry.plate)));
        }
        entry.validate_capacity()?;
    }

    if !positions_are_contiguous(&entries) {
        return Err(Error::ValidationFailure(format!(
            "positions for {destination_id} are not contiguous from 1"
        )));
    }

    entries.sort_by_key(|e| e.position);
    Ok(entries)
}

/// Cloneable handle to the single shared store.
///
/// The guard is not `Send`, so it cannot be held across an `.await`.
#[derive(Clone, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<QueueStateStore>>,
}

impl SharedStore {
    pub fn new(store: QueueStateStore) -> Self {
        SharedStore { inner: Arc::new(Mutex::new(store)) }
    }

    pub fn lock(&self) -> MutexGuard<'_, QueueStateStore> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of one destination.
    pub fn get(&self, destination_id: &str) -> Vec<QueueEntry> {
        self.lock().get(destination_id)
    }

    pub fn summaries(&self) -> Vec<DestinationSummary> {
        self.lock().summaries()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.lock().subscribe()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
