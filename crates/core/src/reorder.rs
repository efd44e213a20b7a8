// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue order changes.
//!
//! Every change is persisted as one batched assignment call before the local
//! list is touched. A failed call leaves local state as it was.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::capacity::CapacityLedger;
use crate::entry::{EntryStatus, PositionAssignment, QueueEntry};
use crate::error::{Error, Result};
use crate::gateway::RemoteQueueGateway;
use crate::store::{renumber, SharedStore};
use crate::suppression::SuppressionManager;

/// Computes assignments for a full reorder of `current`.
///
/// `ordered_ids` must name every current entry exactly once. Entries the
/// capacity ledger locks in place must keep their position.
pub fn plan_reorder(
    current: &[QueueEntry],
    ordered_ids: &[String],
) -> Result<Vec<PositionAssignment>> {
    let mut seen = HashSet::new();
    for id in ordered_ids {
        if !seen.insert(id.as_str()) {
            return Err(Error::ValidationFailure(format!("entry {id} listed twice")));
        }
    }

    let current_ids: HashSet<&str> = current.iter().map(|e| e.id.as_str()).collect();
    if seen != current_ids {
        return Err(Error::StaleOperation(
            "queue changed since the order was computed; refresh and retry".to_string(),
        ));
    }

    let assignments = assign(ordered_ids.iter().map(String::as_str));
    check_locked(current, &assignments)?;
    Ok(assignments)
}

/// Fails if `assignments` would move an entry the capacity ledger locks in place.
pub fn check_locked(current: &[QueueEntry], assignments: &[PositionAssignment]) -> Result<()> {
    let new_position: HashMap<&str, u32> =
        assignments.iter().map(|a| (a.entry_id.as_str(), a.position)).collect();

    match current.iter().find(|e| {
        !CapacityLedger::can_reorder(e) && new_position.get(e.id.as_str()) != Some(&e.position)
    }) {
        Some(entry) => Err(locked(entry)),
        None => Ok(()),
    }
}

fn assign<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<PositionAssignment> {
    ids.enumerate().map(|(i, id)| PositionAssignment::new(id, i as u32 + 1)).collect()
}

fn locked(entry: &QueueEntry) -> Error {
    if entry.booked_seats() > 0 {
        Error::ValidationFailure(format!(
            "vehicle {} has {} booked seat(s) and cannot move",
            entry.plate,
            entry.booked_seats()
        ))
    } else {
        Error::ValidationFailure(format!("vehicle {} is {} and cannot move", entry.plate, entry.status))
    }
}

pub struct ReorderCoordinator<G> {
    gateway: Arc<G>,
    store: SharedStore,
    suppression: Arc<SuppressionManager>,
}

impl<G: RemoteQueueGateway> ReorderCoordinator<G> {
    pub fn new(gateway: Arc<G>, store: SharedStore, suppression: Arc<SuppressionManager>) -> Self {
        ReorderCoordinator { gateway, store, suppression }
    }

    /// Applies a complete new order for one destination.
    pub async fn reorder(
        &self,
        destination_id: &str,
        ordered_ids: &[String],
    ) -> Result<Vec<PositionAssignment>> {
        let snapshot = self.store.get(destination_id);
        let assignments = plan_reorder(&snapshot, ordered_ids)?;
        self.commit(destination_id, &snapshot, assignments).await
    }

    /// Moves a WAITING entry to position 1, shifting the ones ahead of it back.
    ///
    /// Refused when any entry ahead of it is locked in place.
    pub async fn move_to_front(
        &self,
        entry_id: &str,
        destination_id: &str,
    ) -> Result<Vec<PositionAssignment>> {
        let snapshot = self.store.get(destination_id);
        let target = snapshot
            .iter()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| Error::NotFound(format!("queue entry {entry_id} in {destination_id}")))?;

        if target.status != EntryStatus::Waiting {
            return Err(Error::ValidationFailure(format!(
                "only WAITING vehicles can move to the front; {} is {}",
                target.plate, target.status
            )));
        }
        if !CapacityLedger::can_reorder(target) {
            return Err(locked(target));
        }
        if target.position == 1 {
            debug!(entry = entry_id, "already at the front");
            return Ok(Vec::new());
        }

        let order = std::iter::once(entry_id)
            .chain(snapshot.iter().map(|e| e.id.as_str()).filter(|id| *id != entry_id));
        let assignments = assign(order);
        check_locked(&snapshot, &assignments)?;
        self.commit(destination_id, &snapshot, assignments).await
    }

    /// Moves `dragged_id` to where `target_id` currently sits.
    pub async fn drag(
        &self,
        destination_id: &str,
        dragged_id: &str,
        target_id: &str,
    ) -> Result<Vec<PositionAssignment>> {
        let snapshot = self.store.get(destination_id);
        let index_of = |id: &str| {
            snapshot.iter().position(|e| e.id == id).ok_or_else(|| {
                Error::StaleOperation(format!("entry {id} is no longer queued for {destination_id}"))
            })
        };
        let from = index_of(dragged_id)?;
        let to = index_of(target_id)?;

        if !CapacityLedger::can_reorder(&snapshot[from]) {
            return Err(locked(&snapshot[from]));
        }
        if from == to {
            return Ok(Vec::new());
        }

        let mut order: Vec<&str> = snapshot.iter().map(|e| e.id.as_str()).collect();
        let moved = order.remove(from);
        order.insert(to, moved);
        let assignments = assign(order.into_iter());
        check_locked(&snapshot, &assignments)?;
        self.commit(destination_id, &snapshot, assignments).await
    }

    /// Persists remotely, then installs the order and suppresses moved plates.
    async fn commit(
        &self,
        destination_id: &str,
        snapshot: &[QueueEntry],
        assignments: Vec<PositionAssignment>,
    ) -> Result<Vec<PositionAssignment>> {
        self.gateway.reorder(destination_id, &assignments).await?;

        let position: HashMap<&str, u32> =
            assignments.iter().map(|a| (a.entry_id.as_str(), a.position)).collect();
        let moved: Vec<String> = snapshot
            .iter()
            .filter(|e| position.get(e.id.as_str()).is_some_and(|p| *p != e.position))
            .map(|e| e.plate.clone())
            .collect();

        {
            let mut store = self.store.lock();
            let mut updated = store.get(destination_id);
            // Entries admitted during the call have no assignment and go last.
            updated.sort_by_key(|e| position.get(e.id.as_str()).copied().unwrap_or(u32::MAX));
            renumber(&mut updated);
            store.replace(destination_id, updated)?;
        }

        for plate in &moved {
            self.suppression.suppress_default(plate);
        }
        info!(destination = destination_id, moved = moved.len(), "queue reordered");
        Ok(assignments)
    }
}

#[cfg(test)]
#[path = "reorder_tests.rs"]
mod tests;
