// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic and on-demand refresh of the store from the gateway.
//!
//! Rules:
//! - At most one refresh in flight per kind (summaries, or one destination).
//!   A destination request arriving while one is in flight is coalesced: the
//!   running refresh fetches once more when it finishes, so the caller still
//!   sees state read after its request.
//! - After a refresh completes, automatic refreshes of the same kind wait
//!   out a cool-down. On-demand refreshes ignore it.
//! - A failed fetch keeps the last-known state and marks health degraded.
//! - Destinations whose summary reports vehicles but which have no loaded
//!   entries get a scoped detail refresh after each summary refresh.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::entry::SummaryFilter;
use crate::error::{Error, Result};
use crate::gateway::RemoteQueueGateway;
use crate::store::SharedStore;
use crate::suppression::{merge_fetched, SuppressionManager};

/// What a refresh call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The fetch result was merged into the store.
    Applied {
        /// Destinations detail-refreshed because their summary showed vehicles
        /// the store had not loaded.
        auto_fetched: Vec<String>,
    },
    /// A fresher result had already been applied; this one was discarded.
    Superseded,
    /// A refresh of the same kind was already in flight.
    Coalesced,
    /// Automatic refresh skipped inside the cool-down.
    CoolingDown,
}

impl RefreshOutcome {
    fn applied() -> Self {
        RefreshOutcome::Applied { auto_fetched: Vec::new() }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied { .. })
    }
}

/// Connectivity indicator for the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Degraded { reason: String },
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Health::Healthy)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FlightKey {
    Summaries,
    Destination(String),
}

#[derive(Debug, Default)]
struct Slot {
    in_flight: bool,
    /// Set by a request coalesced into the running refresh.
    rerun: bool,
    completed_at_ms: Option<u64>,
}

/// Clears the in-flight flag when the refresh finishes or is dropped.
struct FlightGuard<'a> {
    flights: &'a Mutex<HashMap<FlightKey, Slot>>,
    clock: &'a SharedClock,
    key: FlightKey,
}

impl FlightGuard<'_> {
    /// Clears and returns the flag left by coalesced requests.
    fn take_rerun(&self) -> bool {
        let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        flights.get_mut(&self.key).is_some_and(|slot| std::mem::take(&mut slot.rerun))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = flights.get_mut(&self.key) {
            slot.in_flight = false;
            slot.completed_at_ms = Some(self.clock.now_ms());
        }
    }
}

pub struct SyncScheduler<G> {
    gateway: Arc<G>,
    store: SharedStore,
    suppression: Arc<SuppressionManager>,
    clock: SharedClock,
    cooldown: Duration,
    filter: Option<SummaryFilter>,
    flights: Mutex<HashMap<FlightKey, Slot>>,
    health: Mutex<Health>,
    recurring: Mutex<Option<JoinHandle<()>>>,
}

impl<G: RemoteQueueGateway> SyncScheduler<G> {
    pub fn new(
        gateway: Arc<G>,
        store: SharedStore,
        suppression: Arc<SuppressionManager>,
        clock: SharedClock,
        cooldown: Duration,
    ) -> Self {
        SyncScheduler {
            gateway,
            store,
            suppression,
            clock,
            cooldown,
            filter: None,
            flights: Mutex::new(HashMap::new()),
            health: Mutex::new(Health::Healthy),
            recurring: Mutex::new(None),
        }
    }

    /// Restricts summary refreshes to a region.
    pub fn with_filter(mut self, filter: SummaryFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn health(&self) -> Health {
        self.health.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_health(&self, next: Health) {
        let mut health = self.health.lock().unwrap_or_else(|e| e.into_inner());
        match (&*health, &next) {
            (Health::Healthy, Health::Degraded { reason }) => {
                warn!(reason = %reason, "remote queue service degraded");
            }
            (Health::Degraded { .. }, Health::Healthy) => info!("remote queue service recovered"),
            _ => {}
        }
        *health = next;
    }

    fn degrade(&self, err: &Error) {
        self.set_health(Health::Degraded { reason: err.to_string() });
    }

    /// Records the result of any gateway call made on the scheduler's behalf.
    pub(crate) fn observe<T>(&self, result: &Result<T>) {
        match result {
            Ok(_) => self.set_health(Health::Healthy),
            Err(e) if e.is_network() => self.degrade(e),
            Err(_) => {}
        }
    }

    fn flights(&self) -> MutexGuard<'_, HashMap<FlightKey, Slot>> {
        self.flights.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn try_begin(
        &self,
        key: FlightKey,
        automatic: bool,
    ) -> std::result::Result<FlightGuard<'_>, RefreshOutcome> {
        let now = self.clock.now_ms();
        let mut flights = self.flights();
        let slot = flights.entry(key.clone()).or_default();

        if slot.in_flight {
            debug!(?key, "refresh already in flight, coalescing");
            slot.rerun = true;
            return Err(RefreshOutcome::Coalesced);
        }
        if automatic {
            if let Some(done) = slot.completed_at_ms {
                if now < done.saturating_add(self.cooldown.as_millis() as u64) {
                    debug!(?key, "refresh cooling down");
                    return Err(RefreshOutcome::CoolingDown);
                }
            }
        }

        slot.in_flight = true;
        slot.rerun = false;
        Ok(FlightGuard { flights: &self.flights, clock: &self.clock, key })
    }

    /// On-demand summary refresh.
    pub async fn refresh_summaries(&self) -> Result<RefreshOutcome> {
        self.run_summaries(false).await
    }

    /// Timer-driven summary refresh; respects the cool-down.
    pub async fn auto_refresh(&self) -> Result<RefreshOutcome> {
        self.run_summaries(true).await
    }

    async fn run_summaries(&self, automatic: bool) -> Result<RefreshOutcome> {
        let guard = match self.try_begin(FlightKey::Summaries, automatic) {
            Ok(guard) => guard,
            Err(outcome) => return Ok(outcome),
        };

        let seq = self.store.lock().begin_summary_fetch();
        let fetched: Result<_> =
            self.gateway.list_destination_summaries(self.filter.as_ref()).await.map_err(Into::into);
        self.observe(&fetched);
        let summaries = fetched.inspect_err(|e| {
            warn!(error = %e, "summary refresh failed, keeping last-known state");
        })?;

        let count = summaries.len();
        let applied = self.store.lock().commit_summaries(seq, summaries);
        drop(guard);
        if !applied {
            return Ok(RefreshOutcome::Superseded);
        }
        debug!(count, "summaries refreshed");

        let missing: Vec<String> = {
            let store = self.store.lock();
            store
                .summaries()
                .into_iter()
                .filter(|s| s.vehicle_count > 0 && store.loaded_count(&s.destination_id) == 0)
                .map(|s| s.destination_id)
                .collect()
        };

        let mut auto_fetched = Vec::new();
        for destination_id in missing {
            debug!(destination = %destination_id, "summary shows unloaded vehicles, fetching detail");
            match self.refresh_destination(&destination_id).await {
                Ok(outcome) if outcome.is_applied() => auto_fetched.push(destination_id),
                Ok(_) => {}
                Err(e) => warn!(destination = %destination_id, error = %e, "auto-fetch failed"),
            }
        }

        Ok(RefreshOutcome::Applied { auto_fetched })
    }

    /// Fetches one destination's entries and merges them under suppression.
    ///
    /// Requests coalesced into this one while it runs cause one more fetch
    /// before it returns; the outcome is that of the last fetch.
    pub async fn refresh_destination(&self, destination_id: &str) -> Result<RefreshOutcome> {
        let guard =
            match self.try_begin(FlightKey::Destination(destination_id.to_string()), false) {
                Ok(guard) => guard,
                Err(outcome) => return Ok(outcome),
            };

        loop {
            let outcome = self.fetch_destination(destination_id).await?;
            if !guard.take_rerun() {
                return Ok(outcome);
            }
            debug!(destination = destination_id, "refresh requested mid-flight, fetching again");
        }
    }

    async fn fetch_destination(&self, destination_id: &str) -> Result<RefreshOutcome> {
        let ticket = self.store.lock().begin_fetch(destination_id);
        let fetched: Result<_> = self.gateway.get_queue(destination_id).await.map_err(Into::into);
        self.observe(&fetched);
        let entries = fetched.inspect_err(|e| {
            warn!(destination = destination_id, error = %e, "queue refresh failed");
        })?;

        // Expiry is evaluated now, at merge time.
        let suppressed = self.suppression.active_keys();
        let applied = self
            .store
            .lock()
            .commit_fetch(&ticket, |local| merge_fetched(local, entries, &suppressed))?;

        Ok(if applied { RefreshOutcome::applied() } else { RefreshOutcome::Superseded })
    }

    /// Probes the gateway and updates the health indicator.
    pub async fn check_health(&self) -> Health {
        match self.gateway.health_check().await {
            Ok(true) => self.set_health(Health::Healthy),
            Ok(false) => self.set_health(Health::Degraded {
                reason: "remote reported unhealthy".to_string(),
            }),
            Err(e) => self.degrade(&e.into()),
        }
        self.health()
    }

    /// Stops the recurring refresh, if running.
    pub fn stop(&self) {
        let mut slot = self.recurring.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
            debug!("recurring refresh stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        let slot = self.recurring.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl<G: RemoteQueueGateway + 'static> SyncScheduler<G> {
    /// Starts a background summary refresh every `interval`.
    ///
    /// Returns false (and starts nothing) if one is already running. The task
    /// holds a weak reference and ends once the scheduler is dropped.
    pub fn schedule_recurring(self: &Arc<Self>, interval: Duration) -> bool {
        let mut slot = self.recurring.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("recurring refresh already scheduled");
            return false;
        }

        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(scheduler) = weak.upgrade() else {
                    break;
                };
                match scheduler.auto_refresh().await {
                    Ok(outcome) => debug!(?outcome, "recurring refresh"),
                    Err(e) => debug!(error = %e, "recurring refresh failed"),
                }
            }
        });

        info!(interval_ms = interval.as_millis() as u64, "recurring refresh scheduled");
        *slot = Some(handle);
        true
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
