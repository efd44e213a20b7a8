// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Day-pass checks, purchases and the pass-gated queue admission flow.
//!
//! Each plate moves through `Unknown -> Checked -> Purchasing -> Purchased |
//! Failed`. The tracked state is only trusted for the service day it was
//! observed on; the cached flag itself lives in the store's vehicle list.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::clock::{service_day, SharedClock};
use crate::entry::QueueEntry;
use crate::error::{Error, Result};
use crate::gateway::{AdmissionRequest, GatewayError, PurchaseRequest, RemoteQueueGateway};
use crate::price::Price;
use crate::store::SharedStore;
use crate::suppression::SuppressionManager;

/// Transient per-vehicle pass state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Unknown,
    Checked { valid: bool },
    Purchasing,
    Purchased,
    Failed,
}

impl PassState {
    /// Known-valid or known-invalid, if the state settles the question.
    fn known_validity(self) -> Option<bool> {
        match self {
            PassState::Checked { valid } => Some(valid),
            PassState::Purchased => Some(true),
            PassState::Unknown | PassState::Purchasing | PassState::Failed => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    state: PassState,
    day: NaiveDate,
}

/// How a purchase request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Purchased,
    /// The remote already held a valid pass; nothing was charged.
    AlreadyValid,
}

/// Result of a successful pass-gated admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub plate: String,
    pub destination_id: String,
    /// The admitted entry, when the remote returned it.
    pub entry: Option<QueueEntry>,
    /// A pass was bought as part of this admission.
    pub purchased_pass: bool,
}

/// Marks the purchase failed if the flow is dropped mid-call.
struct PurchaseGuard<'a> {
    states: &'a Mutex<HashMap<String, Tracked>>,
    plate: &'a str,
}

impl Drop for PurchaseGuard<'_> {
    fn drop(&mut self) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tracked) = states.get_mut(self.plate) {
            if tracked.state == PassState::Purchasing {
                tracked.state = PassState::Failed;
            }
        }
    }
}

pub struct DayPassCoordinator<G> {
    gateway: Arc<G>,
    store: SharedStore,
    suppression: Arc<SuppressionManager>,
    clock: SharedClock,
    price: Price,
    states: Mutex<HashMap<String, Tracked>>,
}

impl<G: RemoteQueueGateway> DayPassCoordinator<G> {
    pub fn new(
        gateway: Arc<G>,
        store: SharedStore,
        suppression: Arc<SuppressionManager>,
        clock: SharedClock,
        price: Price,
    ) -> Self {
        DayPassCoordinator {
            gateway,
            store,
            suppression,
            clock,
            price,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Price charged by inline purchases.
    pub fn price(&self) -> Price {
        self.price
    }

    fn today(&self) -> NaiveDate {
        service_day(self.clock.now_ms())
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, Tracked>> {
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current state of a plate for today.
    pub fn state(&self, plate: &str) -> PassState {
        let today = self.today();
        match self.states().get(plate) {
            Some(t) if t.day == today => t.state,
            _ => PassState::Unknown,
        }
    }

    fn set_state(&self, plate: &str, state: PassState) {
        let day = self.today();
        self.states().insert(plate.to_string(), Tracked { state, day });
    }

    fn cached(&self, plate: &str) -> Option<bool> {
        if self.state(plate).known_validity().is_none() {
            return None;
        }
        self.store.lock().vehicle(plate).and_then(|v| v.has_day_pass)
    }

    fn record(&self, plate: &str, valid: bool) {
        self.set_state(plate, PassState::Checked { valid });
        self.store.lock().set_day_pass(plate, valid);
    }

    /// Cached flag for today if known, else asks the gateway.
    pub async fn has_valid_pass(&self, plate: &str) -> Result<bool> {
        if let Some(valid) = self.cached(plate) {
            debug!(plate, valid, "day pass from cache");
            return Ok(valid);
        }
        let valid = self.gateway.has_valid_day_pass(plate).await?;
        self.record(plate, valid);
        Ok(valid)
    }

    /// Resolves many plates with at most one gateway call.
    ///
    /// Plates missing from the remote answer count as invalid and stay
    /// uncached.
    pub async fn has_valid_pass_batch(&self, plates: &[String]) -> Result<BTreeMap<String, bool>> {
        let mut result = BTreeMap::new();
        let mut unknown = Vec::new();
        for plate in plates {
            match self.cached(plate) {
                Some(valid) => {
                    result.insert(plate.clone(), valid);
                }
                None if !unknown.contains(plate) => unknown.push(plate.clone()),
                None => {}
            }
        }
        if unknown.is_empty() {
            return Ok(result);
        }

        let fetched = self.gateway.has_valid_day_pass_batch(&unknown).await?;
        for plate in unknown {
            match fetched.get(&plate) {
                Some(&valid) => {
                    self.record(&plate, valid);
                    result.insert(plate, valid);
                }
                None => {
                    result.insert(plate, false);
                }
            }
        }
        Ok(result)
    }

    /// Buys today's pass for a vehicle.
    ///
    /// A remote answer that the pass already exists counts as success. A
    /// second purchase for the same plate while one is in flight is refused.
    pub async fn purchase(
        &self,
        plate: &str,
        vehicle_id: &str,
        price: Price,
        staff_id: Option<&str>,
    ) -> Result<PurchaseOutcome> {
        {
            let today = self.today();
            let mut states = self.states();
            let in_flight = states
                .get(plate)
                .is_some_and(|t| t.day == today && t.state == PassState::Purchasing);
            if in_flight {
                return Err(Error::Busy(format!("a day pass purchase for {plate} is already in progress")));
            }
            states.insert(plate.to_string(), Tracked { state: PassState::Purchasing, day: today });
        }
        let _guard = PurchaseGuard { states: &self.states, plate };

        let request = PurchaseRequest {
            plate: plate.to_string(),
            vehicle_id: vehicle_id.to_string(),
            price,
            staff_id: staff_id.map(str::to_string),
        };
        let outcome = match self.gateway.purchase_day_pass(&request).await {
            Ok(_) => PurchaseOutcome::Purchased,
            Err(GatewayError::AlreadyHasDayPass(_)) => PurchaseOutcome::AlreadyValid,
            Err(e) => {
                self.set_state(plate, PassState::Failed);
                warn!(plate, error = %e, "day pass purchase failed");
                return Err(e.into());
            }
        };

        self.set_state(plate, PassState::Purchased);
        self.store.lock().set_day_pass(plate, true);
        info!(plate, price = %price, ?outcome, "day pass settled");
        Ok(outcome)
    }

    /// Admits a vehicle after making sure it holds today's pass.
    ///
    /// The admission call is never issued while the pass is invalid and no
    /// purchase has succeeded. A failed admission after a fresh purchase is a
    /// [`Error::PartialFailure`].
    pub async fn enter_queue(&self, request: &AdmissionRequest) -> Result<Admission> {
        let plate = request.plate.as_str();
        let (vehicle_id, queued) = {
            let store = self.store.lock();
            let vehicle_id = store.vehicle(plate).and_then(|v| v.vehicle_id.clone());
            let queued = store.find_by_plate(plate).map(|e| e.destination_name.clone());
            (vehicle_id, queued)
        };
        if let Some(destination) = queued {
            return Err(Error::ValidationFailure(format!(
                "vehicle {plate} is already queued for {destination}"
            )));
        }

        let purchased_pass = if self.has_valid_pass(plate).await? {
            false
        } else {
            let vehicle_id = vehicle_id.as_deref().unwrap_or(plate);
            let outcome =
                self.purchase(plate, vehicle_id, self.price, request.staff_id.as_deref()).await?;
            outcome == PurchaseOutcome::Purchased
        };

        let confirmation = match self.gateway.enter_queue(request).await {
            Ok(c) => c,
            Err(e) if purchased_pass => {
                warn!(plate, error = %e, "admission failed after pass purchase");
                return Err(Error::PartialFailure {
                    completed: format!("day pass purchased for {plate}"),
                    failed: format!("queue admission failed: {e}"),
                });
            }
            Err(e) => return Err(e.into()),
        };

        self.suppression.suppress_default(plate);
        let entry = match confirmation.entry {
            Some(entry) => match self.store.lock().append(entry) {
                Ok(admitted) => Some(admitted),
                Err(e) => {
                    debug!(plate, error = %e, "admitted entry not applied locally");
                    None
                }
            },
            None => None,
        };

        info!(plate, destination = %request.destination_id, purchased_pass, "vehicle admitted");
        Ok(Admission {
            plate: plate.to_string(),
            destination_id: request.destination_id.clone(),
            entry,
            purchased_pass,
        })
    }
}

#[cfg(test)]
#[path = "daypass_tests.rs"]
mod tests;
