// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote queue gateway abstraction.
//!
//! Every network and storage concern lives behind [`RemoteQueueGateway`].
//! The engine only sees typed results; the desk binary plugs in a WebSocket
//! implementation and tests plug in an in-memory one.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::entry::{
    AuthorizedDestination, DestinationSummary, PositionAssignment, QueueEntry, SummaryFilter,
};
use crate::price::Price;

/// Error type for gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The remote service could not be reached.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// Exit refused because passengers already hold seats.
    #[error("vehicle {plate} has {booked_seats} booked seat(s)")]
    BookedSeatsPresent { plate: String, booked_seats: u32 },

    /// Purchase refused because a pass for today already exists.
    #[error("vehicle {0} already has a valid day pass")]
    AlreadyHasDayPass(String),

    /// The referenced vehicle, entry or destination does not exist remotely.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other business rejection.
    #[error("{0}")]
    Rejected(String),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Boxed future returned by gateway methods.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = GatewayResult<T>> + Send + 'a>>;

/// Acknowledgement of a mutating call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The admitted entry, when the remote returns it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<QueueEntry>,
}

impl Confirmation {
    pub fn with_message(message: impl Into<String>) -> Self {
        Confirmation { message: Some(message.into()), entry: None }
    }

    pub fn with_entry(entry: QueueEntry) -> Self {
        Confirmation { message: None, entry: Some(entry) }
    }
}

/// Outcome of an emergency removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyRemoval {
    pub cancelled_bookings: u32,
    pub total_refund: Price,
}

/// Parameters of a queue admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionRequest {
    pub plate: String,
    pub destination_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
}

/// Parameters of a day pass purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub plate: String,
    pub vehicle_id: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
}

/// Capability set of the remote queue service.
///
/// Implementations convert borrowed arguments to owned values before boxing
/// the future, so the future only borrows `self`.
pub trait RemoteQueueGateway: Send + Sync {
    /// Lists every destination summary, optionally filtered by region.
    fn list_destination_summaries(
        &self,
        filter: Option<&SummaryFilter>,
    ) -> GatewayFuture<'_, Vec<DestinationSummary>>;

    /// Fetches the detailed entries of one destination.
    fn get_queue(&self, destination_id: &str) -> GatewayFuture<'_, Vec<QueueEntry>>;

    /// Admits a vehicle to a destination queue.
    fn enter_queue(&self, request: &AdmissionRequest) -> GatewayFuture<'_, Confirmation>;

    /// Removes a vehicle with no booked seats.
    fn exit_queue(&self, plate: &str) -> GatewayFuture<'_, Confirmation>;

    /// Moves booked passengers to another vehicle for the same destination, then removes.
    fn transfer_seats_and_remove(
        &self,
        plate: &str,
        destination_id: &str,
    ) -> GatewayFuture<'_, Confirmation>;

    /// Cancels every booking on the vehicle and removes it.
    fn emergency_remove(&self, plate: &str) -> GatewayFuture<'_, EmergencyRemoval>;

    /// Finalizes a trip and removes the entry.
    fn end_trip(&self, entry_id: &str, staff_id: Option<&str>) -> GatewayFuture<'_, Confirmation>;

    /// Persists a full position assignment for one destination in one call.
    fn reorder(
        &self,
        destination_id: &str,
        assignments: &[PositionAssignment],
    ) -> GatewayFuture<'_, Confirmation>;

    /// Server-side move to front.
    fn move_to_front(&self, entry_id: &str, destination_id: &str)
        -> GatewayFuture<'_, Confirmation>;

    fn has_valid_day_pass(&self, plate: &str) -> GatewayFuture<'_, bool>;

    /// Checks many plates in one round-trip.
    fn has_valid_day_pass_batch(&self, plates: &[String])
        -> GatewayFuture<'_, BTreeMap<String, bool>>;

    fn purchase_day_pass(&self, request: &PurchaseRequest) -> GatewayFuture<'_, Confirmation>;

    fn get_authorized_destinations(
        &self,
        plate: &str,
    ) -> GatewayFuture<'_, Vec<AuthorizedDestination>>;

    /// Sells `seats` seats on an entry.
    fn book_seats(&self, entry_id: &str, seats: u32) -> GatewayFuture<'_, Confirmation>;

    fn health_check(&self) -> GatewayFuture<'_, bool>;
}
