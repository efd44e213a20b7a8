// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! station-core: queue synchronization and ordering engine for a station
//! dispatch desk.
//!
//! This crate provides the queue data model, the client-side state store,
//! the remote gateway abstraction and the coordinators used by both the
//! station-desk client and the station-remote service.

pub mod capacity;
pub mod clock;
pub mod config;
pub mod daypass;
pub mod engine;
pub mod entry;
pub mod error;
pub mod gateway;
pub mod price;
pub mod protocol;
pub mod reorder;
pub mod route;
pub mod scheduler;
pub mod store;
pub mod suppression;

#[cfg(test)]
mod test_helpers;

pub use capacity::{CapacityLedger, TripSettlement};
pub use clock::{service_day, system_clock, ClockSource, SharedClock, SystemClock};
pub use config::EngineConfig;
pub use daypass::{Admission, DayPassCoordinator, PassState, PurchaseOutcome};
pub use engine::{ActionOutcome, DispatchEngine};
pub use entry::{
    AuthorizedDestination, DestinationSummary, EntryPatch, EntryStatus, PositionAssignment,
    QueueEntry, SummaryFilter, VehicleRecord,
};
pub use error::{Error, RemovalAlternative, Result};
pub use gateway::{
    AdmissionRequest, Confirmation, EmergencyRemoval, GatewayError, GatewayFuture, GatewayResult,
    PurchaseRequest, RemoteQueueGateway,
};
pub use price::Price;
pub use protocol::{ClientMessage, Request, ResponseBody, ServerMessage, WireError};
pub use reorder::ReorderCoordinator;
pub use route::{RoutePrice, RouteTable};
pub use scheduler::{Health, RefreshOutcome, SyncScheduler};
pub use store::{QueueStateStore, SharedStore, StoreEvent};
pub use suppression::SuppressionManager;
