// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol between a desk and the remote queue service.
//!
//! The protocol is request/response with server push:
//! - Client sends a [`Request`] tagged with a client-chosen id
//! - Server answers with a [`ResponseBody`] or a [`WireError`] echoing that id
//! - Server broadcasts `queue_changed` to every client after a mutation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entry::{
    AuthorizedDestination, DestinationSummary, PositionAssignment, QueueEntry, SummaryFilter,
};
use crate::gateway::{
    AdmissionRequest, Confirmation, EmergencyRemoval, GatewayError, GatewayResult, PurchaseRequest,
};

/// One gateway call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    ListSummaries {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<SummaryFilter>,
    },
    GetQueue {
        destination_id: String,
    },
    EnterQueue(AdmissionRequest),
    ExitQueue {
        plate: String,
    },
    TransferSeats {
        plate: String,
        destination_id: String,
    },
    EmergencyRemove {
        plate: String,
    },
    EndTrip {
        entry_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        staff_id: Option<String>,
    },
    Reorder {
        destination_id: String,
        assignments: Vec<PositionAssignment>,
    },
    MoveToFront {
        entry_id: String,
        destination_id: String,
    },
    HasDayPass {
        plate: String,
    },
    HasDayPassBatch {
        plates: Vec<String>,
    },
    PurchaseDayPass(PurchaseRequest),
    AuthorizedDestinations {
        plate: String,
    },
    BookSeats {
        entry_id: String,
        seats: u32,
    },
    Health,
}

impl Request {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Request::ListSummaries { .. } => "list_summaries",
            Request::GetQueue { .. } => "get_queue",
            Request::EnterQueue(_) => "enter_queue",
            Request::ExitQueue { .. } => "exit_queue",
            Request::TransferSeats { .. } => "transfer_seats",
            Request::EmergencyRemove { .. } => "emergency_remove",
            Request::EndTrip { .. } => "end_trip",
            Request::Reorder { .. } => "reorder",
            Request::MoveToFront { .. } => "move_to_front",
            Request::HasDayPass { .. } => "has_day_pass",
            Request::HasDayPassBatch { .. } => "has_day_pass_batch",
            Request::PurchaseDayPass(_) => "purchase_day_pass",
            Request::AuthorizedDestinations { .. } => "authorized_destinations",
            Request::BookSeats { .. } => "book_seats",
            Request::Health => "health",
        }
    }

    /// True for requests that change server state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Request::EnterQueue(_)
                | Request::ExitQueue { .. }
                | Request::TransferSeats { .. }
                | Request::EmergencyRemove { .. }
                | Request::EndTrip { .. }
                | Request::Reorder { .. }
                | Request::MoveToFront { .. }
                | Request::PurchaseDayPass(_)
                | Request::BookSeats { .. }
        )
    }
}

/// Successful result of a [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseBody {
    Summaries { summaries: Vec<DestinationSummary> },
    Queue { entries: Vec<QueueEntry> },
    Confirmation(Confirmation),
    Removal(EmergencyRemoval),
    DayPass { valid: bool },
    DayPassBatch { passes: BTreeMap<String, bool> },
    Authorized { destinations: Vec<AuthorizedDestination> },
    Health { healthy: bool },
}

/// Wire form of [`GatewayError`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum WireError {
    Unavailable { message: String },
    BookedSeatsPresent { plate: String, booked_seats: u32 },
    AlreadyHasDayPass { plate: String },
    NotFound { message: String },
    Rejected { message: String },
}

impl From<GatewayError> for WireError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(message) => WireError::Unavailable { message },
            GatewayError::BookedSeatsPresent { plate, booked_seats } => {
                WireError::BookedSeatsPresent { plate, booked_seats }
            }
            GatewayError::AlreadyHasDayPass(plate) => WireError::AlreadyHasDayPass { plate },
            GatewayError::NotFound(message) => WireError::NotFound { message },
            GatewayError::Rejected(message) => WireError::Rejected { message },
        }
    }
}

impl From<WireError> for GatewayError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Unavailable { message } => GatewayError::Unavailable(message),
            WireError::BookedSeatsPresent { plate, booked_seats } => {
                GatewayError::BookedSeatsPresent { plate, booked_seats }
            }
            WireError::AlreadyHasDayPass { plate } => GatewayError::AlreadyHasDayPass(plate),
            WireError::NotFound { message } => GatewayError::NotFound(message),
            WireError::Rejected { message } => GatewayError::Rejected(message),
        }
    }
}

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A gateway call awaiting a response with the same id.
    Request { id: u64, request: Request },

    /// Ping message for keepalive.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Response { id: u64, body: ResponseBody },

    /// Failure of a request, or of an unparseable message when `id` is absent.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        error: WireError,
    },

    /// Pong response to client Ping.
    Pong { id: u64 },

    /// Broadcast after any mutation of a destination.
    QueueChanged { destination_id: String },
}

impl ClientMessage {
    pub fn request(id: u64, request: Request) -> Self {
        ClientMessage::Request { id, request }
    }

    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    pub fn response(id: u64, body: ResponseBody) -> Self {
        ServerMessage::Response { id, body }
    }

    pub fn error(id: Option<u64>, error: impl Into<WireError>) -> Self {
        ServerMessage::Error { id, error: error.into() }
    }

    /// Builds the reply to request `id` from a handler result.
    pub fn reply(id: u64, result: GatewayResult<ResponseBody>) -> Self {
        match result {
            Ok(body) => ServerMessage::response(id, body),
            Err(e) => ServerMessage::error(Some(id), e),
        }
    }

    pub fn pong(id: u64) -> Self {
        ServerMessage::Pong { id }
    }

    pub fn queue_changed(destination_id: impl Into<String>) -> Self {
        ServerMessage::QueueChanged { destination_id: destination_id.into() }
    }

    /// The request id this message answers, if any.
    pub fn reply_to(&self) -> Option<u64> {
        match self {
            ServerMessage::Response { id, .. } | ServerMessage::Pong { id } => Some(*id),
            ServerMessage::Error { id, .. } => *id,
            ServerMessage::QueueChanged { .. } => None,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

fn unexpected(expected: &str, got: &ResponseBody) -> GatewayError {
    GatewayError::Rejected(format!("unexpected response: expected {expected}, got {got:?}"))
}

impl ResponseBody {
    pub fn into_summaries(self) -> GatewayResult<Vec<DestinationSummary>> {
        match self {
            ResponseBody::Summaries { summaries } => Ok(summaries),
            other => Err(unexpected("summaries", &other)),
        }
    }

    pub fn into_queue(self) -> GatewayResult<Vec<QueueEntry>> {
        match self {
            ResponseBody::Queue { entries } => Ok(entries),
            other => Err(unexpected("queue", &other)),
        }
    }

    pub fn into_confirmation(self) -> GatewayResult<Confirmation> {
        match self {
            ResponseBody::Confirmation(c) => Ok(c),
            other => Err(unexpected("confirmation", &other)),
        }
    }

    pub fn into_removal(self) -> GatewayResult<EmergencyRemoval> {
        match self {
            ResponseBody::Removal(r) => Ok(r),
            other => Err(unexpected("removal", &other)),
        }
    }

    pub fn into_day_pass(self) -> GatewayResult<bool> {
        match self {
            ResponseBody::DayPass { valid } => Ok(valid),
            other => Err(unexpected("day_pass", &other)),
        }
    }

    pub fn into_day_pass_batch(self) -> GatewayResult<BTreeMap<String, bool>> {
        match self {
            ResponseBody::DayPassBatch { passes } => Ok(passes),
            other => Err(unexpected("day_pass_batch", &other)),
        }
    }

    pub fn into_authorized(self) -> GatewayResult<Vec<AuthorizedDestination>> {
        match self {
            ResponseBody::Authorized { destinations } => Ok(destinations),
            other => Err(unexpected("authorized", &other)),
        }
    }

    pub fn into_health(self) -> GatewayResult<bool> {
        match self {
            ResponseBody::Health { healthy } => Ok(healthy),
            other => Err(unexpected("health", &other)),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
