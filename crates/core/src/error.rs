// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for station-core operations.

use std::fmt;

use thiserror::Error;

use crate::gateway::GatewayError;

/// Guided alternative offered when a vehicle with booked seats cannot simply leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalAlternative {
    /// Move the booked passengers to another queued vehicle at the same destination.
    TransferSeats,
    /// Cancel all bookings, refund them and remove the vehicle.
    EmergencyRemove,
}

impl RemovalAlternative {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalAlternative::TransferSeats => "transfer seats",
            RemovalAlternative::EmergencyRemove => "emergency removal",
        }
    }
}

impl fmt::Display for RemovalAlternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Joins alternatives for the conflict message.
fn join_alternatives(alternatives: &[RemovalAlternative]) -> String {
    alternatives.iter().map(|a| a.as_str()).collect::<Vec<_>>().join(", ")
}

/// All possible errors that can occur in station-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("remote queue service unreachable: {0}")]
    NetworkUnavailable(String),

    #[error(
        "vehicle {plate} has {booked_seats} booked seat(s)\n  hint: use {}", join_alternatives(.alternatives)
    )]
    Conflict {
        plate: String,
        booked_seats: u32,
        alternatives: Vec<RemovalAlternative>,
    },

    #[error("{0}")]
    ValidationFailure(String),

    #[error("stale operation: {0}")]
    StaleOperation(String),

    #[error("{completed}, but {failed}\n  hint: do not repeat the step that already succeeded")]
    PartialFailure { completed: String, failed: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rejected by remote: {0}")]
    Rejected(String),

    #[error("conflict: {0}")]
    Busy(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// True when the remote service could not be reached at all.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::NetworkUnavailable(_))
    }
}

impl From<GatewayError> for Error {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(msg) => Error::NetworkUnavailable(msg),
            GatewayError::BookedSeatsPresent { plate, booked_seats } => Error::Conflict {
                plate,
                booked_seats,
                alternatives: vec![
                    RemovalAlternative::TransferSeats,
                    RemovalAlternative::EmergencyRemove,
                ],
            },
            GatewayError::AlreadyHasDayPass(plate) => {
                Error::Rejected(format!("{plate} already has a valid day pass"))
            }
            GatewayError::NotFound(what) => Error::NotFound(what),
            GatewayError::Rejected(msg) => Error::Rejected(msg),
        }
    }
}

/// A specialized Result type for station-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
