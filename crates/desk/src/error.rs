// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::TransportError;

/// Errors surfaced by the desk binary.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] station_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    ActionFailed(String),

    #[error("entry not found: {0}\n  hint: run 'station-desk status' to list entry ids")]
    EntryNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
