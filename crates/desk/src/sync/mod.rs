// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection to the remote queue service.
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌──────────────┐
//! │  WsGateway   │────►│  Transport  │────►│ station-     │
//! │ (RemoteQueue │◄────│   (trait)   │◄────│ remote       │
//! │  Gateway)    │     └─────────────┘     └──────────────┘
//! └──────────────┘
//! ```
//!
//! - Request/response correlation by id
//! - Automatic reconnect with exponential backoff
//! - `queue_changed` broadcasts forwarded to subscribers
//! - Injectable transport trait for testing

mod gateway;
mod transport;

pub use gateway::{ConnectionState, LinkConfig, WsGateway};
pub use transport::{Transport, TransportError, WebSocketTransport};

#[cfg(test)]
pub(crate) mod test_helpers;
