// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket implementation of [`RemoteQueueGateway`].
//!
//! Each call is one `request` frame answered by a `response` or `error`
//! frame carrying the same id. Calls are serialized over one connection;
//! `queue_changed` broadcasts seen while waiting for a reply are forwarded
//! to subscribers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use station_core::{
    AdmissionRequest, AuthorizedDestination, ClientMessage, Confirmation, DestinationSummary,
    EmergencyRemoval, GatewayError, GatewayFuture, GatewayResult, PositionAssignment,
    PurchaseRequest, QueueEntry, RemoteQueueGateway, Request, ResponseBody, ServerMessage,
    SummaryFilter,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use super::transport::{Transport, TransportError, WebSocketTransport};

/// Connection settings for the remote queue service.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// URL of the remote server.
    pub url: String,
    /// Maximum connection attempts per call.
    pub max_retries: u32,
    /// Maximum delay between connection attempts (seconds).
    pub max_delay_secs: u64,
    /// Initial delay for exponential backoff (milliseconds).
    pub initial_delay_ms: u64,
    /// How long a call waits for its reply.
    pub request_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            url: "ws://localhost:7890".to_string(),
            max_retries: 10,
            max_delay_secs: 30,
            initial_delay_ms: 100,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// State of the gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Reconnecting { attempt: u32 },
}

struct Link<T> {
    transport: T,
    state: ConnectionState,
}

pub struct WsGateway<T: Transport = WebSocketTransport> {
    config: LinkConfig,
    link: Mutex<Link<T>>,
    next_id: AtomicU64,
    changes: broadcast::Sender<String>,
}

impl WsGateway<WebSocketTransport> {
    pub fn new(config: LinkConfig) -> Self {
        Self::with_transport(config, WebSocketTransport::new())
    }
}

impl<T: Transport> WsGateway<T> {
    /// Create a gateway over a custom transport (for testing).
    pub fn with_transport(config: LinkConfig, transport: T) -> Self {
        let (changes, _) = broadcast::channel(64);
        WsGateway {
            config,
            link: Mutex::new(Link { transport, state: ConnectionState::Disconnected }),
            next_id: AtomicU64::new(1),
            changes,
        }
    }

    pub async fn state(&self) -> ConnectionState {
        self.link.lock().await.state
    }

    /// Destination ids announced by `queue_changed` broadcasts.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }

    pub async fn disconnect(&self) -> GatewayResult<()> {
        let mut link = self.link.lock().await;
        link.transport.disconnect().await?;
        link.state = ConnectionState::Disconnected;
        Ok(())
    }

    /// Connects if needed, retrying with exponential backoff.
    async fn ensure_connected(&self, link: &mut Link<T>) -> GatewayResult<()> {
        if link.state == ConnectionState::Connected && link.transport.is_connected() {
            return Ok(());
        }

        let mut attempt = 0;
        let mut delay_ms = self.config.initial_delay_ms;
        loop {
            attempt += 1;
            link.state = ConnectionState::Reconnecting { attempt };

            match link.transport.connect(&self.config.url).await {
                Ok(()) => {
                    link.state = ConnectionState::Connected;
                    info!(url = %self.config.url, attempt, "remote connected");
                    return Ok(());
                }
                Err(e) if attempt >= self.config.max_retries => {
                    link.state = ConnectionState::Disconnected;
                    warn!(url = %self.config.url, error = %e, "giving up on remote");
                    return Err(GatewayError::Unavailable(format!(
                        "could not reach {} after {attempt} attempt(s): {e}",
                        self.config.url
                    )));
                }
                Err(e) => {
                    debug!(attempt, delay_ms, error = %e, "connect failed, backing off");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = std::cmp::min(delay_ms * 2, self.config.max_delay_secs * 1000);
                }
            }
        }
    }

    /// Sends one request and waits for the matching reply.
    pub async fn call(&self, request: Request) -> GatewayResult<ResponseBody> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let op = request.name();
        let mut link = self.link.lock().await;
        self.ensure_connected(&mut link).await?;

        if let Err(e) = link.transport.send(ClientMessage::request(id, request)).await {
            link.state = ConnectionState::Disconnected;
            return Err(e.into());
        }
        debug!(id, op, "request sent");

        let reply = tokio::time::timeout(self.config.request_timeout, self.await_reply(&mut link, id));
        match reply.await {
            Ok(result) => result,
            Err(_) => {
                // A late reply would be mistaken for the next call's.
                let _ = link.transport.disconnect().await;
                link.state = ConnectionState::Disconnected;
                Err(GatewayError::Unavailable(format!("{op} timed out")))
            }
        }
    }

    async fn await_reply(&self, link: &mut Link<T>, id: u64) -> GatewayResult<ResponseBody> {
        loop {
            let msg = match link.transport.recv().await {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    link.state = ConnectionState::Disconnected;
                    return Err(TransportError::ConnectionClosed.into());
                }
                Err(e) => {
                    link.state = ConnectionState::Disconnected;
                    return Err(e.into());
                }
            };

            match msg {
                ServerMessage::Response { id: reply, body } if reply == id => return Ok(body),
                ServerMessage::Error { id: Some(reply), error } if reply == id => {
                    return Err(error.into())
                }
                ServerMessage::QueueChanged { destination_id } => self.announce(destination_id),
                ServerMessage::Error { id: None, error } => {
                    warn!(?error, "server reported an unattributed error");
                }
                other => debug!(?other, "discarding stale reply"),
            }
        }
    }

    /// Waits up to `wait` for a `queue_changed` broadcast while idle.
    pub async fn next_change(&self, wait: Duration) -> GatewayResult<Option<String>> {
        let mut link = self.link.lock().await;
        self.ensure_connected(&mut link).await?;

        let Ok(received) = tokio::time::timeout(wait, link.transport.recv()).await else {
            return Ok(None);
        };
        match received {
            Ok(Some(ServerMessage::QueueChanged { destination_id })) => {
                self.announce(destination_id.clone());
                Ok(Some(destination_id))
            }
            Ok(Some(other)) => {
                debug!(?other, "discarding unsolicited message");
                Ok(None)
            }
            Ok(None) => {
                link.state = ConnectionState::Disconnected;
                Err(TransportError::ConnectionClosed.into())
            }
            Err(e) => {
                link.state = ConnectionState::Disconnected;
                Err(e.into())
            }
        }
    }

    fn announce(&self, destination_id: String) {
        debug!(destination = %destination_id, "queue changed remotely");
        // No subscribers is fine.
        let _ = self.changes.send(destination_id);
    }
}

impl<T: Transport> RemoteQueueGateway for WsGateway<T> {
    fn list_destination_summaries(
        &self,
        filter: Option<&SummaryFilter>,
    ) -> GatewayFuture<'_, Vec<DestinationSummary>> {
        let request = Request::ListSummaries { filter: filter.cloned() };
        Box::pin(async move { self.call(request).await?.into_summaries() })
    }

    fn get_queue(&self, destination_id: &str) -> GatewayFuture<'_, Vec<QueueEntry>> {
        let request = Request::GetQueue { destination_id: destination_id.to_string() };
        Box::pin(async move { self.call(request).await?.into_queue() })
    }

    fn enter_queue(&self, request: &AdmissionRequest) -> GatewayFuture<'_, Confirmation> {
        let request = Request::EnterQueue(request.clone());
        Box::pin(async move { self.call(request).await?.into_confirmation() })
    }

    fn exit_queue(&self, plate: &str) -> GatewayFuture<'_, Confirmation> {
        let request = Request::ExitQueue { plate: plate.to_string() };
        Box::pin(async move { self.call(request).await?.into_confirmation() })
    }

    fn transfer_seats_and_remove(
        &self,
        plate: &str,
        destination_id: &str,
    ) -> GatewayFuture<'_, Confirmation> {
        let request = Request::TransferSeats {
            plate: plate.to_string(),
            destination_id: destination_id.to_string(),
        };
        Box::pin(async move { self.call(request).await?.into_confirmation() })
    }

    fn emergency_remove(&self, plate: &str) -> GatewayFuture<'_, EmergencyRemoval> {
        let request = Request::EmergencyRemove { plate: plate.to_string() };
        Box::pin(async move { self.call(request).await?.into_removal() })
    }

    fn end_trip(&self, entry_id: &str, staff_id: Option<&str>) -> GatewayFuture<'_, Confirmation> {
        let request = Request::EndTrip {
            entry_id: entry_id.to_string(),
            staff_id: staff_id.map(str::to_string),
        };
        Box::pin(async move { self.call(request).await?.into_confirmation() })
    }

    fn reorder(
        &self,
        destination_id: &str,
        assignments: &[PositionAssignment],
    ) -> GatewayFuture<'_, Confirmation> {
        let request = Request::Reorder {
            destination_id: destination_id.to_string(),
            assignments: assignments.to_vec(),
        };
        Box::pin(async move { self.call(request).await?.into_confirmation() })
    }

    fn move_to_front(
        &self,
        entry_id: &str,
        destination_id: &str,
    ) -> GatewayFuture<'_, Confirmation> {
        let request = Request::MoveToFront {
            entry_id: entry_id.to_string(),
            destination_id: destination_id.to_string(),
        };
        Box::pin(async move { self.call(request).await?.into_confirmation() })
    }

    fn has_valid_day_pass(&self, plate: &str) -> GatewayFuture<'_, bool> {
        let request = Request::HasDayPass { plate: plate.to_string() };
        Box::pin(async move { self.call(request).await?.into_day_pass() })
    }

    fn has_valid_day_pass_batch(
        &self,
        plates: &[String],
    ) -> GatewayFuture<'_, BTreeMap<String, bool>> {
        let request = Request::HasDayPassBatch { plates: plates.to_vec() };
        Box::pin(async move { self.call(request).await?.into_day_pass_batch() })
    }

    fn purchase_day_pass(&self, request: &PurchaseRequest) -> GatewayFuture<'_, Confirmation> {
        let request = Request::PurchaseDayPass(request.clone());
        Box::pin(async move { self.call(request).await?.into_confirmation() })
    }

    fn get_authorized_destinations(
        &self,
        plate: &str,
    ) -> GatewayFuture<'_, Vec<AuthorizedDestination>> {
        let request = Request::AuthorizedDestinations { plate: plate.to_string() };
        Box::pin(async move { self.call(request).await?.into_authorized() })
    }

    fn book_seats(&self, entry_id: &str, seats: u32) -> GatewayFuture<'_, Confirmation> {
        let request = Request::BookSeats { entry_id: entry_id.to_string(), seats };
        Box::pin(async move { self.call(request).await?.into_confirmation() })
    }

    fn health_check(&self) -> GatewayFuture<'_, bool> {
        Box::pin(async move { self.call(Request::Health).await?.into_health() })
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
