// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use station_core::{ClientMessage, GatewayResult, Request, ResponseBody, ServerMessage};

use super::transport::{Transport, TransportError, TransportFuture};

type Responder = Box<dyn Fn(&Request) -> GatewayResult<ResponseBody> + Send>;

/// In-memory transport. Requests are answered by an optional responder;
/// anything else is read from the incoming queue.
#[derive(Clone, Default)]
pub struct MockTransport {
    connected: bool,
    incoming: Arc<Mutex<VecDeque<ServerMessage>>>,
    outgoing: Arc<Mutex<Vec<ClientMessage>>>,
    responder: Arc<Mutex<Option<Responder>>>,
    failing_connects: Arc<Mutex<u32>>,
    connects: Arc<Mutex<u32>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message that will be returned by recv().
    pub fn queue_incoming(&self, msg: ServerMessage) {
        self.incoming.lock().unwrap().push_back(msg);
    }

    /// Answer every request with `respond`.
    pub fn respond_with(
        &self,
        respond: impl Fn(&Request) -> GatewayResult<ResponseBody> + Send + 'static,
    ) {
        *self.responder.lock().unwrap() = Some(Box::new(respond));
    }

    /// Fail the next `n` connection attempts.
    pub fn fail_connects(&self, n: u32) {
        *self.failing_connects.lock().unwrap() = n;
    }

    pub fn connect_attempts(&self) -> u32 {
        *self.connects.lock().unwrap()
    }

    pub fn sent(&self) -> Vec<ClientMessage> {
        self.outgoing.lock().unwrap().clone()
    }

    pub fn sent_requests(&self) -> Vec<Request> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                ClientMessage::Request { request, .. } => Some(request),
                ClientMessage::Ping { .. } => None,
            })
            .collect()
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, _url: &str) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            *self.connects.lock().unwrap() += 1;
            let mut failing = self.failing_connects.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(TransportError::ConnectionFailed("mock failure".into()));
            }
            drop(failing);
            self.connected = true;
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.connected = false;
            Ok(())
        })
    }

    fn send(&mut self, msg: ClientMessage) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if !self.connected {
                return Err(TransportError::ConnectionClosed);
            }
            if let ClientMessage::Request { id, request } = &msg {
                if let Some(respond) = self.responder.lock().unwrap().as_ref() {
                    let reply = ServerMessage::reply(*id, respond(request));
                    self.incoming.lock().unwrap().push_back(reply);
                }
            }
            self.outgoing.lock().unwrap().push(msg);
            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<ServerMessage>> {
        Box::pin(async move {
            let msg = self.incoming.lock().unwrap().pop_front();
            Ok(msg)
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
