// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Desk-facing WebSocket endpoint.
//!
//! Every desk gets its own task. Text frames carry one [`ClientMessage`] each
//! and are answered in order; queue change notices from [`ServerState`] are
//! pushed to every desk between replies.

use std::net::SocketAddr;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use station_core::{ClientMessage, ServerMessage, WireError};

use crate::state::ServerState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

type DeskSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Accepts desks on `addr` until the listener fails.
pub async fn run(addr: SocketAddr, state: ServerState) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "queue service listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_desk(stream, peer, state).await {
                warn!(%peer, error = %e, "desk session ended with an error");
            }
        });
    }
}

/// Runs one desk session to completion.
pub(crate) async fn serve_desk(
    stream: TcpStream,
    peer: SocketAddr,
    state: ServerState,
) -> Result<(), BoxError> {
    let socket = tokio_tungstenite::accept_async(stream).await?;
    info!(%peer, "desk connected");

    let (mut sink, mut frames) = socket.split();
    // Subscribed before the first request is read.
    let mut notices = state.subscribe();

    loop {
        tokio::select! {
            frame = frames.next() => {
                let frame = match frame {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        warn!(%peer, error = %e, "desk socket failed");
                        break;
                    }
                    None => break,
                };
                match frame {
                    Message::Text(text) => push(&mut sink, &answer(&text, &state).await).await?,
                    Message::Ping(data) => sink.send(Message::Pong(data)).await?,
                    Message::Close(_) => break,
                    _ => {}
                }
            }

            notice = notices.recv() => match notice {
                Ok(msg) => {
                    if let Err(e) = push(&mut sink, &msg).await {
                        warn!(%peer, error = %e, "could not forward queue change");
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(%peer, missed, "desk fell behind on queue changes");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!(%peer, "desk disconnected");
    Ok(())
}

async fn push(sink: &mut DeskSink, msg: &ServerMessage) -> Result<(), BoxError> {
    sink.send(Message::Text(msg.to_json()?.into())).await?;
    Ok(())
}

/// Decodes one frame and produces its reply.
async fn answer(text: &str, state: &ServerState) -> ServerMessage {
    let msg = match ClientMessage::from_json(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(error = %e, "undecodable desk frame");
            return ServerMessage::error(
                None,
                WireError::Rejected { message: format!("malformed message: {e}") },
            );
        }
    };

    match msg {
        ClientMessage::Request { id, request } => {
            let op = request.name();
            let result = state.handle(request).await;
            match &result {
                Ok(_) => debug!(id, op, "request served"),
                Err(e) => debug!(id, op, error = %e, "request refused"),
            }
            ServerMessage::reply(id, result)
        }
        ClientMessage::Ping { id } => ServerMessage::pong(id),
    }
}
