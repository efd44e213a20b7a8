// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the station-remote binary.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::process::{Child, Command, Stdio};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Helper to spawn a server process and clean it up on drop.
struct ServerProcess {
    child: Child,
    port: u16,
    temp_dir: tempfile::TempDir,
}

impl ServerProcess {
    fn spawn(port_offset: u16) -> Self {
        let temp_dir = tempfile::tempdir().expect("create temp dir");

        // High ephemeral port, distinct per test in this process
        let port = 49152 + (std::process::id() % 1000) as u16 * 2 + port_offset;

        let child = Command::new(env!("CARGO_BIN_EXE_station-remote"))
            .arg("--bind")
            .arg(format!("127.0.0.1:{}", port))
            .arg("--data")
            .arg(temp_dir.path())
            .arg("--seed")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn server process");

        ServerProcess { child, port, temp_dir }
    }

    fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    async fn connect(
        &self,
    ) -> tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>
    {
        // CI runners can be slow, so we use generous timeouts
        for _ in 0..20 {
            if let Ok(Ok((stream, _))) =
                tokio::time::timeout(Duration::from_millis(500), connect_async(&self.ws_url()))
                    .await
            {
                return stream;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        panic!("should connect to server within retries");
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

async fn exchange(
    ws: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    msg: serde_json::Value,
) -> serde_json::Value {
    ws.send(Message::Text(msg.to_string().into())).await.expect("send");
    match tokio::time::timeout(Duration::from_secs(5), ws.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => serde_json::from_str(&text).expect("json reply"),
        other => panic!("Expected a text reply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_lifecycle() {
    let server = ServerProcess::spawn(0);
    let mut ws = server.connect().await;

    let reply = exchange(&mut ws, serde_json::json!({"type": "ping", "id": 12345})).await;

    assert_eq!(reply, serde_json::json!({"type": "pong", "id": 12345}));
    assert!(server.temp_dir.path().join("station.json").exists());
}

#[tokio::test]
async fn test_request_round_trip() {
    let server = ServerProcess::spawn(1);
    let mut ws = server.connect().await;

    let reply = exchange(
        &mut ws,
        serde_json::json!({
            "type": "request",
            "id": 7,
            "request": {"op": "get_queue", "destination_id": "tunis"}
        }),
    )
    .await;

    assert_eq!(reply["type"], "response");
    assert_eq!(reply["id"], 7);
    assert_eq!(reply["body"]["kind"], "queue");
    let plates: Vec<&str> = reply["body"]["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .map(|e| e["plate"].as_str().expect("plate"))
        .collect();
    assert_eq!(plates, vec!["204TUN118", "87TUN3021"]);

    let refused = exchange(
        &mut ws,
        serde_json::json!({
            "type": "request",
            "id": 8,
            "request": {"op": "exit_queue", "plate": "nobody"}
        }),
    )
    .await;
    assert_eq!(refused["type"], "error");
    assert_eq!(refused["error"]["code"], "not_found");
}
