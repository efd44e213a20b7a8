// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server state management.
//!
//! Wraps the canonical station for shared access and keeps its JSON snapshot
//! on disk in step with every accepted mutation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info};

use station_core::{
    service_day, system_clock, GatewayError, GatewayResult, Request, ResponseBody, Result,
    ServerMessage, SharedClock,
};

use crate::seed::demo_station;
use crate::station::Station;

/// Snapshot file name inside the data directory.
pub const SNAPSHOT_FILE: &str = "station.json";

/// Shared server state containing the canonical station.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<ServerStateInner>,
}

struct ServerStateInner {
    /// Requests run one at a time under this lock.
    station: Mutex<Station>,
    /// Where accepted mutations are saved; `None` keeps the station in memory.
    snapshot_path: Option<PathBuf>,
    /// Decides the service day for day-pass checks.
    clock: SharedClock,
    /// Broadcast channel for queue change notices.
    broadcast_tx: broadcast::Sender<ServerMessage>,
}

impl ServerState {
    pub fn new(station: Station, snapshot_path: Option<PathBuf>, clock: SharedClock) -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        ServerState {
            inner: Arc::new(ServerStateInner {
                station: Mutex::new(station),
                snapshot_path,
                clock,
                broadcast_tx,
            }),
        }
    }

    /// Opens the station saved in `data_dir`.
    ///
    /// Without a snapshot the station starts empty, or with the demo data
    /// when `seed` is set. A seeded station is saved immediately.
    pub fn open(data_dir: &Path, seed: bool) -> Result<Self> {
        Self::open_with_clock(data_dir, seed, system_clock())
    }

    pub fn open_with_clock(data_dir: &Path, seed: bool, clock: SharedClock) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(SNAPSHOT_FILE);

        let station = if path.exists() {
            let station: Station = serde_json::from_str(&fs::read_to_string(&path)?)?;
            info!(
                path = %path.display(),
                destinations = station.destinations.len(),
                vehicles = station.vehicles.len(),
                "loaded station snapshot"
            );
            station
        } else if seed {
            let station = demo_station(service_day(clock.now_ms()));
            save(&path, &station)?;
            info!(path = %path.display(), "seeded demo station");
            station
        } else {
            Station::default()
        };

        Ok(Self::new(station, Some(path), clock))
    }

    /// Runs one request.
    ///
    /// A mutation is applied to a copy, saved, then swapped in, so a failed
    /// save leaves the station untouched. Each changed destination is
    /// announced to every connection.
    pub async fn handle(&self, request: Request) -> GatewayResult<ResponseBody> {
        let op = request.name();
        let today = service_day(self.inner.clock.now_ms());
        let mut station = self.inner.station.lock().await;

        if !request.is_mutation() {
            return station.execute(request, today).map(|applied| applied.body);
        }

        let mut next = station.clone();
        let applied = next.execute(request, today)?;
        if let Some(path) = &self.inner.snapshot_path {
            save(path, &next).map_err(|e| {
                error!(op, path = %path.display(), error = %e, "failed to save station");
                GatewayError::Unavailable(format!("could not save station state: {e}"))
            })?;
        }
        *station = next;

        for destination_id in applied.changed {
            debug!(op, destination = %destination_id, "queue changed");
            // No receivers just means no desk is connected.
            let _ = self.inner.broadcast_tx.send(ServerMessage::queue_changed(destination_id));
        }
        Ok(applied.body)
    }

    /// Subscribe to broadcast messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Copy of the current station.
    #[cfg(test)]
    pub async fn station(&self) -> Station {
        self.inner.station.lock().await.clone()
    }
}

/// Writes the snapshot through a temporary file so readers never see half of it.
fn save(path: &Path, station: &Station) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(station)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
