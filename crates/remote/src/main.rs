// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! station-remote: the queue service station desks synchronize with.
//!
//! Holds the canonical destinations, vehicles, queues and day passes,
//! answers desk requests over WebSocket, and announces every queue change
//! to all connected desks.

mod seed;
mod server;
mod state;
mod station;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// station-remote: queue service for station dispatch desks
#[derive(Parser, Debug)]
#[command(name = "station-remote")]
#[command(about = "WebSocket queue service for station dispatch desks")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7890")]
    bind: SocketAddr,

    /// Directory holding the station snapshot
    #[arg(short, long, default_value = ".")]
    data: PathBuf,

    /// Start from demo data when no snapshot exists
    #[arg(long)]
    seed: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting station-remote server");
    info!("  Bind address: {}", args.bind);
    info!("  Data directory: {}", args.data.display());

    let state = state::ServerState::open(&args.data, args.seed)?;

    server::run(args.bind, state).await?;

    Ok(())
}
