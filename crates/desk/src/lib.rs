// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! station-desk: dispatch desk client for station vehicle queues.
//!
//! Wires a [`station_core::DispatchEngine`] to the remote queue service
//! over WebSocket and exposes its actions as CLI commands.

mod cli;
mod commands;
mod display;

pub mod config;
pub mod error;
pub mod sync;

use std::sync::Arc;

use station_core::DispatchEngine;
use tracing::debug;

pub use cli::{Cli, Command, GlobalArgs};
pub use config::DeskConfig;
pub use error::{Error, Result};

/// Resolves the effective configuration from the config file and flags.
pub fn resolve_config(global: &GlobalArgs) -> Result<DeskConfig> {
    let mut config = match &global.config {
        Some(path) => DeskConfig::load(path)?,
        None => DeskConfig::load_or_default(DeskConfig::default_path().as_deref())?,
    };
    if let Some(url) = &global.url {
        config.url = url.clone();
    }
    if let Some(staff) = &global.staff {
        config.staff_id = Some(staff.clone());
    }
    config.validate()?;
    Ok(config)
}

/// Runs one command and returns the text to print.
pub async fn run(cli: Cli) -> Result<String> {
    let config = resolve_config(&cli.global)?;
    if let Command::Config = cli.command {
        return toml::to_string_pretty(&config)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)));
    }

    debug!(url = %config.url, "connecting to remote queue service");
    let gateway = Arc::new(sync::WsGateway::new(config.link()));
    let mut engine = DispatchEngine::new(gateway.clone(), config.engine.clone());
    if let Some(staff) = &config.staff_id {
        engine = engine.with_staff(staff.clone());
    }

    let result = commands::execute(&engine, &gateway, cli.command).await;
    // Peer may already be gone.
    let _ = gateway.disconnect().await;
    result
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
