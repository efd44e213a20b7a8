// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Desk configuration.
//!
//! Read from `config.toml` in the user config directory
//! (`~/.config/station-desk/` on Linux) unless `--config` points elsewhere:
//!
//! ```toml
//! url = "ws://dispatch.local:7890"
//! staff_id = "agent-12"
//!
//! [engine]
//! summary_interval_ms = 10000
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use station_core::EngineConfig;

use crate::error::{Error, Result};
use crate::sync::LinkConfig;

const APP_DIR_NAME: &str = "station-desk";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeskConfig {
    /// Remote queue service URL (default: "ws://localhost:7890").
    #[serde(default = "default_url")]
    pub url: String,
    /// Staff member recorded on admissions, purchases and trip settlements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
    /// Maximum connection attempts per call (default: 10).
    #[serde(default = "default_reconnect_max_retries")]
    pub reconnect_max_retries: u32,
    /// Maximum delay between connection attempts in seconds (default: 30).
    #[serde(default = "default_reconnect_max_delay_secs")]
    pub reconnect_max_delay_secs: u64,
    /// First backoff delay in milliseconds (default: 100).
    #[serde(default = "default_reconnect_initial_delay_ms")]
    pub reconnect_initial_delay_ms: u64,
    /// Max time to wait for a reply in milliseconds (default: 10000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_url() -> String {
    "ws://localhost:7890".to_string()
}

fn default_reconnect_max_retries() -> u32 {
    10
}

fn default_reconnect_max_delay_secs() -> u64 {
    30
}

fn default_reconnect_initial_delay_ms() -> u64 {
    100
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for DeskConfig {
    fn default() -> Self {
        DeskConfig {
            url: default_url(),
            staff_id: None,
            reconnect_max_retries: default_reconnect_max_retries(),
            reconnect_max_delay_secs: default_reconnect_max_delay_secs(),
            reconnect_initial_delay_ms: default_reconnect_initial_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            engine: EngineConfig::default(),
        }
    }
}

impl DeskConfig {
    /// Default location of the config file, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config: DeskConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(DeskConfig::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(Error::Config(format!(
                "invalid remote URL '{}': must be ws:// or wss://",
                self.url
            )));
        }
        if self.reconnect_max_retries == 0 {
            return Err(Error::Config("reconnect_max_retries must be at least 1".to_string()));
        }
        self.engine.validate()?;
        Ok(())
    }

    pub fn link(&self) -> LinkConfig {
        LinkConfig {
            url: self.url.clone(),
            max_retries: self.reconnect_max_retries,
            max_delay_secs: self.reconnect_max_delay_secs,
            initial_delay_ms: self.reconnect_initial_delay_ms,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
