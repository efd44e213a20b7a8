// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tuning.
//!
//! Usually embedded as the `[engine]` table of the desk configuration:
//!
//! ```toml
//! [engine]
//! summary_interval_ms = 10000
//! suppression_ms = 2500
//! day_pass_price = "2.000"
//!
//! [[engine.routes]]
//! destination_name = "Tunis"
//! base_price = 8500
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::price::Price;
use crate::route::{RoutePrice, RouteTable, DEFAULT_PREFIXES};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Background summary refresh interval (default: 10000).
    #[serde(default = "default_summary_interval_ms")]
    pub summary_interval_ms: u64,
    /// Quiet period after a refresh completes before the next automatic one (default: 1000).
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Suppression window after a local mutation (default: 2500).
    #[serde(default = "default_suppression_ms")]
    pub suppression_ms: u64,
    /// Price charged for a day pass, in dinars (default: "2.000").
    #[serde(default = "default_day_pass_price", with = "price_string")]
    pub day_pass_price: Price,
    /// Prefixes stripped when matching destination names.
    #[serde(default = "default_route_prefixes")]
    pub route_prefixes: Vec<String>,
    /// Fare reference used when an entry carries no base price.
    #[serde(default)]
    pub routes: Vec<RoutePrice>,
}

fn default_summary_interval_ms() -> u64 {
    10_000
}

fn default_cooldown_ms() -> u64 {
    1_000
}

fn default_suppression_ms() -> u64 {
    2_500
}

fn default_day_pass_price() -> Price {
    Price::from_dinars(2)
}

fn default_route_prefixes() -> Vec<String> {
    DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            summary_interval_ms: default_summary_interval_ms(),
            cooldown_ms: default_cooldown_ms(),
            suppression_ms: default_suppression_ms(),
            day_pass_price: default_day_pass_price(),
            route_prefixes: default_route_prefixes(),
            routes: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parses a standalone engine config.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.summary_interval_ms == 0 {
            return Err(Error::Config("summary_interval_ms must be positive".to_string()));
        }
        if self.suppression_ms == 0 {
            return Err(Error::Config("suppression_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn summary_interval(&self) -> Duration {
        Duration::from_millis(self.summary_interval_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn suppression(&self) -> Duration {
        Duration::from_millis(self.suppression_ms)
    }

    pub fn route_table(&self) -> RouteTable {
        RouteTable::with_prefixes(self.routes.clone(), self.route_prefixes.clone())
    }
}

/// Prices in config files are written as dinar strings ("2.000").
mod price_string {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::price::Price;

    pub fn serialize<S: Serializer>(price: &Price, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&price.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Price, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
