// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn empty_file_gives_defaults() {
    let config: DeskConfig = toml::from_str("").unwrap();
    assert_eq!(config, DeskConfig::default());
    assert_eq!(config.url, "ws://localhost:7890");
    assert_eq!(config.engine.summary_interval_ms, 10_000);
}

#[test]
fn engine_table_is_nested() {
    let config: DeskConfig = toml::from_str(
        r#"
url = "wss://dispatch.example:7890"
staff_id = "agent-12"

[engine]
suppression_ms = 4000
day_pass_price = "2.500"
"#,
    )
    .unwrap();

    assert_eq!(config.staff_id.as_deref(), Some("agent-12"));
    assert_eq!(config.engine.suppression_ms, 4_000);
    assert_eq!(config.engine.day_pass_price.to_string(), "2.500");
    assert_eq!(config.engine.cooldown_ms, 1_000);
}

#[test]
fn link_config_carries_reconnect_settings() {
    let config = DeskConfig {
        reconnect_max_retries: 4,
        request_timeout_ms: 1_500,
        ..DeskConfig::default()
    };

    let link = config.link();

    assert_eq!(link.max_retries, 4);
    assert_eq!(link.initial_delay_ms, 100);
    assert_eq!(link.request_timeout, Duration::from_millis(1_500));
}

#[parameterized(
    http = { "url = \"http://localhost:7890\"" },
    git = { "url = \"git:.\"" },
    no_retries = { "reconnect_max_retries = 0" },
    zero_interval = { "[engine]\nsummary_interval_ms = 0" },
)]
fn invalid_config_is_rejected(body: &str) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(&path, body).unwrap();

    let err = DeskConfig::load(&path).unwrap_err();

    assert!(matches!(err, Error::Config(_) | Error::Core(_)), "{err}");
}

#[test]
fn save_then_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("config.toml");
    let config = DeskConfig { staff_id: Some("agent-3".into()), ..DeskConfig::default() };

    config.save(&path).unwrap();

    assert_eq!(DeskConfig::load(&path).unwrap(), config);
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("absent.toml");

    assert_eq!(DeskConfig::load_or_default(Some(&path)).unwrap(), DeskConfig::default());
    assert_eq!(DeskConfig::load_or_default(None).unwrap(), DeskConfig::default());
}

#[test]
fn malformed_toml_names_the_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(&path, "url = [").unwrap();

    let err = DeskConfig::load(&path).unwrap_err();

    assert!(err.to_string().contains("config.toml"));
}
