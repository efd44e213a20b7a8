// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text rendering for the terminal.

use std::collections::BTreeMap;
use std::fmt::Write;

use station_core::{
    ActionOutcome, AuthorizedDestination, DestinationSummary, Health, QueueEntry,
    RemovalAlternative,
};

/// One line per destination: `name (id): N vehicle(s)`.
pub fn format_summaries(summaries: &[DestinationSummary]) -> String {
    if summaries.is_empty() {
        return "no destinations".to_string();
    }
    let mut out = String::new();
    for s in summaries {
        let _ = write!(
            out,
            "{} ({}): {} vehicle(s)",
            s.destination_name, s.destination_id, s.vehicle_count
        );
        if let Some(region) = region(s) {
            let _ = write!(out, " [{region}]");
        }
        out.push('\n');
    }
    out.truncate(out.trim_end().len());
    out
}

fn region(s: &DestinationSummary) -> Option<String> {
    match (&s.governorate, &s.delegation) {
        (Some(g), Some(d)) => Some(format!("{g} / {d}")),
        (Some(g), None) => Some(g.clone()),
        _ => None,
    }
}

/// Table of one destination's queue, in position order.
pub fn format_queue(destination_id: &str, entries: &[QueueEntry]) -> String {
    if entries.is_empty() {
        return format!("{destination_id}: queue is empty");
    }
    let mut sorted: Vec<&QueueEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.position);

    let plate_width = sorted.iter().map(|e| e.plate.len()).max().unwrap_or(0).max("PLATE".len());
    let mut out = format!("{} ({destination_id})\n", sorted[0].destination_name);
    let _ = writeln!(
        out,
        "{:>3}  {:<plate_width$}  {:<8}  {:>5}  {:>8}  ID",
        "POS", "PLATE", "STATUS", "SEATS", "FARE"
    );
    for e in sorted {
        let seats = format!("{}/{}", e.available_seats, e.total_seats);
        let _ = writeln!(
            out,
            "{:>3}  {:<plate_width$}  {:<8}  {:>5}  {:>8}  {}",
            e.position,
            e.plate,
            e.status.as_str(),
            seats,
            e.base_price.to_string(),
            e.id
        );
    }
    out.truncate(out.trim_end().len());
    out
}

pub fn format_outcome(outcome: &ActionOutcome) -> String {
    if outcome.alternatives.is_empty() {
        return outcome.message.clone();
    }
    let commands: Vec<&str> = outcome
        .alternatives
        .iter()
        .map(|a| match a {
            RemovalAlternative::TransferSeats => "station-desk transfer <plate>",
            RemovalAlternative::EmergencyRemove => "station-desk emergency <plate>",
        })
        .collect();
    format!("{}\n  try: {}", outcome.message, commands.join(" | "))
}

pub fn format_health(health: &Health) -> String {
    match health {
        Health::Healthy => "remote: healthy".to_string(),
        Health::Degraded { reason } => format!("remote: degraded ({reason})"),
    }
}

pub fn format_passes(passes: &BTreeMap<String, bool>) -> String {
    passes
        .iter()
        .map(|(plate, valid)| format!("{plate}: {}", if *valid { "valid" } else { "none" }))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_routes(plate: &str, routes: &[AuthorizedDestination]) -> String {
    if routes.is_empty() {
        return format!("{plate}: no authorized destinations");
    }
    let mut out = format!("{plate}:\n");
    for r in routes {
        let marker = if r.is_default { " (default)" } else { "" };
        let _ = writeln!(out, "  {} ({}) {}{marker}", r.station_name, r.station_id, r.base_price);
    }
    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
