// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use station_core::{EntryStatus, Price};

#[test]
fn summaries_list_counts_and_region() {
    let summaries = vec![
        DestinationSummary::new("tunis", "Tunis", 3).with_region("Tunis", Some("Bab Saadoun")),
        DestinationSummary::new("sfax", "Sfax", 0),
    ];

    let out = format_summaries(&summaries);

    assert_eq!(out, "Tunis (tunis): 3 vehicle(s) [Tunis / Bab Saadoun]\nSfax (sfax): 0 vehicle(s)");
}

#[test]
fn queue_table_is_sorted_by_position() {
    let entries = vec![
        QueueEntry::new("e2", "tunis", "Tunis", "222TUN2", 2, 8),
        QueueEntry::new("e1", "tunis", "Tunis", "111TUN1", 1, 8)
            .with_available(5)
            .with_status(EntryStatus::Loading)
            .with_base_price(Price::from_millimes(8_500)),
    ];

    let out = format_queue("tunis", &entries);
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines[0], "Tunis (tunis)");
    assert!(lines[1].starts_with("POS"));
    assert!(lines[2].contains("111TUN1"));
    assert!(lines[2].contains("LOADING"));
    assert!(lines[2].contains("5/8"));
    assert!(lines[2].contains("8.500"));
    assert!(lines[3].contains("222TUN2"));
}

#[test]
fn empty_queue_says_so() {
    assert_eq!(format_queue("sfax", &[]), "sfax: queue is empty");
}

#[test]
fn refused_exit_suggests_commands() {
    let outcome = ActionOutcome {
        success: false,
        message: "vehicle A has 2 booked seat(s)".into(),
        alternatives: vec![RemovalAlternative::TransferSeats, RemovalAlternative::EmergencyRemove],
    };

    let out = format_outcome(&outcome);

    assert!(out.contains("station-desk transfer <plate> | station-desk emergency <plate>"));
}

#[test]
fn plain_outcome_is_just_the_message() {
    assert_eq!(format_outcome(&ActionOutcome::ok("done")), "done");
}

#[test]
fn health_lines() {
    assert_eq!(format_health(&Health::Healthy), "remote: healthy");
    assert_eq!(
        format_health(&Health::Degraded { reason: "timeout".into() }),
        "remote: degraded (timeout)"
    );
}

#[test]
fn passes_and_routes() {
    let passes = BTreeMap::from([("A".to_string(), true), ("B".to_string(), false)]);
    assert_eq!(format_passes(&passes), "A: valid\nB: none");

    let routes = vec![AuthorizedDestination {
        station_id: "tunis".into(),
        station_name: "Tunis".into(),
        base_price: Price::from_millimes(8_500),
        is_default: true,
        priority: 1,
    }];
    assert_eq!(format_routes("A", &routes), "A:\n  Tunis (tunis) 8.500 (default)");
    assert_eq!(format_routes("B", &[]), "B: no authorized destinations");
}
