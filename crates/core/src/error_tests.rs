// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    network = { Error::NetworkUnavailable("connection refused".into()), "connection refused" },
    validation = { Error::ValidationFailure("duplicate plate 123TUN456".into()), "123TUN456" },
    stale = { Error::StaleOperation("entry e-9 vanished".into()), "stale" },
    not_found = { Error::NotFound("entry e-1".into()), "e-1" },
)]
fn error_display_contains(err: Error, expected: &str) {
    assert!(err.to_string().contains(expected));
}

#[test]
fn conflict_lists_alternatives() {
    let err = Error::Conflict {
        plate: "123TUN456".into(),
        booked_seats: 2,
        alternatives: vec![RemovalAlternative::TransferSeats, RemovalAlternative::EmergencyRemove],
    };
    let msg = err.to_string();
    assert!(msg.contains("2 booked seat"));
    assert!(msg.contains("transfer seats"));
    assert!(msg.contains("emergency removal"));
}

#[test]
fn partial_failure_names_both_steps() {
    let err = Error::PartialFailure {
        completed: "day pass purchased".into(),
        failed: "queue admission failed: closed".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("day pass purchased"));
    assert!(msg.contains("admission failed"));
}

#[test]
fn gateway_booked_seats_becomes_conflict() {
    let err: Error =
        GatewayError::BookedSeatsPresent { plate: "77TUN1".into(), booked_seats: 3 }.into();
    match err {
        Error::Conflict { booked_seats, alternatives, .. } => {
            assert_eq!(booked_seats, 3);
            assert_eq!(alternatives.len(), 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn gateway_unavailable_is_network() {
    let err: Error = GatewayError::Unavailable("timeout".into()).into();
    assert!(err.is_network());
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<()>("invalid").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::Json(_)));
}
