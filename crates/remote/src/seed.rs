// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Demo data for `--seed`.

use chrono::NaiveDate;
use station_core::{AdmissionRequest, AuthorizedDestination, Price, PurchaseRequest, Request};

use crate::station::{Destination, Station, Vehicle};

struct Route {
    id: &'static str,
    name: &'static str,
    governorate: &'static str,
    fare_millimes: u64,
}

const ROUTES: &[Route] = &[
    Route { id: "tunis", name: "Tunis", governorate: "Tunis", fare_millimes: 8_500 },
    Route { id: "sousse", name: "Sousse", governorate: "Sousse", fare_millimes: 6_200 },
    Route { id: "sfax", name: "Sfax", governorate: "Sfax", fare_millimes: 12_800 },
];

/// (plate, seats, routes in priority order; the first is the default)
const FLEET: &[(&str, u32, &[&str])] = &[
    ("123TUN456", 8, &["tunis", "sousse"]),
    ("204TUN118", 8, &["tunis"]),
    ("87TUN3021", 8, &["tunis", "sfax"]),
    ("150TUN77", 8, &["sousse", "tunis"]),
    ("99TUN4410", 8, &["sfax"]),
];

fn route(id: &str) -> Option<&'static Route> {
    ROUTES.iter().find(|r| r.id == id)
}

/// A station with three destinations, five vehicles and two short queues.
///
/// Passes are sold for `today` to every vehicle except the first, so a desk
/// can exercise the purchase-then-admit flow with "123TUN456".
pub fn demo_station(today: NaiveDate) -> Station {
    let mut station = Station::default();
    for r in ROUTES {
        station.add_destination(
            r.id,
            Destination {
                name: r.name.to_string(),
                governorate: Some(r.governorate.to_string()),
                delegation: None,
            },
        );
    }

    for (plate, capacity, served) in FLEET {
        let routes = served
            .iter()
            .enumerate()
            .filter_map(|(i, id)| {
                route(id).map(|r| AuthorizedDestination {
                    station_id: r.id.to_string(),
                    station_name: r.name.to_string(),
                    base_price: Price::from_millimes(r.fare_millimes),
                    is_default: i == 0,
                    priority: i as u32 + 1,
                })
            })
            .collect();
        station.add_vehicle(
            plate,
            Vehicle { vehicle_id: format!("veh-{plate}"), capacity: *capacity, routes },
        );
    }

    let mut requests: Vec<Request> = Vec::new();
    for (plate, _, served) in FLEET.iter().skip(1) {
        requests.push(Request::PurchaseDayPass(PurchaseRequest {
            plate: plate.to_string(),
            vehicle_id: format!("veh-{plate}"),
            price: Price::from_dinars(2),
            staff_id: Some("seed".to_string()),
        }));
        if let Some(first) = served.first() {
            requests.push(Request::EnterQueue(AdmissionRequest {
                plate: plate.to_string(),
                destination_id: first.to_string(),
                destination_name: None,
                staff_id: Some("seed".to_string()),
            }));
        }
    }
    for request in requests {
        // Refusals only shrink the demo.
        let _ = station.execute(request, today);
    }

    station
}

#[cfg(test)]
#[path = "seed_tests.rs"]
mod tests;
