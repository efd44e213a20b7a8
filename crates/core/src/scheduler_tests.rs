// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::entry::{DestinationSummary, EntryPatch, EntryStatus};
use crate::store::QueueStateStore;
use crate::test_helpers::{ids, make_queue, ManualClock, MockGateway};

struct Fixture {
    gateway: Arc<MockGateway>,
    store: SharedStore,
    suppression: Arc<SuppressionManager>,
    clock: Arc<ManualClock>,
    scheduler: Arc<SyncScheduler<MockGateway>>,
}

fn fixture(gateway: Arc<MockGateway>) -> Fixture {
    let clock = ManualClock::new(1_000_000);
    let store = SharedStore::new(QueueStateStore::new());
    let suppression = Arc::new(SuppressionManager::new(clock.clone()));
    let scheduler = Arc::new(SyncScheduler::new(
        gateway.clone(),
        store.clone(),
        suppression.clone(),
        clock.clone(),
        Duration::from_secs(1),
    ));
    Fixture { gateway, store, suppression, clock, scheduler }
}

#[tokio::test]
async fn refresh_destination_installs_remote_list() {
    let f = fixture(MockGateway::new().with_queue("tunis", make_queue("tunis", "t", 3)));

    let outcome = f.scheduler.refresh_destination("tunis").await.unwrap();

    assert!(outcome.is_applied());
    assert_eq!(ids(&f.store.get("tunis")), vec!["t1", "t2", "t3"]);
}

#[tokio::test]
async fn summary_refresh_auto_fetches_unloaded_destinations() {
    let gateway = MockGateway::new()
        .with_queue("tunis", make_queue("tunis", "t", 2))
        .with_queue("sfax", make_queue("sfax", "s", 1));
    let f = fixture(gateway);
    f.store.lock().replace("sfax", make_queue("sfax", "s", 1)).unwrap();

    let outcome = f.scheduler.refresh_summaries().await.unwrap();

    assert_eq!(outcome, RefreshOutcome::Applied { auto_fetched: vec!["tunis".to_string()] });
    assert_eq!(f.store.get("tunis").len(), 2);
    assert_eq!(f.gateway.call_count("get_queue"), 1);
}

#[tokio::test]
async fn empty_destinations_are_not_auto_fetched() {
    let gateway = MockGateway::new();
    gateway.set_summaries(vec![DestinationSummary::new("bizerte", "Bizerte", 0)]);
    let f = fixture(gateway);

    let outcome = f.scheduler.refresh_summaries().await.unwrap();

    assert_eq!(outcome, RefreshOutcome::Applied { auto_fetched: vec![] });
    assert_eq!(f.gateway.call_count("get_queue"), 0);
}

#[tokio::test]
async fn concurrent_refresh_of_same_destination_is_coalesced() {
    let f = fixture(MockGateway::new().with_queue("tunis", make_queue("tunis", "t", 2)));
    f.gateway.hold_reads();

    let first = tokio::spawn({
        let scheduler = f.scheduler.clone();
        async move { scheduler.refresh_destination("tunis").await }
    });
    tokio::task::yield_now().await;

    let second = f.scheduler.refresh_destination("tunis").await.unwrap();
    assert_eq!(second, RefreshOutcome::Coalesced);

    f.gateway.release();
    assert!(first.await.unwrap().unwrap().is_applied());
    // one follow-up read for the coalesced request, never two in parallel
    assert_eq!(f.gateway.call_count("get_queue"), 2);
}

#[tokio::test]
async fn coalesced_request_sees_changes_made_mid_flight() {
    let f = fixture(MockGateway::new().with_queue("tunis", make_queue("tunis", "t", 3)));
    f.gateway.hold_reads();

    let first = tokio::spawn({
        let scheduler = f.scheduler.clone();
        async move { scheduler.refresh_destination("tunis").await }
    });
    tokio::task::yield_now().await;

    // the held read already captured three vehicles
    f.gateway.set_queue("tunis", make_queue("tunis", "t", 1));
    assert_eq!(
        f.scheduler.refresh_destination("tunis").await.unwrap(),
        RefreshOutcome::Coalesced
    );

    f.gateway.release();
    assert!(first.await.unwrap().unwrap().is_applied());
    assert_eq!(ids(&f.store.get("tunis")), vec!["t1"]);
}

#[tokio::test]
async fn back_to_back_refreshes_yield_the_same_snapshot() {
    let f = fixture(MockGateway::new().with_queue("tunis", make_queue("tunis", "t", 3)));

    f.scheduler.refresh_destination("tunis").await.unwrap();
    let first = f.store.get("tunis");
    f.scheduler.refresh_destination("tunis").await.unwrap();
    assert_eq!(f.store.get("tunis"), first);

    // same again while a local change is held by a window
    f.store.lock().apply_patch("t2", &EntryPatch::status(EntryStatus::Loading)).unwrap();
    f.suppression.suppress(&first[1].plate, Duration::from_millis(2_500));

    f.scheduler.refresh_destination("tunis").await.unwrap();
    let held = f.store.get("tunis");
    f.scheduler.refresh_destination("tunis").await.unwrap();

    assert_eq!(f.store.get("tunis"), held);
    assert_eq!(held[1].status, EntryStatus::Loading);
}

#[tokio::test]
async fn local_replace_supersedes_in_flight_fetch() {
    let f = fixture(MockGateway::new().with_queue("tunis", make_queue("tunis", "t", 3)));
    f.store.lock().replace("tunis", make_queue("tunis", "t", 3)).unwrap();
    f.gateway.hold_reads();

    let pending = tokio::spawn({
        let scheduler = f.scheduler.clone();
        async move { scheduler.refresh_destination("tunis").await }
    });
    tokio::task::yield_now().await;

    // local reorder lands while the read is outstanding
    let mut local = f.store.get("tunis");
    local.rotate_right(1);
    crate::store::renumber(&mut local);
    f.store.lock().replace("tunis", local).unwrap();

    f.gateway.release();
    assert_eq!(pending.await.unwrap().unwrap(), RefreshOutcome::Superseded);
    assert_eq!(ids(&f.store.get("tunis")), vec!["t3", "t1", "t2"]);
}

#[tokio::test]
async fn suppressed_plate_keeps_local_status_through_stale_read() {
    let f = fixture(MockGateway::new().with_queue("tunis", make_queue("tunis", "t", 2)));
    f.scheduler.refresh_destination("tunis").await.unwrap();
    let plate = f.store.get("tunis")[0].plate.clone();

    f.store.lock().apply_patch("t1", &EntryPatch::status(EntryStatus::Loading)).unwrap();
    f.suppression.suppress(&plate, Duration::from_millis(2_500));

    f.scheduler.refresh_destination("tunis").await.unwrap();
    assert_eq!(f.store.get("tunis")[0].status, EntryStatus::Loading);

    // window over: remote wins again
    f.clock.advance(2_500);
    f.scheduler.refresh_destination("tunis").await.unwrap();
    assert_eq!(f.store.get("tunis")[0].status, EntryStatus::Waiting);
}

#[tokio::test]
async fn failed_fetch_keeps_state_and_degrades() {
    let f = fixture(MockGateway::new().with_queue("tunis", make_queue("tunis", "t", 2)));
    f.scheduler.refresh_destination("tunis").await.unwrap();
    f.gateway.set_unavailable(true);

    let err = f.scheduler.refresh_destination("tunis").await.unwrap_err();

    assert!(err.is_network());
    assert_eq!(f.store.get("tunis").len(), 2);
    assert!(!f.scheduler.health().is_healthy());

    f.gateway.set_unavailable(false);
    f.scheduler.refresh_destination("tunis").await.unwrap();
    assert!(f.scheduler.health().is_healthy());
}

#[tokio::test]
async fn automatic_refresh_respects_cooldown() {
    let f = fixture(MockGateway::new());

    assert!(f.scheduler.auto_refresh().await.unwrap().is_applied());
    assert_eq!(f.scheduler.auto_refresh().await.unwrap(), RefreshOutcome::CoolingDown);

    // on-demand ignores the cool-down
    assert!(f.scheduler.refresh_summaries().await.unwrap().is_applied());

    f.clock.advance(1_000);
    assert!(f.scheduler.auto_refresh().await.unwrap().is_applied());
    assert_eq!(f.gateway.call_count("list_destination_summaries"), 3);
}

#[tokio::test]
async fn check_health_reports_gateway_state() {
    let f = fixture(MockGateway::new());
    assert_eq!(f.scheduler.check_health().await, Health::Healthy);

    f.gateway.set_unavailable(true);
    assert!(matches!(f.scheduler.check_health().await, Health::Degraded { .. }));
}

#[tokio::test(start_paused = true)]
async fn recurring_refresh_is_idempotent_and_stoppable() {
    let f = fixture(MockGateway::new());

    assert!(f.scheduler.schedule_recurring(Duration::from_secs(10)));
    assert!(!f.scheduler.schedule_recurring(Duration::from_secs(10)));
    assert!(f.scheduler.is_running());

    // first tick fires immediately
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(f.gateway.call_count("list_destination_summaries"), 1);

    f.clock.advance(10_000);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(f.gateway.call_count("list_destination_summaries"), 2);

    f.scheduler.stop();
    tokio::task::yield_now().await;
    assert!(!f.scheduler.is_running());

    f.clock.advance(10_000);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(f.gateway.call_count("list_destination_summaries"), 2);
}
