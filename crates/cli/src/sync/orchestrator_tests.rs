// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use crate::error::Error;
use crate::sync::gateway::RemoteError;
use crate::sync::test_helpers::{test_store, GatewayCall, MockGateway};
use hydrant_core::{ClockSource, ManualClock};
use serde_json::json;
use std::sync::atomic::AtomicUsize;

struct Harness {
    service: Arc<SyncService<MockGateway>>,
    gateway: Arc<MockGateway>,
    monitor: ConnectivityMonitor,
    clock: Arc<ManualClock>,
}

fn harness(online: bool) -> Harness {
    harness_with(online, RetryPolicy::default())
}

fn harness_with(online: bool, policy: RetryPolicy) -> Harness {
    let (store, clock) = test_store(1_000_000);
    let monitor = ConnectivityMonitor::new(online);
    let gateway = Arc::new(MockGateway::new());
    let service = SyncService::new(store, monitor.clone(), Arc::clone(&gateway)).with_policy(policy);
    Harness { service: Arc::new(service), gateway, monitor, clock }
}

impl Harness {
    fn enqueue(&self, entity_type: &str, operation: Operation, payload: Value) -> MutationId {
        self.service.enqueue(entity_type, operation, payload).unwrap()
    }

    fn cached(&self, entity_type: &str, key: &str) -> Option<Value> {
        self.service.store().lock().unwrap().get(entity_type, key).unwrap()
    }
}

/// Poll `cond` until it holds, failing after five seconds.
async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}

// ─────────────────────────────────────────────────────────────────────────────
// Drain
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn checklist_scenario_syncs_both() {
    let h = harness(true);
    h.enqueue("checklist", Operation::Update, json!({"id": "c1", "porcentagem": 50}));
    h.enqueue("checklist_items", Operation::Add, json!({"id": "i9"}));
    let start = h.clock.now();

    let report = h.service.try_sync().await.unwrap();

    assert_eq!(
        report,
        SyncReport {
            success: true,
            synced_items: 2,
            errors: vec![],
            remaining_items: 0,
            dead_lettered: 0,
            deferred_items: 0,
            skipped: None,
        }
    );
    assert!(h.service.last_sync_timestamp().unwrap().unwrap() >= start);
    assert_eq!(
        h.gateway.remote_record("checklist", "c1"),
        Some(json!({"id": "c1", "porcentagem": 50}))
    );
}

#[tokio::test]
async fn successful_drain_empties_queue() {
    let h = harness(true);
    for i in 0..5 {
        h.enqueue("materials", Operation::Add, json!({"id": format!("m{i}")}));
    }

    let report = h.service.try_sync().await.unwrap();

    assert!(report.success);
    assert_eq!(report.synced_items, 5);
    assert_eq!(h.service.pending_count().unwrap(), 0);
}

#[tokio::test]
async fn replay_follows_enqueue_order() {
    let h = harness(true);
    let keys = ["c3", "a1", "b2", "c1", "a9"];
    for key in keys {
        h.enqueue("checklist", Operation::Update, json!({"id": key}));
        h.clock.advance(1);
    }

    h.service.try_sync().await.unwrap();

    assert_eq!(h.gateway.written_keys(), keys.map(String::from).to_vec());
}

#[tokio::test]
async fn replay_carries_mutation_ids() {
    let h = harness(true);
    let id = h.enqueue("materials", Operation::Delete, json!("m1"));

    h.service.try_sync().await.unwrap();

    assert_eq!(
        h.gateway.calls(),
        vec![GatewayCall::Delete { entity_type: "materials".into(), key: "m1".into(), origin: Some(id) }]
    );
}

#[tokio::test]
async fn one_failure_does_not_abort_the_drain() {
    let h = harness(true);
    h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    let second = h.enqueue("checklist", Operation::Update, json!({"id": "c2"}));
    h.enqueue("checklist", Operation::Update, json!({"id": "c3"}));
    h.gateway.fail_key("c2", RemoteError::Server("validation failed".into()));

    let report = h.service.try_sync().await.unwrap();

    assert!(!report.success);
    assert_eq!(report.synced_items, 2);
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.remaining_items, 1);
    assert!(report.errors[0].contains("c2"));
    assert!(report.errors[0].contains("validation failed"));

    let pending = h.service.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second);
    assert_eq!(pending[0].retries, 1);
}

#[tokio::test]
async fn pass_updates_last_sync_even_with_errors() {
    let h = harness(true);
    h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    h.gateway.fail_all(RemoteError::Unreachable("reset".into()));

    let report = h.service.try_sync().await.unwrap();

    assert!(!report.success);
    assert_eq!(h.service.last_sync_timestamp().unwrap(), Some(h.clock.now()));
}

#[tokio::test]
async fn empty_queue_succeeds_and_stamps_metadata() {
    let h = harness(true);

    let report = h.service.try_sync().await.unwrap();

    assert!(report.success);
    assert_eq!(report.synced_items, 0);
    assert_eq!(report.remaining_items, 0);
    assert_eq!(h.service.last_sync_timestamp().unwrap(), Some(h.clock.now()));
    assert_eq!(h.gateway.call_count(), 0);
}

#[tokio::test]
async fn offline_pass_leaves_queue_untouched() {
    let h = harness(false);
    h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    h.enqueue("materials", Operation::Delete, json!({"id": "m1"}));
    let before = h.service.pending().unwrap();

    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);
    let _sub = h.service.on_error(move |f| sink.lock().unwrap().push(f.clone()));

    let report = h.service.try_sync().await.unwrap();

    assert!(!report.success);
    assert_eq!(report.skipped, Some(SkipReason::Offline));
    assert_eq!(report.errors, vec!["offline".to_string()]);
    assert_eq!(report.error_count(), 0);
    assert_eq!(h.service.pending().unwrap(), before);
    assert_eq!(h.service.last_sync_timestamp().unwrap(), None);
    assert_eq!(h.gateway.call_count(), 0);
    assert_eq!(h.service.state(), SyncState::Idle);
    assert_eq!(
        *failures.lock().unwrap(),
        vec![SyncFailure { mutation: None, message: "offline".into() }]
    );
}

#[tokio::test]
async fn concurrent_pass_is_rejected_without_double_apply() {
    let h = harness(true);
    h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    h.enqueue("checklist", Operation::Update, json!({"id": "c2"}));
    h.gateway.hold();

    let first = tokio::spawn({
        let service = Arc::clone(&h.service);
        async move { service.try_sync().await }
    });
    h.gateway.wait_for_calls(1).await;
    assert!(h.service.is_syncing());
    assert_eq!(h.service.state(), SyncState::Syncing);

    let second = h.service.try_sync().await.unwrap();
    assert!(!second.success);
    assert_eq!(second.skipped, Some(SkipReason::InProgress));
    assert_eq!(second.synced_items, 0);

    h.gateway.release();
    let first = first.await.unwrap().unwrap();

    assert_eq!(first.synced_items, 2);
    assert_eq!(h.gateway.written_keys(), vec!["c1".to_string(), "c2".to_string()]);
    assert!(!h.service.is_syncing());
}

#[tokio::test]
async fn mutations_enqueued_mid_pass_wait_for_next_pass() {
    let h = harness(true);
    h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    h.gateway.hold();

    let pass = tokio::spawn({
        let service = Arc::clone(&h.service);
        async move { service.try_sync().await }
    });
    h.gateway.wait_for_calls(1).await;
    let late = h.enqueue("checklist", Operation::Update, json!({"id": "c2"}));
    h.gateway.release();

    let report = pass.await.unwrap().unwrap();
    assert_eq!(report.synced_items, 1);
    assert_eq!(report.remaining_items, 1);
    assert_eq!(h.service.pending().unwrap()[0].id, late);

    let report = h.service.try_sync().await.unwrap();
    assert_eq!(report.synced_items, 1);
    assert_eq!(report.remaining_items, 0);
}

#[tokio::test]
async fn later_writes_to_a_failed_record_are_deferred() {
    let h = harness(true);
    let add = h.enqueue("checklist_items", Operation::Add, json!({"id": "i1"}));
    let update = h.enqueue("checklist_items", Operation::Update, json!({"id": "i1", "ok": true}));
    h.enqueue("checklist_items", Operation::Add, json!({"id": "i2"}));
    h.gateway.fail_key("i1", RemoteError::Unreachable("reset".into()));

    let report = h.service.try_sync().await.unwrap();

    assert_eq!(report.synced_items, 1);
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.deferred_items, 1);
    assert_eq!(report.remaining_items, 2);
    assert_eq!(h.gateway.written_keys(), vec!["i1".to_string(), "i2".to_string()]);

    let pending = h.service.pending().unwrap();
    assert_eq!(pending.iter().map(|m| (m.id, m.retries)).collect::<Vec<_>>(), vec![(add, 1), (update, 0)]);
}

#[tokio::test]
async fn progress_reports_each_mutation() {
    let h = harness(true);
    h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    h.enqueue("checklist", Operation::Update, json!({"id": "c2"}));
    h.enqueue("checklist", Operation::Update, json!({"id": "c3"}));
    h.gateway.fail_key("c2", RemoteError::Server("boom".into()));

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let _sub = h.service.on_progress(move |p| sink.lock().unwrap().push(*p));

    h.service.try_sync().await.unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            SyncProgress { completed: 1, total: 3 },
            SyncProgress { completed: 2, total: 3 },
            SyncProgress { completed: 3, total: 3 },
        ]
    );
}

#[tokio::test]
async fn state_machine_and_notifications() {
    let h = harness(true);
    let states = Arc::new(Mutex::new(Vec::new()));
    let state_sink = Arc::clone(&states);
    let _states = h.service.on_state_change(move |s| state_sink.lock().unwrap().push(s));
    let successes = Arc::new(AtomicUsize::new(0));
    let success_count = Arc::clone(&successes);
    let _successes = h.service.on_success(move |_| {
        success_count.fetch_add(1, Ordering::SeqCst);
    });
    let failures = Arc::new(Mutex::new(Vec::new()));
    let failure_sink = Arc::clone(&failures);
    let _failures = h.service.on_error(move |f| failure_sink.lock().unwrap().push(f.clone()));

    h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    h.service.try_sync().await.unwrap();

    let failing = h.enqueue("checklist", Operation::Update, json!({"id": "c2"}));
    h.gateway.fail_key("c2", RemoteError::Rejected("nope".into()));
    h.service.try_sync().await.unwrap();

    assert_eq!(
        *states.lock().unwrap(),
        vec![
            SyncState::Syncing,
            SyncState::Completed,
            SyncState::Idle,
            SyncState::Syncing,
            SyncState::Error,
            SyncState::Idle,
        ]
    );
    assert_eq!(successes.load(Ordering::SeqCst), 1);
    let failures = failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].mutation, Some(failing));
    assert!(failures[0].message.contains("rejected: nope"));
    assert_eq!(h.service.state(), SyncState::Idle);
}

#[tokio::test]
async fn disposed_observer_stops_receiving() {
    let h = harness(true);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let sub = h.service.on_progress(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    h.service.try_sync().await.unwrap();
    sub.dispose();
    h.enqueue("checklist", Operation::Update, json!({"id": "c2"}));
    h.service.try_sync().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn replay_delay_spaces_out_mutations() {
    let h = harness(true);
    let (store, _) = test_store(0);
    let service = SyncService::new(store, h.monitor.clone(), Arc::clone(&h.gateway))
        .with_replay_delay(Some(Duration::from_millis(20)));
    service.enqueue("checklist", Operation::Update, json!({"id": "c1"})).unwrap();
    service.enqueue("checklist", Operation::Update, json!({"id": "c2"})).unwrap();

    let started = std::time::Instant::now();
    let report = service.try_sync().await.unwrap();

    assert_eq!(report.synced_items, 2);
    assert!(started.elapsed() >= Duration::from_millis(40));
}

// ─────────────────────────────────────────────────────────────────────────────
// Retry policy and dead letters
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unlimited_policy_keeps_retrying() {
    let h = harness(true);
    h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    h.gateway.fail_key("c1", RemoteError::Server("boom".into()));

    for _ in 0..5 {
        h.service.try_sync().await.unwrap();
    }

    let pending = h.service.pending().unwrap();
    assert_eq!(pending[0].retries, 5);
    assert!(h.service.dead_letters().unwrap().is_empty());
}

#[tokio::test]
async fn exhausted_mutations_become_dead_letters() {
    let h = harness_with(true, RetryPolicy::default().with_max_retries(2));
    let id = h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    h.enqueue("checklist", Operation::Update, json!({"id": "c2"}));
    h.gateway.fail_key("c1", RemoteError::Server("boom".into()));

    let first = h.service.try_sync().await.unwrap();
    assert_eq!(first.dead_lettered, 0);
    assert_eq!(first.remaining_items, 1);

    let second = h.service.try_sync().await.unwrap();
    assert!(!second.success);
    assert_eq!(second.dead_lettered, 1);
    assert_eq!(second.remaining_items, 0);
    assert_eq!(h.service.pending_count().unwrap(), 0);

    let letters = h.service.dead_letters().unwrap();
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].mutation.id, id);
    assert_eq!(letters[0].mutation.retries, 2);
    assert!(letters[0].last_error.contains("boom"));
}

#[tokio::test]
async fn requeued_dead_letter_syncs_again() {
    let h = harness_with(true, RetryPolicy::default().with_max_retries(1));
    let id = h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    h.gateway.fail_key("c1", RemoteError::Server("boom".into()));
    h.service.try_sync().await.unwrap();
    assert_eq!(h.service.dead_letters().unwrap().len(), 1);

    h.gateway.clear_failures();
    assert!(h.service.requeue_dead_letter(id).unwrap());
    let pending = h.service.pending().unwrap();
    assert_eq!(pending[0].id, id);
    assert_eq!(pending[0].retries, 0);

    let report = h.service.try_sync().await.unwrap();
    assert!(report.success);
    assert_eq!(report.synced_items, 1);
    assert!(h.service.dead_letters().unwrap().is_empty());
}

#[tokio::test]
async fn dead_letter_holds_back_later_writes_to_the_record() {
    let h = harness_with(true, RetryPolicy::default().with_max_retries(1));
    let add = h.enqueue("incidents", Operation::Add, json!({"id": "i1"}));
    h.clock.advance(1);
    let update = h.enqueue("incidents", Operation::Update, json!({"id": "i1", "ok": true}));
    h.enqueue("incidents", Operation::Add, json!({"id": "i2"}));
    h.gateway.fail_key("i1", RemoteError::Server("boom".into()));

    let first = h.service.try_sync().await.unwrap();
    assert_eq!(first.dead_lettered, 1);
    assert_eq!(first.deferred_items, 1);
    assert_eq!(first.synced_items, 1);

    h.gateway.clear_failures();
    let second = h.service.try_sync().await.unwrap();
    assert_eq!(second.synced_items, 0);
    assert_eq!(second.deferred_items, 1);
    assert_eq!(second.remaining_items, 1);
    assert_eq!(h.gateway.written_keys(), vec!["i1", "i2"]);

    assert!(h.service.requeue_dead_letter(add).unwrap());
    let third = h.service.try_sync().await.unwrap();
    assert!(third.success);
    assert_eq!(third.synced_items, 2);

    let calls = h.gateway.calls();
    assert_eq!(calls.len(), 4);
    assert!(matches!(&calls[0], GatewayCall::Create { origin: Some(o), .. } if *o == add));
    assert!(matches!(&calls[2], GatewayCall::Create { origin: Some(o), .. } if *o == add));
    assert!(matches!(&calls[3], GatewayCall::Update { origin: Some(o), .. } if *o == update));
    assert_eq!(h.gateway.remote_record("incidents", "i1"), Some(json!({"id": "i1", "ok": true})));
}

#[tokio::test]
async fn purged_dead_letter_releases_later_writes() {
    let h = harness_with(true, RetryPolicy::default().with_max_retries(1));
    let add = h.enqueue("incidents", Operation::Add, json!({"id": "i1"}));
    h.enqueue("incidents", Operation::Update, json!({"id": "i1", "ok": true}));
    h.gateway.fail_key("i1", RemoteError::Server("boom".into()));
    h.service.try_sync().await.unwrap();
    h.gateway.clear_failures();

    assert!(h.service.purge_dead_letter(add).unwrap());
    let report = h.service.try_sync().await.unwrap();

    assert_eq!(report.synced_items, 1);
    assert_eq!(h.service.pending_count().unwrap(), 0);
}

#[tokio::test]
async fn purge_and_missing_dead_letters() {
    let h = harness_with(true, RetryPolicy::default().with_max_retries(1));
    let id = h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    h.gateway.fail_key("c1", RemoteError::Server("boom".into()));
    h.service.try_sync().await.unwrap();

    assert!(h.service.purge_dead_letter(id).unwrap());
    assert!(!h.service.purge_dead_letter(id).unwrap());
    assert!(!h.service.requeue_dead_letter(id).unwrap());
}

// ─────────────────────────────────────────────────────────────────────────────
// Write path
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn online_write_applies_then_caches() {
    let h = harness(true);

    let outcome = h
        .service
        .write("checklist", Operation::Update, json!({"id": "c1", "porcentagem": 50}))
        .await
        .unwrap();

    assert_eq!(outcome, WriteOutcome::Applied);
    assert_eq!(h.service.pending_count().unwrap(), 0);
    assert_eq!(h.cached("checklist", "c1"), Some(json!({"id": "c1", "porcentagem": 50})));
    assert!(matches!(h.gateway.calls()[0], GatewayCall::Update { origin: None, .. }));
}

#[tokio::test]
async fn online_create_caches_the_echoed_record() {
    let h = harness(true);
    h.gateway.echo_creates();

    h.service.write("incidents", Operation::Add, json!({"id": "f1"})).await.unwrap();

    assert_eq!(h.cached("incidents", "f1"), Some(json!({"id": "f1", "_rev": 1})));
}

#[tokio::test]
async fn offline_write_caches_and_queues() {
    let h = harness(false);

    let outcome =
        h.service.write("checklist", Operation::Update, json!({"id": "c1", "porcentagem": 10})).await.unwrap();

    assert_eq!(outcome, WriteOutcome::Queued(h.service.pending().unwrap()[0].id));
    assert_eq!(h.cached("checklist", "c1"), Some(json!({"id": "c1", "porcentagem": 10})));
    assert_eq!(h.gateway.call_count(), 0);
}

#[tokio::test]
async fn offline_delete_removes_cached_record() {
    let h = harness(false);
    h.service.write("materials", Operation::Add, json!({"id": "m1"})).await.unwrap();

    h.service.write("materials", Operation::Delete, json!({"id": "m1"})).await.unwrap();

    assert_eq!(h.cached("materials", "m1"), None);
    assert_eq!(h.service.pending_count().unwrap(), 2);
}

#[tokio::test]
async fn transient_gateway_failure_falls_back_to_queue() {
    let h = harness(true);
    h.gateway.fail_all(RemoteError::Timeout(Duration::from_secs(30)));

    let outcome = h.service.write("checklist", Operation::Update, json!({"id": "c1"})).await.unwrap();

    assert!(matches!(outcome, WriteOutcome::Queued(_)));
    assert_eq!(h.service.pending_count().unwrap(), 1);
    assert!(h.cached("checklist", "c1").is_some());
}

#[tokio::test]
async fn online_write_queues_behind_unsynced_writes() {
    let h = harness(true);
    let queued = h.enqueue("incidents", Operation::Add, json!({"id": "i1"}));

    let outcome = h
        .service
        .write("incidents", Operation::Update, json!({"id": "i1", "ok": true}))
        .await
        .unwrap();

    assert!(matches!(outcome, WriteOutcome::Queued(id) if id > queued));
    assert_eq!(h.gateway.call_count(), 0);
    assert_eq!(h.service.pending_count().unwrap(), 2);

    let other = h.service.write("incidents", Operation::Add, json!({"id": "i2"})).await.unwrap();
    assert_eq!(other, WriteOutcome::Applied);
}

#[tokio::test]
async fn rejected_write_changes_nothing() {
    let h = harness(true);
    h.gateway.fail_key("c1", RemoteError::Rejected("porcentagem out of range".into()));

    let err = h
        .service
        .write("checklist", Operation::Update, json!({"id": "c1", "porcentagem": 500}))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Remote(RemoteError::Rejected(_))));
    assert_eq!(h.service.pending_count().unwrap(), 0);
    assert_eq!(h.cached("checklist", "c1"), None);
}

#[tokio::test]
async fn invalid_write_is_refused_before_the_gateway() {
    let h = harness(true);

    let err = h.service.write("checklist", Operation::Update, json!([1, 2])).await.unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(h.gateway.call_count(), 0);
}

#[tokio::test]
async fn clear_local_data_drops_everything() {
    let h = harness(false);
    h.service.write("checklist", Operation::Update, json!({"id": "c1"})).await.unwrap();
    h.monitor.set_online(true);
    h.service.try_sync().await.unwrap();
    h.service.enqueue("checklist", Operation::Update, json!({"id": "c2"})).unwrap();

    h.service.clear_local_data().unwrap();

    assert_eq!(h.service.pending_count().unwrap(), 0);
    assert_eq!(h.service.last_sync_timestamp().unwrap(), None);
    assert_eq!(h.cached("checklist", "c1"), None);
}

// ─────────────────────────────────────────────────────────────────────────────
// Auto-sync
// ─────────────────────────────────────────────────────────────────────────────

fn count_passes(service: &SyncService<MockGateway>) -> (Arc<AtomicUsize>, Subscription) {
    let passes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&passes);
    let sub = service.on_state_change(move |state| {
        if state == SyncState::Syncing {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    (passes, sub)
}

#[tokio::test]
async fn reconnect_triggers_exactly_one_pass() {
    let h = harness(false);
    h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    h.enqueue("checklist_items", Operation::Add, json!({"id": "i9"}));
    let (passes, _sub) = count_passes(&h.service);
    let task = h.service.spawn_auto_sync();

    h.monitor.set_online(true);
    wait_until(|| h.service.pending_count().unwrap() == 0).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(passes.load(Ordering::SeqCst), 1);

    // Repeating the online signal is not a transition.
    h.monitor.set_online(true);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(passes.load(Ordering::SeqCst), 1);
    assert_eq!(h.gateway.call_count(), 2);

    task.abort();
}

#[tokio::test]
async fn each_reconnect_gets_its_own_pass() {
    let h = harness(false);
    let (passes, _sub) = count_passes(&h.service);
    let task = h.service.spawn_auto_sync();

    for expected in 1..=3 {
        h.monitor.set_online(true);
        wait_until(|| passes.load(Ordering::SeqCst) == expected && !h.service.is_syncing()).await;
        h.monitor.set_online(false);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(passes.load(Ordering::SeqCst), 3);

    task.abort();
}

#[tokio::test]
async fn going_offline_does_not_sync() {
    let h = harness(true);
    h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    let (passes, _sub) = count_passes(&h.service);
    let task = h.service.spawn_auto_sync();

    h.monitor.set_online(false);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(passes.load(Ordering::SeqCst), 0);
    assert_eq!(h.service.pending_count().unwrap(), 1);
    task.abort();
}

#[tokio::test]
async fn failed_pass_is_retried_with_backoff() {
    let policy = RetryPolicy {
        max_retries: None,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(20),
    };
    let h = harness_with(false, policy);
    h.enqueue("checklist", Operation::Update, json!({"id": "c1"}));
    h.gateway.fail_all(RemoteError::Unreachable("reset".into()));
    let (passes, _sub) = count_passes(&h.service);
    let task = h.service.spawn_auto_sync();

    h.monitor.set_online(true);
    wait_until(|| passes.load(Ordering::SeqCst) >= 3).await;
    h.gateway.clear_failures();
    wait_until(|| h.service.pending_count().unwrap() == 0).await;

    // Once the queue drains cleanly the loop goes quiet.
    let settled = passes.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(passes.load(Ordering::SeqCst), settled);

    task.abort();
}
