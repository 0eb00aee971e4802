// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use hydrant_core::mutation::payload_key;
use hydrant_core::{LocalStore, ManualClock, MutationId};
use serde_json::{json, Value};
use tokio::sync::watch;

use super::gateway::{GatewayFuture, RemoteError, RemoteGateway};

/// A request the mock gateway received.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Create { entity_type: String, payload: Value, origin: Option<MutationId> },
    Update { entity_type: String, key: String, payload: Value, origin: Option<MutationId> },
    Delete { entity_type: String, key: String, origin: Option<MutationId> },
    FetchSince { entity_type: String, since: Option<DateTime<Utc>> },
}

impl GatewayCall {
    /// The record key a write targets.
    pub fn key(&self) -> Option<String> {
        match self {
            GatewayCall::Create { payload, .. } => payload_key(payload),
            GatewayCall::Update { key, .. } | GatewayCall::Delete { key, .. } => Some(key.clone()),
            GatewayCall::FetchSince { .. } => None,
        }
    }
}

/// In-memory gateway with failure injection.
pub struct MockGateway {
    calls: Mutex<Vec<GatewayCall>>,
    records: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
    failing_keys: Mutex<HashMap<String, RemoteError>>,
    fail_all: Mutex<Option<RemoteError>>,
    echo_creates: Mutex<bool>,
    held: watch::Sender<bool>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        MockGateway {
            calls: Mutex::new(Vec::new()),
            records: Mutex::new(BTreeMap::new()),
            failing_keys: Mutex::new(HashMap::new()),
            fail_all: Mutex::new(None),
            echo_creates: Mutex::new(false),
            held: watch::channel(false).0,
        }
    }

    /// Every write to `key` fails with `error` until cleared.
    pub fn fail_key(&self, key: &str, error: RemoteError) {
        self.failing_keys.lock().unwrap().insert(key.to_string(), error);
    }

    /// Every request fails with `error` until cleared.
    pub fn fail_all(&self, error: RemoteError) {
        *self.fail_all.lock().unwrap() = Some(error);
    }

    pub fn clear_failures(&self) {
        self.failing_keys.lock().unwrap().clear();
        *self.fail_all.lock().unwrap() = None;
    }

    /// Creates answer with the stored record plus a `_rev` field.
    pub fn echo_creates(&self) {
        *self.echo_creates.lock().unwrap() = true;
    }

    /// Make requests wait (after being recorded) until [`MockGateway::release`].
    pub fn hold(&self) {
        self.held.send_replace(true);
    }

    pub fn release(&self) {
        self.held.send_replace(false);
    }

    /// Put a record on the remote side directly.
    pub fn seed(&self, entity_type: &str, record: Value) {
        let key = payload_key(&record).unwrap();
        self.records
            .lock()
            .unwrap()
            .entry(entity_type.to_string())
            .or_default()
            .insert(key, record);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Keys of successful and failed writes, in arrival order.
    pub fn written_keys(&self) -> Vec<String> {
        self.calls().iter().filter_map(GatewayCall::key).collect()
    }

    pub fn remote_record(&self, entity_type: &str, key: &str) -> Option<Value> {
        self.records.lock().unwrap().get(entity_type).and_then(|c| c.get(key)).cloned()
    }

    /// Wait until at least `n` requests have arrived.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.call_count() < n {
            tokio::task::yield_now().await;
        }
    }

    /// Record the call, honor the hold gate, then check injected failures.
    async fn admit(&self, call: GatewayCall) -> Result<(), RemoteError> {
        let key = call.key();
        self.calls.lock().unwrap().push(call);

        let mut held = self.held.subscribe();
        let _ = held.wait_for(|held| !*held).await;

        if let Some(error) = self.fail_all.lock().unwrap().clone() {
            return Err(error);
        }
        if let Some(error) = key.and_then(|k| self.failing_keys.lock().unwrap().get(&k).cloned()) {
            return Err(error);
        }
        Ok(())
    }
}

impl RemoteGateway for MockGateway {
    fn create<'a>(
        &'a self,
        entity_type: &'a str,
        payload: &'a Value,
        origin: Option<MutationId>,
    ) -> GatewayFuture<'a, Option<Value>> {
        Box::pin(async move {
            self.admit(GatewayCall::Create {
                entity_type: entity_type.to_string(),
                payload: payload.clone(),
                origin,
            })
            .await?;
            let mut stored = payload.clone();
            if *self.echo_creates.lock().unwrap() {
                if let Some(obj) = stored.as_object_mut() {
                    obj.insert("_rev".to_string(), json!(1));
                }
            }
            if let Some(key) = payload_key(payload) {
                self.records
                    .lock()
                    .unwrap()
                    .entry(entity_type.to_string())
                    .or_default()
                    .insert(key, stored.clone());
            }
            let echo = *self.echo_creates.lock().unwrap();
            Ok(echo.then_some(stored))
        })
    }

    fn update<'a>(
        &'a self,
        entity_type: &'a str,
        key: &'a str,
        payload: &'a Value,
        origin: Option<MutationId>,
    ) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            self.admit(GatewayCall::Update {
                entity_type: entity_type.to_string(),
                key: key.to_string(),
                payload: payload.clone(),
                origin,
            })
            .await?;
            self.records
                .lock()
                .unwrap()
                .entry(entity_type.to_string())
                .or_default()
                .insert(key.to_string(), payload.clone());
            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        entity_type: &'a str,
        key: &'a str,
        origin: Option<MutationId>,
    ) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            self.admit(GatewayCall::Delete {
                entity_type: entity_type.to_string(),
                key: key.to_string(),
                origin,
            })
            .await?;
            if let Some(collection) = self.records.lock().unwrap().get_mut(entity_type) {
                collection.remove(key);
            }
            Ok(())
        })
    }

    fn fetch_since<'a>(
        &'a self,
        entity_type: &'a str,
        since: Option<DateTime<Utc>>,
    ) -> GatewayFuture<'a, Vec<Value>> {
        Box::pin(async move {
            self.admit(GatewayCall::FetchSince { entity_type: entity_type.to_string(), since })
                .await?;
            let records = self.records.lock().unwrap();
            Ok(records.get(entity_type).map(|c| c.values().cloned().collect()).unwrap_or_default())
        })
    }
}

/// An in-memory store driven by a manual clock starting at `start_ms`.
pub fn test_store(start_ms: i64) -> (Arc<Mutex<LocalStore>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_ms));
    let store = LocalStore::open_in_memory().unwrap().with_clock(clock.clone());
    (Arc::new(Mutex::new(store)), clock)
}
