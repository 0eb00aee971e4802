// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Read-through entity cache.
//!
//! Reads always come from the local store, so they work offline. `refresh`
//! pulls records changed since the previous refresh of the same entity type
//! and upserts them. Each type keeps its own watermark; sync passes do not
//! move it. Records with queued or dead-lettered local writes are left alone
//! so a refresh never hides an edit that has not reached the remote yet.

use std::sync::{Arc, Mutex, PoisonError};

use hydrant_core::mutation::payload_key;
use hydrant_core::{KeyRange, LocalStore};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::sync::{ConnectivityMonitor, RemoteGateway, SyncService};

pub struct EntityCache<G> {
    store: Arc<Mutex<LocalStore>>,
    gateway: Arc<G>,
    monitor: ConnectivityMonitor,
}

impl<G: RemoteGateway + 'static> EntityCache<G> {
    pub fn new(store: Arc<Mutex<LocalStore>>, gateway: Arc<G>, monitor: ConnectivityMonitor) -> Self {
        EntityCache { store, gateway, monitor }
    }

    /// A cache sharing the service's store, gateway and monitor.
    pub fn for_service(service: &SyncService<G>) -> Self {
        EntityCache::new(service.store(), service.gateway(), service.monitor().clone())
    }

    fn with_store<T>(&self, f: impl FnOnce(&mut LocalStore) -> hydrant_core::Result<T>) -> Result<T> {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut store)?)
    }

    pub fn get(&self, entity_type: &str, key: &str) -> Result<Option<Value>> {
        self.with_store(|s| s.get(entity_type, key))
    }

    /// Every cached record of a type, ordered by key.
    pub fn list(&self, entity_type: &str) -> Result<Vec<Value>> {
        let records = self.with_store(|s| s.get_all(entity_type))?;
        Ok(records.into_iter().map(|r| r.value).collect())
    }

    pub fn define_index(&self, entity_type: &str, name: &str, field_path: &str) -> Result<()> {
        self.with_store(|s| s.define_index(entity_type, name, field_path))
    }

    /// Cached records whose indexed field falls in `range`.
    pub fn query(&self, entity_type: &str, index: &str, range: &KeyRange) -> Result<Vec<Value>> {
        let records = self.with_store(|s| s.query_by_index(entity_type, index, range))?;
        Ok(records.into_iter().map(|r| r.value).collect())
    }

    /// Pull remote changes for one entity type into the cache.
    ///
    /// Returns the number of records written. Offline this is a no-op. The
    /// watermark only advances when the whole refresh succeeds, and it is set
    /// to the time the fetch started so edits made meanwhile are not missed.
    pub async fn refresh(&self, entity_type: &str) -> Result<usize> {
        if !self.monitor.is_online() {
            debug!(entity_type, "refresh skipped: offline");
            return Ok(0);
        }

        let (since, started) = self.with_store(|s| Ok((s.refreshed_at(entity_type)?, s.now())))?;
        let fetched = self.gateway.fetch_since(entity_type, since).await?;

        let cached = self.with_store(|s| {
            let dirty = s.unsynced_keys(entity_type)?;

            let mut cached = 0;
            for record in &fetched {
                let Some(key) = payload_key(record) else {
                    warn!(entity_type, "remote record without an id, skipping");
                    continue;
                };
                if dirty.contains(&key) {
                    debug!(entity_type, %key, "keeping local copy with queued writes");
                    continue;
                }
                s.put(entity_type, &key, record)?;
                cached += 1;
            }
            s.set_refreshed_at(entity_type, started)?;
            Ok(cached)
        })?;

        info!(entity_type, fetched = fetched.len(), cached, "refreshed cache");
        Ok(cached)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
