// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod cache;
pub mod clear;
pub mod dead_letter;
pub mod init;
pub mod queue;
pub mod status;
pub mod sync;
#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;
pub mod watch;
pub mod write;

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use hydrant_core::{LocalStore, Operation};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{find_work_dir, get_db_path, get_lock_path, Config, RemoteConfig};
use crate::error::{Error, Result};
use crate::sync::{ConnectivityMonitor, ReachabilityProbe, SyncService, TcpProbe, WebSocketGateway};

/// An opened `.hydrant/` directory.
pub struct Workspace {
    pub work_dir: PathBuf,
    pub config: Config,
    pub store: Arc<Mutex<LocalStore>>,
}

/// Helper to open the local store from the current context.
pub fn open_workspace() -> Result<Workspace> {
    let work_dir = find_work_dir()?;
    let config = Config::load(&work_dir)?;
    let store = LocalStore::open(&get_db_path(&work_dir))?;
    Ok(Workspace { work_dir, config, store: Arc::new(Mutex::new(store)) })
}

impl Workspace {
    pub fn remote(&self) -> Result<&RemoteConfig> {
        self.config.remote.as_ref().ok_or(Error::NoRemote)
    }

    /// Run `f` against the locked store.
    pub fn with_store<T>(&self, f: impl FnOnce(&mut LocalStore) -> hydrant_core::Result<T>) -> Result<T> {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut store)?)
    }

    /// A sync service for the configured remote. Its monitor starts offline.
    pub fn service(&self, remote: &RemoteConfig) -> SyncService<WebSocketGateway> {
        let gateway = WebSocketGateway::new(remote.url.clone(), remote.request_timeout());
        SyncService::new(Arc::clone(&self.store), ConnectivityMonitor::new(false), Arc::new(gateway))
            .with_policy(self.config.sync.retry_policy())
            .with_replay_delay(self.config.sync.replay_delay())
    }

    /// Take the drain lock shared by `sync` and `watch`.
    pub fn lock_drain(&self) -> Result<File> {
        acquire_lock(&get_lock_path(&self.work_dir))
    }
}

/// Acquire an exclusive lock on the lock file.
pub(crate) fn acquire_lock(lock_path: &Path) -> Result<File> {
    use fs2::FileExt;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)?;

    // Non-blocking: a second drainer fails fast
    file.try_lock_exclusive()
        .map_err(|_| Error::LockHeld(lock_path.display().to_string()))?;

    Ok(file)
}

/// The runtime for commands that talk to the remote.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread().enable_all().build()?)
}

/// Probe the remote once and publish the result to `monitor`.
pub async fn probe_once(monitor: &ConnectivityMonitor, remote: &RemoteConfig) -> bool {
    let online = match remote.probe_address() {
        Some(address) => TcpProbe::new(address, remote.probe_timeout()).probe().await,
        None => false,
    };
    debug!(url = %remote.url, online, "probed remote");
    monitor.set_online(online);
    online
}

/// Parse a command-line payload.
///
/// Deletes also accept a bare key that is not valid JSON (`m7` for `"m7"`).
pub fn parse_payload(operation: Operation, raw: &str) -> Result<Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(_) if operation == Operation::Delete && !raw.trim().is_empty() => {
            Ok(Value::String(raw.trim().to_string()))
        }
        Err(e) => Err(Error::InvalidInput(format!("payload is not valid JSON: {}", e))),
    }
}

/// Parse a query bound: JSON when possible, otherwise the raw string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
