// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity monitor.
//!
//! Tracks whether the remote gateway is reachable. Transitions fire
//! immediately with no debouncing; setting the current value again is not a
//! transition and notifies nobody.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::events::{Listeners, Subscription};

/// Shortest interval [`spawn_probe`] will poll at.
const MIN_PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// Cheap-to-clone handle on the current online/offline state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<bool>>,
    listeners: Listeners<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        ConnectivityMonitor { state: Arc::new(state), listeners: Listeners::new() }
    }

    /// Current snapshot.
    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Feed the platform reachability signal.
    ///
    /// Returns true if this was a transition. Observers and async
    /// subscribers are only notified on transitions.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            info!(online, "connectivity changed");
            self.listeners.emit(&online);
        }
        changed
    }

    /// Register a callback for transitions. Receives the new state.
    pub fn on_change(&self, callback: impl Fn(bool) + Send + Sync + 'static) -> Subscription {
        self.listeners.subscribe(move |online| callback(*online))
    }

    /// Async view of the state; `changed()` resolves on transitions.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor").field("online", &self.is_online()).finish()
    }
}

/// A source of the reachability signal.
pub trait ReachabilityProbe: Send + Sync {
    /// Whether the remote can be reached right now.
    fn probe(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

/// Reachability by opening a TCP connection to the gateway's host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        TcpProbe { address: address.into(), timeout }
    }
}

impl ReachabilityProbe for TcpProbe {
    fn probe(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
                Ok(Ok(_)) => true,
                Ok(Err(e)) => {
                    debug!(address = %self.address, error = %e, "probe failed");
                    false
                }
                Err(_) => {
                    debug!(address = %self.address, "probe timed out");
                    false
                }
            }
        })
    }
}

/// Poll `probe` every `interval` and feed the result into `monitor`.
///
/// The first probe runs immediately. The task runs until aborted.
pub fn spawn_probe<P>(monitor: ConnectivityMonitor, probe: P, interval: Duration) -> JoinHandle<()>
where
    P: ReachabilityProbe + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(MIN_PROBE_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let online = probe.probe().await;
            monitor.set_online(online);
        }
    })
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
