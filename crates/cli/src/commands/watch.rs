// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::sync::{spawn_probe, TcpProbe};

use super::open_workspace;
use super::sync::format_report;

/// Hold the watch lock and sync on every offline→online transition until Ctrl-C.
pub fn run() -> Result<()> {
    let workspace = open_workspace()?;
    let remote = workspace.remote()?.clone();
    let address = remote
        .probe_address()
        .ok_or_else(|| Error::Config(format!("cannot derive a host from '{}'", remote.url)))?;
    let _lock = workspace.lock_drain()?;

    let service = Arc::new(workspace.service(&remote));
    let _successes = service.on_success(|report| println!("{}", format_report(report)));
    let _failures = service.on_error(|failure| eprintln!("sync error: {}", failure.message));
    let _states = service.on_state_change(|state| debug!(%state, "sync state"));
    let _connectivity = service.monitor().on_change(|online| {
        println!("{}", if online { "Remote reachable" } else { "Remote unreachable" });
    });

    super::runtime()?.block_on(async {
        // Subscribe before the first probe can flip the monitor online
        let syncer = service.spawn_auto_sync();
        let probe = TcpProbe::new(address, remote.probe_timeout());
        let prober = spawn_probe(service.monitor().clone(), probe, remote.probe_interval());
        info!(url = %remote.url, "watching remote");
        println!("Watching {} (Ctrl-C to stop)", remote.url);

        let stopped = tokio::signal::ctrl_c().await;
        prober.abort();
        syncer.abort();
        info!("watch stopped");
        stopped
    })?;
    Ok(())
}
