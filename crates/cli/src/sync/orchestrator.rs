// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync orchestrator.
//!
//! [`SyncService`] owns the write path and the drain. A pass moves
//! `Idle → Syncing → Completed | Error → Idle`; at most one pass runs at a
//! time and a concurrent [`SyncService::try_sync`] returns immediately.
//!
//! The drain works on a snapshot of the queue taken when the pass starts.
//! Mutations enqueued while it runs are picked up by the next pass.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use hydrant_core::{DeadLetter, LocalStore, MutationId, NewMutation, Operation, PendingMutation};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::connectivity::ConnectivityMonitor;
use super::events::{Listeners, Subscription};
use super::gateway::RemoteGateway;
use super::policy::RetryPolicy;
use crate::error::Result;

const STATE_IDLE: u8 = 0;
const STATE_SYNCING: u8 = 1;
const STATE_COMPLETED: u8 = 2;
const STATE_ERROR: u8 = 3;

/// Where the orchestrator is in its pass lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Idle,
    Syncing,
    Completed,
    Error,
}

impl SyncState {
    fn as_u8(self) -> u8 {
        match self {
            SyncState::Idle => STATE_IDLE,
            SyncState::Syncing => STATE_SYNCING,
            SyncState::Completed => STATE_COMPLETED,
            SyncState::Error => STATE_ERROR,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            STATE_SYNCING => SyncState::Syncing,
            STATE_COMPLETED => SyncState::Completed,
            STATE_ERROR => SyncState::Error,
            _ => SyncState::Idle,
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncState::Idle => "idle",
            SyncState::Syncing => "syncing",
            SyncState::Completed => "completed",
            SyncState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Why a pass did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Offline,
    InProgress,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Offline => f.write_str("offline"),
            SkipReason::InProgress => f.write_str("sync already in progress"),
        }
    }
}

/// Aggregate result of one [`SyncService::try_sync`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// True when the pass ran and no mutation failed.
    pub success: bool,
    pub synced_items: usize,
    /// One human-readable line per failed mutation.
    pub errors: Vec<String>,
    /// Queue length after the pass. Zero when the pass was skipped.
    pub remaining_items: usize,
    /// Mutations moved to the dead-letter table during this pass.
    pub dead_lettered: usize,
    /// Mutations not attempted because an earlier one for the same record failed.
    pub deferred_items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
}

impl SyncReport {
    fn skipped(reason: SkipReason) -> Self {
        SyncReport {
            success: false,
            synced_items: 0,
            errors: vec![reason.to_string()],
            remaining_items: 0,
            dead_lettered: 0,
            deferred_items: 0,
            skipped: Some(reason),
        }
    }

    pub fn error_count(&self) -> usize {
        if self.skipped.is_some() {
            0
        } else {
            self.errors.len()
        }
    }
}

/// Emitted after each mutation the drain processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress {
    pub completed: usize,
    pub total: usize,
}

/// A failure reported to `on_error` observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    /// The mutation that failed; `None` for pass-level failures.
    pub mutation: Option<MutationId>,
    pub message: String,
}

/// What [`SyncService::write`] did with a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The gateway accepted the write and the cache mirrors it.
    Applied,
    /// The cache was updated and the write queued for a later pass.
    Queued(MutationId),
}

/// Releases the single-flight flag when a pass ends, however it ends.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Offline-first write path and queue drain over an injected store,
/// connectivity monitor and gateway.
pub struct SyncService<G> {
    store: Arc<Mutex<LocalStore>>,
    monitor: ConnectivityMonitor,
    gateway: Arc<G>,
    policy: RetryPolicy,
    replay_delay: Option<Duration>,
    syncing: AtomicBool,
    state: AtomicU8,
    progress: Listeners<SyncProgress>,
    failures: Listeners<SyncFailure>,
    successes: Listeners<SyncReport>,
    states: Listeners<SyncState>,
}

impl<G: RemoteGateway + 'static> SyncService<G> {
    pub fn new(store: Arc<Mutex<LocalStore>>, monitor: ConnectivityMonitor, gateway: Arc<G>) -> Self {
        SyncService {
            store,
            monitor,
            gateway,
            policy: RetryPolicy::default(),
            replay_delay: None,
            syncing: AtomicBool::new(false),
            state: AtomicU8::new(STATE_IDLE),
            progress: Listeners::new(),
            failures: Listeners::new(),
            successes: Listeners::new(),
            states: Listeners::new(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sleep this long before replaying each mutation.
    pub fn with_replay_delay(mut self, delay: Option<Duration>) -> Self {
        self.replay_delay = delay;
        self
    }

    pub fn store(&self) -> Arc<Mutex<LocalStore>> {
        Arc::clone(&self.store)
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    pub fn gateway(&self) -> Arc<G> {
        Arc::clone(&self.gateway)
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn state(&self) -> SyncState {
        SyncState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    pub fn on_progress(&self, callback: impl Fn(&SyncProgress) + Send + Sync + 'static) -> Subscription {
        self.progress.subscribe(callback)
    }

    pub fn on_error(&self, callback: impl Fn(&SyncFailure) + Send + Sync + 'static) -> Subscription {
        self.failures.subscribe(callback)
    }

    /// Called after every pass that finished with no failed mutation.
    pub fn on_success(&self, callback: impl Fn(&SyncReport) + Send + Sync + 'static) -> Subscription {
        self.successes.subscribe(callback)
    }

    pub fn on_state_change(&self, callback: impl Fn(SyncState) + Send + Sync + 'static) -> Subscription {
        self.states.subscribe(move |state| callback(*state))
    }

    /// Run `f` against the store. The lock is never held across an await.
    fn with_store<T>(&self, f: impl FnOnce(&mut LocalStore) -> hydrant_core::Result<T>) -> Result<T> {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut store)?)
    }

    fn set_state(&self, state: SyncState) {
        self.state.store(state.as_u8(), Ordering::Release);
        self.states.emit(&state);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queue and metadata
    // ─────────────────────────────────────────────────────────────────────

    /// Queue a write without trying the gateway.
    pub fn enqueue(
        &self,
        entity_type: impl Into<String>,
        operation: Operation,
        payload: Value,
    ) -> Result<MutationId> {
        let mutation = NewMutation::new(entity_type, operation, payload);
        let id = self.with_store(|s| s.enqueue(&mutation))?;
        debug!(%id, entity_type = %mutation.entity_type, %operation, "queued mutation");
        Ok(id)
    }

    pub fn pending(&self) -> Result<Vec<PendingMutation>> {
        self.with_store(|s| s.pending_mutations())
    }

    pub fn pending_count(&self) -> Result<usize> {
        self.with_store(|s| s.pending_count())
    }

    pub fn last_sync_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        self.with_store(|s| s.last_sync_timestamp())
    }

    pub fn dead_letters(&self) -> Result<Vec<DeadLetter>> {
        self.with_store(|s| s.dead_letters())
    }

    /// Put a dead letter back in the queue, in its original position, with
    /// zero retries. Returns false if there is no such dead letter.
    pub fn requeue_dead_letter(&self, id: MutationId) -> Result<bool> {
        let requeued = self.with_store(|s| s.requeue_dead_letter(id))?;
        if requeued {
            info!(%id, "requeued dead letter");
        }
        Ok(requeued)
    }

    pub fn purge_dead_letter(&self, id: MutationId) -> Result<bool> {
        self.with_store(|s| s.purge_dead_letter(id))
    }

    /// Drop every cached record, pending mutation, dead letter and metadata entry.
    pub fn clear_local_data(&self) -> Result<()> {
        self.with_store(|s| s.clear_all())?;
        warn!("cleared all local data");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Write path
    // ─────────────────────────────────────────────────────────────────────

    /// Apply a write, online or not.
    ///
    /// Online, the gateway is tried first; on success the cache mirrors the
    /// stored record. If the gateway cannot take the write right now (offline,
    /// unreachable, timeout, server error) the cache is updated and the write
    /// queued. A rejection is returned to the caller and changes nothing.
    ///
    /// A record with earlier writes still queued or dead-lettered is never
    /// written directly; the new write queues behind them.
    pub async fn write(
        &self,
        entity_type: impl Into<String>,
        operation: Operation,
        payload: Value,
    ) -> Result<WriteOutcome> {
        let mutation = NewMutation::new(entity_type, operation, payload);
        mutation.validate()?;

        let behind_unsynced = match mutation.key() {
            Some(key) => self.with_store(|s| s.unsynced_keys(&mutation.entity_type))?.contains(&key),
            None => false,
        };
        if behind_unsynced {
            debug!(entity_type = %mutation.entity_type, "record has unsynced writes, queueing");
        }

        if self.monitor.is_online() && !behind_unsynced {
            let sent = self
                .gateway
                .send(&mutation.entity_type, mutation.operation, &mutation.payload, None)
                .await;
            match sent {
                Ok(stored) => {
                    self.with_store(|s| s.mirror_write(&mutation, stored.as_ref()))?;
                    return Ok(WriteOutcome::Applied);
                }
                Err(e) if e.is_rejection() => return Err(e.into()),
                Err(e) => warn!(error = %e, "gateway write failed, queueing"),
            }
        }

        let id = self.with_store(|s| {
            let id = s.enqueue(&mutation)?;
            s.mirror_write(&mutation, None)?;
            Ok(id)
        })?;
        debug!(%id, entity_type = %mutation.entity_type, operation = %mutation.operation, "queued write");
        Ok(WriteOutcome::Queued(id))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Drain
    // ─────────────────────────────────────────────────────────────────────

    /// Run one sync pass.
    ///
    /// Returns a skipped report when offline or when another pass is running.
    /// Individual gateway failures are collected in the report; only a
    /// storage failure aborts the pass with `Err`.
    pub async fn try_sync(&self) -> Result<SyncReport> {
        if !self.monitor.is_online() {
            info!("sync skipped: offline");
            self.failures.emit(&SyncFailure {
                mutation: None,
                message: SkipReason::Offline.to_string(),
            });
            return Ok(SyncReport::skipped(SkipReason::Offline));
        }

        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("sync skipped: pass already running");
            return Ok(SyncReport::skipped(SkipReason::InProgress));
        }
        let _guard = PassGuard(&self.syncing);

        self.set_state(SyncState::Syncing);
        let result = self.drain().await;

        match &result {
            Ok(report) if report.success => {
                self.set_state(SyncState::Completed);
                self.successes.emit(report);
            }
            Ok(_) => self.set_state(SyncState::Error),
            Err(e) => {
                warn!(error = %e, "sync pass aborted");
                self.failures.emit(&SyncFailure { mutation: None, message: e.to_string() });
                self.set_state(SyncState::Error);
            }
        }
        self.set_state(SyncState::Idle);
        result
    }

    async fn drain(&self) -> Result<SyncReport> {
        let snapshot = self.with_store(|s| s.pending_mutations())?;
        let total = snapshot.len();

        let mut synced_items = 0;
        let mut errors = Vec::new();
        let mut dead_lettered = 0;
        let mut deferred_items = 0;
        // Records with a dead letter or a failed mutation this pass; later
        // writes to them wait.
        let mut blocked: HashSet<(String, String)> = self.with_store(|s| s.dead_letter_keys())?;

        for (index, mutation) in snapshot.iter().enumerate() {
            let record = mutation.key().map(|key| (mutation.entity_type.clone(), key));

            if record.as_ref().is_some_and(|r| blocked.contains(r)) {
                debug!(mutation = %mutation.describe(), "deferred behind an unsynced write");
                deferred_items += 1;
            } else {
                if let Some(delay) = self.replay_delay {
                    tokio::time::sleep(delay).await;
                }
                debug!(mutation = %mutation.describe(), retries = mutation.retries, "replaying");

                match self.gateway.apply(mutation).await {
                    Ok(()) => {
                        self.with_store(|s| s.remove_mutation(mutation.id))?;
                        synced_items += 1;
                    }
                    Err(e) => {
                        let message = format!("{}: {}", mutation.describe(), e);
                        warn!(mutation = %mutation.describe(), error = %e, "replay failed");

                        let retries = self.with_store(|s| s.increment_retries(mutation.id))?;
                        if retries.is_some_and(|r| self.policy.is_exhausted(r))
                            && self.with_store(|s| s.dead_letter(mutation.id, &e.to_string()))?
                        {
                            warn!(mutation = %mutation.describe(), "moved to dead letters");
                            dead_lettered += 1;
                        }

                        if let Some(record) = record {
                            blocked.insert(record);
                        }
                        self.failures.emit(&SyncFailure {
                            mutation: Some(mutation.id),
                            message: message.clone(),
                        });
                        errors.push(message);
                    }
                }
            }

            self.progress.emit(&SyncProgress { completed: index + 1, total });
        }

        self.with_store(|s| {
            let now = s.now();
            s.set_last_sync_timestamp(now)
        })?;
        let remaining_items = self.with_store(|s| s.pending_count())?;

        info!(
            synced = synced_items,
            failed = errors.len(),
            deferred = deferred_items,
            remaining = remaining_items,
            "sync pass complete"
        );

        Ok(SyncReport {
            success: errors.is_empty(),
            synced_items,
            errors,
            remaining_items,
            dead_lettered,
            deferred_items,
            skipped: None,
        })
    }

    /// Run one pass per offline→online transition, plus backoff re-attempts
    /// while a failed pass leaves the service online.
    ///
    /// Transitions that happen while a pass runs are coalesced into one
    /// follow-up pass. The task runs until aborted.
    pub fn spawn_auto_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let mut online_rx = self.monitor.subscribe();

        tokio::spawn(async move {
            let mut attempt: u32 = 0;
            loop {
                let retry_in = (attempt > 0).then(|| service.policy.backoff(attempt));

                let triggered = match retry_in {
                    Some(delay) => tokio::select! {
                        changed = online_rx.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            *online_rx.borrow_and_update()
                        }
                        _ = tokio::time::sleep(delay) => {
                            debug!(attempt, "retrying failed sync pass");
                            true
                        }
                    },
                    None => {
                        if online_rx.changed().await.is_err() {
                            break;
                        }
                        *online_rx.borrow_and_update()
                    }
                };

                if !triggered {
                    attempt = 0;
                    continue;
                }

                match service.try_sync().await {
                    Ok(report) if report.success => attempt = 0,
                    Ok(report) if report.skipped.is_some() => {}
                    Ok(_) => attempt = attempt.saturating_add(1),
                    Err(e) => {
                        warn!(error = %e, "automatic sync failed");
                        attempt = attempt.saturating_add(1);
                    }
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
