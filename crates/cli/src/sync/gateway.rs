// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote gateway abstraction.
//!
//! The gateway is the remote store's per-entity-type endpoints. The trait
//! keeps the sync layer agnostic of the wire so tests can substitute an
//! in-memory gateway.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hydrant_core::mutation::payload_key;
use hydrant_core::{MutationId, Operation, PendingMutation};
use serde_json::Value;

/// Error applying a request to the remote gateway.
///
/// The sync drain treats every kind the same way; the distinction only
/// matters to the online write path, which hands rejections back to the
/// caller instead of queueing them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The gateway could not be reached.
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    /// The gateway refused the request (validation, permissions, missing record).
    #[error("rejected: {0}")]
    Rejected(String),

    /// The gateway failed while handling the request.
    #[error("server error: {0}")]
    Server(String),

    /// The gateway answered with something unexpected.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No response within the configured request timeout.
    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

impl RemoteError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, RemoteError::Rejected(_))
    }
}

/// Boxed future returned by gateway methods.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// The remote store, one collection per entity type.
///
/// `origin` is the queued mutation a write replays, if any. Implementations
/// may forward it as an idempotency hint; callers never assume the remote
/// side deduplicates.
pub trait RemoteGateway: Send + Sync {
    /// Insert a record. May return the record as stored remotely.
    fn create<'a>(
        &'a self,
        entity_type: &'a str,
        payload: &'a Value,
        origin: Option<MutationId>,
    ) -> GatewayFuture<'a, Option<Value>>;

    /// Overwrite the record at `key`.
    fn update<'a>(
        &'a self,
        entity_type: &'a str,
        key: &'a str,
        payload: &'a Value,
        origin: Option<MutationId>,
    ) -> GatewayFuture<'a, ()>;

    /// Remove the record at `key`.
    fn delete<'a>(
        &'a self,
        entity_type: &'a str,
        key: &'a str,
        origin: Option<MutationId>,
    ) -> GatewayFuture<'a, ()>;

    /// Records modified after `since`, or every record when `since` is `None`.
    fn fetch_since<'a>(
        &'a self,
        entity_type: &'a str,
        since: Option<DateTime<Utc>>,
    ) -> GatewayFuture<'a, Vec<Value>>;

    /// Dispatch a write by operation.
    ///
    /// Returns the record the remote stored when it echoes one.
    fn send<'a>(
        &'a self,
        entity_type: &'a str,
        operation: Operation,
        payload: &'a Value,
        origin: Option<MutationId>,
    ) -> GatewayFuture<'a, Option<Value>> {
        Box::pin(async move {
            if operation == Operation::Add {
                return self.create(entity_type, payload, origin).await;
            }
            let key = payload_key(payload).ok_or_else(|| {
                RemoteError::Rejected(format!("{operation} {entity_type}: payload has no id"))
            })?;
            match operation {
                Operation::Update => self.update(entity_type, &key, payload, origin).await?,
                _ => self.delete(entity_type, &key, origin).await?,
            }
            Ok(None)
        })
    }

    /// Replay a queued mutation.
    fn apply<'a>(&'a self, mutation: &'a PendingMutation) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            self.send(&mutation.entity_type, mutation.operation, &mutation.payload, Some(mutation.id))
                .await
                .map(|_| ())
        })
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
