// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline-first sync engine.
//!
//! Writes go to the remote gateway when it is reachable and to the local
//! queue when it is not. The orchestrator drains the queue in order once
//! connectivity returns.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌─────────────┐
//! │ Application  │────►│ Orchestrator  │────►│   Gateway   │
//! │   (write)    │     │ (SyncService) │◄────│   (trait)   │
//! └──────────────┘     └───────────────┘     └─────────────┘
//!                         │         ▲
//!                         ▼         │ offline → online
//!                 ┌─────────────┐  ┌──────────────┐
//!                 │ LocalStore  │  │ Connectivity │
//!                 │ (queue +    │  │   Monitor    │
//!                 │  cache)     │  └──────────────┘
//!                 └─────────────┘
//! ```
//!
//! # Features
//!
//! - FIFO replay with per-mutation failure isolation
//! - Single-flight passes; concurrent calls return immediately
//! - One automatic pass per offline→online transition
//! - Optional retry cap with a dead-letter table, and backoff between
//!   failed passes
//! - Progress, error, success and state observers with disposable handles
//! - Injectable gateway and reachability probe for testing

mod connectivity;
mod events;
mod gateway;
mod orchestrator;
mod policy;
mod websocket;

pub use connectivity::{spawn_probe, ConnectivityMonitor, ReachabilityProbe, TcpProbe};
pub use events::{Listeners, Subscription};
pub use gateway::{GatewayFuture, RemoteError, RemoteGateway};
pub use orchestrator::{
    SkipReason, SyncFailure, SyncProgress, SyncReport, SyncService, SyncState, WriteOutcome,
};
pub use policy::RetryPolicy;
pub use websocket::WebSocketGateway;

#[cfg(test)]
pub(crate) mod test_helpers;
