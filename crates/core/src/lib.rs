// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! hydrant-core: durable offline state for the hydrant sync engine
//!
//! This crate provides the local store (cached entities, the pending
//! mutation queue, dead letters and sync metadata), the mutation data model
//! and the wire protocol spoken with the remote gateway. It is synchronous;
//! the async sync layer lives in the `hydrant` crate.

pub mod clock;
pub mod error;
pub mod mutation;
pub mod protocol;
pub mod store;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use mutation::{DeadLetter, MutationId, NewMutation, Operation, PendingMutation};
pub use protocol::{GatewayRequest, GatewayResponse};
pub use store::{KeyRange, LocalStore, Record, LAST_SYNC_KEY};
