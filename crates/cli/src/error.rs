// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use hydrant_core::MutationId;
use thiserror::Error;

use crate::sync::RemoteError;

/// All possible errors that can occur in the hydrant library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'hydrant init' first")]
    NotInitialized,

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("no remote configured\n  hint: re-run 'hydrant init --remote ws://...' or edit .hydrant/config.toml")]
    NoRemote,

    #[error("remote is unreachable: the pass was skipped and the queue left untouched")]
    Offline,

    #[error("a sync pass is already running")]
    SyncInProgress,

    #[error("sync incomplete: {failed} mutation(s) failed, {remaining} still queued")]
    SyncIncomplete { failed: usize, remaining: usize },

    #[error("dead letter not found: {0}")]
    DeadLetterNotFound(MutationId),

    #[error("record not found: {entity_type}/{key}")]
    RecordNotFound { entity_type: String, key: String },

    #[error("refusing to clear local data\n  hint: pass --force; pending mutations will be lost")]
    ForceRequired,

    #[error("lock already held: {0}\n  hint: another 'hydrant watch' or 'hydrant sync' is using this store")]
    LockHeld(String),

    #[error("invalid operation: '{0}'\n  hint: valid operations are: add, update, delete")]
    InvalidOperation(String),

    #[error("unknown index '{index}' on collection '{collection}'")]
    UnknownIndex { collection: String, index: String },

    #[error("{0}")]
    InvalidInput(String),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("corrupted data in local store: {0}")]
    CorruptedData(String),
}

/// A specialized Result type for hydrant operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<hydrant_core::Error> for Error {
    fn from(e: hydrant_core::Error) -> Self {
        match e {
            hydrant_core::Error::Storage(e) => Error::Storage(e),
            hydrant_core::Error::Io(e) => Error::Io(e),
            hydrant_core::Error::Json(e) => Error::Json(e),
            hydrant_core::Error::CorruptedData(s) => Error::CorruptedData(s),
            hydrant_core::Error::InvalidOperation(s) => Error::InvalidOperation(s),
            hydrant_core::Error::UnknownIndex { collection, index } => {
                Error::UnknownIndex { collection, index }
            }
            hydrant_core::Error::InvalidInput(s) => Error::InvalidInput(s),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
