// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for hydrant-core operations.

use thiserror::Error;

/// All possible errors that can occur in hydrant-core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The durable local store failed an operation.
    ///
    /// Fatal to the current call; callers must not assume a partial write.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("invalid operation: '{0}'\n  hint: valid operations are: add, update, delete")]
    InvalidOperation(String),

    #[error("unknown index '{index}' on collection '{collection}'")]
    UnknownIndex { collection: String, index: String },

    #[error("{0}")]
    InvalidInput(String),
}

/// A specialized Result type for hydrant-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
