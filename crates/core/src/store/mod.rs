// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed durable local store.
//!
//! [`LocalStore`] holds three kinds of state:
//!
//! - cached copies of remote entities, one logical collection per entity type,
//!   with optional secondary indices over JSON fields
//! - the pending mutation queue (and its dead-letter table)
//! - sync metadata such as the last successful sync time
//!
//! Every write runs inside a single SQLite transaction, so a failed call
//! leaves no partial state behind.

mod dead_letters;
mod meta;
mod queue;
mod range;
mod records;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::clock::{ClockSource, SystemClock};
use crate::error::{Error, Result};

pub use meta::LAST_SYNC_KEY;
pub use range::KeyRange;
pub use records::Record;

/// SQL schema for the local store.
pub const SCHEMA: &str = r#"
-- Cached remote entities, one row per (collection, key)
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, key)
);

-- Secondary index definitions over JSON fields of cached records
CREATE TABLE IF NOT EXISTS record_indexes (
    collection TEXT NOT NULL,
    name TEXT NOT NULL,
    field_path TEXT NOT NULL,
    PRIMARY KEY (collection, name)
);

-- Index entries; value is untyped so text and numbers keep their own ordering
CREATE TABLE IF NOT EXISTS record_index_entries (
    collection TEXT NOT NULL,
    name TEXT NOT NULL,
    value,
    key TEXT NOT NULL,
    PRIMARY KEY (collection, name, key)
);

-- Writes not yet confirmed by the remote store
CREATE TABLE IF NOT EXISTS pending_mutations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_type TEXT NOT NULL,
    operation TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL,
    retries INTEGER NOT NULL DEFAULT 0
);

-- Mutations parked after exhausting their retry budget
CREATE TABLE IF NOT EXISTS dead_letters (
    id INTEGER PRIMARY KEY,
    entity_type TEXT NOT NULL,
    operation TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL,
    retries INTEGER NOT NULL,
    last_error TEXT NOT NULL,
    failed_at TEXT NOT NULL
);

-- Sync metadata (single rows keyed by name)
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_index_entries_value
    ON record_index_entries(collection, name, value, key);
CREATE INDEX IF NOT EXISTS idx_pending_order ON pending_mutations(created_at, id);
CREATE INDEX IF NOT EXISTS idx_dead_letters_failed ON dead_letters(failed_at);
"#;

/// Parse a string value from the database, returning a rusqlite error on parse failure.
fn parse_db<T: std::str::FromStr>(
    value: &str,
    column: &str,
) -> std::result::Result<T, rusqlite::Error> {
    value.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!(
                "invalid value '{value}' in column '{column}'"
            ))),
        )
    })
}

/// Parse an RFC3339 timestamp from the database.
fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(Error::CorruptedData(format!(
                    "invalid timestamp '{value}' in column '{column}'"
                ))),
            )
        })
}

/// Parse a JSON document stored as text.
fn parse_json(
    value: &str,
    column: &str,
) -> std::result::Result<serde_json::Value, rusqlite::Error> {
    serde_json::from_str(value).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!("invalid JSON in column '{column}'"))),
        )
    })
}

/// Durable local store with an injectable clock.
pub struct LocalStore {
    conn: Connection,
    clock: Arc<dyn ClockSource>,
}

impl LocalStore {
    /// Open a store at the given path, creating and migrating if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA)?;

        Ok(LocalStore { conn, clock: Arc::new(SystemClock) })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(LocalStore { conn, clock: Arc::new(SystemClock) })
    }

    /// Replace the clock used to stamp mutations and records.
    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Remove every cached record, pending mutation, dead letter and metadata
    /// entry in one transaction. Index definitions are kept.
    pub fn clear_all(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM records;
             DELETE FROM record_index_entries;
             DELETE FROM pending_mutations;
             DELETE FROM dead_letters;
             DELETE FROM metadata;",
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
