// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync metadata.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::clock::to_storage;
use crate::error::{Error, Result};

use super::LocalStore;

/// Metadata key holding the time of the most recent sync pass.
pub const LAST_SYNC_KEY: &str = "lastSync";

fn refresh_key(entity_type: &str) -> String {
    format!("refreshed:{entity_type}")
}

impl LocalStore {
    /// Read a raw metadata value.
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Write a raw metadata value.
    pub fn set_meta(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn get_timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.get_meta(key)? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| Error::CorruptedData(format!("invalid timestamp '{raw}' for '{key}'")))
    }

    /// When the last sync pass ran, if ever.
    pub fn last_sync_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        self.get_timestamp(LAST_SYNC_KEY)
    }

    /// Record when a sync pass ran.
    pub fn set_last_sync_timestamp(&mut self, ts: DateTime<Utc>) -> Result<()> {
        self.set_meta(LAST_SYNC_KEY, &to_storage(&ts))
    }

    /// Start of the last completed cache refresh for `entity_type`, if any.
    pub fn refreshed_at(&self, entity_type: &str) -> Result<Option<DateTime<Utc>>> {
        self.get_timestamp(&refresh_key(entity_type))
    }

    pub fn set_refreshed_at(&mut self, entity_type: &str, ts: DateTime<Utc>) -> Result<()> {
        self.set_meta(&refresh_key(entity_type), &to_storage(&ts))
    }
}

#[cfg(test)]
#[path = "meta_tests.rs"]
mod tests;
