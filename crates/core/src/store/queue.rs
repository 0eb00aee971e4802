// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The pending mutation queue.
//!
//! A FIFO of writes that have not been confirmed by the remote store, ordered
//! by `(created_at, id)`. Entries are only removed once the sync pass that
//! replayed them sees the remote accept the write.

use std::collections::HashSet;

use rusqlite::{params, OptionalExtension, Transaction};

use crate::clock::to_storage;
use crate::error::Result;
use crate::mutation::{MutationId, NewMutation, PendingMutation};

use super::{parse_db, parse_json, parse_timestamp, LocalStore};

const SELECT_PENDING: &str =
    "SELECT id, entity_type, operation, payload, created_at, retries FROM pending_mutations";

pub(super) fn row_to_mutation(
    row: &rusqlite::Row<'_>,
) -> std::result::Result<PendingMutation, rusqlite::Error> {
    let operation_str: String = row.get(2)?;
    let payload_str: String = row.get(3)?;
    let created_str: String = row.get(4)?;
    Ok(PendingMutation {
        id: MutationId(row.get(0)?),
        entity_type: row.get(1)?,
        operation: parse_db(&operation_str, "operation")?,
        payload: parse_json(&payload_str, "payload")?,
        created_at: parse_timestamp(&created_str, "created_at")?,
        retries: row.get(5)?,
    })
}

/// Creation timestamp for a new tail entry: `now`, unless the newest queued
/// entry is later.
fn next_created_at(tx: &Transaction<'_>, now: String) -> Result<String> {
    let newest: Option<String> =
        tx.query_row("SELECT MAX(created_at) FROM pending_mutations", [], |row| row.get(0))?;
    Ok(match newest {
        Some(newest) if newest > now => newest,
        _ => now,
    })
}

impl LocalStore {
    /// Append a mutation to the queue.
    ///
    /// Assigns the id, a creation timestamp and a zero retry count. The
    /// timestamp never goes below the newest queued entry, so a wall clock
    /// stepping backwards cannot reorder the queue.
    pub fn enqueue(&mut self, mutation: &NewMutation) -> Result<MutationId> {
        mutation.validate()?;
        let payload = serde_json::to_string(&mutation.payload)?;
        let now = to_storage(&self.clock.now());

        let tx = self.conn.transaction()?;
        let created_at = next_created_at(&tx, now)?;
        tx.execute(
            "INSERT INTO pending_mutations (entity_type, operation, payload, created_at, retries)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![mutation.entity_type, mutation.operation.as_str(), payload, created_at],
        )?;
        let id = MutationId(tx.last_insert_rowid());
        tx.commit()?;
        Ok(id)
    }

    /// All pending mutations, oldest first.
    pub fn pending_mutations(&self) -> Result<Vec<PendingMutation>> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_PENDING} ORDER BY created_at, id"))?;
        let mutations = stmt
            .query_map([], row_to_mutation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(mutations)
    }

    /// One pending mutation by id.
    pub fn get_mutation(&self, id: MutationId) -> Result<Option<PendingMutation>> {
        let mutation = self
            .conn
            .query_row(&format!("{SELECT_PENDING} WHERE id = ?1"), params![id.0], row_to_mutation)
            .optional()?;
        Ok(mutation)
    }

    /// Remove one mutation. Returns false (and does nothing) if it is absent.
    pub fn remove_mutation(&mut self, id: MutationId) -> Result<bool> {
        let removed =
            self.conn.execute("DELETE FROM pending_mutations WHERE id = ?1", params![id.0])?;
        Ok(removed > 0)
    }

    /// Bump a mutation's retry counter, returning the new value.
    ///
    /// Returns `None` without writing anything if the mutation is gone.
    pub fn increment_retries(&mut self, id: MutationId) -> Result<Option<u32>> {
        let tx = self.conn.transaction()?;
        let retries: Option<u32> = tx
            .query_row("SELECT retries FROM pending_mutations WHERE id = ?1", params![id.0], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(retries) = retries else {
            return Ok(None);
        };
        let next = retries.saturating_add(1);
        tx.execute("UPDATE pending_mutations SET retries = ?1 WHERE id = ?2", params![next, id.0])?;
        tx.commit()?;
        Ok(Some(next))
    }

    /// Keys of `entity_type` records with a write the remote has not taken
    /// yet, either still queued or parked in the dead letters.
    pub fn unsynced_keys(&self, entity_type: &str) -> Result<HashSet<String>> {
        let queued = self.pending_mutations()?.into_iter();
        let parked = self.dead_letters()?.into_iter().map(|letter| letter.mutation);
        Ok(queued
            .chain(parked)
            .filter(|m| m.entity_type == entity_type)
            .filter_map(|m| m.key())
            .collect())
    }

    /// Number of pending mutations.
    pub fn pending_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM pending_mutations", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
