// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Dead letters: mutations moved out of the queue after too many failures.
//!
//! Nothing here is deleted implicitly. A dead letter stays until it is either
//! requeued or purged by an explicit call.

use std::collections::HashSet;

use rusqlite::{params, OptionalExtension};

use crate::clock::to_storage;
use crate::error::Result;
use crate::mutation::{DeadLetter, MutationId, PendingMutation};

use super::queue::row_to_mutation;
use super::{parse_db, parse_json, parse_timestamp, LocalStore};

fn row_to_dead_letter(row: &rusqlite::Row<'_>) -> std::result::Result<DeadLetter, rusqlite::Error> {
    let operation_str: String = row.get(2)?;
    let payload_str: String = row.get(3)?;
    let created_str: String = row.get(4)?;
    let failed_str: String = row.get(7)?;
    Ok(DeadLetter {
        mutation: PendingMutation {
            id: MutationId(row.get(0)?),
            entity_type: row.get(1)?,
            operation: parse_db(&operation_str, "operation")?,
            payload: parse_json(&payload_str, "payload")?,
            created_at: parse_timestamp(&created_str, "created_at")?,
            retries: row.get(5)?,
        },
        last_error: row.get(6)?,
        failed_at: parse_timestamp(&failed_str, "failed_at")?,
    })
}

const SELECT_DEAD: &str = "SELECT id, entity_type, operation, payload, created_at, retries,
     last_error, failed_at FROM dead_letters";

impl LocalStore {
    /// Move a pending mutation to the dead-letter table.
    ///
    /// Returns false if the mutation is no longer queued.
    pub fn dead_letter(&mut self, id: MutationId, last_error: &str) -> Result<bool> {
        let failed_at = to_storage(&self.clock.now());

        let tx = self.conn.transaction()?;
        let mutation = tx
            .query_row(
                "SELECT id, entity_type, operation, payload, created_at, retries
                 FROM pending_mutations WHERE id = ?1",
                params![id.0],
                row_to_mutation,
            )
            .optional()?;
        let Some(mutation) = mutation else {
            return Ok(false);
        };

        tx.execute(
            "INSERT OR REPLACE INTO dead_letters
             (id, entity_type, operation, payload, created_at, retries, last_error, failed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                mutation.id.0,
                mutation.entity_type,
                mutation.operation.as_str(),
                serde_json::to_string(&mutation.payload)?,
                to_storage(&mutation.created_at),
                mutation.retries,
                last_error,
                failed_at,
            ],
        )?;
        tx.execute("DELETE FROM pending_mutations WHERE id = ?1", params![id.0])?;
        tx.commit()?;
        Ok(true)
    }

    /// All dead letters, oldest failure first.
    pub fn dead_letters(&self) -> Result<Vec<DeadLetter>> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_DEAD} ORDER BY failed_at, id"))?;
        let letters = stmt
            .query_map([], row_to_dead_letter)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(letters)
    }

    /// Number of dead letters.
    pub fn dead_letter_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM dead_letters", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// `(entity_type, key)` of every dead-lettered mutation that has a key.
    pub fn dead_letter_keys(&self) -> Result<HashSet<(String, String)>> {
        Ok(self
            .dead_letters()?
            .into_iter()
            .filter_map(|letter| {
                let key = letter.mutation.key()?;
                Some((letter.mutation.entity_type, key))
            })
            .collect())
    }

    /// Put a dead letter back in the queue with zero retries.
    ///
    /// The mutation keeps its id and creation timestamp, so it replays ahead
    /// of any later write to the same record. Returns false if absent.
    pub fn requeue_dead_letter(&mut self, id: MutationId) -> Result<bool> {
        let tx = self.conn.transaction()?;
        let letter = tx
            .query_row(&format!("{SELECT_DEAD} WHERE id = ?1"), params![id.0], row_to_dead_letter)
            .optional()?;
        let Some(letter) = letter else {
            return Ok(false);
        };

        let mutation = letter.mutation;
        tx.execute(
            "INSERT INTO pending_mutations (id, entity_type, operation, payload, created_at, retries)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                mutation.id.0,
                mutation.entity_type,
                mutation.operation.as_str(),
                serde_json::to_string(&mutation.payload)?,
                to_storage(&mutation.created_at),
            ],
        )?;
        tx.execute("DELETE FROM dead_letters WHERE id = ?1", params![id.0])?;
        tx.commit()?;
        Ok(true)
    }

    /// Permanently discard a dead letter. Returns false if absent.
    pub fn purge_dead_letter(&mut self, id: MutationId) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM dead_letters WHERE id = ?1", params![id.0])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
#[path = "dead_letters_tests.rs"]
mod tests;
