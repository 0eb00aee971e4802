// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cached entity records and their secondary indices.

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, OptionalExtension, Transaction};
use serde_json::Value;

use crate::clock::to_storage;
use crate::error::{Error, Result};
use crate::mutation::{payload_key, NewMutation, Operation};

use super::range::{extract_field, index_value};
use super::{parse_json, parse_timestamp, KeyRange, LocalStore};

/// A cached copy of a remote entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: String,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}

fn row_to_record(row: &rusqlite::Row<'_>) -> std::result::Result<Record, rusqlite::Error> {
    let value_str: String = row.get(1)?;
    let updated_str: String = row.get(2)?;
    Ok(Record {
        key: row.get(0)?,
        value: parse_json(&value_str, "value")?,
        updated_at: parse_timestamp(&updated_str, "updated_at")?,
    })
}

/// Rewrites the index entries of one record for every index on its collection.
fn reindex(tx: &Transaction<'_>, collection: &str, key: &str, value: &Value) -> Result<()> {
    tx.execute(
        "DELETE FROM record_index_entries WHERE collection = ?1 AND key = ?2",
        params![collection, key],
    )?;

    let indexes: Vec<(String, String)> = {
        let mut stmt =
            tx.prepare("SELECT name, field_path FROM record_indexes WHERE collection = ?1")?;
        let rows = stmt
            .query_map(params![collection], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    for (name, field_path) in indexes {
        let Some(indexed) = extract_field(value, &field_path).and_then(index_value) else {
            continue;
        };
        tx.execute(
            "INSERT INTO record_index_entries (collection, name, value, key)
             VALUES (?1, ?2, ?3, ?4)",
            params![collection, name, indexed, key],
        )?;
    }
    Ok(())
}

impl LocalStore {
    /// Register a secondary index over a dot-separated JSON field path.
    ///
    /// Existing records in the collection are indexed immediately. Redefining
    /// an index with a different path rebuilds its entries.
    pub fn define_index(&mut self, collection: &str, name: &str, field_path: &str) -> Result<()> {
        if field_path.trim().is_empty() {
            return Err(Error::InvalidInput("index field path cannot be empty".to_string()));
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO record_indexes (collection, name, field_path)
             VALUES (?1, ?2, ?3)",
            params![collection, name, field_path],
        )?;
        tx.execute(
            "DELETE FROM record_index_entries WHERE collection = ?1 AND name = ?2",
            params![collection, name],
        )?;

        let existing: Vec<(String, String)> = {
            let mut stmt = tx.prepare("SELECT key, value FROM records WHERE collection = ?1")?;
            let rows = stmt
                .query_map(params![collection], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };
        for (key, value_str) in existing {
            let value = parse_json(&value_str, "value")?;
            if let Some(indexed) = extract_field(&value, field_path).and_then(index_value) {
                tx.execute(
                    "INSERT INTO record_index_entries (collection, name, value, key)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![collection, name, indexed, key],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Names of the indices defined on a collection.
    pub fn indexes(&self, collection: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM record_indexes WHERE collection = ?1 ORDER BY name")?;
        let names = stmt
            .query_map(params![collection], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Insert or replace a record.
    pub fn put(&mut self, collection: &str, key: &str, value: &Value) -> Result<()> {
        let now = to_storage(&self.clock.now());
        let json = serde_json::to_string(value)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO records (collection, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![collection, key, json, now],
        )?;
        reindex(&tx, collection, key, value)?;
        tx.commit()?;
        Ok(())
    }

    /// Get one record's value by key.
    pub fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        Ok(self.get_record(collection, key)?.map(|r| r.value))
    }

    /// Get one record with its metadata.
    pub fn get_record(&self, collection: &str, key: &str) -> Result<Option<Record>> {
        let record = self
            .conn
            .query_row(
                "SELECT key, value, updated_at FROM records WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// All records in a collection, ordered by key.
    pub fn get_all(&self, collection: &str) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value, updated_at FROM records WHERE collection = ?1 ORDER BY key",
        )?;
        let records = stmt
            .query_map(params![collection], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Records whose indexed field falls in `range`, ordered by index value then key.
    pub fn query_by_index(
        &self,
        collection: &str,
        index: &str,
        range: &KeyRange,
    ) -> Result<Vec<Record>> {
        let exists: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM record_indexes WHERE collection = ?1 AND name = ?2",
            params![collection, index],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::UnknownIndex {
                collection: collection.to_string(),
                index: index.to_string(),
            });
        }

        let mut params: Vec<SqlValue> =
            vec![SqlValue::Text(collection.to_string()), SqlValue::Text(index.to_string())];
        let conditions = range.to_sql("e.value", &mut params)?;

        let mut sql = String::from(
            "SELECT r.key, r.value, r.updated_at
             FROM record_index_entries e
             JOIN records r ON r.collection = e.collection AND r.key = e.key
             WHERE e.collection = ?1 AND e.name = ?2",
        );
        if !conditions.is_empty() {
            sql.push_str(" AND ");
            sql.push_str(&conditions);
        }
        sql.push_str(" ORDER BY e.value, e.key");

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(params.iter()), row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Delete one record. Returns false if it did not exist.
    pub fn delete(&mut self, collection: &str, key: &str) -> Result<bool> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM records WHERE collection = ?1 AND key = ?2",
            params![collection, key],
        )?;
        tx.execute(
            "DELETE FROM record_index_entries WHERE collection = ?1 AND key = ?2",
            params![collection, key],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Delete every record in a collection. Returns the number removed.
    pub fn clear(&mut self, collection: &str) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM records WHERE collection = ?1", params![collection])?;
        tx.execute(
            "DELETE FROM record_index_entries WHERE collection = ?1",
            params![collection],
        )?;
        tx.commit()?;
        Ok(removed)
    }

    /// Reflect a write in the cache.
    ///
    /// `stored` is the record as the remote kept it, when it echoed one.
    /// Adds without an identifying key cannot be cached and are skipped.
    pub fn mirror_write(&mut self, mutation: &NewMutation, stored: Option<&Value>) -> Result<()> {
        let value = stored.unwrap_or(&mutation.payload);
        let Some(key) = payload_key(value).or_else(|| mutation.key()) else {
            return Ok(());
        };
        match mutation.operation {
            Operation::Add | Operation::Update => self.put(&mutation.entity_type, &key, value),
            Operation::Delete => self.delete(&mutation.entity_type, &key).map(|_| ()),
        }
    }

    /// Collections that currently hold at least one record.
    pub fn collections(&self) -> Result<Vec<String>> {
        let mut stmt =
            self.conn.prepare("SELECT DISTINCT collection FROM records ORDER BY collection")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
