// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pending mutations: writes that could not reach the remote store yet.
//!
//! A mutation names the remote collection it targets (`entity_type`), what to
//! do there ([`Operation`]) and the data needed to replay it. The store assigns
//! the id, creation timestamp and retry counter when the mutation is queued.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Store-assigned identifier of a queued mutation.
///
/// Strictly increasing in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationId(pub i64);

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MutationId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(MutationId)
            .map_err(|_| Error::InvalidInput(format!("invalid mutation id '{s}'")))
    }
}

/// The kind of write being replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "add" | "create" => Ok(Operation::Add),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            _ => Err(Error::InvalidOperation(s.to_string())),
        }
    }
}

/// A mutation as submitted by application code, before it is queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMutation {
    /// Remote collection affected (e.g. "checklist").
    pub entity_type: String,
    pub operation: Operation,
    /// Full record for add/update, identifying key for delete.
    pub payload: Value,
}

impl NewMutation {
    pub fn new(entity_type: impl Into<String>, operation: Operation, payload: Value) -> Self {
        NewMutation { entity_type: entity_type.into(), operation, payload }
    }

    pub fn add(entity_type: impl Into<String>, payload: Value) -> Self {
        Self::new(entity_type, Operation::Add, payload)
    }

    pub fn update(entity_type: impl Into<String>, payload: Value) -> Self {
        Self::new(entity_type, Operation::Update, payload)
    }

    pub fn delete(entity_type: impl Into<String>, payload: Value) -> Self {
        Self::new(entity_type, Operation::Delete, payload)
    }

    /// Identifying key of the record this mutation touches, if any.
    pub fn key(&self) -> Option<String> {
        payload_key(&self.payload)
    }

    /// Checks that the mutation can be replayed later.
    ///
    /// Add and update need a JSON object; delete needs a key.
    pub fn validate(&self) -> Result<()> {
        if self.entity_type.trim().is_empty() {
            return Err(Error::InvalidInput("entity type cannot be empty".to_string()));
        }
        match self.operation {
            Operation::Add | Operation::Update => {
                if !self.payload.is_object() {
                    return Err(Error::InvalidInput(format!(
                        "{} payload for '{}' must be a JSON object",
                        self.operation, self.entity_type
                    )));
                }
                if self.operation == Operation::Update && self.key().is_none() {
                    return Err(Error::InvalidInput(format!(
                        "update payload for '{}' needs an 'id' field",
                        self.entity_type
                    )));
                }
            }
            Operation::Delete => {
                if self.key().is_none() {
                    return Err(Error::InvalidInput(format!(
                        "delete payload for '{}' needs an 'id' field or a bare key",
                        self.entity_type
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A mutation recorded in the durable queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMutation {
    pub id: MutationId,
    pub entity_type: String,
    pub operation: Operation,
    pub payload: Value,
    /// Local creation time; defines replay order.
    pub created_at: DateTime<Utc>,
    /// Failed replay attempts so far.
    pub retries: u32,
}

impl PendingMutation {
    /// Identifying key of the record this mutation touches, if any.
    pub fn key(&self) -> Option<String> {
        payload_key(&self.payload)
    }

    /// Human-readable one-line summary, used in error strings and logs.
    pub fn describe(&self) -> String {
        match self.key() {
            Some(key) => format!("{} {} {} (#{})", self.operation, self.entity_type, key, self.id),
            None => format!("{} {} (#{})", self.operation, self.entity_type, self.id),
        }
    }
}

/// A mutation parked after exhausting its retry budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub mutation: PendingMutation,
    /// Error from the final failed attempt.
    pub last_error: String,
    pub failed_at: DateTime<Utc>,
}

/// Extracts the identifying key from a payload.
///
/// Objects use their `id` field; bare strings and numbers are the key itself.
pub fn payload_key(payload: &Value) -> Option<String> {
    match payload {
        Value::Object(map) => map.get("id").and_then(scalar_key),
        other => scalar_key(other),
    }
}

fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
