// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages between the client and the remote gateway.
//!
//! Every request carries a client-chosen `request_id` that the server echoes
//! in exactly one response. Writes replayed from the queue also carry the
//! originating `mutation_id`; a server may use it to drop duplicates, but the
//! client never relies on that.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mutation::MutationId;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayRequest {
    /// Insert a new record.
    Create {
        request_id: u64,
        entity_type: String,
        payload: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mutation_id: Option<MutationId>,
    },

    /// Overwrite an existing record.
    Update {
        request_id: u64,
        entity_type: String,
        key: String,
        payload: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mutation_id: Option<MutationId>,
    },

    /// Remove a record.
    Delete {
        request_id: u64,
        entity_type: String,
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mutation_id: Option<MutationId>,
    },

    /// Request records modified after `since` (all records when absent).
    FetchSince {
        request_id: u64,
        entity_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        since: Option<DateTime<Utc>>,
    },

    /// Keepalive.
    Ping { request_id: u64 },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayResponse {
    /// The write was applied. Creates may echo the stored record.
    Ok {
        request_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        record: Option<Value>,
    },

    /// Response to a FetchSince request.
    Records { request_id: u64, records: Vec<Value> },

    /// The server refused the request (validation, permissions, missing record).
    Rejected { request_id: u64, message: String },

    /// The server failed while handling a request, or the connection as a whole.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<u64>,
        message: String,
    },

    /// Response to Ping.
    Pong { request_id: u64 },
}

impl GatewayRequest {
    pub fn create(
        request_id: u64,
        entity_type: impl Into<String>,
        payload: Value,
        mutation_id: Option<MutationId>,
    ) -> Self {
        GatewayRequest::Create { request_id, entity_type: entity_type.into(), payload, mutation_id }
    }

    pub fn update(
        request_id: u64,
        entity_type: impl Into<String>,
        key: impl Into<String>,
        payload: Value,
        mutation_id: Option<MutationId>,
    ) -> Self {
        GatewayRequest::Update {
            request_id,
            entity_type: entity_type.into(),
            key: key.into(),
            payload,
            mutation_id,
        }
    }

    pub fn delete(
        request_id: u64,
        entity_type: impl Into<String>,
        key: impl Into<String>,
        mutation_id: Option<MutationId>,
    ) -> Self {
        GatewayRequest::Delete {
            request_id,
            entity_type: entity_type.into(),
            key: key.into(),
            mutation_id,
        }
    }

    pub fn fetch_since(
        request_id: u64,
        entity_type: impl Into<String>,
        since: Option<DateTime<Utc>>,
    ) -> Self {
        GatewayRequest::FetchSince { request_id, entity_type: entity_type.into(), since }
    }

    pub fn ping(request_id: u64) -> Self {
        GatewayRequest::Ping { request_id }
    }

    /// The id the matching response will carry.
    pub fn request_id(&self) -> u64 {
        match self {
            GatewayRequest::Create { request_id, .. }
            | GatewayRequest::Update { request_id, .. }
            | GatewayRequest::Delete { request_id, .. }
            | GatewayRequest::FetchSince { request_id, .. }
            | GatewayRequest::Ping { request_id } => *request_id,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl GatewayResponse {
    pub fn ok(request_id: u64, record: Option<Value>) -> Self {
        GatewayResponse::Ok { request_id, record }
    }

    pub fn records(request_id: u64, records: Vec<Value>) -> Self {
        GatewayResponse::Records { request_id, records }
    }

    pub fn rejected(request_id: u64, message: impl Into<String>) -> Self {
        GatewayResponse::Rejected { request_id, message: message.into() }
    }

    pub fn error(request_id: Option<u64>, message: impl Into<String>) -> Self {
        GatewayResponse::Error { request_id, message: message.into() }
    }

    pub fn pong(request_id: u64) -> Self {
        GatewayResponse::Pong { request_id }
    }

    /// The request this response answers; `None` for connection-level errors.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            GatewayResponse::Ok { request_id, .. }
            | GatewayResponse::Records { request_id, .. }
            | GatewayResponse::Rejected { request_id, .. }
            | GatewayResponse::Pong { request_id } => Some(*request_id),
            GatewayResponse::Error { request_id, .. } => *request_id,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
