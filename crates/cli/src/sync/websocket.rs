// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket gateway using tokio-tungstenite.
//!
//! One request is in flight at a time. The connection is opened lazily on
//! the first request and dropped after any transport failure or timeout, so
//! a late response can never be matched to a later request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use hydrant_core::protocol::{GatewayRequest, GatewayResponse};
use hydrant_core::MutationId;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use super::gateway::{GatewayFuture, RemoteError, RemoteGateway};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct WebSocketConnection {
    sink: SplitSink<Socket, Message>,
    stream: SplitStream<Socket>,
}

/// Gateway speaking the JSON protocol over a WebSocket.
pub struct WebSocketGateway {
    url: String,
    request_timeout: Option<Duration>,
    next_id: AtomicU64,
    connection: Mutex<Option<WebSocketConnection>>,
}

impl WebSocketGateway {
    /// `request_timeout` of `None` waits for responses indefinitely.
    pub fn new(url: impl Into<String>, request_timeout: Option<Duration>) -> Self {
        WebSocketGateway {
            url: url.into(),
            request_timeout,
            next_id: AtomicU64::new(1),
            connection: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// Round-trip a keepalive.
    pub async fn ping(&self) -> Result<(), RemoteError> {
        match self.request(GatewayRequest::ping).await? {
            GatewayResponse::Pong { .. } => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Close the connection, if open.
    pub async fn disconnect(&self) {
        if let Some(mut ws) = self.connection.lock().await.take() {
            let _ = ws.sink.close().await;
        }
    }

    /// Send one request and wait for its response.
    ///
    /// Server-side `rejected` and `error` answers become [`RemoteError`]s.
    async fn request(
        &self,
        build: impl FnOnce(u64) -> GatewayRequest,
    ) -> Result<GatewayResponse, RemoteError> {
        let request = build(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut slot = self.connection.lock().await;

        let result = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, exchange(&mut slot, &self.url, &request))
                .await
                .unwrap_or(Err(RemoteError::Timeout(limit))),
            None => exchange(&mut slot, &self.url, &request).await,
        };

        match result {
            Ok(GatewayResponse::Rejected { message, .. }) => Err(RemoteError::Rejected(message)),
            Ok(GatewayResponse::Error { message, .. }) => Err(RemoteError::Server(message)),
            Ok(response) => Ok(response),
            Err(e) => {
                debug!(error = %e, "dropping gateway connection");
                *slot = None;
                Err(e)
            }
        }
    }
}

fn unexpected(response: &GatewayResponse) -> RemoteError {
    RemoteError::Protocol(format!("unexpected response: {response:?}"))
}

async fn connect(url: &str) -> Result<WebSocketConnection, RemoteError> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| RemoteError::Unreachable(e.to_string()))?;
    let (sink, stream) = ws_stream.split();
    debug!(url, "connected to gateway");
    Ok(WebSocketConnection { sink, stream })
}

/// Write `request` and read frames until its response arrives.
async fn exchange(
    slot: &mut Option<WebSocketConnection>,
    url: &str,
    request: &GatewayRequest,
) -> Result<GatewayResponse, RemoteError> {
    if slot.is_none() {
        *slot = Some(connect(url).await?);
    }
    let ws = slot.as_mut().ok_or_else(|| RemoteError::Unreachable("not connected".into()))?;

    let json = request.to_json().map_err(|e| RemoteError::Protocol(e.to_string()))?;
    ws.sink
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| RemoteError::Unreachable(e.to_string()))?;

    let wanted = request.request_id();
    loop {
        match ws.stream.next().await {
            Some(Ok(Message::Text(text))) => {
                let response = GatewayResponse::from_json(&text)
                    .map_err(|e| RemoteError::Protocol(e.to_string()))?;
                match response.request_id() {
                    Some(id) if id == wanted => return Ok(response),
                    Some(id) => trace!(id, wanted, "ignoring stale response"),
                    None => {
                        let message = match response {
                            GatewayResponse::Error { message, .. } => message,
                            other => format!("{other:?}"),
                        };
                        return Err(RemoteError::Server(message));
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(RemoteError::Unreachable("connection closed".into()));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(RemoteError::Unreachable(e.to_string())),
        }
    }
}

impl RemoteGateway for WebSocketGateway {
    fn create<'a>(
        &'a self,
        entity_type: &'a str,
        payload: &'a Value,
        origin: Option<MutationId>,
    ) -> GatewayFuture<'a, Option<Value>> {
        Box::pin(async move {
            let response = self
                .request(|id| GatewayRequest::create(id, entity_type, payload.clone(), origin))
                .await?;
            match response {
                GatewayResponse::Ok { record, .. } => Ok(record),
                other => Err(unexpected(&other)),
            }
        })
    }

    fn update<'a>(
        &'a self,
        entity_type: &'a str,
        key: &'a str,
        payload: &'a Value,
        origin: Option<MutationId>,
    ) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            let response = self
                .request(|id| GatewayRequest::update(id, entity_type, key, payload.clone(), origin))
                .await?;
            match response {
                GatewayResponse::Ok { .. } => Ok(()),
                other => Err(unexpected(&other)),
            }
        })
    }

    fn delete<'a>(
        &'a self,
        entity_type: &'a str,
        key: &'a str,
        origin: Option<MutationId>,
    ) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            let response =
                self.request(|id| GatewayRequest::delete(id, entity_type, key, origin)).await?;
            match response {
                GatewayResponse::Ok { .. } => Ok(()),
                other => Err(unexpected(&other)),
            }
        })
    }

    fn fetch_since<'a>(
        &'a self,
        entity_type: &'a str,
        since: Option<DateTime<Utc>>,
    ) -> GatewayFuture<'a, Vec<Value>> {
        Box::pin(async move {
            let response =
                self.request(|id| GatewayRequest::fetch_since(id, entity_type, since)).await?;
            match response {
                GatewayResponse::Records { records, .. } => Ok(records),
                other => Err(unexpected(&other)),
            }
        })
    }
}

#[cfg(test)]
#[path = "websocket_tests.rs"]
mod tests;
