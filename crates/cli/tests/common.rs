// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use futures_util::{SinkExt, StreamExt};
use hydrant::Config;
use hydrant_core::{GatewayRequest, GatewayResponse};
use tokio_tungstenite::tungstenite::Message;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

pub fn hydrant() -> Command {
    cargo_bin_cmd!("hydrant")
}

/// Helper to create an initialized temp directory in local-only mode
pub fn init_temp() -> TempDir {
    let temp = TempDir::new().unwrap();
    hydrant().arg("init").current_dir(temp.path()).assert().success();
    temp
}

/// Helper to create an initialized temp directory syncing with `url`
pub fn init_temp_remote(url: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    hydrant()
        .args(["init", "--remote", url])
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

/// Edit `.hydrant/config.toml` in place.
pub fn edit_config(temp: &TempDir, edit: impl FnOnce(&mut Config)) {
    let work_dir = temp.path().join(".hydrant");
    let mut config = Config::load(&work_dir).unwrap();
    edit(&mut config);
    config.save(&work_dir).unwrap();
}

/// A ws:// URL on a port nothing listens on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}

/// Queue a write through the CLI.
pub fn queue_add(temp: &TempDir, entity_type: &str, operation: &str, payload: &str) {
    hydrant()
        .args(["queue", "add", entity_type, operation, payload])
        .current_dir(temp.path())
        .assert()
        .success();
}

/// Number of pending mutations as reported by `queue count`.
pub fn queue_count(temp: &TempDir) -> usize {
    let output = hydrant().args(["queue", "count"]).current_dir(temp.path()).output().unwrap();
    String::from_utf8_lossy(&output.stdout).trim().parse().unwrap()
}

/// An in-process gateway answering every request with `handler`.
pub struct TestGateway {
    pub url: String,
    requests: Arc<Mutex<Vec<GatewayRequest>>>,
}

impl TestGateway {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&GatewayRequest) -> GatewayResponse + Send + Sync + 'static,
    {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);
        let handler = Arc::new(handler);

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                while let Ok((stream, _)) = listener.accept().await {
                    let handler = Arc::clone(&handler);
                    let log = Arc::clone(&log);
                    tokio::spawn(async move {
                        // Reachability probes connect and hang up without a handshake
                        let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                            return;
                        };
                        while let Some(Ok(msg)) = ws.next().await {
                            let Message::Text(text) = msg else { continue };
                            let request = GatewayRequest::from_json(&text).unwrap();
                            log.lock().unwrap().push(request.clone());
                            let response = handler(&request).to_json().unwrap();
                            if ws.send(Message::Text(response.into())).await.is_err() {
                                break;
                            }
                        }
                    });
                }
            });
        });

        TestGateway { url, requests }
    }

    /// A gateway that accepts every write.
    pub fn accepting() -> Self {
        Self::start(|request| GatewayResponse::ok(request.request_id(), None))
    }

    pub fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Keys of the write requests received, in order.
    pub fn written_keys(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|request| match request {
                GatewayRequest::Update { key, .. } | GatewayRequest::Delete { key, .. } => {
                    Some(key.clone())
                }
                GatewayRequest::Create { payload, .. } => {
                    payload.get("id").and_then(|v| v.as_str()).map(str::to_string)
                }
                _ => None,
            })
            .collect()
    }
}
