// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Project configuration management.
//!
//! Configuration is stored in `.hydrant/config.toml`:
//! - `[remote]`: the gateway to sync with (absent = local-only mode)
//! - `[sync]`: retry and replay tuning for the sync orchestrator

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::sync::RetryPolicy;

const WORK_DIR_NAME: &str = ".hydrant";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "local.db";
const LOCK_FILE_NAME: &str = "watch.lock";
const LOG_FILE_NAME: &str = "watch.log";

/// Project configuration stored in `.hydrant/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote gateway configuration (optional - if absent, runs in local-only mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
    /// Sync orchestrator tuning.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Remote gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// WebSocket URL of the gateway (`ws://...` or `wss://...`).
    pub url: String,
    /// How often the reachability probe runs, in milliseconds (default: 5000).
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    /// Max time a single probe may take, in milliseconds (default: 2000).
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Max time to wait for a gateway response in seconds (default: 30). 0 = no limit.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Sync orchestrator tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Failed replays before a mutation is dead-lettered. Absent = retry forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// First backoff delay after a failed pass, in milliseconds (default: 1000).
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    /// Backoff ceiling in seconds (default: 60).
    #[serde(default = "default_retry_max_delay_secs")]
    pub retry_max_delay_secs: u64,
    /// Artificial delay before each replayed mutation, in milliseconds (default: 0).
    #[serde(default)]
    pub replay_delay_ms: u64,
}

fn default_probe_interval_ms() -> u64 {
    5_000
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_retry_initial_delay_ms() -> u64 {
    1_000
}

fn default_retry_max_delay_secs() -> u64 {
    60
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            max_retries: None,
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_secs: default_retry_max_delay_secs(),
            replay_delay_ms: 0,
        }
    }
}

impl SyncConfig {
    /// The retry policy these settings describe.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_secs(self.retry_max_delay_secs),
        }
    }

    pub fn replay_delay(&self) -> Option<Duration> {
        (self.replay_delay_ms > 0).then(|| Duration::from_millis(self.replay_delay_ms))
    }
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>) -> Self {
        RemoteConfig {
            url: url.into(),
            probe_interval_ms: default_probe_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Validates that the URL is a WebSocket URL.
    ///
    /// Returns an error message if the URL is invalid.
    pub fn validate_url(&self) -> Option<String> {
        let rest = self
            .url
            .strip_prefix("ws://")
            .or_else(|| self.url.strip_prefix("wss://"));
        match rest {
            Some(host) if !host.is_empty() && !host.starts_with('/') => None,
            Some(_) => Some(format!("invalid remote URL '{}': missing host", self.url)),
            None => Some(format!(
                "invalid remote URL '{}': must start with ws:// or wss://",
                self.url
            )),
        }
    }

    /// The `host:port` the reachability probe connects to.
    ///
    /// Falls back to port 80 for `ws://` and 443 for `wss://`.
    pub fn probe_address(&self) -> Option<String> {
        let (rest, default_port) = if let Some(rest) = self.url.strip_prefix("wss://") {
            (rest, 443)
        } else {
            (self.url.strip_prefix("ws://")?, 80)
        };
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let authority = authority.rsplit('@').next().unwrap_or(authority);
        if authority.is_empty() {
            return None;
        }
        let has_port = match authority.rfind(':') {
            // IPv6 literals carry colons inside brackets
            Some(idx) => !authority[idx..].contains(']'),
            None => false,
        };
        Some(if has_port { authority.to_string() } else { format!("{authority}:{default_port}") })
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Per-request gateway timeout; `None` means wait indefinitely.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

impl Config {
    /// Creates a config, validating the remote URL if one is given.
    pub fn new(remote_url: Option<String>) -> Result<Self> {
        let remote = remote_url.map(RemoteConfig::new);
        if let Some(msg) = remote.as_ref().and_then(RemoteConfig::validate_url) {
            return Err(Error::Config(msg));
        }
        Ok(Config { remote, sync: SyncConfig::default() })
    }

    /// Loads configuration from the given `.hydrant/` directory.
    pub fn load(work_dir: &Path) -> Result<Self> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        if let Some(msg) = config.remote.as_ref().and_then(RemoteConfig::validate_url) {
            return Err(Error::Config(msg));
        }
        Ok(config)
    }

    /// Returns the remote URL if configured.
    pub fn remote_url(&self) -> Option<&str> {
        self.remote.as_ref().map(|r| r.url.as_str())
    }

    /// Saves configuration to the given `.hydrant/` directory.
    pub fn save(&self, work_dir: &Path) -> Result<()> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&config_path, content)?;
        Ok(())
    }
}

/// Find the .hydrant directory by walking up from the current directory
pub fn find_work_dir() -> Result<PathBuf> {
    let mut current = std::env::current_dir()?;
    loop {
        let work_dir = current.join(WORK_DIR_NAME);
        if work_dir.is_dir() {
            return Ok(work_dir);
        }
        if !current.pop() {
            return Err(Error::NotInitialized);
        }
    }
}

pub fn get_db_path(work_dir: &Path) -> PathBuf {
    work_dir.join(DB_FILE_NAME)
}

pub fn get_lock_path(work_dir: &Path) -> PathBuf {
    work_dir.join(LOCK_FILE_NAME)
}

pub fn get_log_path(work_dir: &Path) -> PathBuf {
    work_dir.join(LOG_FILE_NAME)
}

/// Initialize a new .hydrant directory at the given path
pub fn init_work_dir(path: &Path, remote_url: Option<String>) -> Result<PathBuf> {
    let work_dir = path.join(WORK_DIR_NAME);

    if work_dir.exists() {
        return Err(Error::AlreadyInitialized(work_dir.display().to_string()));
    }

    let config = Config::new(remote_url)?;
    fs::create_dir_all(&work_dir)?;
    config.save(&work_dir)?;

    Ok(work_dir)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
