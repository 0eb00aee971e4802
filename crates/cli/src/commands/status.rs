// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::Result;

use super::{open_workspace, print_json, Workspace};

/// Local sync state. Does not contact the remote.
#[derive(Debug, Serialize)]
pub struct Status {
    pub pending: usize,
    pub dead_letters: usize,
    pub last_sync: Option<DateTime<Utc>>,
    pub remote: Option<String>,
    pub collections: Vec<String>,
}

pub fn run(output: OutputFormat) -> Result<()> {
    let workspace = open_workspace()?;
    let status = status_impl(&workspace)?;
    match output {
        OutputFormat::Json => print_json(&status),
        OutputFormat::Text => {
            println!("{}", format_status(&status));
            Ok(())
        }
    }
}

pub(crate) fn status_impl(workspace: &Workspace) -> Result<Status> {
    let (pending, dead_letters, last_sync, collections) = workspace.with_store(|s| {
        Ok((s.pending_count()?, s.dead_letter_count()?, s.last_sync_timestamp()?, s.collections()?))
    })?;
    Ok(Status {
        pending,
        dead_letters,
        last_sync,
        remote: workspace.config.remote_url().map(str::to_string),
        collections,
    })
}

pub(crate) fn format_status(status: &Status) -> String {
    let remote = status.remote.as_deref().unwrap_or("none (local only)");
    let last_sync = match status.last_sync {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "never".to_string(),
    };
    let mut out = format!(
        "Remote:       {}\nPending:      {}\nDead letters: {}\nLast sync:    {}",
        remote, status.pending, status.dead_letters, last_sync
    );
    if !status.collections.is_empty() {
        out.push_str(&format!("\nCached:       {}", status.collections.join(", ")));
    }
    out
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
