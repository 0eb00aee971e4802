// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::OutputFormat;
use crate::error::{Error, Result};
use crate::sync::{SkipReason, SyncReport};

use super::{open_workspace, print_json, probe_once, runtime, Workspace};

pub fn run(output: OutputFormat) -> Result<()> {
    let workspace = open_workspace()?;
    let report = run_impl(&workspace)?;

    match output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            if report.skipped.is_none() {
                println!("{}", format_report(&report));
            }
        }
    }
    report_status(&report)
}

/// One pass under the drain lock, so it never overlaps a running `watch`.
pub(crate) fn run_impl(workspace: &Workspace) -> Result<SyncReport> {
    let remote = workspace.remote()?.clone();
    let _lock = workspace.lock_drain()?;
    let service = workspace.service(&remote);

    runtime()?.block_on(async {
        probe_once(service.monitor(), &remote).await;
        service.try_sync().await
    })
}

/// Summary of a pass that ran, with one indented line per failure.
pub(crate) fn format_report(report: &SyncReport) -> String {
    let mut out = format!("Synced {} mutation(s)", report.synced_items);
    if !report.errors.is_empty() {
        out.push_str(&format!(", {} failed", report.errors.len()));
    }
    if report.deferred_items > 0 {
        out.push_str(&format!(", {} deferred", report.deferred_items));
    }
    if report.dead_lettered > 0 {
        out.push_str(&format!(", {} dead-lettered", report.dead_lettered));
    }
    out.push_str(&format!("; {} remaining", report.remaining_items));
    for error in &report.errors {
        out.push_str("\n  ");
        out.push_str(error);
    }
    out
}

/// Map a report to the command's exit status.
pub(crate) fn report_status(report: &SyncReport) -> Result<()> {
    match report.skipped {
        Some(SkipReason::Offline) => Err(Error::Offline),
        Some(SkipReason::InProgress) => Err(Error::SyncInProgress),
        None if !report.success => Err(Error::SyncIncomplete {
            failed: report.error_count(),
            remaining: report.remaining_items,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
