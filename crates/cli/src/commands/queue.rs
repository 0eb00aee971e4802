// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use hydrant_core::PendingMutation;

use crate::cli::{OutputFormat, WriteArgs};
use crate::error::Result;

use super::write::{parse_args, queue_impl};
use super::{open_workspace, print_json, Workspace};

pub fn add(args: WriteArgs) -> Result<()> {
    let workspace = open_workspace()?;
    let mutation = parse_args(&args)?;
    let id = queue_impl(&workspace, &mutation)?;
    println!("Queued #{}", id);
    Ok(())
}

pub fn list(output: OutputFormat) -> Result<()> {
    let workspace = open_workspace()?;
    list_impl(&workspace, output)
}

pub(crate) fn list_impl(workspace: &Workspace, output: OutputFormat) -> Result<()> {
    let pending = workspace.with_store(|s| s.pending_mutations())?;
    match output {
        OutputFormat::Json => print_json(&pending)?,
        OutputFormat::Text if pending.is_empty() => println!("Queue is empty"),
        OutputFormat::Text => {
            for mutation in &pending {
                println!("{}", format_mutation(mutation));
            }
        }
    }
    Ok(())
}

pub fn count() -> Result<()> {
    let workspace = open_workspace()?;
    println!("{}", workspace.with_store(|s| s.pending_count())?);
    Ok(())
}

/// One line per queued mutation, in replay order.
pub(crate) fn format_mutation(mutation: &PendingMutation) -> String {
    let key = mutation.key().unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "#{:<5} {}  {:<6} {} {}",
        mutation.id.0,
        mutation.created_at.format("%Y-%m-%d %H:%M:%S"),
        mutation.operation.as_str(),
        mutation.entity_type,
        key
    );
    if mutation.retries > 0 {
        line.push_str(&format!("  (retries: {})", mutation.retries));
    }
    line
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
