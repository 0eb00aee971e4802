// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use hydrant_core::{DeadLetter, MutationId};

use crate::cli::OutputFormat;
use crate::error::{Error, Result};

use super::queue::format_mutation;
use super::{open_workspace, print_json, Workspace};

pub fn list(output: OutputFormat) -> Result<()> {
    let workspace = open_workspace()?;
    list_impl(&workspace, output)
}

pub(crate) fn list_impl(workspace: &Workspace, output: OutputFormat) -> Result<()> {
    let letters = workspace.with_store(|s| s.dead_letters())?;
    match output {
        OutputFormat::Json => print_json(&letters)?,
        OutputFormat::Text if letters.is_empty() => println!("No dead letters"),
        OutputFormat::Text => {
            for letter in &letters {
                println!("{}", format_dead_letter(letter));
            }
        }
    }
    Ok(())
}

pub fn retry(id: &str) -> Result<()> {
    let workspace = open_workspace()?;
    let id = retry_impl(&workspace, id)?;
    println!("Requeued #{}", id);
    Ok(())
}

pub(crate) fn retry_impl(workspace: &Workspace, id: &str) -> Result<MutationId> {
    let id: MutationId = id.parse()?;
    if workspace.with_store(|s| s.requeue_dead_letter(id))? {
        Ok(id)
    } else {
        Err(Error::DeadLetterNotFound(id))
    }
}

pub fn purge(id: &str) -> Result<()> {
    let workspace = open_workspace()?;
    let id = purge_impl(&workspace, id)?;
    println!("Purged #{}", id);
    Ok(())
}

pub(crate) fn purge_impl(workspace: &Workspace, id: &str) -> Result<MutationId> {
    let id: MutationId = id.parse()?;
    if workspace.with_store(|s| s.purge_dead_letter(id))? {
        Ok(id)
    } else {
        Err(Error::DeadLetterNotFound(id))
    }
}

pub(crate) fn format_dead_letter(letter: &DeadLetter) -> String {
    format!(
        "{}\n       failed {}: {}",
        format_mutation(&letter.mutation),
        letter.failed_at.format("%Y-%m-%d %H:%M:%S"),
        letter.last_error
    )
}

#[cfg(test)]
#[path = "dead_letter_tests.rs"]
mod tests;
