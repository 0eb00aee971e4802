// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tracing::warn;

use crate::error::{Error, Result};

use super::{open_workspace, Workspace};

pub fn run(force: bool) -> Result<()> {
    let workspace = open_workspace()?;
    let dropped = run_impl(&workspace, force)?;
    if dropped > 0 {
        println!("Cleared local data ({} pending mutation(s) discarded)", dropped);
    } else {
        println!("Cleared local data");
    }
    Ok(())
}

/// Clear everything; returns how many queued mutations were discarded.
pub(crate) fn run_impl(workspace: &Workspace, force: bool) -> Result<usize> {
    if !force {
        return Err(Error::ForceRequired);
    }
    let pending = workspace.with_store(|s| {
        let pending = s.pending_count()?;
        s.clear_all()?;
        Ok(pending)
    })?;
    warn!(pending, "cleared all local data");
    Ok(pending)
}

#[cfg(test)]
#[path = "clear_tests.rs"]
mod tests;
