// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use hydrant_core::{MutationId, NewMutation, Operation};

use crate::cli::WriteArgs;
use crate::error::Result;
use crate::sync::WriteOutcome;

use super::{open_workspace, parse_payload, probe_once, runtime, Workspace};

/// Validate command-line write arguments into a mutation.
pub(crate) fn parse_args(args: &WriteArgs) -> Result<NewMutation> {
    let operation: Operation = args.operation.parse()?;
    let payload = parse_payload(operation, &args.payload)?;
    let mutation = NewMutation::new(args.entity_type.clone(), operation, payload);
    mutation.validate()?;
    Ok(mutation)
}

/// Queue a write and mirror it into the cache.
pub(crate) fn queue_impl(workspace: &Workspace, mutation: &NewMutation) -> Result<MutationId> {
    workspace.with_store(|s| {
        let id = s.enqueue(mutation)?;
        s.mirror_write(mutation, None)?;
        Ok(id)
    })
}

pub fn run(args: WriteArgs) -> Result<()> {
    let workspace = open_workspace()?;
    let mutation = parse_args(&args)?;

    let Some(remote) = workspace.config.remote.clone() else {
        let id = queue_impl(&workspace, &mutation)?;
        println!("Queued #{} (no remote configured)", id);
        return Ok(());
    };

    let service = workspace.service(&remote);
    let outcome = runtime()?.block_on(async {
        probe_once(service.monitor(), &remote).await;
        service.write(mutation.entity_type.clone(), mutation.operation, mutation.payload.clone()).await
    })?;

    match outcome {
        WriteOutcome::Applied => println!("Applied {}", describe(&mutation)),
        WriteOutcome::Queued(id) => println!("Queued #{} {} (remote unreachable)", id, describe(&mutation)),
    }
    Ok(())
}

fn describe(mutation: &NewMutation) -> String {
    match mutation.key() {
        Some(key) => format!("{} {} {}", mutation.operation, mutation.entity_type, key),
        None => format!("{} {}", mutation.operation, mutation.entity_type),
    }
}

#[cfg(test)]
#[path = "write_tests.rs"]
mod tests;
