// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};

use hydrant_core::LocalStore;

use crate::config::{get_db_path, init_work_dir};
use crate::error::Result;

pub fn run(remote: Option<String>, path: Option<String>) -> Result<()> {
    let target_path = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir()?,
    };
    let work_dir = run_impl(&target_path, remote.clone())?;

    println!("Initialized hydrant at {}", work_dir.display());
    match remote {
        Some(url) => println!("Remote: {}", url),
        None => println!("Remote: none (writes stay queued until one is configured)"),
    }
    Ok(())
}

/// Create the work directory and the local store inside it.
pub(crate) fn run_impl(target_path: &Path, remote: Option<String>) -> Result<PathBuf> {
    let work_dir = init_work_dir(target_path, remote)?;
    LocalStore::open(&get_db_path(&work_dir))?;
    Ok(work_dir)
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
