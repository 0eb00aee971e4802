// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::fs;

use clap::Parser;
use hydrant::{env, find_work_dir, get_log_path, Cli, Command};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    if let Some(dir) = &cli.directory {
        if let Err(e) = std::env::set_current_dir(dir) {
            eprintln!("error: cannot change to directory '{}': {}", dir, e);
            std::process::exit(1);
        }
    }

    setup_logging(matches!(cli.command, Command::Watch));

    if let Err(e) = hydrant::run(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

/// Install the tracing subscriber.
///
/// `watch` logs at `info` into `.hydrant/watch.log` when it can be opened;
/// every other command logs `warn` and above to stderr.
fn setup_logging(watch: bool) {
    let default = if watch { "info" } else { "warn" };
    let filter = env::log_filter()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    let log_file = watch
        .then(|| find_work_dir().ok())
        .flatten()
        .and_then(|work_dir| {
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(get_log_path(&work_dir))
                .ok()
        });

    if let Some(file) = log_file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
