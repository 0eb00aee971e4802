// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! hydrant - offline-first mutation queue and sync engine.
//!
//! Writes made while the remote store is unreachable are recorded in a
//! durable local queue and replayed in order once connectivity returns.
//!
//! # Main Components
//!
//! - [`SyncService`] - write path, queue drain and pass notifications
//! - [`ConnectivityMonitor`](sync::ConnectivityMonitor) - online/offline signal with observers
//! - [`RemoteGateway`](sync::RemoteGateway) - the remote store seam, with a WebSocket implementation
//! - [`EntityCache`] - read-through cache of remote records
//! - [`Config`] - `.hydrant/config.toml`
//!
//! Storage and the data model live in `hydrant-core`.
//!
//! ```rust,ignore
//! use hydrant::sync::{ConnectivityMonitor, SyncService, WebSocketGateway};
//!
//! let gateway = Arc::new(WebSocketGateway::new("ws://host:7890", None));
//! let service = Arc::new(SyncService::new(store, ConnectivityMonitor::new(false), gateway));
//! let _auto = service.spawn_auto_sync();
//! service.write("checklist", Operation::Update, json!({"id": "c1", "porcentagem": 50})).await?;
//! ```

mod cli;
mod commands;

pub mod cache;
pub mod config;
pub mod env;
pub mod error;
pub mod sync;

pub use cache::EntityCache;
pub use cli::{
    CacheCommand, Cli, Command, DeadLetterCommand, OutputArgs, OutputFormat, QueueCommand,
    WriteArgs,
};
pub use config::{find_work_dir, get_db_path, get_log_path, init_work_dir, Config};
pub use error::{Error, Result};
pub use sync::SyncService;

use clap::CommandFactory;
use clap_complete::generate;

/// Execute a CLI command. This is the main entry point for library users
/// and provides a testable way to run commands without process execution.
pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Write(args) => commands::write::run(args),
        Command::Queue(cmd) => match cmd {
            QueueCommand::Add(args) => commands::queue::add(args),
            QueueCommand::List { output } => commands::queue::list(output.output),
            QueueCommand::Count => commands::queue::count(),
        },
        Command::DeadLetter(cmd) => match cmd {
            DeadLetterCommand::List { output } => commands::dead_letter::list(output.output),
            DeadLetterCommand::Retry { id } => commands::dead_letter::retry(&id),
            DeadLetterCommand::Purge { id } => commands::dead_letter::purge(&id),
        },
        Command::Cache(cmd) => match cmd {
            CacheCommand::Get { entity_type, key } => commands::cache::get(&entity_type, &key),
            CacheCommand::List { entity_type, output } => {
                commands::cache::list(&entity_type, output.output)
            }
            CacheCommand::Index { entity_type, name, field_path } => {
                commands::cache::index(&entity_type, &name, &field_path)
            }
            CacheCommand::Query { entity_type, index, eq, from, to, output } => {
                commands::cache::query(&entity_type, &index, eq, from, to, output.output)
            }
            CacheCommand::Refresh { entity_type } => commands::cache::refresh(&entity_type),
        },
        Command::Sync { output } => commands::sync::run(output.output),
        Command::Watch => commands::watch::run(),
        Command::Status { output } => commands::status::run(output.output),
        Command::Init { remote, path } => commands::init::run(remote, path),
        Command::Clear { force } => commands::clear::run(force),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "hydrant", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
