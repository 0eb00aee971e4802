// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Clone, Copy, Debug, Default)]
pub struct OutputArgs {
    /// Output format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

// Custom help template that groups commands into sections
const HELP_TEMPLATE: &str = "{about-with-newline}
{usage-heading} {usage}

{before-help}Options:
{options}{after-help}";

const COMMANDS_HELP: &str = "\
Writes & Queue:
  write        Apply a write now, or queue it if the remote is unreachable
  queue        Inspect or add to the pending mutation queue
  dead-letter  Inspect, retry or purge parked mutations
  cache        Read, index and refresh cached records

Sync:
  sync         Run one sync pass against the remote
  watch        Sync automatically whenever the remote becomes reachable
  status       Show queue, dead-letter and last-sync state

Setup:
  init         Create a .hydrant/ directory
  clear        Clear all local data
  completions  Generate shell completions
";

const QUICKSTART_HELP: &str = "
Get started:
  hydrant init --remote ws://host:7890
  hydrant queue add checklist update '{\"id\":\"c1\",\"porcentagem\":50}'
  hydrant sync";

#[derive(Parser)]
#[command(name = "hydrant", version)]
#[command(about = "Offline-first mutation queue and sync engine")]
#[command(
    long_about = "Offline-first mutation queue and sync engine.\n\n\
    Writes made while the remote store is unreachable are kept in a durable local queue\n\
    and replayed in order once connectivity returns."
)]
#[command(help_template = HELP_TEMPLATE)]
#[command(before_help = COMMANDS_HELP)]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Run as if hydrant was started in <path>
    #[arg(short = 'C', long = "directory", global = true, value_name = "path")]
    pub directory: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    // ─────────────────────────────────────────────────────────────────────────
    // Writes & Queue
    // ─────────────────────────────────────────────────────────────────────────
    /// Apply a write to the remote, queueing it if the remote is unreachable
    #[command(after_help = "Examples:\n  \
        hydrant write checklist update '{\"id\":\"c1\",\"porcentagem\":50}'\n  \
        hydrant write materials delete '\"m7\"'")]
    Write(WriteArgs),

    /// Pending mutation queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Mutations parked after exhausting their retries
    #[command(subcommand)]
    DeadLetter(DeadLetterCommand),

    /// Cached entity records
    #[command(subcommand)]
    Cache(CacheCommand),

    // ─────────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────────
    /// Probe the remote and run one sync pass
    #[command(after_help = "Exits non-zero when the remote is unreachable or any mutation failed.")]
    Sync {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Sync automatically whenever the remote becomes reachable (until Ctrl-C)
    Watch,

    /// Show pending count, dead letters, last sync time and remote
    Status {
        #[command(flatten)]
        output: OutputArgs,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Setup
    // ─────────────────────────────────────────────────────────────────────────
    /// Create a .hydrant/ directory in the current directory (or specified path)
    #[command(after_help = "Examples:\n  \
        hydrant init                            Local-only: writes are always queued\n  \
        hydrant init --remote ws://host:7890    Sync against a WebSocket gateway")]
    Init {
        /// Remote gateway URL (ws:// or wss://)
        #[arg(long)]
        remote: Option<String>,

        /// Path to initialize (defaults to current directory)
        #[arg(long)]
        path: Option<String>,
    },

    /// Clear all local data: cache, queue, dead letters and sync metadata
    Clear {
        /// Required; pending mutations are lost
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    #[command(after_help = "Examples:\n  \
        hydrant completions bash > ~/.local/share/bash-completion/completions/hydrant\n  \
        hydrant completions zsh > ~/.zfunc/_hydrant")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Clone, Debug)]
pub struct WriteArgs {
    /// Remote collection (e.g. checklist, materials)
    pub entity_type: String,

    /// add, update or delete
    pub operation: String,

    /// JSON payload: the full record for add/update, the key for delete
    pub payload: String,
}

/// Queue commands.
#[derive(Subcommand)]
pub enum QueueCommand {
    /// Queue a write without contacting the remote
    Add(WriteArgs),
    /// List pending mutations in replay order
    List {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the number of pending mutations
    Count,
}

/// Dead-letter commands.
#[derive(Subcommand)]
pub enum DeadLetterCommand {
    /// List dead letters
    List {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Move a dead letter back to the tail of the queue with its retries reset
    Retry {
        /// Mutation id
        id: String,
    },
    /// Discard a dead letter
    Purge {
        /// Mutation id
        id: String,
    },
}

/// Cache commands.
#[derive(Subcommand)]
pub enum CacheCommand {
    /// Print one cached record
    Get { entity_type: String, key: String },

    /// List every cached record of a type
    List {
        entity_type: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Define a secondary index over a dot-separated field path
    #[command(after_help = "Examples:\n  \
        hydrant cache index incidents by_date date\n  \
        hydrant cache index checklist_items by_checklist checklist.id")]
    Index {
        entity_type: String,
        name: String,
        field_path: String,
    },

    /// Query cached records through an index
    #[command(after_help = "Values are parsed as JSON when possible, otherwise taken as strings.\n\n\
        Examples:\n  \
        hydrant cache query incidents by_date --eq 2024-03-01\n  \
        hydrant cache query incidents by_date --from 2024-03-01 --to 2024-03-31")]
    Query {
        entity_type: String,
        index: String,

        /// Exact match
        #[arg(long, conflicts_with_all = ["from", "to"])]
        eq: Option<String>,

        /// Inclusive lower bound
        #[arg(long)]
        from: Option<String>,

        /// Inclusive upper bound
        #[arg(long)]
        to: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Pull records changed since the last sync from the remote
    Refresh { entity_type: String },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
