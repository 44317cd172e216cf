//! CLI argument parsing for unlatch.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Unlatch: find the processes holding a file open, release them, and
/// force-delete the path.
///
/// Destructive commands are dry runs unless `--yes` is given.
#[derive(Parser, Debug)]
#[command(name = "unlatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML configuration file. Defaults are used when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Handle-enumeration tool to run, overriding the configuration.
    #[arg(long, global = true, value_name = "PATH")]
    pub tool: Option<String>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for unlatch.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the processes holding a file or directory open.
    Probe(ProbeArgs),

    /// Release the locks on a path without deleting it.
    ///
    /// Probes first, then terminates the owners that are not critical and
    /// tries the alternative unlock strategies.
    Unlock(UnlockArgs),

    /// Delete a path through the full deletion cascade.
    Delete(DeleteArgs),

    /// Probe, unlock, wait for release and delete.
    #[command(alias = "nuke")]
    Purge(PurgeArgs),

    /// Translate a technical error message into a user-facing one.
    Explain(ExplainArgs),
}

/// Arguments for the `probe` command.
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// File or directory to inspect.
    pub path: PathBuf,

    /// Print the owners as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `unlock` command.
#[derive(Parser, Debug)]
pub struct UnlockArgs {
    /// File or directory to release.
    pub path: PathBuf,

    /// Perform the unlock instead of listing the planned actions.
    #[arg(long)]
    pub yes: bool,
}

/// Arguments for the `delete` command.
#[derive(Parser, Debug)]
pub struct DeleteArgs {
    /// File or directory to delete.
    pub path: PathBuf,

    /// Perform the deletion instead of a dry run.
    #[arg(long)]
    pub yes: bool,
}

/// Arguments for the `purge` command.
#[derive(Parser, Debug)]
pub struct PurgeArgs {
    /// File or directory to release and delete.
    pub path: PathBuf,

    /// Perform the purge instead of listing the planned actions.
    #[arg(long)]
    pub yes: bool,
}

/// Arguments for the `explain` command.
#[derive(Parser, Debug)]
pub struct ExplainArgs {
    /// Raw error text, e.g. copied from a failed `del`.
    #[arg(required = true, num_args = 1..)]
    pub message: Vec<String>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
