//! Command implementations for unlatch.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the helpers the handlers share: engine
//! construction, the stderr progress printer and the owner plan.

mod delete;
mod explain;
mod probe;
mod purge;
mod unlock;


use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::model::{LockOwner, ProgressFn, ProgressReport};
use std::path::Path;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        config,
        tool,
        command,
        ..
    } = cli;
    let engine = || build_engine(config.as_deref(), tool);

    match command {
        Command::Probe(args) => probe::cmd_probe(&engine()?, args),
        Command::Unlock(args) => unlock::cmd_unlock(&engine()?, args),
        Command::Delete(args) => delete::cmd_delete(&engine()?, args),
        Command::Purge(args) => purge::cmd_purge(&engine()?, args),
        Command::Explain(args) => explain::cmd_explain(args),
    }
}

/// Load the configuration, apply command-line overrides and start an engine
/// on the real operating system.
fn build_engine(config_path: Option<&Path>, tool: Option<String>) -> Result<Engine> {
    let config = load_config(config_path, tool)?;
    Ok(Engine::native(config))
}

fn load_config(config_path: Option<&Path>, tool: Option<String>) -> Result<Config> {
    let mut config = Config::load_or_default(config_path)?;
    if let Some(tool) = tool {
        config.tool_path = tool;
        config.validate()?;
    }
    Ok(config)
}

/// Progress printer for long-running commands. Never requests cancellation.
fn stderr_progress(label: &'static str) -> ProgressFn {
    Box::new(move |report: ProgressReport| {
        match report.percent() {
            Some(percent) => eprint!(
                "\r{}: {}/{} ({}%)",
                label, report.current, report.total, percent
            ),
            None => eprint!("\r{}: {}", label, report.current),
        }
        if !report.is_indeterminate() && report.current >= report.total {
            eprintln!();
        }
        true
    })
}

/// One line per owner describing what an unlock would do to it.
fn planned_actions(engine: &Engine, owners: &[LockOwner]) -> Vec<String> {
    owners
        .iter()
        .map(|owner| {
            let action = if owner.is_placeholder() {
                "try alternative unlock strategies"
            } else if engine.is_critical(owner) {
                "skip (critical process), try alternative unlock strategies"
            } else {
                "terminate"
            };
            format!(
                "{} on {}: {}",
                owner.label(),
                owner.file_path.display(),
                action
            )
        })
        .collect()
}

fn print_owners(path: &Path, owners: &[LockOwner]) {
    if owners.is_empty() {
        println!("No process holds {} open.", path.display());
        return;
    }

    println!("Lock owners of {} ({}):", path.display(), owners.len());
    for owner in owners {
        println!("  - {}  {}", owner.label(), owner.file_path.display());
    }
}

fn print_dry_run(flag_hint: &str) {
    println!();
    println!("Dry-run mode: no changes made.");
    println!("Run with --yes to {}.", flag_hint);
}
