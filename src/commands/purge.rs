//! Implementation of the `unlatch purge` command.
//!
//! Probe, unlock, wait for release and delete in one go. Without `--yes`
//! only the plan is printed.

use super::{planned_actions, print_dry_run, stderr_progress};
use crate::cli::PurgeArgs;
use crate::engine::Engine;
use crate::error::{Result, UnlatchError};
use crate::host::PathKind;

pub fn cmd_purge(engine: &Engine, args: PurgeArgs) -> Result<()> {
    if PathKind::of(&args.path).is_none() {
        return Err(UnlatchError::PathNotFound(args.path));
    }

    let owners = engine
        .spawn_probe(args.path.clone(), Some(stderr_progress("Scanning")))
        .join()??;

    println!("Purge plan for {}:", args.path.display());
    if owners.is_empty() {
        println!("  - no lock owners found");
    }
    for line in planned_actions(engine, &owners) {
        println!("  - {}", line);
    }
    println!("  - delete {}", args.path.display());

    if !args.yes {
        print_dry_run("release and delete it");
        return Ok(());
    }

    let message = engine
        .spawn_unlock_and_delete(args.path.clone(), owners, Some(stderr_progress("Purging")))
        .join()?
        .into_result()?;

    println!();
    println!("{}", message);
    Ok(())
}
