//! Implementation of the `unlatch unlock` command.
//!
//! Probes the path, prints what would happen to every owner and, with
//! `--yes`, terminates the owners that are not critical. Default behaviour
//! is a dry run.

use super::{planned_actions, print_dry_run, stderr_progress};
use crate::cli::UnlockArgs;
use crate::engine::Engine;
use crate::error::Result;

pub fn cmd_unlock(engine: &Engine, args: UnlockArgs) -> Result<()> {
    let owners = engine
        .spawn_probe(args.path.clone(), Some(stderr_progress("Scanning")))
        .join()??;

    if owners.is_empty() {
        println!("No process holds {} open.", args.path.display());
        return Ok(());
    }

    println!("Unlock plan for {}:", args.path.display());
    for line in planned_actions(engine, &owners) {
        println!("  - {}", line);
    }

    if !args.yes {
        print_dry_run("release these locks");
        return Ok(());
    }

    let message = engine
        .spawn_unlock(args.path.clone(), owners, Some(stderr_progress("Unlocking")))
        .join()?
        .into_result()?;

    println!();
    println!("{}", message);
    Ok(())
}
