//! Implementation of the `unlatch delete` command.
//!
//! Runs the deletion cascade on a path: unlock rounds for a locked file,
//! bottom-up emptying for a directory, then every removal method in turn.
//! Default behaviour is a dry run; `--yes` deletes.

use super::{print_dry_run, stderr_progress};
use crate::cli::DeleteArgs;
use crate::engine::Engine;
use crate::error::{Result, UnlatchError};
use crate::host::PathKind;

pub fn cmd_delete(engine: &Engine, args: DeleteArgs) -> Result<()> {
    let kind = PathKind::of(&args.path)
        .ok_or_else(|| UnlatchError::PathNotFound(args.path.clone()))?;

    if !args.yes {
        let what = if kind.is_dir() { "directory" } else { "file" };
        println!("Would delete {} {}", what, args.path.display());
        print_dry_run("delete it");
        return Ok(());
    }

    let message = engine
        .spawn_delete(args.path.clone(), Some(stderr_progress("Deleting")))
        .join()?
        .into_result()?;

    println!("{}", message);
    Ok(())
}
