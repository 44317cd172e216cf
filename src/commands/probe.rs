//! Implementation of the `unlatch probe` command.

use super::{print_owners, stderr_progress};
use crate::cli::ProbeArgs;
use crate::engine::Engine;
use crate::error::{Result, UnlatchError};

/// List the processes holding `args.path` open.
///
/// With `--json` the owners are printed as a JSON array instead of a table.
pub fn cmd_probe(engine: &Engine, args: ProbeArgs) -> Result<()> {
    let handle = engine.spawn_probe(args.path.clone(), Some(stderr_progress("Scanning")));
    let owners = handle.join()??;

    if args.json {
        let json = serde_json::to_string_pretty(&owners)
            .map_err(|e| UnlatchError::Unknown(format!("failed to serialize owners: {}", e)))?;
        println!("{}", json);
    } else {
        print_owners(&args.path, &owners);
    }

    Ok(())
}
