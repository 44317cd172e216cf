//! Implementation of the `unlatch explain` command.

use crate::cli::ExplainArgs;
use crate::error::Result;
use crate::translate::to_user_message;

/// Print the user-facing translation of a raw error message.
pub fn cmd_explain(args: ExplainArgs) -> Result<()> {
    println!("{}", to_user_message(&args.message.join(" ")));
    Ok(())
}
