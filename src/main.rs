//! Unlatch: find the processes holding a file open, release them, and
//! force-delete the path.
//!
//! This is the main entry point for the `unlatch` CLI. It parses arguments,
//! installs logging, dispatches to the appropriate command handler, and
//! handles errors with proper exit codes.

mod cli;
mod commands;
pub mod config;
pub mod critical;
pub mod delete;
pub mod engine;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod host;
pub mod model;
pub mod orchestrator;
pub mod probe;
pub mod translate;
pub mod unlock;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            tracing::debug!(
                error = %err,
                kind = ?err.kind(),
                reboot = err.suggests_reboot(),
                "command failed"
            );
            eprintln!("Error: {}", translate::describe(&err));
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// Log to stderr. `RUST_LOG` wins over the `-v` count.
fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
