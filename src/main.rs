mod cli;
mod error;
mod locator;
mod logging;
mod model;
mod orchestrator;
mod privilege;
mod registry;
#[cfg(feature = "tui")]
mod tui;
mod validator;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = cli::Cli::parse();

    // The TUI owns the terminal, so only headless runs mirror logs to stderr.
    let _log_guard = logging::init(&args.log_file, args.is_headless())?;

    if (args.require_elevation || privilege::required_by_platform()) && !privilege::is_elevated() {
        tracing::error!("not running with elevated privileges; exiting");
        eprintln!("Permission error: {}", privilege::ELEVATION_HINT);
        return Ok(ExitCode::FAILURE);
    }

    match cli::run(args).await {
        Ok(code) => Ok(code),
        Err(e) => {
            tracing::error!("{e:#}");
            Err(e)
        }
    }
}
