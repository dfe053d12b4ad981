//! looper - run a configured per-thread run loop from the command line.
//!
//! Main entry point for the looper CLI.

mod cli;
mod cmd_check;
mod cmd_run;
mod logging;

use clap::Parser;
use tracing::debug;

use looper_config::ConfigLoader;
use looper_runloop::registry;

use crate::cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(cli.config.as_deref())?;
    logging::init_tracing(&config.logging)?;
    debug!(config = ?cli.config, "Configuration loaded");

    let result = match cli.command {
        Commands::Run { duration_ms } => cmd_run::handle_run(&config, duration_ms),
        Commands::Check => cmd_check::handle_check(&config),
    };
    registry::shutdown();
    result
}
