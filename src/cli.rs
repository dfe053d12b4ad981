//! CLI definitions for looper.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// looper CLI.
#[derive(Parser)]
#[command(name = "looper")]
#[command(about = "Drive a per-thread run loop from a TOML config")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to the user config directory)
    #[arg(short, long, global = true, env = "LOOPER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the configured timers and sources, then print a metrics report
    Run {
        /// Override `[run] duration_ms`
        #[arg(long)]
        duration_ms: Option<u64>,
    },

    /// Load and validate the configuration
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["looper", "run", "--duration-ms", "250"]).unwrap();
        assert!(cli.config.is_none());
        assert!(matches!(cli.command, Commands::Run { duration_ms: Some(250) }));
    }

    #[test]
    fn test_parse_check_with_config() {
        let cli = Cli::try_parse_from(["looper", "check", "--config", "looper.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("looper.toml")));
        assert!(matches!(cli.command, Commands::Check));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["looper"]).is_err());
    }
}
