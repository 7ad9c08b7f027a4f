//! CLI command definitions for agent-config
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod convert;
pub mod restore;

use crate::environment::EnvMode;
use crate::format::ConfigFormat;
use clap::{Args, Parser, Subcommand};
use convert::{ConvertArgs, MergeArgs};
use restore::RestoreArgs;
use std::path::PathBuf;

/// Default template installed by `init`.
pub const DEFAULT_TEMPLATE: &str = "default";

/// Layered configuration manager for agent tooling
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project directory (default: current directory)
    #[arg(short, long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Configuration file format: yaml (default) or json
    #[arg(long, global = true, value_name = "FORMAT")]
    pub format: Option<ConfigFormat>,

    /// Pin the environment mode instead of detecting it
    #[arg(short, long, global = true, value_name = "MODE", value_parser = parse_env_mode)]
    pub env: Option<EnvMode>,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve and print the effective configuration
    Show,

    /// Create the global configuration and a project companion file
    Init(InitArgs),

    /// Show configuration status and health
    Status,

    /// Back up the global configuration file
    Backup,

    /// List backups, newest first
    Backups,

    /// Restore a configuration file from a backup
    Restore(RestoreArgs),

    /// Show the files and directories in use
    Paths,

    /// Convert a configuration file to another format
    Convert(ConvertArgs),

    /// Merge several configuration files into one
    Merge(MergeArgs),

    /// Validate a configuration file
    Validate(ValidateArgs),

    /// Show the detected environment
    Env,

    /// Record a sync on the global configuration file
    Sync(SyncArgs),
}

/// Arguments for the init subcommand
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Template to install
    #[arg(short, long, default_value = DEFAULT_TEMPLATE)]
    pub template: String,

    /// Overwrite an existing configuration (the old file is backed up)
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the validate subcommand
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// File to validate (default: the global configuration file)
    #[arg(value_name = "FILE")]
    pub path: Option<PathBuf>,
}

/// Arguments for the sync subcommand
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Remote locator to store alongside the timestamp
    #[arg(short, long, value_name = "URL")]
    pub remote: Option<String>,
}

/// Parse an environment mode, accepting the same synonyms as `AGENT_ENV`.
pub fn parse_env_mode(s: &str) -> Result<EnvMode, String> {
    EnvMode::from_alias(s).ok_or_else(|| {
        format!(
            "Invalid environment '{}'. Valid options: development, staging, production, test",
            s
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_env_mode() {
        assert_eq!(parse_env_mode("prod").unwrap(), EnvMode::Production);
        assert_eq!(parse_env_mode("Staging").unwrap(), EnvMode::Staging);
        assert!(parse_env_mode("qa").is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["agent-config", "status", "--json", "--format", "json"]);
        assert!(cli.json);
        assert_eq!(cli.format, Some(ConfigFormat::Json));
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn test_init_defaults() {
        let cli = Cli::parse_from(["agent-config", "init"]);
        match cli.command {
            Command::Init(args) => {
                assert_eq!(args.template, DEFAULT_TEMPLATE);
                assert!(!args.force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.log, "2");
    }

    #[test]
    fn test_init_with_template_and_force() {
        let cli = Cli::parse_from(["agent-config", "init", "-t", "claude", "-f", "--env", "test"]);
        assert_eq!(cli.env, Some(EnvMode::Test));
        match cli.command {
            Command::Init(args) => {
                assert_eq!(args.template, "claude");
                assert!(args.force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
