//! Command line interface definition

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

/// bridge - keeps installed packages in step with a central authority
#[derive(Parser)]
#[command(name = "bridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Remote update agent for packages announced by a central authority")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to a file in the logs directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the poll timer and the trigger endpoint until interrupted
    Serve,

    /// Ask the authority for updates and install them
    Sync {
        /// Only report what is available
        #[arg(long)]
        check_only: bool,
    },

    /// Install a single package
    #[command(alias = "i")]
    #[command(group(ArgGroup::new("source").required(true).args(["repo", "zip_url"])))]
    Install {
        /// Repository reference, `owner/name`
        #[arg(long, value_name = "OWNER/NAME")]
        repo: Option<String>,

        /// Direct archive URL
        #[arg(long, value_name = "URL", requires = "slug")]
        zip_url: Option<String>,

        /// Branch to fetch from the repository
        #[arg(long, requires = "repo")]
        branch: Option<String>,

        /// Install slot name; defaults to the repository name
        #[arg(long)]
        slug: Option<String>,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration with secrets masked
    Show,

    /// Set a configuration key and write it back to the config file
    Set {
        /// Dotted key, e.g. `authority.url`
        key: String,
        /// New value; empty clears optional settings
        value: String,
    },
}

impl Commands {
    /// Whether environment overrides apply to this command
    ///
    /// `config set` writes the file back, so it must not pick up values that
    /// only exist in the environment.
    pub fn uses_env(&self) -> bool {
        !matches!(self, Commands::Config(ConfigCommands::Set { .. }))
    }
}
