//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod build;
mod list;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build against every available version
    Build(build::BuildArgs),
    /// List all available versions
    List,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Build(args) => build::handle_build_command(args, config).await,
        Commands::List => list::handle_list_command(config).await,
    }
}
