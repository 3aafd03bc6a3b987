//! vmatrix CLI
//!
//! Builds a project against every available runtime version and writes one
//! consolidated report.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "vmatrix")]
#[command(about = "Build a project against a matrix of runtime versions", long_about = None)]
struct Cli {
    /// Version catalog URL
    #[arg(
        long,
        env = "VMATRIX_REGISTRY_URL",
        default_value = vmatrix_client::DEFAULT_REGISTRY_URL
    )]
    registry_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, command output to stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vmatrix=info,vmatrix_runner=info,vmatrix_client=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        registry_url: cli.registry_url,
    };

    handle_command(cli.command, &config).await
}
