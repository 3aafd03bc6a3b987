//! List command handler
//!
//! Prints the versions the catalog currently offers.

use anyhow::{Context, Result};
use colored::*;
use vmatrix_client::CatalogClient;

use crate::config::Config;

/// List all available versions
pub async fn handle_list_command(config: &Config) -> Result<()> {
    let client = CatalogClient::new(&config.registry_url);

    println!("Fetching available versions");
    let versions = client
        .fetch_versions()
        .await
        .context("Failed to fetch the version catalog")?;

    if versions.is_empty() {
        println!("{}", "No release versions found.".yellow());
        return Ok(());
    }

    println!();
    for version in versions {
        println!("   {}", version);
    }

    Ok(())
}
