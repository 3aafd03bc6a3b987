//! Configuration module
//!
//! Settings shared by every CLI command.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Tag listing endpoint of the version catalog
    pub registry_url: String,
}
