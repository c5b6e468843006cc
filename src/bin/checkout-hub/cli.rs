//! CLI definition for checkout-hub.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Checkout and origin permission service.
#[derive(Parser, Debug)]
#[command(name = "checkout-hub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Address to listen on, overrides the configuration file.
    #[arg(long, short)]
    pub listen: Option<SocketAddr>,

    /// Permission database path, overrides the configuration file.
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Log level, overrides the configuration file.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Command to run (defaults to `serve`).
    #[command(subcommand)]
    pub command: Option<HubCommand>,
}

#[derive(Subcommand, Debug)]
pub enum HubCommand {
    /// Run the HTTP service.
    Serve,
    /// Write the effective configuration to a file.
    WriteConfig {
        /// Destination of the TOML file.
        path: PathBuf,
    },
    /// Delete the permission database. It is seeded again on next start.
    ResetPermissions,
}
