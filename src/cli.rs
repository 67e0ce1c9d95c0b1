// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "compose-redeploy")]
#[command(about = "Redeploy every service of a compose manifest on request")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to redeploy.yml in the working directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the redeploy endpoint
    Serve {
        /// Address to listen on (overrides the config)
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },

    /// Redeploy all services once and exit
    Redeploy,

    /// Show what a redeploy would do, without touching the runtime
    Plan,
}
