use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(about = "Launch and tear down a multi-container deployment", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Working directory containing the compose files (overrides config)
    #[arg(short, long, global = true)]
    pub workdir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the deployment
    Start {
        /// Network mode: local or overlay
        #[arg(short, long, default_value = "local")]
        mode: String,

        /// Rebuild images before starting
        #[arg(long)]
        rebuild: bool,
    },

    /// Stop the deployment
    Stop,

    /// Save the overlay auth key for later overlay starts
    SaveKey {
        /// The auth key value
        value: String,
    },

    /// Print the configured deployment without touching it
    Status,
}
