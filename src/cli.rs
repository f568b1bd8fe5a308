//! Command-line interface definition for camcp
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to run the device and to inspect its tools.

use clap::{Parser, Subcommand};

/// camcp - MCP tool server for a networked camera board
///
/// Serves JSON-RPC tool calls (LED, flash, capture, status) over HTTP while
/// supervising the network link.
#[derive(Parser, Debug, Clone)]
#[command(name = "camcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "CAMCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for camcp
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the device: main loop, connectivity supervision and HTTP endpoint
    Serve {
        /// Override the listening port from config
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the `tools/list` result as JSON and exit
    Tools,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            command: Commands::Serve { port: None },
        }
    }
}
