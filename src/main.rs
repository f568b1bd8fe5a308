//! camcp - MCP tool server for a networked camera board
//!
#![doc = "camcp - MCP tool server for a networked camera board"]
#![doc = "Main entry point for the camcp device binary."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use camcp::cli::{Cli, Commands};
use camcp::commands;
use camcp::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Logging is up before config so load warnings are visible
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Execute command
    match cli.command {
        Commands::Serve { port } => {
            tracing::info!("Starting device");
            if let Some(p) = port {
                tracing::debug!("Using port override: {}", p);
            }
            commands::serve::run_serve(config).await?;
            Ok(())
        }
        Commands::Tools => {
            commands::tools::print_tools(&config)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "camcp=debug" } else { "camcp=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
