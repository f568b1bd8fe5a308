/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes two top-level command modules:

- `serve` - Run the device loop, connectivity supervision and HTTP endpoint
- `tools` - Print the tool catalogue the device would advertise

These handlers are intentionally small and only wire library components
together: capability providers, the tool registry, the router, the
supervisor and the HTTP transport.
*/

use crate::config::Config;
use crate::connectivity::{Clock, ConnectivitySupervisor, LinkEventInbox, SupervisorTiming};
use crate::device::{DeviceHandle, DeviceLoop};
use crate::error::Result;
use crate::hal::Capabilities;
use crate::mcp::router::Router;
use crate::tools::registry_builder::ToolRegistryBuilder;
use std::sync::Arc;
use std::time::Duration;

/// Assemble the device core from a capability set.
///
/// The supervisor is returned unbooted inside the loop; callers decide when
/// the initial association happens.
///
/// # Errors
///
/// Returns error if the tool registry cannot be built.
pub fn build_device(
    config: &Config,
    capabilities: Capabilities,
    clock: Arc<dyn Clock>,
    inbox: LinkEventInbox,
) -> Result<(DeviceLoop, DeviceHandle)> {
    let registry = ToolRegistryBuilder::new(capabilities.clone())
        .with_camera_config(config.camera.clone())
        .build()?;
    let router = Router::new(
        registry,
        config.device.server_info(),
        config.device.protocol_version.clone(),
    );
    let supervisor = ConnectivitySupervisor::from_capabilities(
        SupervisorTiming::from(&config.connectivity),
        &capabilities,
        clock,
        inbox,
    );
    Ok(DeviceLoop::new(
        supervisor,
        router,
        Arc::clone(&capabilities.watchdog),
        config.connectivity.request_queue_capacity,
        Duration::from_millis(config.connectivity.loop_period_ms),
    ))
}

// Device runtime
pub mod serve {
    //! Device runtime.
    //!
    //! Arms the watchdog, builds the host providers, performs the initial
    //! association, then runs the device loop on a blocking thread and the
    //! HTTP endpoint on the async runtime until Ctrl-C.

    use super::*;
    use crate::connectivity::{inbox, MonotonicClock};
    use crate::error::CamcpError;
    use crate::hal::watchdog::{DisabledWatchdog, SoftwareWatchdog};
    use crate::hal::{sim, Watchdog};
    use crate::server;
    use anyhow::Context;
    use tokio_util::sync::CancellationToken;

    /// Run the device until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid, the watchdog thread
    /// cannot start, or the listener cannot bind.
    pub async fn run_serve(config: Config) -> Result<()> {
        config.validate()?;

        let watchdog: Arc<dyn Watchdog> = if config.watchdog.enabled {
            let timeout = Duration::from_millis(config.watchdog.timeout_ms);
            let watchdog = SoftwareWatchdog::start(timeout).map_err(CamcpError::from)?;
            Arc::new(watchdog)
        } else {
            tracing::warn!("Watchdog disabled");
            Arc::new(DisabledWatchdog)
        };

        let (events, event_inbox) = inbox(config.connectivity.event_queue_capacity);
        let capabilities = sim::host_capabilities(&config, Some(events), watchdog);
        let (device, handle) = build_device(
            &config,
            capabilities,
            Arc::new(MonotonicClock::new()),
            event_inbox,
        )?;

        // the initial association blocks, so it runs on the loop thread too
        let shutdown = CancellationToken::new();
        let loop_token = shutdown.clone();
        let device_task = tokio::task::spawn_blocking(move || device.boot_and_run(loop_token));

        let addr = format!("{}:{}", config.server.bind, config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding to {}", addr))?;
        tracing::info!(addr = %addr, deflate = config.server.deflate, "MCP server listening");

        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
            tracing::info!("Received SIGINT, shutting down");
            signal_token.cancel();
        });

        let app = server::router(handle, config.server.deflate);
        let served = server::serve(listener, app, shutdown.clone()).await;
        shutdown.cancel();
        device_task
            .await
            .map_err(|e| CamcpError::Transport(format!("device loop panicked: {}", e)))?;
        served.context("HTTP server error")?;

        tracing::info!("Shutdown complete");
        Ok(())
    }
}

// Tool catalogue
pub mod tools {
    //! Prints the `tools/list` payload.

    use super::*;
    use crate::error::CamcpError;
    use crate::hal::sim;
    use crate::hal::watchdog::DisabledWatchdog;
    use crate::mcp::types::ListToolsResponse;

    /// Render the tool catalogue as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns error if the registry cannot be built or serialized.
    pub fn render_tools(config: &Config) -> Result<String> {
        let capabilities = sim::host_capabilities(config, None, Arc::new(DisabledWatchdog));
        let registry = ToolRegistryBuilder::new(capabilities)
            .with_camera_config(config.camera.clone())
            .build()?;
        let listing = ListToolsResponse {
            tools: registry.list_tools(),
        };
        let rendered = serde_json::to_string_pretty(&listing).map_err(CamcpError::from)?;
        Ok(rendered)
    }

    /// Print the tool catalogue to stdout
    ///
    /// # Errors
    ///
    /// Returns error if the catalogue cannot be rendered.
    pub fn print_tools(config: &Config) -> Result<()> {
        println!("{}", render_tools(config)?);
        Ok(())
    }

}
