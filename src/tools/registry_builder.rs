//! Device tool registry builder
//!
//! This module wires the capability providers into the five device tools
//! and registers them in the order `tools/list` reports them: `led`,
//! `flash`, `capture`, `wifi_status`, `system_status`.

use std::sync::Arc;

use crate::config::CameraConfig;
use crate::error::Result;
use crate::hal::Capabilities;
use crate::tools::{
    CaptureTool, FlashTool, LedTool, SystemStatusTool, ToolRegistry, WifiStatusTool,
};

/// Builder for the device tool registry
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use camcp::config::Config;
/// use camcp::hal::{sim, watchdog::DisabledWatchdog};
/// use camcp::tools::registry_builder::ToolRegistryBuilder;
///
/// let config = Config::default();
/// let capabilities = sim::host_capabilities(&config, None, Arc::new(DisabledWatchdog));
/// let registry = ToolRegistryBuilder::new(capabilities)
///     .with_camera_config(config.camera.clone())
///     .build()
///     .expect("Failed to build registry");
/// assert_eq!(registry.len(), 5);
/// ```
pub struct ToolRegistryBuilder {
    /// Capability providers handed to the tools
    capabilities: Capabilities,
    /// Capture settings
    camera_config: CameraConfig,
}

impl ToolRegistryBuilder {
    /// Create a new builder over a capability set
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            camera_config: CameraConfig::default(),
        }
    }

    /// Set the capture configuration
    pub fn with_camera_config(mut self, config: CameraConfig) -> Self {
        self.camera_config = config;
        self
    }

    /// Build the registry
    ///
    /// # Errors
    ///
    /// Returns error if a tool name collides, which only happens through a
    /// programming error.
    pub fn build(&self) -> Result<ToolRegistry> {
        let caps = &self.capabilities;
        let mut registry = ToolRegistry::new();

        registry.register(Arc::new(LedTool::new(Arc::clone(&caps.led))))?;
        registry.register(Arc::new(FlashTool::new(Arc::clone(&caps.flash))))?;
        registry.register(Arc::new(CaptureTool::new(
            Arc::clone(&caps.camera),
            Arc::clone(&caps.flash),
            &self.camera_config,
        )))?;
        registry.register(Arc::new(WifiStatusTool::new(Arc::clone(&caps.link))))?;
        registry.register(Arc::new(SystemStatusTool::new(
            Arc::clone(&caps.system),
            Arc::clone(&caps.camera),
        )))?;

        tracing::debug!(tools = registry.len(), "Tool registry built");
        Ok(registry)
    }

    /// Capture configuration in use
    pub fn camera_config(&self) -> &CameraConfig {
        &self.camera_config
    }
}
