//! Configuration management for camcp
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{CamcpError, Result};
use anyhow::Context;
use crate::mcp::types::{Implementation, MCP_PROTOCOL_VERSION};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure for camcp
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// runnable configuration apart from the network credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP endpoint settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Identity reported by `initialize`
    #[serde(default)]
    pub device: DeviceConfig,
    /// Persisted network credentials
    #[serde(default)]
    pub network: NetworkConfig,
    /// Connectivity supervisor timing
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    /// Liveness watchdog
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    /// Camera and capture settings
    #[serde(default)]
    pub camera: CameraConfig,
}

/// HTTP endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Compress JSON responses when the client accepts `deflate`
    #[serde(default)]
    pub deflate: bool,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    80
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            deflate: false,
        }
    }
}

/// Server identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// `serverInfo.name`
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// `serverInfo.version`
    #[serde(default = "default_server_version")]
    pub server_version: String,

    /// `protocolVersion` reported by `initialize`
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
}

fn default_server_name() -> String {
    "ESP32-CAM-AI MCP Server".to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_protocol_version() -> String {
    MCP_PROTOCOL_VERSION.to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            server_version: default_server_version(),
            protocol_version: default_protocol_version(),
        }
    }
}

impl DeviceConfig {
    /// `serverInfo` object for `initialize`
    pub fn server_info(&self) -> Implementation {
        Implementation {
            name: self.server_name.clone(),
            version: self.server_version.clone(),
        }
    }
}

/// Network credentials
///
/// This is the only state the device keeps across restarts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Access point name
    #[serde(default)]
    pub ssid: String,

    /// Access point passphrase
    #[serde(default)]
    pub password: String,
}

/// Connectivity supervisor timing and budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// Minimum spacing between link status checks
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    /// Minimum spacing between reconnect attempts
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// Delay from the last attempt to the restart once escalated
    #[serde(default = "default_reboot_delay_ms")]
    pub reboot_delay_ms: u64,

    /// Attempts before escalating to a restart
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Bound on one blocking reconnect attempt
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Idle sleep of the device loop between iterations
    #[serde(default = "default_loop_period_ms")]
    pub loop_period_ms: u64,

    /// Capacity of the link event inbox
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Capacity of the request queue in front of the device loop
    #[serde(default = "default_request_queue_capacity")]
    pub request_queue_capacity: usize,
}

fn default_check_interval_ms() -> u64 {
    5_000
}

fn default_reconnect_interval_ms() -> u64 {
    30_000
}

fn default_reboot_delay_ms() -> u64 {
    60_000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_loop_period_ms() -> u64 {
    10
}

fn default_event_queue_capacity() -> usize {
    16
}

fn default_request_queue_capacity() -> usize {
    8
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: default_check_interval_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            reboot_delay_ms: default_reboot_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            connect_timeout_ms: default_connect_timeout_ms(),
            loop_period_ms: default_loop_period_ms(),
            event_queue_capacity: default_event_queue_capacity(),
            request_queue_capacity: default_request_queue_capacity(),
        }
    }
}

/// Liveness watchdog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Arm the software watchdog
    #[serde(default = "default_watchdog_enabled")]
    pub enabled: bool,

    /// Deadline between two pulses
    #[serde(default = "default_watchdog_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_watchdog_enabled() -> bool {
    true
}

fn default_watchdog_timeout_ms() -> u64 {
    30_000
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: default_watchdog_enabled(),
            timeout_ms: default_watchdog_timeout_ms(),
        }
    }
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// JPEG served as every frame by the host camera
    #[serde(default)]
    pub image_path: Option<PathBuf>,

    /// Frames discarded before the real capture
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: u32,

    /// Wait after switching the flash on
    #[serde(default = "default_flash_settle_ms")]
    pub flash_settle_ms: u64,
}

fn default_warmup_frames() -> u32 {
    2
}

fn default_flash_settle_ms() -> u64 {
    20
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            image_path: None,
            warmup_frames: default_warmup_frames(),
            flash_settle_ms: default_flash_settle_ms(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path).with_context(|| format!("loading config from {}", path))?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(CamcpError::from)?;
        let config = serde_yaml::from_str(&contents).map_err(CamcpError::from)?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(bind) = std::env::var("CAMCP_BIND") {
            self.server.bind = bind;
        }
        parse_env("CAMCP_PORT", &mut self.server.port);
        parse_env("CAMCP_DEFLATE", &mut self.server.deflate);

        if let Ok(ssid) = std::env::var("CAMCP_WIFI_SSID") {
            self.network.ssid = ssid;
        }
        if let Ok(password) = std::env::var("CAMCP_WIFI_PASSWORD") {
            self.network.password = password;
        }

        parse_env(
            "CAMCP_MAX_RECONNECT_ATTEMPTS",
            &mut self.connectivity.max_reconnect_attempts,
        );
        parse_env(
            "CAMCP_CONNECT_TIMEOUT_MS",
            &mut self.connectivity.connect_timeout_ms,
        );
        parse_env("CAMCP_WATCHDOG_TIMEOUT_MS", &mut self.watchdog.timeout_ms);

        if let Ok(image) = std::env::var("CAMCP_CAMERA_IMAGE") {
            self.camera.image_path = Some(PathBuf::from(image));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
        if let crate::cli::Commands::Serve { port: Some(port) } = cli.command {
            self.server.port = port;
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.network.ssid.trim().is_empty() {
            return Err(CamcpError::Config("network.ssid cannot be empty".to_string()).into());
        }

        let intervals = [
            ("check_interval_ms", self.connectivity.check_interval_ms),
            ("reconnect_interval_ms", self.connectivity.reconnect_interval_ms),
            ("reboot_delay_ms", self.connectivity.reboot_delay_ms),
            ("connect_timeout_ms", self.connectivity.connect_timeout_ms),
            ("loop_period_ms", self.connectivity.loop_period_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(CamcpError::Config(format!(
                    "connectivity.{} must be greater than 0",
                    name
                ))
                .into());
            }
        }

        if self.connectivity.max_reconnect_attempts == 0 {
            return Err(CamcpError::Config(
                "connectivity.max_reconnect_attempts must be at least 1".to_string(),
            )
            .into());
        }

        if self.connectivity.event_queue_capacity == 0
            || self.connectivity.request_queue_capacity == 0
        {
            return Err(CamcpError::Config(
                "connectivity queue capacities must be at least 1".to_string(),
            )
            .into());
        }

        if self.watchdog.enabled {
            if self.watchdog.timeout_ms == 0 {
                return Err(CamcpError::Config(
                    "watchdog.timeout_ms must be greater than 0".to_string(),
                )
                .into());
            }
            // a reconnect blocks the loop, so a pulse must still land in time
            let worst_gap = self
                .connectivity
                .connect_timeout_ms
                .saturating_add(self.connectivity.check_interval_ms);
            if worst_gap >= self.watchdog.timeout_ms {
                return Err(CamcpError::Config(format!(
                    "connect_timeout_ms + check_interval_ms ({}) must be less than watchdog.timeout_ms ({})",
                    worst_gap, self.watchdog.timeout_ms
                ))
                .into());
            }
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!("Invalid {}: {}", key, raw),
        }
    }
}
