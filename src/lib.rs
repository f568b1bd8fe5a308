//! camcp - MCP tool server library for a networked camera board
//!
//! This library provides the firmware core of a camera device that exposes
//! its hardware as MCP tools over JSON-RPC 2.0, plus the supervisor that keeps
//! the network link alive.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `mcp`: JSON-RPC parsing, response building and method routing
//! - `tools`: The tool registry and the five device tools
//! - `connectivity`: Link supervision with bounded reconnects and restart escalation
//! - `hal`: Hardware capability traits and host-side providers
//! - `device`: The cooperative main loop tying supervision and requests together
//! - `server`: HTTP transport with CORS and optional deflate
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use camcp::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!     camcp::commands::serve::run_serve(config).await
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod connectivity;
pub mod device;
pub mod error;
pub mod hal;
pub mod mcp;
pub mod server;
pub mod tools;

// Re-export commonly used types
pub use config::Config;
pub use connectivity::{ConnectivitySupervisor, Phase, SupervisorTiming};
pub use device::{DeviceHandle, DeviceLoop};
pub use error::{CamcpError, Result};
pub use mcp::Router;
pub use tools::ToolRegistry;
