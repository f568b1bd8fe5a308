//! Error types for camcp
//!
//! This module defines the crate-level error type used by configuration
//! loading, the HTTP transport, and capability providers, using `thiserror`
//! for ergonomic error handling.
//!
//! Protocol failures (malformed bodies, unknown methods, bad tool arguments)
//! never travel through this type. They are carried as
//! [`crate::mcp::types::RpcError`] values and end up as JSON-RPC error
//! envelopes on the wire.

use thiserror::Error;

/// Main error type for camcp operations
#[derive(Error, Debug)]
pub enum CamcpError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport and device loop plumbing errors
    #[error("Transport error: {0}")]
    Transport(String),

    /// Tool registry errors (duplicate registration, empty names)
    #[error("Tool registry error: {0}")]
    Registry(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure reported by a capability provider
///
/// Tool handlers map every variant to the JSON-RPC `internal_error` code;
/// nothing at the protocol layer retries these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HalError {
    /// An on/off actuator could not be driven
    #[error("actuator '{name}' failed: {reason}")]
    Actuation {
        /// Actuator name (`led`, `flash`)
        name: String,
        /// Provider-supplied reason
        reason: String,
    },

    /// The camera never initialized
    #[error("camera not initialized: {0}")]
    CameraUnavailable(String),

    /// The frame buffer could not be acquired
    #[error("frame capture failed: {0}")]
    CaptureFailed(String),
}

/// Result type alias for camcp operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
