//! Tools module for camcp
//!
//! This module contains the tool handler trait, the ordered tool registry
//! that backs `tools/list` and `tools/call`, and the device tools: status
//! LED, flash lamp, camera capture, and link/system status reports.

pub mod args;
pub mod capture;
pub mod flash;
pub mod led;
pub mod registry_builder;
pub mod system_status;
pub mod wifi_status;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{CamcpError, Result};
use crate::mcp::protocol::ResponseBuilder;
use crate::mcp::types::{CallToolResponse, ErrorCode, RpcError, ToolDescriptor};

pub use capture::CaptureTool;
pub use flash::FlashTool;
pub use led::LedTool;
pub use registry_builder::ToolRegistryBuilder;
pub use system_status::SystemStatusTool;
pub use wifi_status::WifiStatusTool;

/// Status LED switch
pub const TOOL_LED: &str = "led";
/// Flash lamp pulse
pub const TOOL_FLASH: &str = "flash";
/// Camera capture
pub const TOOL_CAPTURE: &str = "capture";
/// Network link report
pub const TOOL_WIFI_STATUS: &str = "wifi_status";
/// System report
pub const TOOL_SYSTEM_STATUS: &str = "system_status";

/// Handler for one registered tool
///
/// Implementations validate their own arguments and return either the tool
/// result or a JSON-RPC error: `invalid_params` for argument violations,
/// `internal_error` for capability failures.
///
/// # Examples
///
/// ```
/// use camcp::mcp::types::{CallToolResponse, RpcError, ToolDescriptor};
/// use camcp::tools::ToolHandler;
/// use serde_json::{json, Map, Value};
///
/// struct Ping;
///
/// impl ToolHandler for Ping {
///     fn descriptor(&self) -> ToolDescriptor {
///         ToolDescriptor::new("ping", "Replies pong", json!({"type": "object"}))
///     }
///
///     fn call(&self, _args: &Map<String, Value>) -> Result<CallToolResponse, RpcError> {
///         Ok(CallToolResponse::text("pong"))
///     }
/// }
/// ```
pub trait ToolHandler: Send + Sync {
    /// Name, description and input schema of the tool
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool with the `arguments` of a `tools/call`
    ///
    /// # Errors
    ///
    /// Returns the JSON-RPC error to send back to the caller.
    fn call(&self, args: &Map<String, Value>) -> std::result::Result<CallToolResponse, RpcError>;
}

struct Entry {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

/// Tool registry in registration order
///
/// The registry is built once at startup and never changes afterwards.
/// Registration order is the order of `tools/list`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Entry>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool handler
    ///
    /// The descriptor is captured once, at registration.
    ///
    /// # Errors
    ///
    /// Returns [`CamcpError::Registry`] if the tool name is empty or already
    /// registered.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> Result<()> {
        let descriptor = handler.descriptor();
        if descriptor.name.is_empty() {
            return Err(CamcpError::Registry("tool name cannot be empty".to_string()).into());
        }
        if self.get(&descriptor.name).is_some() {
            return Err(
                CamcpError::Registry(format!("duplicate tool: {}", descriptor.name)).into(),
            );
        }
        tracing::debug!(tool = %descriptor.name, "Registered tool");
        self.tools.push(Entry {
            descriptor,
            handler,
        });
        Ok(())
    }

    /// Get a tool handler by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools
            .iter()
            .find(|entry| entry.descriptor.name == name)
            .map(|entry| Arc::clone(&entry.handler))
    }

    /// Descriptors of every tool, in registration order
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    /// Dispatch a `tools/call` and write exactly one outcome into `response`
    ///
    /// Handler errors are written unchanged.
    pub fn call_tool(&self, name: &str, args: &Map<String, Value>, response: &mut ResponseBuilder) {
        if name.is_empty() {
            response.set_error(ErrorCode::InvalidRequest, "Tool name is required");
            return;
        }

        let Some(handler) = self.get(name) else {
            tracing::warn!(tool = name, "Unknown tool requested");
            response.set_error(ErrorCode::MethodNotFound, format!("Unknown tool: {}", name));
            return;
        };

        match handler.call(args) {
            Ok(result) => {
                tracing::info!(tool = name, "Tool call succeeded");
                response.set_result_from(&result);
            }
            Err(error) => {
                tracing::warn!(tool = name, code = error.code, message = %error.message, "Tool call failed");
                response.fail(error);
            }
        }
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
