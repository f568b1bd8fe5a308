//! JSON-RPC 2.0 primitives and tool-calling wire types
//!
//! This module defines the data model shared by the protocol engine, the
//! router, and the tool dispatcher. Struct fields are `camelCase` on the wire
//! via `#[serde(rename_all = "camelCase")]`. All JSON objects are
//! `serde_json::Map`s built with the `preserve_order` feature, so keys are
//! emitted in insertion order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Version and method constants
// ---------------------------------------------------------------------------

/// JSON-RPC envelope version used when a request does not carry one.
pub const JSONRPC_VERSION: &str = "2.0";

/// Tool-calling protocol revision announced by `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Lifecycle: client opens a session.
pub const METHOD_INITIALIZE: &str = "initialize";
/// Lifecycle: client confirms the session is initialized.
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
/// List registered tools.
pub const METHOD_TOOLS_LIST: &str = "tools/list";
/// Invoke a named tool.
pub const METHOD_TOOLS_CALL: &str = "tools/call";

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// First code of the range reserved for tool/server specific errors.
pub const SERVER_ERROR_START: i64 = -32000;
/// Last code of the range reserved for tool/server specific errors.
pub const SERVER_ERROR_END: i64 = -32099;

/// JSON-RPC error codes understood by this device.
///
/// # Examples
///
/// ```
/// use camcp::mcp::types::ErrorCode;
///
/// assert_eq!(ErrorCode::InvalidParams.code(), -32602);
/// assert_eq!(ErrorCode::from_code(-32601), Some(ErrorCode::MethodNotFound));
/// assert!(ErrorCode::server(-32050).is_some());
/// assert!(ErrorCode::server(-32100).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The body is not well-formed JSON or its top level is not an object.
    ParseError,
    /// The envelope is structurally valid but semantically incomplete.
    InvalidRequest,
    /// Unknown method or unknown tool.
    MethodNotFound,
    /// A tool argument violates its schema.
    InvalidParams,
    /// A capability provider failed.
    InternalError,
    /// Tool/server specific code in `-32000..=-32099`.
    Server(i64),
}

impl ErrorCode {
    /// Numeric value placed in the `error.code` field.
    pub fn code(self) -> i64 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::Server(code) => code,
        }
    }

    /// Build a server-specific code, rejecting values outside the reserved range.
    pub fn server(code: i64) -> Option<Self> {
        (SERVER_ERROR_END..=SERVER_ERROR_START)
            .contains(&code)
            .then_some(ErrorCode::Server(code))
    }

    /// Map a numeric code back to its taxonomy entry.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -32700 => Some(ErrorCode::ParseError),
            -32600 => Some(ErrorCode::InvalidRequest),
            -32601 => Some(ErrorCode::MethodNotFound),
            -32602 => Some(ErrorCode::InvalidParams),
            -32603 => Some(ErrorCode::InternalError),
            other => ErrorCode::server(other),
        }
    }
}

/// A JSON-RPC 2.0 error object.
///
/// Implements `Display` as `"JSON-RPC error {code}: {message}"`.
///
/// # Examples
///
/// ```
/// use camcp::mcp::types::RpcError;
///
/// let e = RpcError::invalid_request("Tool name is required");
/// assert_eq!(e.to_string(), "JSON-RPC error -32600: Tool name is required");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable error description.
    pub message: String,
}

impl RpcError {
    /// Create an error from a taxonomy entry and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
        }
    }

    /// `-32700`
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    /// `-32600`
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// `-32601`
    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MethodNotFound, message)
    }

    /// `-32602`
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    /// `-32603`
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Taxonomy entry for this error, if the code is a known one.
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// A request body could not be parsed into a [`Request`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to parse JSON request: {0}")]
pub struct ParseError(pub String);

impl From<ParseError> for RpcError {
    fn from(err: ParseError) -> Self {
        RpcError::parse_error(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A parsed JSON-RPC request envelope.
///
/// Every recognized field carries its documented default when absent:
/// `jsonrpc` falls back to `"2.0"`, `method` to the empty string and `params`
/// to an empty map. `id` is kept exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Envelope version (`"2.0"` unless the client sent another string).
    pub jsonrpc: String,
    /// Correlation value. `None` when the key was absent; echoed verbatim.
    pub id: Option<Value>,
    /// Method name, empty when absent or not a string.
    pub method: String,
    /// Parameters, empty when absent or not an object.
    pub params: Map<String, Value>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: String::new(),
            params: Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tool types
// ---------------------------------------------------------------------------

/// A tool exposed through `tools/list`.
///
/// # Examples
///
/// ```
/// use camcp::mcp::types::ToolDescriptor;
///
/// let tool = ToolDescriptor::new("led", "Controls the LED", serde_json::json!({"type": "object"}));
/// let json = serde_json::to_value(&tool).unwrap();
/// assert_eq!(json["inputSchema"]["type"], "object");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Unique name of the tool.
    pub name: String,
    /// Human-readable description of the tool's purpose.
    pub description: String,
    /// JSON Schema describing the accepted arguments.
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Create a new tool descriptor
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// A single content item in a tool response.
///
/// Discriminated by the `"type"` field on the wire.
///
/// # Examples
///
/// ```
/// use camcp::mcp::types::ToolResponseContent;
///
/// let c = ToolResponseContent::text("hello");
/// let json = serde_json::to_value(&c).unwrap();
/// assert_eq!(json["type"], "text");
/// assert_eq!(json["text"], "hello");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolResponseContent {
    /// Plain text output.
    Text {
        /// The text content.
        text: String,
    },
    /// A base64-encoded image.
    Image {
        /// Base64-encoded image bytes.
        data: String,
        /// MIME type of the image (e.g. `"image/jpeg"`).
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl ToolResponseContent {
    /// Shorthand for a text item.
    pub fn text(text: impl Into<String>) -> Self {
        ToolResponseContent::Text { text: text.into() }
    }

    /// The text of a text item.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ToolResponseContent::Text { text } => Some(text),
            ToolResponseContent::Image { .. } => None,
        }
    }
}

/// Result payload of a successful `tools/call`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CallToolResponse {
    /// The content items produced by the tool.
    pub content: Vec<ToolResponseContent>,
}

impl CallToolResponse {
    /// A response holding one text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResponseContent::text(text)],
        }
    }
}

/// Result payload of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResponse {
    /// Tools in registration order.
    pub tools: Vec<ToolDescriptor>,
}

// ---------------------------------------------------------------------------
// Initialize types
// ---------------------------------------------------------------------------

/// Identifies this server implementation by name and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// Display name of the server.
    pub name: String,
    /// Firmware version string.
    pub version: String,
}

/// Tool capability advertised by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    /// The tool list is fixed for the life of the process.
    pub list_changed: bool,
}

/// Capabilities advertised in the `initialize` result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tool support descriptor.
    pub tools: ToolsCapability,
}

/// Result payload of `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    /// Protocol revision spoken by the server.
    pub protocol_version: String,
    /// Capabilities advertised by this server.
    pub capabilities: ServerCapabilities,
    /// Information identifying this server implementation.
    pub server_info: Implementation,
}
