//! MCP (Model Context Protocol) server core for camcp
//!
//! The device speaks JSON-RPC 2.0 over a single HTTP endpoint. This module
//! holds everything between the raw request body and the serialized reply.
//!
//! # Module Layout
//!
//! - `types`    -- wire types, error taxonomy and method-name constants
//! - `protocol` -- request parsing and the response builder
//! - `router`   -- method dispatch onto the fixed handlers and the tool registry

pub mod protocol;
pub mod router;
pub mod types;

pub use protocol::{HttpReply, ResponseBuilder};
pub use router::Router;
pub use types::{ErrorCode, ParseError, Request, RpcError};
