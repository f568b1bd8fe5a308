//! Method dispatch
//!
//! [`Router::handle`] runs one request end to end: parse the body, copy the
//! id, dispatch on `method`, serialize. It never fails; every problem ends
//! up as a JSON-RPC error envelope or, for a broken builder, a 500 reply.

use serde_json::{Map, Value};

use crate::mcp::protocol::{HttpReply, ResponseBuilder};
use crate::mcp::types::{
    ErrorCode, Implementation, InitializeResponse, ListToolsResponse, Request,
    ServerCapabilities, ToolsCapability, JSONRPC_VERSION, METHOD_INITIALIZE, METHOD_INITIALIZED,
    METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
};
use crate::tools::ToolRegistry;

/// Routes parsed requests to the fixed handlers and the tool registry.
pub struct Router {
    tools: ToolRegistry,
    server_info: Implementation,
    protocol_version: String,
}

impl Router {
    /// Create a router over a built registry.
    pub fn new(
        tools: ToolRegistry,
        server_info: Implementation,
        protocol_version: impl Into<String>,
    ) -> Self {
        Self {
            tools,
            server_info,
            protocol_version: protocol_version.into(),
        }
    }

    /// Registered tools.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Handle one raw request body.
    pub fn handle(&self, body: &[u8]) -> HttpReply {
        let mut response = ResponseBuilder::new(JSONRPC_VERSION);

        match Request::parse(body) {
            Ok(request) => {
                response.set_id(request.id.as_ref());
                tracing::debug!(method = %request.method, id = %response.id(), "Handling request");
                self.dispatch(&request, &mut response);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting unparsable request");
                response.fail(e.into());
            }
        }

        let reply = response.serialize();
        tracing::debug!(status = reply.status, bytes = reply.body.len(), "Sending response");
        reply
    }

    /// Dispatch a parsed request, writing exactly one outcome.
    pub fn dispatch(&self, request: &Request, response: &mut ResponseBuilder) {
        match request.method.as_str() {
            METHOD_INITIALIZE => self.handle_initialize(response),
            METHOD_INITIALIZED => {
                response
                    .set_result()
                    .insert("acknowledged".to_string(), Value::Bool(true));
            }
            METHOD_TOOLS_LIST => response.set_result_from(&ListToolsResponse {
                tools: self.tools.list_tools(),
            }),
            METHOD_TOOLS_CALL => self.handle_tools_call(&request.params, response),
            other => {
                tracing::warn!(method = other, "Unknown method");
                response.set_error(
                    ErrorCode::MethodNotFound,
                    format!("Method not found: {}", other),
                );
            }
        }
    }

    fn handle_initialize(&self, response: &mut ResponseBuilder) {
        tracing::info!("Client initializing");
        response.set_result_from(&InitializeResponse {
            protocol_version: self.protocol_version.clone(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: self.server_info.clone(),
        });
    }

    fn handle_tools_call(&self, params: &Map<String, Value>, response: &mut ResponseBuilder) {
        let name = params.get("name").and_then(Value::as_str).unwrap_or("");
        let empty = Map::new();
        let args = params
            .get("arguments")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        self.tools.call_tool(name, args, response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::types::{CallToolResponse, RpcError, ToolDescriptor};
    use crate::tools::ToolHandler;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Map<String, Value>>>,
    }

    impl ToolHandler for Recorder {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("record", "Records arguments", json!({"type": "object"}))
        }

        fn call(&self, args: &Map<String, Value>) -> Result<CallToolResponse, RpcError> {
            self.seen.lock().unwrap().push(args.clone());
            Ok(CallToolResponse::text("ok"))
        }
    }

    fn router() -> (Router, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let mut tools = ToolRegistry::new();
        tools.register(recorder.clone()).unwrap();
        let info = Implementation {
            name: "Test Server".to_string(),
            version: "9.9.9".to_string(),
        };
        (Router::new(tools, info, "2024-11-05"), recorder)
    }

    fn body(reply: &HttpReply) -> Value {
        serde_json::from_str(&reply.body).unwrap()
    }

    #[test]
    fn test_initialize() {
        let (router, _) = router();
        let reply = router.handle(br#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#);
        assert_eq!(reply.status, 200);
        assert_eq!(
            body(&reply),
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {"tools": {"listChanged": false}},
                    "serverInfo": {"name": "Test Server", "version": "9.9.9"}
                }
            })
        );
    }

    #[test]
    fn test_initialized_notification_is_acknowledged() {
        let (router, _) = router();
        let reply = router.handle(br#"{"id":"n","method":"notifications/initialized"}"#);
        assert_eq!(reply.status, 200);
        assert_eq!(body(&reply)["result"], json!({"acknowledged": true}));
        assert_eq!(body(&reply)["id"], "n");
    }

    #[test]
    fn test_tools_list() {
        let (router, _) = router();
        let reply = router.handle(br#"{"id":1,"method":"tools/list","params":{"ignored":1}}"#);
        let tools = &body(&reply)["result"]["tools"];
        assert_eq!(tools.as_array().unwrap().len(), 1);
        assert_eq!(tools[0]["name"], "record");
        assert_eq!(tools[0]["inputSchema"]["type"], "object");
    }

    #[test]
    fn test_tools_call_forwards_arguments() {
        let (router, recorder) = router();
        let reply = router.handle(
            br#"{"id":2,"method":"tools/call","params":{"name":"record","arguments":{"x":1}}}"#,
        );
        assert_eq!(reply.status, 200);
        assert_eq!(recorder.seen.lock().unwrap()[0], json!({"x": 1}).as_object().cloned().unwrap());
    }

    #[test]
    fn test_tools_call_non_object_arguments_become_empty() {
        let (router, recorder) = router();
        router.handle(br#"{"id":2,"method":"tools/call","params":{"name":"record","arguments":[1]}}"#);
        assert!(recorder.seen.lock().unwrap()[0].is_empty());
    }

    #[test]
    fn test_tools_call_without_name() {
        let (router, _) = router();
        let reply = router.handle(br#"{"id":3,"method":"tools/call","params":{}}"#);
        assert_eq!(reply.status, 400);
        assert_eq!(body(&reply)["error"]["code"], -32600);
    }

    #[test]
    fn test_unknown_method() {
        let (router, _) = router();
        let reply = router.handle(br#"{"id":4,"method":"resources/list"}"#);
        assert_eq!(reply.status, 400);
        assert_eq!(
            body(&reply)["error"],
            json!({"code": -32601, "message": "Method not found: resources/list"})
        );
    }

    #[test]
    fn test_malformed_body() {
        let (router, _) = router();
        let reply = router.handle(b"{not json");
        assert_eq!(reply.status, 400);
        let value = body(&reply);
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["error"]["code"], -32700);
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_id_echoed_verbatim() {
        let (router, _) = router();
        for id in [json!(7), json!("7"), json!(null), json!(1.5)] {
            let request = json!({"id": id, "method": "tools/list"});
            let reply = router.handle(request.to_string().as_bytes());
            assert_eq!(body(&reply)["id"], id);
        }
        let reply = router.handle(br#"{"method":"tools/list"}"#);
        assert_eq!(body(&reply)["id"], Value::Null);
    }

    #[test]
    fn test_id_numbers_beyond_native_range_echoed_verbatim() {
        let (router, _) = router();
        for id in ["18446744073709551616", "1e400", "-0.10000000000000000000001"] {
            let request = format!(r#"{{"id":{},"method":"tools/list"}}"#, id);
            let reply = router.handle(request.as_bytes());
            assert_eq!(reply.status, 200, "id {}", id);
            assert!(
                reply.body.starts_with(&format!(r#"{{"jsonrpc":"2.0","id":{},"#, id)),
                "id {} came back as {}",
                id,
                reply.body
            );
        }
    }
}
