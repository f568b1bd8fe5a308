//! Request parsing and response assembly
//!
//! This module is the protocol engine of the device:
//!
//! - [`Request::parse`] turns a raw HTTP body into a [`Request`], or a
//!   [`ParseError`] when the body is not a JSON object.
//! - [`ResponseBuilder`] collects the correlation id and exactly one outcome
//!   (result map or error object) and serializes the envelope into an
//!   [`HttpReply`].
//!
//! # Design
//!
//! Parsing is lenient for recognized fields: missing or mistyped `jsonrpc`,
//! `method` and `params` fall back to their defaults and unknown keys are
//! ignored. The engine never validates `method`; routing is the router's job.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::mcp::types::{ErrorCode, ParseError, Request, RpcError, JSONRPC_VERSION};

/// `Content-Type` of protocol responses.
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// `Content-Type` of transport-level plain responses.
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

impl Request {
    /// Parse a raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if `raw` is not well-formed JSON or if its top
    /// level is not an object.
    ///
    /// # Examples
    ///
    /// ```
    /// use camcp::mcp::types::Request;
    ///
    /// let req = Request::parse(br#"{"id":"a","method":"tools/list"}"#).unwrap();
    /// assert_eq!(req.jsonrpc, "2.0");
    /// assert_eq!(req.id, Some(serde_json::json!("a")));
    /// assert!(Request::parse(b"[1,2]").is_err());
    /// ```
    pub fn parse(raw: &[u8]) -> Result<Request, ParseError> {
        let value: Value =
            serde_json::from_slice(raw).map_err(|e| ParseError(e.to_string()))?;

        let mut object = match value {
            Value::Object(object) => object,
            other => {
                return Err(ParseError(format!(
                    "top level must be an object, found {}",
                    json_kind(&other)
                )))
            }
        };

        let mut request = Request::default();
        if let Some(Value::String(version)) = object.remove("jsonrpc") {
            request.jsonrpc = version;
        }
        request.id = object.remove("id");
        if let Some(Value::String(method)) = object.remove("method") {
            request.method = method;
        }
        if let Some(Value::Object(params)) = object.remove("params") {
            request.params = params;
        }
        Ok(request)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// HTTP status, content type and body produced for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Content-Type` header.
    pub content_type: &'static str,
    /// Response body.
    pub body: String,
}

impl HttpReply {
    /// A JSON body with the given status.
    pub fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: CONTENT_TYPE_JSON,
            body,
        }
    }

    /// A plain-text body with the given status.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: CONTENT_TYPE_TEXT,
            body: body.into(),
        }
    }

    /// 500 for a response that could not be serialized.
    pub fn serialization_failure(detail: impl std::fmt::Display) -> Self {
        Self::text(500, format!("internal serialization failure: {}", detail))
    }

    /// 503 while the network link is not ready.
    pub fn unavailable() -> Self {
        Self::text(503, "Network link unavailable")
    }

    /// 405 for anything other than POST or OPTIONS.
    pub fn method_not_allowed() -> Self {
        Self::text(405, "Only POST allowed")
    }

    /// 200 answer to a CORS preflight.
    pub fn preflight() -> Self {
        Self::text(200, "OK")
    }
}

/// Builder for one JSON-RPC response envelope.
///
/// Holds at most one of `result` or `error`: each setter clears the other,
/// so the last write wins. Callers are expected to write exactly one.
///
/// # Examples
///
/// ```
/// use camcp::mcp::protocol::ResponseBuilder;
///
/// let mut response = ResponseBuilder::new("2.0");
/// response.set_id(Some(&serde_json::json!(7)));
/// response.set_result().insert("acknowledged".into(), true.into());
///
/// let reply = response.serialize();
/// assert_eq!(reply.status, 200);
/// assert_eq!(reply.body, r#"{"jsonrpc":"2.0","id":7,"result":{"acknowledged":true}}"#);
/// ```
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    jsonrpc: String,
    id: Value,
    result: Option<Map<String, Value>>,
    error: Option<RpcError>,
}

impl ResponseBuilder {
    /// Start a response with the given envelope version and a `null` id.
    pub fn new(jsonrpc: impl Into<String>) -> Self {
        Self {
            jsonrpc: jsonrpc.into(),
            id: Value::Null,
            result: None,
            error: None,
        }
    }

    /// Copy the correlation value from a request.
    ///
    /// The value is stored as-is; an absent id is written as `null`.
    pub fn set_id(&mut self, id: Option<&Value>) -> &mut Self {
        self.id = id.cloned().unwrap_or(Value::Null);
        self
    }

    /// Mark the response successful and return the result map to populate.
    ///
    /// Clears any previously set error. Calling it again returns the same map.
    pub fn set_result(&mut self) -> &mut Map<String, Value> {
        self.error = None;
        self.result.get_or_insert_with(Map::new)
    }

    /// Mark the response successful with the fields of a serializable value.
    ///
    /// A value that does not encode to an object becomes an `internal_error`.
    pub fn set_result_from<T: Serialize>(&mut self, value: &T) {
        match serde_json::to_value(value) {
            Ok(Value::Object(fields)) => self.set_result().extend(fields),
            Ok(other) => {
                self.set_error(
                    ErrorCode::InternalError,
                    format!("result must be an object, found {}", json_kind(&other)),
                );
            }
            Err(e) => {
                self.set_error(
                    ErrorCode::InternalError,
                    format!("failed to encode result: {}", e),
                );
            }
        }
    }

    /// Mark the response failed with the given code and message.
    ///
    /// Clears any previously set result.
    pub fn set_error(&mut self, code: ErrorCode, message: impl Into<String>) -> &mut RpcError {
        self.fail(RpcError::new(code, message))
    }

    /// Mark the response failed with a prepared error object.
    pub fn fail(&mut self, error: RpcError) -> &mut RpcError {
        self.result = None;
        self.error.insert(error)
    }

    /// Correlation value currently held.
    pub fn id(&self) -> &Value {
        &self.id
    }

    /// Error currently held, if any.
    pub fn error(&self) -> Option<&RpcError> {
        self.error.as_ref()
    }

    /// Result map currently held, if any.
    pub fn result(&self) -> Option<&Map<String, Value>> {
        self.result.as_ref()
    }

    /// Whether a result or an error has been written.
    pub fn has_outcome(&self) -> bool {
        self.result.is_some() || self.error.is_some()
    }

    /// Build the envelope value, or `None` when no outcome was written.
    pub fn to_value(&self) -> Option<Value> {
        let mut envelope = Map::new();
        envelope.insert("jsonrpc".to_string(), Value::String(self.jsonrpc.clone()));
        envelope.insert("id".to_string(), self.id.clone());
        if let Some(error) = &self.error {
            envelope.insert("error".to_string(), serde_json::to_value(error).ok()?);
        } else if let Some(result) = &self.result {
            envelope.insert("result".to_string(), Value::Object(result.clone()));
        } else {
            return None;
        }
        Some(Value::Object(envelope))
    }

    /// Serialize into an HTTP status, content type and body.
    ///
    /// 200 with a result, 400 with an error, 500 `text/plain` when the
    /// envelope cannot be produced.
    pub fn serialize(&self) -> HttpReply {
        let Some(envelope) = self.to_value() else {
            tracing::error!(id = %self.id, "Response built without result or error");
            return HttpReply::serialization_failure("response has neither result nor error");
        };

        match serde_json::to_string(&envelope) {
            Ok(body) if self.error.is_some() => HttpReply::json(400, body),
            Ok(body) => HttpReply::json(200, body),
            Err(e) => HttpReply::serialization_failure(e),
        }
    }
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new(JSONRPC_VERSION)
    }
}
