//! Flash lamp tool

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};

use crate::hal::Actuator;
use crate::mcp::types::{CallToolResponse, RpcError, ToolDescriptor};
use crate::tools::args::bounded_number;
use crate::tools::{ToolHandler, TOOL_FLASH};

/// Shortest accepted pulse, in milliseconds.
pub const MIN_DURATION_MS: u64 = 5;
/// Longest accepted pulse, in milliseconds.
pub const MAX_DURATION_MS: u64 = 100;
/// Pulse used when `duration` is omitted.
pub const DEFAULT_DURATION_MS: u64 = 50;

/// Fires the flash for `duration` milliseconds (5 to 100, default 50).
pub struct FlashTool {
    flash: Arc<dyn Actuator>,
}

impl FlashTool {
    /// Create the tool around the flash actuator.
    pub fn new(flash: Arc<dyn Actuator>) -> Self {
        Self { flash }
    }
}

impl ToolHandler for FlashTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            TOOL_FLASH,
            "Controls the ESP32-CAM Flash",
            json!({
                "type": "object",
                "properties": {
                    "duration": {
                        "type": "number",
                        "description": "Flash duration in milliseconds",
                        "minimum": MIN_DURATION_MS,
                        "maximum": MAX_DURATION_MS,
                        "default": DEFAULT_DURATION_MS
                    }
                },
                "additionalProperties": false
            }),
        )
    }

    fn call(&self, args: &Map<String, Value>) -> Result<CallToolResponse, RpcError> {
        let duration_ms = bounded_number(
            args,
            "duration",
            MIN_DURATION_MS as f64,
            MAX_DURATION_MS as f64,
            DEFAULT_DURATION_MS as f64,
        )?
        .floor() as u64;

        tracing::debug!(duration_ms, "Firing flash");
        self.flash
            .pulse(Duration::from_millis(duration_ms))
            .map_err(|e| RpcError::internal_error(e.to_string()))?;

        Ok(CallToolResponse::text("Flash executed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockActuator;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn expect_pulse(ms: u64) -> MockActuator {
        let mut flash = MockActuator::new();
        flash
            .expect_pulse()
            .withf(move |d| *d == Duration::from_millis(ms))
            .times(1)
            .returning(|_| Ok(()));
        flash
    }

    #[test]
    fn test_default_duration() {
        let tool = FlashTool::new(Arc::new(expect_pulse(50)));
        let result = tool.call(&Map::new()).unwrap();
        assert_eq!(result, CallToolResponse::text("Flash executed"));
    }

    #[test]
    fn test_null_duration_uses_default() {
        let tool = FlashTool::new(Arc::new(expect_pulse(50)));
        assert!(tool.call(&args(json!({"duration": null}))).is_ok());
    }

    #[test]
    fn test_explicit_duration_bounds() {
        let tool = FlashTool::new(Arc::new(expect_pulse(5)));
        assert!(tool.call(&args(json!({"duration": 5}))).is_ok());

        let tool = FlashTool::new(Arc::new(expect_pulse(100)));
        assert!(tool.call(&args(json!({"duration": 100}))).is_ok());
    }

    #[test]
    fn test_fractional_duration_is_floored() {
        let tool = FlashTool::new(Arc::new(expect_pulse(12)));
        assert!(tool.call(&args(json!({"duration": 12.9}))).is_ok());
    }

    #[test]
    fn test_out_of_range_does_not_actuate() {
        let mut flash = MockActuator::new();
        flash.expect_pulse().never();
        flash.expect_set().never();
        let tool = FlashTool::new(Arc::new(flash));

        for bad in [json!({"duration": 4}), json!({"duration": 101}), json!({"duration": "50"})] {
            let err = tool.call(&args(bad)).unwrap_err();
            assert_eq!(err.code, -32602);
        }
    }

    #[test]
    fn test_descriptor_schema() {
        let tool = FlashTool::new(Arc::new(MockActuator::new()));
        let schema = tool.descriptor().input_schema;
        assert_eq!(schema["properties"]["duration"]["minimum"], 5);
        assert_eq!(schema["properties"]["duration"]["maximum"], 100);
        assert_eq!(schema["properties"]["duration"]["default"], 50);
    }
}
