//! Status LED tool

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::hal::Actuator;
use crate::mcp::types::{CallToolResponse, RpcError, ToolDescriptor};
use crate::tools::args::{switch, switch_schema};
use crate::tools::{ToolHandler, TOOL_LED};

const INVALID_STATE: &str = "Invalid LED state. Use 'on' or 'off'.";

/// Switches the status LED on or off.
///
/// `state` is required; anything but `"on"`/`"off"` is rejected before the
/// LED is touched.
pub struct LedTool {
    led: Arc<dyn Actuator>,
}

impl LedTool {
    /// Create the tool around the LED actuator.
    pub fn new(led: Arc<dyn Actuator>) -> Self {
        Self { led }
    }
}

impl ToolHandler for LedTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            TOOL_LED,
            "Controls the ESP32-CAM LED state",
            json!({
                "type": "object",
                "properties": {
                    "state": switch_schema("LED state")
                },
                "required": ["state"],
                "additionalProperties": false
            }),
        )
    }

    fn call(&self, args: &Map<String, Value>) -> Result<CallToolResponse, RpcError> {
        let on = switch(args, "state", INVALID_STATE)?
            .ok_or_else(|| RpcError::invalid_params(INVALID_STATE))?;

        self.led
            .set(on)
            .map_err(|e| RpcError::internal_error(e.to_string()))?;

        Ok(CallToolResponse::text(if on {
            "LED turned on"
        } else {
            "LED turned off"
        }))
    }
}
