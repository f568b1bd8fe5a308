//! Network link status tool

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::hal::{Link, LinkInfo};
use crate::mcp::types::{CallToolResponse, RpcError, ToolDescriptor};
use crate::tools::{ToolHandler, TOOL_WIFI_STATUS};

/// Reports addressing and signal details of the current association.
pub struct WifiStatusTool {
    link: Arc<dyn Link>,
}

impl WifiStatusTool {
    /// Create the tool around the link provider.
    pub fn new(link: Arc<dyn Link>) -> Self {
        Self { link }
    }
}

fn render(info: &LinkInfo) -> String {
    format!(
        "IP Address: {}\nSignal Strength: {} dBm\nMAC Address: {}\nGateway: {}\nDNS: {}\n",
        info.ip, info.rssi_dbm, info.mac, info.gateway, info.dns
    )
}

impl ToolHandler for WifiStatusTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            TOOL_WIFI_STATUS,
            "Gets current WiFi connection status and network information",
            json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        )
    }

    fn call(&self, _args: &Map<String, Value>) -> Result<CallToolResponse, RpcError> {
        Ok(CallToolResponse::text(render(&self.link.info())))
    }
}
