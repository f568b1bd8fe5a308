//! System status tool

use std::fmt::Write as _;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::hal::{Camera, SystemInfo, SystemSnapshot};
use crate::mcp::types::{CallToolResponse, RpcError, ToolDescriptor};
use crate::tools::{ToolHandler, TOOL_SYSTEM_STATUS};

/// Reports uptime, memory, CPU, firmware and camera health.
pub struct SystemStatusTool {
    system: Arc<dyn SystemInfo>,
    camera: Arc<dyn Camera>,
}

impl SystemStatusTool {
    /// Create the tool around the platform statistics and the camera.
    pub fn new(system: Arc<dyn SystemInfo>, camera: Arc<dyn Camera>) -> Self {
        Self { system, camera }
    }
}

fn bytes_or_unknown(value: Option<u64>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| format!("{} bytes", v))
}

fn render(snapshot: &SystemSnapshot, camera: Result<(), String>) -> String {
    let mut text = String::from("System Status:\n");
    // writing into a String cannot fail
    let _ = writeln!(text, "Uptime: {} seconds", snapshot.uptime.as_secs());
    let _ = writeln!(text, "Free Heap: {}", bytes_or_unknown(snapshot.free_heap));
    let _ = writeln!(
        text,
        "Min Free Heap: {}",
        bytes_or_unknown(snapshot.min_free_heap)
    );
    if let Some(bytes) = snapshot.max_alloc_heap {
        let _ = writeln!(text, "Max Alloc Heap: {} bytes", bytes);
    }
    match snapshot.cpu_mhz {
        Some(mhz) => {
            let _ = writeln!(text, "CPU Frequency: {} MHz", mhz);
        }
        None => text.push_str("CPU Frequency: unknown\n"),
    }
    // platform extras are left out when the host cannot report them
    if let Some(bytes) = snapshot.flash_size {
        let _ = writeln!(text, "Flash Size: {} bytes", bytes);
    }
    if let Some(hz) = snapshot.flash_speed_hz {
        let _ = writeln!(text, "Flash Speed: {} Hz", hz);
    }
    if let Some(bytes) = snapshot.sketch_size {
        let _ = writeln!(text, "Sketch Size: {} bytes", bytes);
    }
    if let Some(bytes) = snapshot.free_sketch_space {
        let _ = writeln!(text, "Free Sketch Space: {} bytes", bytes);
    }
    if let Some(sdk) = &snapshot.sdk_version {
        let _ = writeln!(text, "SDK Version: {}", sdk);
    }
    let _ = writeln!(text, "CPU Cores: {}", snapshot.cpu_cores);
    let _ = writeln!(text, "Firmware Version: {}", snapshot.firmware_version);
    let _ = writeln!(text, "Reset Reason: {}", snapshot.reset_reason);
    match camera {
        Ok(()) => text.push_str("Camera initialized: Yes\n"),
        Err(reason) => {
            let _ = writeln!(text, "Camera initialized: No ({})", reason);
        }
    }
    if let Some(celsius) = snapshot.temperature_c {
        let _ = writeln!(text, "Internal Temperature: {:.2} °C", celsius);
    }
    text
}

impl ToolHandler for SystemStatusTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            TOOL_SYSTEM_STATUS,
            "Gets comprehensive system status including memory, uptime, and hardware info",
            json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        )
    }

    fn call(&self, _args: &Map<String, Value>) -> Result<CallToolResponse, RpcError> {
        let snapshot = self.system.snapshot();
        let camera = self.camera.init_status().map_err(|e| e.to_string());
        Ok(CallToolResponse::text(render(&snapshot, camera)))
    }
}
