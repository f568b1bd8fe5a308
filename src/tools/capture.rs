//! Camera capture tool
//!
//! A capture discards a few warm-up frames so the returned image is fresh,
//! optionally lights the flash around the whole sequence, and returns the
//! frame as a base64 JPEG content item.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Map, Value};

use crate::config::CameraConfig;
use crate::hal::{Actuator, Camera};
use crate::mcp::types::{CallToolResponse, RpcError, ToolDescriptor, ToolResponseContent};
use crate::tools::args::{switch, switch_schema};
use crate::tools::{ToolHandler, TOOL_CAPTURE};

const INVALID_FLASH: &str = "Invalid flash option. Use 'on' or 'off'.";

/// MIME type of captured frames.
pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// Captures one photo, optionally with the flash on.
pub struct CaptureTool {
    camera: Arc<dyn Camera>,
    flash: Arc<dyn Actuator>,
    warmup_frames: u32,
    flash_settle: Duration,
}

impl CaptureTool {
    /// Create the tool around the camera and the flash actuator.
    pub fn new(camera: Arc<dyn Camera>, flash: Arc<dyn Actuator>, config: &CameraConfig) -> Self {
        Self {
            camera,
            flash,
            warmup_frames: config.warmup_frames,
            flash_settle: Duration::from_millis(config.flash_settle_ms),
        }
    }

    fn grab_frame(&self) -> Result<Vec<u8>, RpcError> {
        for _ in 0..self.warmup_frames {
            if let Err(e) = self.camera.capture() {
                tracing::debug!(error = %e, "Warm-up frame failed");
            }
        }
        self.camera.capture().map_err(|e| {
            tracing::error!(error = %e, "Camera capture failed");
            RpcError::internal_error("Camera capture failed")
        })
    }
}

impl ToolHandler for CaptureTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            TOOL_CAPTURE,
            "Captures a photo from the ESP32-CAM",
            json!({
                "type": "object",
                "properties": {
                    "flash": switch_schema("Use flash when capturing")
                },
                "additionalProperties": false
            }),
        )
    }

    fn call(&self, args: &Map<String, Value>) -> Result<CallToolResponse, RpcError> {
        let use_flash = switch(args, "flash", INVALID_FLASH)?.unwrap_or(false);

        if let Err(e) = self.camera.init_status() {
            tracing::warn!(error = %e, "Capture requested without a camera");
            return Err(RpcError::internal_error(
                "Camera not initialized or failed to initialize",
            ));
        }

        if use_flash {
            self.flash
                .set(true)
                .map_err(|e| RpcError::internal_error(e.to_string()))?;
            std::thread::sleep(self.flash_settle);
        }

        let frame = self.grab_frame();

        if use_flash {
            if let Err(e) = self.flash.set(false) {
                if frame.is_err() {
                    // the capture failure is the one the caller needs to see
                    tracing::error!(error = %e, "Failed to switch flash off after failed capture");
                } else {
                    return Err(RpcError::internal_error(e.to_string()));
                }
            }
        }

        let encoded = STANDARD.encode(frame?);
        Ok(CallToolResponse {
            content: vec![
                ToolResponseContent::text(format!(
                    "Image captured successfully. Size: {} bytes (base64 encoded)",
                    encoded.len()
                )),
                ToolResponseContent::Image {
                    data: encoded,
                    mime_type: JPEG_MIME_TYPE.to_string(),
                },
            ],
        })
    }
}
