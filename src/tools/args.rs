//! Argument helpers for tool handlers
//!
//! `tools/call` arguments arrive as an untyped JSON map. These helpers pull
//! the few shapes the device tools accept out of it and turn violations into
//! `invalid_params` errors carrying the caller-facing message.

use serde_json::{Map, Value};

use crate::mcp::types::RpcError;

/// An `"on"`/`"off"` switch argument.
///
/// Returns `Ok(None)` when the key is absent or `null`. Any other value
/// outside the enumeration fails with `invalid_params` and `message`.
///
/// # Examples
///
/// ```
/// use camcp::tools::args::switch;
/// use serde_json::json;
///
/// let args = json!({"state": "on"});
/// let args = args.as_object().unwrap();
/// assert_eq!(switch(args, "state", "bad state").unwrap(), Some(true));
/// assert_eq!(switch(args, "missing", "bad state").unwrap(), None);
/// ```
pub fn switch(args: &Map<String, Value>, key: &str, message: &str) -> Result<Option<bool>, RpcError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s == "on" => Ok(Some(true)),
        Some(Value::String(s)) if s == "off" => Ok(Some(false)),
        Some(_) => Err(RpcError::invalid_params(message)),
    }
}

/// A numeric argument constrained to `min..=max`, defaulting when absent.
///
/// `null` counts as absent. Non-numbers and out-of-range values fail with
/// `invalid_params`.
pub fn bounded_number(
    args: &Map<String, Value>,
    key: &str,
    min: f64,
    max: f64,
    default: f64,
) -> Result<f64, RpcError> {
    let value = match args.get(key) {
        None | Some(Value::Null) => return Ok(default),
        Some(value) => value,
    };
    let Some(number) = value.as_f64() else {
        return Err(RpcError::invalid_params(format!(
            "'{}' must be a number between {} and {}",
            key, min, max
        )));
    };
    if !(min..=max).contains(&number) {
        return Err(RpcError::invalid_params(format!(
            "'{}' must be between {} and {}, got {}",
            key, min, max, number
        )));
    }
    Ok(number)
}

/// JSON schema property for an `"on"`/`"off"` switch.
pub fn switch_schema(description: &str) -> Value {
    serde_json::json!({
        "type": "string",
        "description": description,
        "enum": ["on", "off"]
    })
}
