//! Raw experiment options as received from a host.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// Option name to value, as posted by an experimenter.
pub type Options = serde_json::Map<String, Value>;

/// Deserialize options into a typed configuration.
///
/// The target type is expected to use `#[serde(default)]`, so missing fields
/// take their defaults and unknown fields are ignored.
pub fn parse_options<T: DeserializeOwned>(options: &Options) -> EngineResult<T> {
    serde_json::from_value(Value::Object(options.clone()))
        .map_err(|e| EngineError::config("options", e.to_string()))
}

/// Parse a JSON document that must be an object.
pub fn options_from_json(json: &str) -> EngineResult<Options> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(EngineError::config(
            "options",
            format!("expected a JSON object, got {}", kind_of(&other)),
        )),
        Err(e) => Err(EngineError::config("options", format!("JSON parse error: {e}"))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
