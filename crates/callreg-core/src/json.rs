//! JSON bridge for calling registered methods with `serde_json` values.
//!
//! Lets a JSON-RPC style front end pass positional `params` straight through:
//!
//! | JSON                         | Value             |
//! |------------------------------|-------------------|
//! | `true` / `false`             | `Bool`            |
//! | integer fitting `i64`        | `I64`             |
//! | integer above `i64::MAX`     | `U64`             |
//! | other number                 | `F64`             |
//! | string                       | `Str`             |
//! | array of integers `0..=255`  | `Bytes`           |
//!
//! `null` and objects have no [`Value`] counterpart and are rejected.

use crate::error::{CallregError, Result};
use crate::registry::Registry;
use crate::value::Value;
use serde_json::Value as JsonValue;

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(v) => JsonValue::from(v),
            Value::I8(v) => JsonValue::from(v),
            Value::I16(v) => JsonValue::from(v),
            Value::I32(v) => JsonValue::from(v),
            Value::I64(v) => JsonValue::from(v),
            Value::U8(v) => JsonValue::from(v),
            Value::U16(v) => JsonValue::from(v),
            Value::U32(v) => JsonValue::from(v),
            Value::U64(v) => JsonValue::from(v),
            Value::F32(v) => JsonValue::from(v),
            Value::F64(v) => JsonValue::from(v),
            Value::Char(v) => JsonValue::from(v.to_string()),
            Value::Str(v) => JsonValue::from(v),
            Value::Bytes(v) => JsonValue::from(v),
        }
    }
}

impl TryFrom<&JsonValue> for Value {
    type Error = CallregError;

    fn try_from(json: &JsonValue) -> Result<Self> {
        match json {
            JsonValue::Bool(b) => Ok(Value::Bool(*b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::I64(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(Value::U64(u))
                } else {
                    n.as_f64()
                        .map(Value::F64)
                        .ok_or_else(|| CallregError::InvalidParams {
                            message: format!("Unsupported number: {}", n),
                        })
                }
            }
            JsonValue::String(s) => Ok(Value::Str(s.clone())),
            JsonValue::Array(items) => items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .map(Value::Bytes)
                .ok_or_else(|| CallregError::InvalidParams {
                    message: "Only arrays of bytes (0-255) are supported".to_string(),
                }),
            JsonValue::Null | JsonValue::Object(_) => Err(CallregError::InvalidParams {
                message: format!("Unsupported argument: {}", json),
            }),
        }
    }
}

/// Convert positional JSON params into call arguments.
///
/// `null` means no arguments; anything else must be an array.
pub fn params_to_args(params: &JsonValue) -> Result<Vec<Value>> {
    match params {
        JsonValue::Null => Ok(Vec::new()),
        JsonValue::Array(items) => items.iter().map(Value::try_from).collect(),
        other => Err(CallregError::InvalidParams {
            message: format!("Params must be an array, got {}", other),
        }),
    }
}

impl Registry {
    /// Call a registered method with JSON positional params and return the
    /// results as a JSON array.
    pub fn call_json(&self, name: &str, params: &JsonValue) -> Result<JsonValue> {
        let args = params_to_args(params)?;
        let rets = self.call(name, args)?;
        Ok(JsonValue::Array(rets.into_iter().map(JsonValue::from).collect()))
    }

    /// Introspection records as a JSON array.
    pub fn describe_json(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self.describe()?)?)
    }
}
