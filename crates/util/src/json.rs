//! Small JSON helpers shared by the transport and the step executor.

use serde_json::Value;

/// Returns true when a decoded value carries no data.
///
/// `null`, `false`, zero, the empty string, the empty array and the empty
/// object all count as empty. An API answering with any of these has nothing
/// more to give for the current request.
pub fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64().is_some_and(|float| float == 0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Renders a value for places that only accept text (headers, query strings, URL paths).
///
/// Strings are used verbatim; everything else uses its JSON rendering.
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
