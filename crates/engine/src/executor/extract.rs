//! Output path navigation and key projection.

use serde_json::Value;

use super::StopReason;

/// Walks a dot-separated path from the response root.
///
/// Object segments are keys. Array segments must parse as a non-negative
/// index. An empty path or `.` selects the root. Any missing segment yields
/// [`StopReason::PathNotFound`].
pub(crate) fn resolve_output_path<'a>(response: &'a Value, path: &str) -> Result<&'a Value, StopReason> {
    let trimmed = path.trim();
    if trimmed.is_empty() || trimmed == "." {
        return Ok(response);
    }

    let mut current = response;
    for segment in trimmed.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
            _ => None,
        };
        current = next.ok_or_else(|| StopReason::PathNotFound {
            path: trimmed.to_string(),
            segment: segment.to_string(),
        })?;
    }
    Ok(current)
}

/// Turns the selected value into a sequence, optionally projected to `key`.
///
/// A non-array value is treated as a one-element sequence. With a key, only
/// object elements that contain it contribute.
pub(crate) fn project(value: &Value, key: Option<&str>) -> Vec<Value> {
    let elements = match value {
        Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };
    match key {
        None => elements.to_vec(),
        Some(key) => elements
            .iter()
            .filter_map(|element| element.as_object().and_then(|object| object.get(key)).cloned())
            .collect(),
    }
}
