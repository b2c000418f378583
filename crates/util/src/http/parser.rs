//! # HTTP Response Parsing
//!
//! Strict JSON decoding of response bodies with enough context in the error to
//! tell a truncated page from an HTML error page when reading logs.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Parse HTTP response text into JSON, providing detailed errors on failure.
///
/// # Arguments
/// * `text` - The raw HTTP response body text
/// * `status` - Optional HTTP status code for error context
///
/// # Errors
/// Returns a [`JsonParseError`] carrying the serde error and up to 200
/// characters of the body with whitespace collapsed.
///
/// # Example
/// ```rust
/// use parsify_util::http::parse_response_json_strict;
///
/// let value = parse_response_json_strict(r#"{"items": [1, 2]}"#, None).unwrap();
/// assert_eq!(value["items"][1], 2);
///
/// let error = parse_response_json_strict("<html>oops</html>", None).unwrap_err();
/// assert_eq!(error.body_preview(), "<html>oops</html>");
/// ```
pub fn parse_response_json_strict(text: &str, status: Option<StatusCode>) -> Result<Value, JsonParseError> {
    serde_json::from_str::<Value>(text).map_err(|error| {
        let status_note = status
            .map(|code| format!("status {code}"))
            .unwrap_or_else(|| "unknown status".to_string());
        let preview = truncate_response_preview(text, 200);

        JsonParseError::new(status_note, error, preview)
    })
}

/// Collapses whitespace and caps the preview at roughly `limit` bytes.
pub fn truncate_response_preview(text: &str, limit: usize) -> String {
    if text.trim().is_empty() {
        return "<empty>".to_string();
    }

    let mut preview = String::new();
    for ch in text.chars() {
        if preview.len() >= limit {
            preview.push_str("...");
            break;
        }
        match ch {
            '\n' | '\r' | '\t' => {
                if !preview.ends_with(' ') {
                    preview.push(' ');
                }
            }
            _ => preview.push(ch),
        }
    }

    preview.trim().to_string()
}

/// Error returned when strict JSON parsing of an HTTP response fails.
#[derive(Debug, Error)]
#[error("failed to parse JSON response ({status_note}): {source}. body preview: {body_preview}")]
pub struct JsonParseError {
    status_note: String,
    #[source]
    source: serde_json::Error,
    body_preview: String,
}

impl JsonParseError {
    pub fn new(status_note: String, source: serde_json::Error, body_preview: String) -> Self {
        Self {
            status_note,
            source,
            body_preview,
        }
    }

    /// Access the truncated response preview captured during parsing.
    pub fn body_preview(&self) -> &str {
        &self.body_preview
    }
}
