pub mod async_runtime;
pub mod http;
pub mod json;

pub use async_runtime::block_on_future;
pub use json::{is_empty_json, render_scalar};

use once_cell::sync::Lazy;
use regex::Regex;

static SENSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization: )([\w\-\.=:/+]+)",
        r"(?i)([A-Z0-9_]*?(KEY|TOKEN|SECRET|PASSWORD)=)([^\s&]+)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("redaction pattern compiles"))
    .collect()
});

/// Redacts values that look like secrets in a string.
///
/// Used before logging request URLs and transport errors, which may carry
/// credentials in headers or query strings.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for regex in SENSITIVE_PATTERNS.iter() {
        redacted = regex
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}<redacted>", prefix)
            })
            .to_string();
    }
    redacted
}
