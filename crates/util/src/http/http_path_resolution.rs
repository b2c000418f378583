use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Map, Value};

use crate::json::render_scalar;

/// Everything except RFC 3986 unreserved bytes (`A-Z a-z 0-9 - . _ ~`).
const PLACEHOLDER_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Replaces `{name}` placeholders in a URL template with bound values.
///
/// Values are percent-encoded so a bound value can never change the URL
/// structure. Placeholders without a bound value are left untouched.
///
/// # Examples
/// ```rust
/// use parsify_util::http::fill_url_placeholders;
/// use serde_json::{Map, json};
///
/// let mut variables = Map::new();
/// variables.insert("category".into(), json!("home & garden"));
/// variables.insert("page".into(), json!(3));
///
/// let url = fill_url_placeholders("https://shop.example.com/c/{category}/p/{page}", &variables);
/// assert_eq!(url, "https://shop.example.com/c/home%20%26%20garden/p/3");
/// ```
pub fn fill_url_placeholders(template: &str, variables: &Map<String, Value>) -> String {
    let mut url = template.to_string();
    for (name, value) in variables {
        let rendered = render_scalar(value);
        let encoded = utf8_percent_encode(&rendered, PLACEHOLDER_VALUE).to_string();
        url = url.replace(&format!("{{{}}}", name), &encoded);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::fill_url_placeholders;
    use serde_json::{Map, Value, json};

    #[test]
    fn preserves_unreserved_identifier_bytes() {
        let mut variables = Map::new();
        variables.insert("region".to_string(), Value::String("eu-west_1.a~b".to_string()));

        let url = fill_url_placeholders("https://api.example.com/regions/{region}/items", &variables);
        assert_eq!(url, "https://api.example.com/regions/eu-west_1.a~b/items");
    }

    #[test]
    fn encodes_reserved_bytes_and_keeps_unknown_placeholders() {
        let mut variables = Map::new();
        variables.insert("team".to_string(), json!("core/infra"));

        let url = fill_url_placeholders("https://api.example.com/{team}/{missing}", &variables);
        assert_eq!(url, "https://api.example.com/core%2Finfra/{missing}");
    }
}
