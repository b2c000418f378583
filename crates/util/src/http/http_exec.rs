//! HTTP execution of prepared step requests.
//!
//! This module turns a [`PreparedRequest`] into a `reqwest` call, enforces a
//! success status, and decodes the body as JSON. Failures are typed so the
//! engine can log network, status and decoding problems distinctly even though
//! it treats all of them as "no data".

use std::time::Instant;

use parsify_api::ParsifyClient;
use parsify_types::{BodyEncoding, PreparedRequest};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    http::{JsonParseError, parse_response_json_strict, truncate_response_preview},
    json::render_scalar,
    redact_sensitive,
};

/// Failure of one HTTP exchange.
#[derive(Debug, Error)]
pub enum HttpExecError {
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("HTTP {status}: {body_preview}")]
    Status { status: u16, body_preview: String },
    #[error(transparent)]
    Decode(#[from] JsonParseError),
    #[error("could not start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Execute a prepared request and parse the response payload.
///
/// # Returns
/// Returns the parsed JSON payload for a successful response and `Value::Null`
/// for an empty body.
///
/// # Errors
/// - [`HttpExecError::InvalidMethod`] / [`HttpExecError::InvalidRequest`] before anything is sent
/// - [`HttpExecError::Network`] when the exchange fails
/// - [`HttpExecError::Status`] for non-2xx responses
/// - [`HttpExecError::Decode`] when the body is not JSON
pub async fn execute_prepared_request(client: &ParsifyClient, request: &PreparedRequest) -> Result<Value, HttpExecError> {
    let start = Instant::now();
    let method = Method::from_bytes(request.method.as_bytes()).map_err(|_| HttpExecError::InvalidMethod(request.method.clone()))?;
    let safe_url = redact_sensitive(&request.url);
    debug!(
        method = %method,
        url = %safe_url,
        header_count = request.headers.len(),
        query_parameter_count = request.query.len(),
        has_body = request.body.is_some(),
        "http request started"
    );

    let mut request_builder = client
        .request(method.clone(), &request.url)
        .map_err(|error| HttpExecError::InvalidRequest(error.to_string()))?;

    for (name, value) in &request.headers {
        request_builder = request_builder.header(name.as_str(), render_scalar(value));
    }

    if !request.query.is_empty() {
        let query_pairs = build_query_pairs(&request.query);
        request_builder = request_builder.query(&query_pairs);
    }

    match (&request.body, request.body_encoding) {
        (None, _) => {}
        (Some(body), BodyEncoding::Json) => {
            request_builder = request_builder.json(body);
        }
        (Some(Value::Object(fields)), BodyEncoding::Form) => {
            request_builder = request_builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"))
                .body(encode_form_body(fields));
        }
        (Some(other), BodyEncoding::Form) => {
            return Err(HttpExecError::InvalidRequest(format!(
                "form payload must be an object, got {}",
                json_type_name(other)
            )));
        }
    }

    let response = request_builder.send().await.map_err(HttpExecError::Network)?;
    let status = response.status();
    let body_text = response.text().await.map_err(HttpExecError::Network)?;

    if !status.is_success() {
        warn!(
            method = %method,
            url = %safe_url,
            status = %status,
            duration_ms = start.elapsed().as_millis(),
            "http request failed"
        );
        return Err(HttpExecError::Status {
            status: status.as_u16(),
            body_preview: truncate_response_preview(&body_text, 200),
        });
    }

    if body_text.trim().is_empty() {
        debug!(
            method = %method,
            url = %safe_url,
            status = %status,
            duration_ms = start.elapsed().as_millis(),
            "http request completed with empty response"
        );
        return Ok(Value::Null);
    }

    let parsed = parse_response_json_strict(&body_text, Some(status)).inspect_err(|error| {
        warn!(
            method = %method,
            url = %safe_url,
            status = %status,
            body_len = body_text.len(),
            duration_ms = start.elapsed().as_millis(),
            error = %error,
            "http response JSON parse failed"
        );
    })?;
    debug!(
        method = %method,
        url = %safe_url,
        status = %status,
        duration_ms = start.elapsed().as_millis(),
        "http request completed"
    );
    Ok(parsed)
}

/// Flattens query parameters into pairs; array values repeat the key.
pub fn build_query_pairs(query_parameters: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in query_parameters {
        match value {
            Value::Array(items) => {
                for item in items {
                    pairs.push((key.clone(), render_scalar(item)));
                }
            }
            Value::Null => {}
            other => pairs.push((key.clone(), render_scalar(other))),
        }
    }
    pairs
}

/// Encodes an object as `application/x-www-form-urlencoded`.
pub fn encode_form_body(fields: &Map<String, Value>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in build_query_pairs(fields) {
        serializer.append_pair(&key, &value);
    }
    serializer.finish()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
