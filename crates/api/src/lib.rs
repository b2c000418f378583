//! Parsify HTTP client utilities.
//!
//! This module provides a lightweight client used by the engine's HTTP
//! transport. It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults (timeout, user agent, JSON accept header)
//! - Validating that step URLs are absolute `http`/`https` URLs
//! - Building requests with a consistent User-Agent
//!
//! # Example
//!
//! ```ignore
//! use parsify_api::{ClientSettings, ParsifyClient};
//!
//! let client = ParsifyClient::new(&ClientSettings::default())?;
//! let builder = client.request(reqwest::Method::GET, "https://api.example.com/items")?;
//! ```

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, Url, header};
use tracing::debug;

/// Default request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Knobs for building a [`ParsifyClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Total time budget for one request, including reading the body.
    pub timeout: Duration,
    /// Value sent in the `User-Agent` header.
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: default_user_agent(),
        }
    }
}

/// `parsify/<version>; <os>`.
pub fn default_user_agent() -> String {
    format!("parsify/{}; {}", env!("CARGO_PKG_VERSION"), std::env::consts::OS)
}

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client`.
///
/// Unlike a single-service API client there is no base URL: every handbook
/// step carries its own absolute URL, which is validated per request.
pub struct ParsifyClient {
    pub http: Client,
    pub user_agent: String,
}

impl ParsifyClient {
    /// Construct a client from explicit settings.
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(settings.timeout)
            .build()
            .context("build http client")?;

        Ok(Self {
            http,
            user_agent: settings.user_agent.clone(),
        })
    }

    /// Build a `reqwest::RequestBuilder` for a method and absolute URL.
    ///
    /// Fails when the URL is not an absolute `http`/`https` URL.
    pub fn request(&self, method: reqwest::Method, url: &str) -> Result<RequestBuilder> {
        let url = validate_request_url(url)?;
        debug!(%url, %method, "building request");

        Ok(self
            .http
            .request(method, url)
            .header(header::USER_AGENT, &self.user_agent))
    }
}

/// Validate that a step URL is acceptable for the client.
///
/// Rules:
/// - the URL must parse as an absolute URL
/// - the scheme must be `http` or `https`
/// - the URL must include a host
pub fn validate_request_url(raw: &str) -> Result<Url> {
    let parsed = Url::parse(raw).map_err(|error| anyhow!("invalid request URL '{}': {}", raw, error))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!(
            "request URL must use http or https; got '{}://' in '{}'",
            parsed.scheme(),
            raw
        ));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(anyhow!("request URL '{}' must include a host", raw));
    }

    Ok(parsed)
}
