use anyhow::Result;
use parsify_api::ParsifyClient;
use parsify_types::PreparedRequest;
use parsify_util::{
    block_on_future,
    http::{HttpExecError, execute_prepared_request},
};
use serde_json::Value;
use tracing::debug;

use crate::EngineSettings;

/// Sends one prepared request and returns the decoded JSON response.
///
/// The engine never talks to the network directly; tests plug in scripted
/// transports and the CLI uses [`HttpTransport`].
pub trait Transport {
    fn send(&self, request: &PreparedRequest) -> Result<Value, HttpExecError>;
}

/// Blocking HTTP transport backed by [`ParsifyClient`].
pub struct HttpTransport {
    client: ParsifyClient,
}

impl HttpTransport {
    pub fn new(settings: &EngineSettings) -> Result<Self> {
        let client = ParsifyClient::new(&settings.client_settings())?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &PreparedRequest) -> Result<Value, HttpExecError> {
        debug!(method = %request.method, "http transport dispatching request");
        let client = self.client.clone();
        let request = request.clone();
        let request_future = async move { execute_prepared_request(&client, &request).await };
        block_on_future(request_future).map_err(HttpExecError::Runtime)?
    }
}
