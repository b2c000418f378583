//! Engine configuration.

use std::time::Duration;

use parsify_api::{ClientSettings, DEFAULT_TIMEOUT, default_user_agent};

/// Runtime knobs for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Per-request timeout used by the HTTP transport.
    pub request_timeout: Duration,
    /// `User-Agent` sent by the HTTP transport.
    pub user_agent: String,
    /// Upper bound on step invocations in one chain traversal. `None` means
    /// the traversal only ends when every dimension is exhausted.
    pub max_invocations_per_chain: Option<u32>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
            user_agent: default_user_agent(),
            max_invocations_per_chain: None,
        }
    }
}

impl EngineSettings {
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            timeout: self.request_timeout,
            user_agent: self.user_agent.clone(),
        }
    }
}
