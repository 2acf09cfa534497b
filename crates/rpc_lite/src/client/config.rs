use std::time::Duration;

use crate::DEFAULT_ENDPOINT;
use crate::connection::DEFAULT_MAX_FRAME_LENGTH;

/// Configuration for the RPC client.
#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    /// Server address, as `host:port`.
    pub endpoint: String,

    /// Give up connecting after this long. No limit by default.
    pub connect_timeout: Option<Duration>,

    /// Give up waiting for a response after this long. No limit by default.
    pub call_timeout: Option<Duration>,

    /// Largest response frame accepted, in bytes.
    pub max_frame_length: usize,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: None,
            call_timeout: None,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

impl RpcClientConfig {
    /// Create a new config for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set a per-call deadline.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn with_max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }
}
