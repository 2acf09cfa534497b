use bon::Builder;

use crate::DEFAULT_ENDPOINT;
use crate::connection::DEFAULT_MAX_FRAME_LENGTH;

/// How the server treats connections that arrive while one is being served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Serve one connection to completion before accepting the next.
    #[default]
    Sequential,

    /// Serve every connection on its own task.
    Concurrent,
}

/// Configuration for the RPC server.
#[derive(Debug, Clone, Builder)]
pub struct RpcServerConfig {
    /// Address to listen on, as `host:port`.
    #[builder(into, default = DEFAULT_ENDPOINT.to_string())]
    pub endpoint: String,

    #[builder(default)]
    pub mode: ConnectionMode,

    /// Largest request frame accepted, in bytes. A larger frame ends the
    /// connection it arrived on.
    #[builder(default = DEFAULT_MAX_FRAME_LENGTH)]
    pub max_frame_length: usize,

    /// Cap on simultaneously open connections in concurrent mode.
    pub max_connections: Option<usize>,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
