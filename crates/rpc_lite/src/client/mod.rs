//! Client-side types for rpc_lite.
//!
//! # Example
//!
//! ```ignore
//! use rpc_lite::client::{RpcClient, RpcClientConfig};
//! use std::time::Duration;
//!
//! let config = RpcClientConfig::new("localhost:8000")
//!     .with_call_timeout(Duration::from_secs(5));
//!
//! let mut client = RpcClient::connect(config).await?;
//! let sum = client.call("add", &[2.0, 3.0]).await?;
//! ```

mod config;
mod connection;

pub use config::RpcClientConfig;
pub use connection::RpcClient;
