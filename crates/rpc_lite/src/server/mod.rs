//! Server-side types for rpc_lite.
//!
//! This module contains the `RpcServer` and the pieces it is built from: the
//! operation registry, the handler trait, and the session map that tracks
//! open connections.

mod config;
mod handler;
mod registry;
mod router;
mod session;

pub use config::{ConnectionMode, RpcServerConfig};
pub use handler::{FnOperation, Operation};
pub use registry::OperationRegistry;
pub use router::{RpcServer, shutdown_signal};
pub use session::{ConnectionId, SessionGuard, SessionMap};
