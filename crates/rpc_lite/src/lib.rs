//! A small request/response RPC layer over TCP.
//!
//! A server registers named [`Operation`]s over `f64` arguments and answers
//! each [`CallRequest`] with exactly one result or [`Fault`]. The client side
//! is a proxy whose `call` hides the round trip. Messages are protobuf,
//! carried one per length-delimited frame.

pub mod client;
pub mod connection;
pub mod error;
pub mod server;
pub mod wire;

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "localhost:8000";

pub use client::{RpcClient, RpcClientConfig};
pub use error::{
    DispatchError, DomainError, RemoteFault, RpcClientError, RpcSendError, RpcServerError,
    TransportError,
};
pub use server::{ConnectionMode, FnOperation, Operation, RpcServer, RpcServerConfig};
pub use wire::{CallRequest, CallResponse, Fault, FaultCode};
