use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::wire::{Fault, FaultCode};

/// Errors that can occur while setting up or running the RPC server.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RpcServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind '{endpoint}'")]
    Bind {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// An operation with this name is already in the registry.
    #[error("operation '{0}' is already registered")]
    DuplicateOperation(String),

    /// The server is already serving as many connections as it allows.
    #[error("connection limit of {limit} reached, refusing {peer}")]
    ConnectionLimit { limit: usize, peer: SocketAddr },
}

/// Errors returned by [`RpcClient`](crate::client::RpcClient).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RpcClientError {
    /// The endpoint could not be reached.
    #[error("failed to connect to '{endpoint}'")]
    Connection {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// The connection failed while a call was in flight.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a fault.
    #[error(transparent)]
    Fault(#[from] RemoteFault),
}

impl RpcClientError {
    /// The remote fault, if the server answered with one.
    pub fn as_fault(&self) -> Option<&RemoteFault> {
        match self {
            RpcClientError::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

/// Failures of an established connection.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Send(#[from] RpcSendError),

    /// The server closed the connection before answering.
    #[error("connection closed by server")]
    ConnectionClosed,

    #[error("failed to decode response")]
    Decode(#[from] prost::DecodeError),

    /// The response carried neither a result nor a fault.
    #[error("response carried no outcome")]
    EmptyResponse,

    #[error("timed out waiting for response")]
    Timeout(#[from] tokio::time::error::Elapsed),
}

/// Errors that can occur while writing outbound frames.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RpcSendError {
    #[error("failed to write frame")]
    Io(#[from] io::Error),
}

/// A fault reported by the server, as seen by the client.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code}: {message}")]
pub struct RemoteFault {
    pub code: FaultCode,
    pub message: String,
}

impl From<Fault> for RemoteFault {
    fn from(fault: Fault) -> Self {
        Self {
            code: fault.code(),
            message: fault.message,
        }
    }
}

/// A handler-level failure, such as division by zero.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DomainError {
    message: String,
}

impl DomainError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Why a request could not be answered with a result.
///
/// Every variant becomes a [`Fault`] at the dispatch boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("operation '{operation}' takes {expected} argument(s), got {actual}")]
    ArityMismatch {
        operation: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The handler panicked instead of returning.
    #[error("operation '{0}' failed unexpectedly")]
    HandlerPanic(String),
}

impl DispatchError {
    pub fn code(&self) -> FaultCode {
        match self {
            DispatchError::Malformed(_) => FaultCode::MalformedRequest,
            DispatchError::UnknownOperation(_) => FaultCode::UnknownOperation,
            DispatchError::ArityMismatch { .. } => FaultCode::ArityMismatch,
            DispatchError::Domain(_) => FaultCode::DomainError,
            DispatchError::HandlerPanic(_) => FaultCode::Internal,
        }
    }
}

impl From<DispatchError> for Fault {
    fn from(err: DispatchError) -> Self {
        Fault::new(err.code(), err.to_string())
    }
}
