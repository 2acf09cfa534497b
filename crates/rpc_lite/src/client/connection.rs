use futures::StreamExt;
use prost::Message;
use std::io;
use tokio::net::TcpStream;
use tracing::debug;

use crate::client::config::RpcClientConfig;
use crate::connection::{self, RpcInbound, RpcOutbound};
use crate::error::{RemoteFault, RpcClientError, TransportError};
use crate::wire::call_response::Outcome;
use crate::wire::{CallRequest, CallResponse};

/// A connection to an RPC server that turns calls into round trips.
///
/// `call` takes `&mut self`, so a connection carries at most one request at
/// a time and responses always match the request that was just sent.
///
/// # Example
///
/// ```ignore
/// let mut client = RpcClient::connect_to("localhost:8000").await?;
/// let product = client.call("multiply", &[6.0, 7.0]).await?;
/// ```
pub struct RpcClient {
    outbound: RpcOutbound,
    inbound: RpcInbound,
    config: RpcClientConfig,
    // Set once the stream can no longer be trusted to pair requests with responses
    broken: bool,
}

impl RpcClient {
    /// Connect to `endpoint` with default settings.
    pub async fn connect_to(endpoint: impl Into<String>) -> Result<Self, RpcClientError> {
        Self::connect(RpcClientConfig::new(endpoint)).await
    }

    pub async fn connect(config: RpcClientConfig) -> Result<Self, RpcClientError> {
        let connect = TcpStream::connect(config.endpoint.as_str());
        let connected = match config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))),
            None => connect.await,
        };

        let stream = connected
            .and_then(|stream| stream.set_nodelay(true).map(|()| stream))
            .map_err(|source| RpcClientError::Connection {
                endpoint: config.endpoint.clone(),
                source,
            })?;

        debug!(endpoint = %config.endpoint, "Connected to RPC server");

        let (outbound, inbound) = connection::split(stream, config.max_frame_length);
        Ok(Self {
            outbound,
            inbound,
            config,
            broken: false,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Invoke `operation` on the server and wait for its result.
    ///
    /// A fault from the server leaves the connection usable. A transport
    /// error does not: every later call fails with
    /// [`TransportError::ConnectionClosed`].
    pub async fn call(&mut self, operation: &str, arguments: &[f64]) -> Result<f64, RpcClientError> {
        if self.broken {
            return Err(TransportError::ConnectionClosed.into());
        }

        let request = CallRequest::new(operation, arguments);
        let call_timeout = self.config.call_timeout;

        let round_trip = self.round_trip(&request);
        let response = match call_timeout {
            Some(limit) => tokio::time::timeout(limit, round_trip)
                .await
                .unwrap_or_else(|elapsed| Err(elapsed.into())),
            None => round_trip.await,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                self.broken = true;
                return Err(e.into());
            }
        };

        match response.outcome {
            Some(Outcome::Result(result)) => {
                debug!(operation, ?arguments, result, "Call succeeded");
                Ok(result)
            }
            Some(Outcome::Fault(fault)) => {
                let fault = RemoteFault::from(fault);
                debug!(operation, ?arguments, fault = %fault, "Call faulted");
                Err(fault.into())
            }
            None => Err(TransportError::EmptyResponse.into()),
        }
    }

    async fn round_trip(&mut self, request: &CallRequest) -> Result<CallResponse, TransportError> {
        self.outbound.send(request).await?;

        let frame = self
            .inbound
            .next()
            .await
            .ok_or(TransportError::ConnectionClosed)??;

        Ok(CallResponse::decode(frame)?)
    }

    /// Flush and close the connection.
    pub async fn close(mut self) -> Result<(), RpcClientError> {
        self.outbound.close().await.map_err(TransportError::from)?;
        Ok(())
    }
}
