//! Typed client for the calculator service.

use rpc_lite::{RpcClient, RpcClientConfig, RpcClientError};

use crate::calculator::Arithmetic;

/// Method-call front end for a calculator server.
///
/// Each method is one round trip through [`RpcClient::call`].
pub struct CalculatorClient {
    rpc: RpcClient,
}

impl CalculatorClient {
    pub async fn connect(config: RpcClientConfig) -> Result<Self, RpcClientError> {
        Ok(Self::new(RpcClient::connect(config).await?))
    }

    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    pub fn endpoint(&self) -> &str {
        self.rpc.endpoint()
    }

    pub async fn evaluate(&mut self, op: Arithmetic, a: f64, b: f64) -> Result<f64, RpcClientError> {
        self.rpc.call(op.name(), &[a, b]).await
    }

    pub async fn add(&mut self, a: f64, b: f64) -> Result<f64, RpcClientError> {
        self.evaluate(Arithmetic::Add, a, b).await
    }

    pub async fn subtract(&mut self, a: f64, b: f64) -> Result<f64, RpcClientError> {
        self.evaluate(Arithmetic::Subtract, a, b).await
    }

    pub async fn multiply(&mut self, a: f64, b: f64) -> Result<f64, RpcClientError> {
        self.evaluate(Arithmetic::Multiply, a, b).await
    }

    pub async fn divide(&mut self, a: f64, b: f64) -> Result<f64, RpcClientError> {
        self.evaluate(Arithmetic::Divide, a, b).await
    }

    /// Access the underlying connection, e.g. to call operations by name.
    pub fn rpc(&mut self) -> &mut RpcClient {
        &mut self.rpc
    }

    pub async fn close(self) -> Result<(), RpcClientError> {
        self.rpc.close().await
    }
}
