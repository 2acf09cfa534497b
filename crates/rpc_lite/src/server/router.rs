use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::connection;
use crate::error::{DomainError, RpcServerError};
use crate::server::config::{ConnectionMode, RpcServerConfig};
use crate::server::handler::{FnOperation, Operation};
use crate::server::registry::OperationRegistry;
use crate::server::session::{SessionGuard, SessionMap};

/// Pause after a failed accept so a persistent error (e.g. out of file
/// descriptors) does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The RPC server: an operation registry plus the loop that serves it.
///
/// Operations are registered up front; serving consumes the server, so the
/// registry cannot change once requests are being answered.
pub struct RpcServer {
    registry: OperationRegistry,
    sessions: Arc<SessionMap>,
    config: RpcServerConfig,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig) -> Self {
        Self {
            registry: OperationRegistry::new(),
            sessions: Arc::new(SessionMap::with_limit(config.max_connections)),
            config,
        }
    }

    /// Register an operation under `name`.
    ///
    /// # Example
    /// ```ignore
    /// server.register("negate", FnOperation::new(1, |args| Ok(-args[0])))?;
    /// ```
    pub fn register(
        &mut self,
        name: impl Into<String>,
        operation: impl Operation + 'static,
    ) -> Result<(), RpcServerError> {
        let name = name.into();
        let arity = operation.arity();
        self.registry.register(name.clone(), operation)?;

        info!(operation = %name, arity, "Registered RPC operation");
        Ok(())
    }

    /// Register a closure as an operation taking `arity` arguments.
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        arity: usize,
        f: F,
    ) -> Result<(), RpcServerError>
    where
        F: Fn(&[f64]) -> Result<f64, DomainError> + Send + Sync + 'static,
    {
        self.register(name, FnOperation::new(arity, f))
    }

    pub fn has_operation(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Registered operation names, sorted.
    pub fn operations(&self) -> Vec<&str> {
        self.registry.names()
    }

    pub fn config(&self) -> &RpcServerConfig {
        &self.config
    }

    /// Shared view of the open connections, usable after serving starts.
    pub fn sessions(&self) -> Arc<SessionMap> {
        Arc::clone(&self.sessions)
    }

    /// Bind the configured endpoint.
    pub async fn bind(&self) -> Result<TcpListener, RpcServerError> {
        TcpListener::bind(&self.config.endpoint)
            .await
            .map_err(|source| RpcServerError::Bind {
                endpoint: self.config.endpoint.clone(),
                source,
            })
    }

    /// Bind the configured endpoint and serve until Ctrl-C.
    pub async fn serve_forever(self) -> Result<(), RpcServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve `listener` until `shutdown` resolves.
    ///
    /// The listener is dropped before this returns, releasing the endpoint.
    /// In concurrent mode open connections are cancelled and awaited first.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), RpcServerError>
    where
        F: Future<Output = ()>,
    {
        let registry = Arc::new(self.registry);
        let sessions = self.sessions;
        let config = self.config;

        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        tokio::pin!(shutdown);

        info!(
            addr = ?listener.local_addr().ok(),
            mode = ?config.mode,
            operations = ?registry.names(),
            "RPC server started"
        );

        loop {
            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
            };

            let guard = match sessions.try_open(peer) {
                Ok(guard) => guard,
                Err(e) => {
                    // Dropping the stream closes the socket
                    warn!(peer = %peer, error = %e, "Refusing connection");
                    continue;
                }
            };

            let span = info_span!("connection", id = %guard.id(), peer = %guard.peer());
            let connection =
                serve_connection(Arc::clone(&registry), stream, guard, config.max_frame_length)
                    .instrument(span);

            match config.mode {
                ConnectionMode::Sequential => {
                    tokio::select! {
                        _ = &mut shutdown => break,
                        () = connection => {}
                    }
                }
                ConnectionMode::Concurrent => {
                    let cancel = cancel.clone();
                    tracker.spawn(async move {
                        tokio::select! {
                            _ = cancel.cancelled() => debug!("Connection cancelled by shutdown"),
                            () = connection => {}
                        }
                    });
                }
            }
        }

        info!("Shutdown requested, RPC server stopping");
        drop(listener);

        cancel.cancel();
        tracker.close();
        tracker.wait().await;

        info!("RPC server stopped");
        Ok(())
    }
}

/// Answer requests on one connection until the client goes away.
///
/// Requests are answered strictly in arrival order.
async fn serve_connection(
    registry: Arc<OperationRegistry>,
    stream: TcpStream,
    guard: SessionGuard,
    max_frame_length: usize,
) {
    // Small request/response frames; don't let Nagle hold them back
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "Failed to set TCP_NODELAY");
    }

    info!("Client connected");

    let (mut outbound, mut inbound) = connection::split(stream, max_frame_length);

    while let Some(frame) = inbound.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Failed to read request frame, closing connection");
                break;
            }
        };

        let response = registry.handle_frame(frame);

        if let Err(e) = outbound.send(&response).await {
            warn!(error = %e, "Failed to send response, closing connection");
            break;
        }
    }

    info!("Client disconnected");
    drop(guard);
}

/// Resolves on Ctrl-C. Never resolves if the signal cannot be installed.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, serving until the process is killed");
        std::future::pending::<()>().await;
    }
}
