use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use prost::Message;
use rpc_lite::wire::call_response::Outcome;
use rpc_lite::{
    CallRequest, CallResponse, ConnectionMode, DomainError, FaultCode, RpcClient,
    RpcClientConfig, RpcClientError, RpcServer, RpcServerConfig, RpcServerError, TransportError,
};
use rpc_lite::server::SessionMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

struct TestServer {
    addr: SocketAddr,
    sessions: Arc<SessionMap>,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), RpcServerError>>,
}

impl TestServer {
    async fn start(config: RpcServerConfig) -> Self {
        let mut server = RpcServer::new(config);
        server
            .register_fn("add", 2, |args| Ok(args[0] + args[1]))
            .unwrap();
        server
            .register_fn("inverse", 1, |args| {
                if args[0] == 0.0 {
                    Err(DomainError::new("zero has no inverse"))
                } else {
                    Ok(1.0 / args[0])
                }
            })
            .unwrap();

        let sessions = server.sessions();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(listener, async move {
            let _ = rx.await;
        }));

        Self {
            addr,
            sessions,
            shutdown,
            handle,
        }
    }

    async fn sequential() -> Self {
        Self::start(RpcServerConfig::default()).await
    }

    async fn concurrent() -> Self {
        Self::start(
            RpcServerConfig::builder()
                .mode(ConnectionMode::Concurrent)
                .build(),
        )
        .await
    }

    async fn client(&self) -> RpcClient {
        RpcClient::connect_to(self.addr.to_string()).await.unwrap()
    }

    async fn stop(self) {
        self.shutdown.send(()).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

fn expect_fault(result: Result<f64, RpcClientError>) -> (FaultCode, String) {
    match result {
        Err(RpcClientError::Fault(fault)) => (fault.code, fault.message),
        other => panic!("expected a fault, got {other:?}"),
    }
}

#[tokio::test]
async fn test_call_returns_result() {
    let server = TestServer::sequential().await;
    let mut client = server.client().await;

    assert_eq!(client.call("add", &[2.0, 3.0]).await.unwrap(), 5.0);
    assert_eq!(client.call("add", &[-1.25, 0.5]).await.unwrap(), -0.75);
    assert_eq!(client.call("inverse", &[4.0]).await.unwrap(), 0.25);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_fault_leaves_connection_usable() {
    let server = TestServer::sequential().await;
    let mut client = server.client().await;

    let (code, message) = expect_fault(client.call("inverse", &[0.0]).await);
    assert_eq!(code, FaultCode::DomainError);
    assert_eq!(message, "zero has no inverse");

    assert_eq!(client.call("add", &[1.0, 1.0]).await.unwrap(), 2.0);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_unknown_operation_and_arity() {
    let server = TestServer::sequential().await;
    let mut client = server.client().await;

    let (code, _) = expect_fault(client.call("unknown_op", &[1.0]).await);
    assert_eq!(code, FaultCode::UnknownOperation);

    let (code, message) = expect_fault(client.call("add", &[1.0, 2.0, 3.0]).await);
    assert_eq!(code, FaultCode::ArityMismatch);
    assert!(message.contains("takes 2"));

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_malformed_frame_gets_fault() {
    let server = TestServer::sequential().await;

    let stream = TcpStream::connect(server.addr).await.unwrap();
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    // A string field that claims 200 bytes but carries one
    framed
        .send(Bytes::from_static(&[0x0a, 0xc8, 0x01, b'a']))
        .await
        .unwrap();
    let frame = framed.next().await.unwrap().unwrap();
    match CallResponse::decode(frame).unwrap().outcome {
        Some(Outcome::Fault(fault)) => assert_eq!(fault.code(), FaultCode::MalformedRequest),
        other => panic!("expected a fault, got {other:?}"),
    }

    // Same connection keeps serving
    let request = CallRequest::new("add", vec![20.0, 22.0]);
    framed
        .send(Bytes::from(request.encode_to_vec()))
        .await
        .unwrap();
    let frame = framed.next().await.unwrap().unwrap();
    assert_eq!(CallResponse::decode(frame).unwrap(), CallResponse::result(42.0));

    drop(framed);
    server.stop().await;
}

#[tokio::test]
async fn test_new_client_after_disconnect() {
    let server = TestServer::sequential().await;

    let mut first = server.client().await;
    assert_eq!(first.call("add", &[1.0, 2.0]).await.unwrap(), 3.0);
    first.close().await.unwrap();

    let mut second = server.client().await;
    assert_eq!(second.call("add", &[3.0, 4.0]).await.unwrap(), 7.0);

    drop(second);
    server.stop().await;
}

#[tokio::test]
async fn test_sequential_mode_serves_one_connection_at_a_time() {
    let server = TestServer::sequential().await;

    let mut first = server.client().await;
    assert_eq!(first.call("add", &[1.0, 2.0]).await.unwrap(), 3.0);

    let config = RpcClientConfig::new(server.addr.to_string())
        .with_call_timeout(Duration::from_millis(200));
    let mut waiting = RpcClient::connect(config).await.unwrap();
    let result = waiting.call("add", &[1.0, 1.0]).await;
    assert!(matches!(
        result,
        Err(RpcClientError::Transport(TransportError::Timeout(_)))
    ));

    // The timed-out connection can no longer pair responses with requests
    let result = waiting.call("add", &[1.0, 1.0]).await;
    assert!(matches!(
        result,
        Err(RpcClientError::Transport(TransportError::ConnectionClosed))
    ));

    drop(waiting);
    drop(first);

    let mut third = server.client().await;
    assert_eq!(third.call("add", &[2.0, 2.0]).await.unwrap(), 4.0);

    drop(third);
    server.stop().await;
}

#[tokio::test]
async fn test_concurrent_mode_serves_interleaved_clients() {
    let server = TestServer::concurrent().await;

    let mut first = server.client().await;
    let mut second = server.client().await;

    assert_eq!(first.call("add", &[1.0, 2.0]).await.unwrap(), 3.0);
    assert_eq!(second.call("add", &[10.0, 20.0]).await.unwrap(), 30.0);
    assert_eq!(first.call("inverse", &[2.0]).await.unwrap(), 0.5);

    server.stop().await;

    // Shutdown closes connections that were still open
    assert!(matches!(
        first.call("add", &[1.0, 1.0]).await,
        Err(RpcClientError::Transport(_))
    ));
}

#[tokio::test]
async fn test_connection_limit_refuses_extra_client() {
    let server = TestServer::start(
        RpcServerConfig::builder()
            .mode(ConnectionMode::Concurrent)
            .max_connections(1)
            .build(),
    )
    .await;

    let mut first = server.client().await;
    assert_eq!(first.call("add", &[1.0, 2.0]).await.unwrap(), 3.0);

    let mut refused = server.client().await;
    assert!(matches!(
        refused.call("add", &[1.0, 2.0]).await,
        Err(RpcClientError::Transport(_))
    ));

    assert_eq!(first.call("add", &[2.0, 2.0]).await.unwrap(), 4.0);

    drop(first);
    drop(refused);
    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_releases_endpoint() {
    let server = TestServer::sequential().await;
    let addr = server.addr;

    let mut client = server.client().await;
    assert_eq!(client.call("add", &[1.0, 2.0]).await.unwrap(), 3.0);
    drop(client);

    server.stop().await;

    TcpListener::bind(addr).await.unwrap();
}

#[tokio::test]
async fn test_oversized_frame_closes_only_that_connection() {
    let server = TestServer::start(RpcServerConfig::builder().max_frame_length(64).build()).await;

    let stream = TcpStream::connect(server.addr).await.unwrap();
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
    framed.send(Bytes::from(vec![0u8; 200])).await.unwrap();

    // No response, just a closed (or reset) connection
    assert!(matches!(framed.next().await, None | Some(Err(_))));
    drop(framed);

    let mut client = server.client().await;
    assert_eq!(client.call("add", &[20.0, 22.0]).await.unwrap(), 42.0);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_sequential_shutdown_with_connected_client() {
    let server = TestServer::sequential().await;
    let addr = server.addr;

    let mut client = server.client().await;
    assert_eq!(client.call("add", &[1.0, 2.0]).await.unwrap(), 3.0);

    // The client is still connected when the server stops
    server.stop().await;

    assert!(matches!(
        client.call("add", &[1.0, 1.0]).await,
        Err(RpcClientError::Transport(_))
    ));
    drop(client);
    TcpListener::bind(addr).await.unwrap();
}

#[tokio::test]
async fn test_bind_fails_on_taken_endpoint() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = taken.local_addr().unwrap().to_string();

    let server = RpcServer::new(RpcServerConfig::builder().endpoint(endpoint.clone()).build());
    match server.bind().await {
        Err(RpcServerError::Bind { endpoint: failed, .. }) => assert_eq!(failed, endpoint),
        other => panic!("expected a bind error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sessions_track_open_connections() {
    let server = TestServer::concurrent().await;
    assert!(server.sessions.is_empty());

    let mut first = server.client().await;
    let mut second = server.client().await;
    assert_eq!(first.call("add", &[1.0, 2.0]).await.unwrap(), 3.0);
    assert_eq!(second.call("add", &[3.0, 4.0]).await.unwrap(), 7.0);
    assert_eq!(server.sessions.len(), 2);

    drop(first);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while server.sessions.len() != 1 {
        assert!(tokio::time::Instant::now() < deadline, "session was not released");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    drop(second);
    let sessions = server.sessions.clone();
    server.stop().await;
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = RpcClient::connect_to(addr.to_string()).await;
    assert!(matches!(result, Err(RpcClientError::Connection { .. })));
}

#[tokio::test]
async fn test_response_without_outcome_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
        while framed.next().await.is_some() {
            framed.send(Bytes::new()).await.unwrap();
        }
    });

    let mut client = RpcClient::connect_to(addr.to_string()).await.unwrap();
    assert!(matches!(
        client.call("add", &[1.0, 2.0]).await,
        Err(RpcClientError::Transport(TransportError::EmptyResponse))
    ));
}

#[tokio::test]
async fn test_server_closing_mid_call() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
        // Read the request and hang up without answering
        let _ = framed.next().await;
    });

    let mut client = RpcClient::connect_to(addr.to_string()).await.unwrap();
    let result = client.call("add", &[1.0, 2.0]).await;
    assert!(matches!(result, Err(RpcClientError::Transport(_))));

    let result = client.call("add", &[1.0, 2.0]).await;
    assert!(matches!(
        result,
        Err(RpcClientError::Transport(TransportError::ConnectionClosed))
    ));
}
