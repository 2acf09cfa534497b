use anyhow::Result;
use rpc_calculator::{init_tracing, register_calculator};
use rpc_lite::server::shutdown_signal;
use rpc_lite::{RpcServer, RpcServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info");

    let mut server = RpcServer::new(RpcServerConfig::default());
    register_calculator(&mut server)?;

    let listener = server.bind().await?;

    println!("RPC Calculator Server is running on {}", server.config().endpoint);
    println!("Available methods: {}", server.operations().join(", "));
    println!("Press Ctrl+C to stop the server...");

    server.serve(listener, shutdown_signal()).await?;

    println!("\nShutting down the RPC server...");
    Ok(())
}
