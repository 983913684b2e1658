#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
use blockdrop::relay::Relay;
#[cfg(not(target_arch = "wasm32"))]
use blockdrop::room::RoomManager;
#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;
#[cfg(not(target_arch = "wasm32"))]
use futures::{SinkExt, StreamExt};
#[cfg(not(target_arch = "wasm32"))]
use std::sync::Arc;
#[cfg(not(target_arch = "wasm32"))]
use tokio::net::{TcpListener, TcpStream};
#[cfg(not(target_arch = "wasm32"))]
use tokio::sync::Mutex;
#[cfg(not(target_arch = "wasm32"))]
use tokio_tungstenite::{accept_async, tungstenite::Message};
#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::EnvFilter;

/// Websocket relay for multiplayer rooms.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug, Clone)]
struct Opts {
    /// Address to accept browser websocket connections on
    #[arg(long, env = "BLOCKDROP_LISTEN", default_value = "127.0.0.1:3000")]
    listen: String,
    /// Seed for room codes (random when omitted)
    #[arg(long, env = "BLOCKDROP_SEED")]
    seed: Option<u64>,
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let opts = Opts::parse();
    let rooms = match opts.seed {
        Some(seed) => RoomManager::seeded(seed),
        None => RoomManager::new(),
    };
    let relay = Arc::new(Mutex::new(Relay::new(rooms)));
    let listener = TcpListener::bind(&opts.listen).await?;
    tracing::info!("room server listening on ws://{}", opts.listen);

    loop {
        let (stream, addr) = listener.accept().await?;
        let relay = relay.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_conn(stream, relay).await {
                tracing::warn!(%addr, error = ?e, "connection error");
            }
        });
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn handle_conn(stream: TcpStream, relay: Arc<Mutex<Relay>>) -> anyhow::Result<()> {
    let addr = stream.peer_addr()?;
    let ws_stream = accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (conn, mut outbound) = relay.lock().await.connect();
    tracing::info!(conn, %addr, "client connected");

    // Forward relay -> ws and ws -> relay until either side goes away.
    let result: anyhow::Result<()> = async {
        loop {
            tokio::select! {
                Some(text) = outbound.recv() => {
                    ws_tx.send(Message::Text(text)).await?;
                }
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Text(t))) => relay.lock().await.handle_text(conn, &t),
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                    }
                }
            }
        }
        Ok(())
    }
    .await;

    relay.lock().await.disconnect(conn);
    tracing::info!(conn, "client disconnected");
    let _ = ws_tx.close().await;
    result
}
