//! Consumer WebSocket endpoint
//!
//! Accepts viewer connections, upgrades them to WebSocket, and wires them
//! into the session registry. Each connection gets two halves: a writer
//! task that drains the session's command channel into the socket (binary
//! frames for broadcast chunks, Pings for liveness probes) and a read loop
//! that records Pong answers and notices the transport closing.
//!
//! No authentication happens on this path: anyone who can reach the
//! listener receives the stream.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::registry::{ConsumerSession, SessionCommand, SessionRegistry};
use crate::state::ProcessState;

/// Run the consumer accept loop
///
/// Never returns under normal operation; accept errors are logged and the
/// loop continues.
pub async fn run(
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
    state: Arc<ProcessState>,
    tcp_nodelay: bool,
) -> crate::error::Result<()> {
    loop {
        match listener.accept().await {
            Ok((socket, peer_addr)) => {
                if tcp_nodelay {
                    let _ = socket.set_nodelay(true);
                }

                let registry = Arc::clone(&registry);
                let state = Arc::clone(&state);

                tokio::spawn(async move {
                    handle_connection(socket, peer_addr, registry, state).await;
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to accept consumer connection");
            }
        }
    }
}

/// Handle one consumer connection from upgrade to close
async fn handle_connection(
    socket: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    state: Arc<ProcessState>,
) {
    let ws = match tokio_tungstenite::accept_async(socket).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::debug!(peer = %peer_addr, error = %e, "WebSocket handshake failed");
            return;
        }
    };

    let (sink, mut ws_rx) = ws.split();
    let (tx, rx) = mpsc::unbounded_channel();

    let session_id = registry.next_session_id();
    let session = Arc::new(ConsumerSession::new(session_id, peer_addr, tx));

    registry.add(session).await;
    state.client_connected();

    let mut writer = tokio::spawn(write_loop(sink, rx));

    // Read loop: record probe answers, stop on close or when the writer
    // task has already torn the connection down (eviction path).
    loop {
        tokio::select! {
            _ = &mut writer => break,
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Pong(_))) => registry.mark_alive(session_id).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(session_id, peer = %peer_addr, error = %e, "Consumer read error");
                    break;
                }
            },
        }
    }

    // No-op if the prober already evicted the session; the connection
    // counter is ours either way, exactly once per accepted connection.
    registry.remove(session_id).await;
    state.client_disconnected();
    writer.abort();

    tracing::info!(session_id, peer = %peer_addr, "Consumer disconnected");
}

/// Drain the session's command channel into the WebSocket sink
///
/// Exits when told to shut down, when the socket write fails, or when the
/// session has been dropped from the registry and all senders are gone.
async fn write_loop(
    mut sink: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut rx: mpsc::UnboundedReceiver<SessionCommand>,
) {
    while let Some(command) = rx.recv().await {
        let result = match command {
            SessionCommand::Chunk(data) => sink.send(Message::Binary(data)).await,
            SessionCommand::Probe => sink.send(Message::Ping(Bytes::new())).await,
            SessionCommand::Shutdown => break,
        };

        if result.is_err() {
            return;
        }
    }

    let _ = sink.close().await;
}
