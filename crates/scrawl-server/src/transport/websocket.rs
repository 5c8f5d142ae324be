//! WebSocket listener using tokio-tungstenite.
//!
//! Accepts TCP connections, performs the WebSocket upgrade on a separate task,
//! and hands finished connections to the server through a channel.

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, Stream, StreamExt};
use scrawl_core::{ScrawlError, ScrawlResult};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

/// A serialized envelope queued for one connection. Shared between all
/// receivers of a broadcast.
pub type Outbound = Arc<str>;

/// Write half of an accepted connection.
pub type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// A handle to an accepted WebSocket connection.
pub struct WebSocketConnection {
    pub ws_stream: WebSocketStream<TcpStream>,
    pub remote_addr: SocketAddr,
}

/// Accepted connections plus the address the listener is bound to.
pub struct Listener {
    local_addr: SocketAddr,
    rx: mpsc::Receiver<WebSocketConnection>,
}

impl Listener {
    /// The bound address (resolves port 0 to the real port).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Next upgraded connection, or `None` once the accept loop has stopped.
    pub async fn accept(&mut self) -> Option<WebSocketConnection> {
        self.rx.recv().await
    }
}

/// Start the WebSocket listener.
///
/// Bind failures are returned to the caller; they are fatal for the server.
pub async fn start_listener(host: &str, port: u16) -> ScrawlResult<Listener> {
    let tcp_listener = TcpListener::bind((host, port))
        .await
        .map_err(|e| ScrawlError::Transport(format!("WS bind {host}:{port} failed: {e}")))?;
    let local_addr = tcp_listener.local_addr()?;

    info!(addr = %local_addr, "WebSocket listener started");

    let (tx, rx) = mpsc::channel::<WebSocketConnection>(64);
    tokio::spawn(accept_loop(tcp_listener, tx));

    Ok(Listener { local_addr, rx })
}

/// Accept sockets until the [`Listener`] is dropped, upgrading each one on
/// its own task. The TCP socket is closed when the loop returns.
async fn accept_loop(tcp_listener: TcpListener, tx: mpsc::Sender<WebSocketConnection>) {
    loop {
        let accepted = tokio::select! {
            _ = tx.closed() => break,
            accepted = tcp_listener.accept() => accepted,
        };
        let (stream, addr) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "TCP accept failed");
                continue;
            }
        };
        let tx = tx.clone();
        tokio::spawn(async move {
            match tokio_tungstenite::accept_async(stream).await {
                Ok(ws_stream) => {
                    debug!(remote = %addr, "WebSocket connection accepted");
                    let conn = WebSocketConnection {
                        ws_stream,
                        remote_addr: addr,
                    };
                    if tx.send(conn).await.is_err() {
                        debug!(remote = %addr, "listener gone, dropping connection");
                    }
                }
                Err(e) => {
                    warn!(remote = %addr, error = %e, "WebSocket handshake failed");
                }
            }
        });
    }
    info!("WebSocket listener stopped");
}

/// Drain a connection's outbound queue into its socket.
///
/// Ends when every sender for the queue is gone or the socket rejects a
/// write; either way the queue is closed and later broadcasts skip it.
pub async fn write_loop(mut sink: WsSink, mut rx: mpsc::Receiver<Outbound>) {
    while let Some(payload) = rx.recv().await {
        if let Err(e) = sink.send(Message::Text(payload.to_string().into())).await {
            debug!(error = %e, "WS send failed, closing writer");
            rx.close();
            return;
        }
    }
    let _ = sink.close().await;
}

/// Receive the next envelope text from a WebSocket.
///
/// Returns `Ok(None)` when the peer closed. Binary messages are accepted if
/// they hold UTF-8. Oversized or non-UTF-8 messages yield `InvalidMessage`,
/// which the caller treats as a dropped message rather than a dead link.
pub async fn ws_recv_text<S>(ws: &mut S, max_message_size: usize) -> ScrawlResult<Option<String>>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                check_size(text.len(), max_message_size)?;
                return Ok(Some(text.to_string()));
            }
            Some(Ok(Message::Binary(data))) => {
                check_size(data.len(), max_message_size)?;
                return String::from_utf8(data.to_vec())
                    .map(Some)
                    .map_err(|e| ScrawlError::InvalidMessage(format!("binary frame: {e}")));
            }
            Some(Ok(Message::Close(_))) => return Ok(None),
            // tungstenite queues pong replies itself and flushes them on the next read
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                return Err(ScrawlError::Transport(format!("WS recv failed: {e}")));
            }
            None => return Ok(None),
        }
    }
}

fn check_size(len: usize, max: usize) -> ScrawlResult<()> {
    if len > max {
        return Err(ScrawlError::InvalidMessage(format!(
            "WS message too large: {len} bytes (max {max})"
        )));
    }
    Ok(())
}
