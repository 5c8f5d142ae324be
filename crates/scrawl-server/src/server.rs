//! Core server: accepts WebSocket connections and runs one relay session
//! per connection.
//!
//! Owns the room registry and message router. Each accepted connection gets
//! a reader task (this module) and a writer task draining its outbound queue.

use crate::config::ServerConfig;
use crate::relay::{Connection, MessageRouter, RoomRegistry};
use crate::transport::websocket::{self, Listener, Outbound, WebSocketConnection};
use futures_util::StreamExt;
use scrawl_core::{ConnId, ScrawlResult};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The scrawl relay server instance.
pub struct ScrawlServer {
    /// Server configuration.
    config: ServerConfig,
    /// Rooms and their members.
    registry: Arc<RoomRegistry>,
    /// Applies client messages to the registry.
    router: Arc<MessageRouter>,
    /// Next connection ID to hand out.
    next_conn_id: AtomicU64,
    /// Connections currently open, joined or not.
    open_connections: Arc<AtomicUsize>,
}

impl ScrawlServer {
    /// Create a new server instance.
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(RoomRegistry::new());
        let router = Arc::new(MessageRouter::new(registry.clone()));
        Self {
            config,
            registry,
            router,
            next_conn_id: AtomicU64::new(1),
            open_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared handle to the room registry.
    pub fn registry(&self) -> Arc<RoomRegistry> {
        self.registry.clone()
    }

    /// Bind the configured address and serve until the listener stops.
    pub async fn run(self) -> ScrawlResult<()> {
        let listener = websocket::start_listener(&self.config.host, self.config.port).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(self, mut listener: Listener) -> ScrawlResult<()> {
        let server = Arc::new(self);

        if server.config.stats_interval > 0 {
            let registry = server.registry.clone();
            let open = server.open_connections.clone();
            let period = Duration::from_secs(server.config.stats_interval);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.tick().await;
                loop {
                    interval.tick().await;
                    let rooms = registry.room_count().await;
                    let joined = registry.connection_count().await;
                    info!(
                        rooms,
                        joined,
                        connections = open.load(Ordering::Relaxed),
                        "relay stats"
                    );
                }
            });
        }

        info!(addr = %listener.local_addr(), "scrawl-server ready");

        while let Some(conn) = listener.accept().await {
            let srv = server.clone();
            tokio::spawn(async move {
                srv.handle_connection(conn).await;
            });
        }

        info!("listener closed, shutting down");
        Ok(())
    }

    /// Run one connection from accept to close.
    async fn handle_connection(&self, conn: WebSocketConnection) {
        let conn_id = ConnId(self.next_conn_id.fetch_add(1, Ordering::Relaxed));
        let remote = conn.remote_addr;
        self.open_connections.fetch_add(1, Ordering::Relaxed);
        info!(conn_id = %conn_id, remote = %remote, "connection opened");

        let (sink, mut source) = conn.ws_stream.split();
        let (tx, rx) = mpsc::channel::<Outbound>(self.config.send_queue);
        tokio::spawn(websocket::write_loop(sink, rx));

        let mut connection = Connection::new(conn_id, tx).with_remote_addr(remote);

        loop {
            match websocket::ws_recv_text(&mut source, self.config.max_message_size).await {
                Ok(Some(text)) => self.router.handle_text(&mut connection, &text).await,
                Ok(None) => {
                    debug!(conn_id = %conn_id, "peer closed");
                    break;
                }
                Err(e) if e.is_protocol() => {
                    warn!(conn_id = %conn_id, error = %e, "dropping unreadable message");
                }
                Err(e) => {
                    debug!(conn_id = %conn_id, error = %e, "connection ended");
                    break;
                }
            }
        }

        // Dropping the last sender lets the writer flush and close the socket.
        self.router.disconnect(connection).await;
        self.open_connections.fetch_sub(1, Ordering::Relaxed);
        info!(conn_id = %conn_id, remote = %remote, "connection closed");
    }
}
