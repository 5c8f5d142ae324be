//! Message router: decodes client envelopes and applies them to the
//! registry and broadcaster on behalf of one connection.
//!
//! A connection starts unjoined. `join_room` moves it into a room, leaving
//! any room it was in before. `draw_event` is relayed to the rest of the
//! current room, or dropped while unjoined. Malformed input is logged and
//! dropped without telling the client.

use super::broadcast::Broadcaster;
use super::connection::Connection;
use super::registry::RoomRegistry;
use scrawl_core::{
    decode_client, encode_server, ClientMessage, RoomId, ScrawlResult, ServerMessage, Stroke,
};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Routes decoded client messages.
pub struct MessageRouter {
    registry: Arc<RoomRegistry>,
    broadcaster: Broadcaster,
}

impl MessageRouter {
    /// Create a router sharing `registry` with the broadcaster.
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        let broadcaster = Broadcaster::new(registry.clone());
        Self {
            registry,
            broadcaster,
        }
    }

    /// Handle one inbound text message. Never fails: protocol problems are
    /// logged and the message is dropped.
    pub async fn handle_text(&self, conn: &mut Connection, text: &str) {
        let msg = match decode_client(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(conn_id = %conn.id(), error = %e, "dropping malformed message");
                return;
            }
        };
        if let Err(e) = self.dispatch(conn, msg).await {
            warn!(conn_id = %conn.id(), error = %e, "message handling failed");
        }
    }

    /// Apply a decoded message.
    pub async fn dispatch(&self, conn: &mut Connection, msg: ClientMessage) -> ScrawlResult<()> {
        match msg {
            ClientMessage::JoinRoom { room_id } => self.join(conn, room_id).await,
            ClientMessage::DrawEvent { stroke } => self.draw(conn, stroke).await,
        }
    }

    /// Tear down a closed connection's membership.
    pub async fn disconnect(&self, mut conn: Connection) {
        if let Some(room) = conn.take_room() {
            self.registry.leave(&room, conn.id()).await;
            info!(
                conn_id = %conn.id(),
                remote = ?conn.remote_addr(),
                room = %room,
                "left room on disconnect"
            );
        }
    }

    async fn join(&self, conn: &mut Connection, room: RoomId) -> ScrawlResult<()> {
        if let Some(prev) = conn.enter(room.clone()) {
            if prev != room {
                self.registry.leave(&prev, conn.id()).await;
                debug!(conn_id = %conn.id(), from = %prev, to = %room, "switching rooms");
            }
        }
        // The ack is queued under the registry lock, ahead of any stroke
        // broadcast to the room after this connection became a member.
        let ack = encode_server(&ServerMessage::RoomJoined {
            room_id: room.clone(),
        })?;
        self.registry
            .join_and_notify(&room, conn.id(), conn.outbound().clone(), Arc::from(ack))
            .await?;

        info!(conn_id = %conn.id(), room = %room, "joined room");
        Ok(())
    }

    async fn draw(&self, conn: &Connection, stroke: Stroke) -> ScrawlResult<()> {
        let Some(room) = conn.current_room() else {
            debug!(conn_id = %conn.id(), "draw_event before join_room, dropped");
            return Ok(());
        };
        let delivered = self
            .broadcaster
            .broadcast(room, &ServerMessage::DrawEvent { stroke }, Some(conn.id()))
            .await?;
        trace!(conn_id = %conn.id(), room = %room, delivered, "stroke relayed");
        Ok(())
    }
}
