//! Broadcast engine: fans one message out to the members of a room.
//!
//! Delivery is fire-and-forget. Each member has a bounded outbound queue;
//! a full queue loses the new message (drop-newest) and a closed queue is
//! skipped. Nothing is retried and nothing is reported to the sender.
//!
//! There is no backpressure toward the drawing client: a receiver that
//! cannot keep up silently misses strokes.

use super::registry::RoomRegistry;
use crate::transport::websocket::Outbound;
use scrawl_core::{encode_server, ConnId, RoomId, ScrawlResult, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace};

/// Delivers server messages to room members.
pub struct Broadcaster {
    registry: Arc<RoomRegistry>,
}

impl Broadcaster {
    /// Create a broadcaster over a room registry.
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Send `message` to every member of `room` except `exclude`.
    ///
    /// The message is serialized once and the same payload is queued for
    /// every recipient. Returns how many members it was queued for.
    pub async fn broadcast(
        &self,
        room: &RoomId,
        message: &ServerMessage,
        exclude: Option<ConnId>,
    ) -> ScrawlResult<usize> {
        let payload: Outbound = Arc::from(encode_server(message)?);
        let recipients = self.registry.recipients(room).await;

        let mut delivered = 0;
        for (conn_id, sender) in recipients {
            if Some(conn_id) == exclude {
                continue;
            }
            match sender.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(room = %room, conn_id = %conn_id, "outbound queue full, message dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    trace!(room = %room, conn_id = %conn_id, "peer not open, skipped");
                }
            }
        }

        trace!(room = %room, delivered, "broadcast");
        Ok(delivered)
    }
}
