//! Room registry.
//!
//! Maps room identifiers to the connections currently in them. Rooms are
//! created by the first join and removed by the last leave, so every room
//! present in the map has at least one member.

use crate::transport::websocket::Outbound;
use scrawl_core::{ConnId, RoomId, ScrawlError, ScrawlResult};
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Outbound queue handle of a room member.
pub type PeerSender = mpsc::Sender<Outbound>;

/// Registry of rooms and their members.
#[derive(Default)]
pub struct RoomRegistry {
    /// Members per room, keyed by connection so a repeated join is a no-op.
    rooms: RwLock<HashMap<RoomId, HashMap<ConnId, PeerSender>>>,
}

impl RoomRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room, creating the room if needed.
    ///
    /// Returns `false` if the connection was already a member.
    pub async fn join(&self, room: &RoomId, conn_id: ConnId, sender: PeerSender) -> bool {
        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(room.clone()).or_default();
        let added = members.insert(conn_id, sender).is_none();
        debug!(room = %room, conn_id = %conn_id, members = members.len(), "joined room");
        added
    }

    /// Add a connection to a room and queue `ack` to it in the same step.
    ///
    /// Queue space is reserved before the room is locked and the ack is
    /// pushed while the lock is still held, so no broadcast can reach the
    /// new member ahead of its ack.
    pub async fn join_and_notify(
        &self,
        room: &RoomId,
        conn_id: ConnId,
        sender: PeerSender,
        ack: Outbound,
    ) -> ScrawlResult<bool> {
        let permit = sender
            .reserve()
            .await
            .map_err(|_| ScrawlError::Transport("outbound queue closed".into()))?;
        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(room.clone()).or_default();
        let added = members.insert(conn_id, sender.clone()).is_none();
        permit.send(ack);
        debug!(room = %room, conn_id = %conn_id, members = members.len(), "joined room");
        Ok(added)
    }

    /// Remove a connection from a room, dropping the room once empty.
    ///
    /// Absent rooms and non-members are ignored. Returns whether anything
    /// was removed.
    pub async fn leave(&self, room: &RoomId, conn_id: ConnId) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(members) = rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(&conn_id).is_some();
        if members.is_empty() {
            rooms.remove(room);
            debug!(room = %room, "room emptied, removed");
        } else if removed {
            debug!(room = %room, conn_id = %conn_id, members = members.len(), "left room");
        }
        removed
    }

    /// Current members of a room; empty if the room does not exist.
    pub async fn members(&self, room: &RoomId) -> Vec<ConnId> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room)
            .map(|members| members.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Members of a room together with their outbound queues.
    pub async fn recipients(&self, room: &RoomId) -> Vec<(ConnId, PeerSender)> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room)
            .map(|members| {
                members
                    .iter()
                    .map(|(id, tx)| (*id, tx.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of members in a room.
    pub async fn member_count(&self, room: &RoomId) -> usize {
        self.rooms.read().await.get(room).map_or(0, HashMap::len)
    }

    /// Whether a room currently exists.
    pub async fn contains(&self, room: &RoomId) -> bool {
        self.rooms.read().await.contains_key(room)
    }

    /// All active rooms.
    pub async fn rooms(&self) -> Vec<RoomId> {
        self.rooms.read().await.keys().cloned().collect()
    }

    /// Number of active rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Number of connections that are in some room.
    pub async fn connection_count(&self) -> usize {
        self.rooms.read().await.values().map(HashMap::len).sum()
    }
}
