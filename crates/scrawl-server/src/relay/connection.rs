//! Per-connection relay state.

use super::registry::PeerSender;
use scrawl_core::{ConnId, RoomId};
use std::net::SocketAddr;

/// Room membership of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    /// No `join_room` processed yet.
    Unjoined,
    /// Member of exactly this room.
    Joined(RoomId),
}

/// State the router keeps for one client connection.
#[derive(Debug)]
pub struct Connection {
    id: ConnId,
    remote_addr: Option<SocketAddr>,
    /// Queue drained by this connection's writer task.
    outbound: PeerSender,
    membership: Membership,
}

impl Connection {
    pub fn new(id: ConnId, outbound: PeerSender) -> Self {
        Self {
            id,
            remote_addr: None,
            outbound,
            membership: Membership::Unjoined,
        }
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn outbound(&self) -> &PeerSender {
        &self.outbound
    }

    pub fn current_room(&self) -> Option<&RoomId> {
        match &self.membership {
            Membership::Joined(room) => Some(room),
            Membership::Unjoined => None,
        }
    }

    /// Record a new current room, returning the previous one.
    pub fn enter(&mut self, room: RoomId) -> Option<RoomId> {
        match std::mem::replace(&mut self.membership, Membership::Joined(room)) {
            Membership::Joined(prev) => Some(prev),
            Membership::Unjoined => None,
        }
    }

    /// Clear the current room, returning it.
    pub fn take_room(&mut self) -> Option<RoomId> {
        match std::mem::replace(&mut self.membership, Membership::Unjoined) {
            Membership::Joined(prev) => Some(prev),
            Membership::Unjoined => None,
        }
    }
}
