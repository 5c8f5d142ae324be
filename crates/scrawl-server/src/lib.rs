//! scrawl-server: relay for a shared freehand drawing surface.
//!
//! Clients connect over WebSocket, join a room with `join_room`, and every
//! `draw_event` they send is relayed to the other members of that room.

pub mod config;
pub mod relay;
pub mod server;
pub mod transport;

pub use config::{ConfigOverrides, ServerConfig};
pub use relay::{Broadcaster, MessageRouter, RoomRegistry};
pub use server::ScrawlServer;
