//! scrawl-core: Shared protocol library for the scrawl drawing relay.
//!
//! Provides the JSON message envelopes, stroke model, text codec, identifier
//! types, and the error type used across the workspace.

pub mod codec;
pub mod error;
pub mod messages;
pub mod types;

// Re-export commonly used items at crate root.
pub use codec::{decode_client, decode_server, encode_client, encode_server};
pub use error::{ScrawlError, ScrawlResult};
pub use messages::{ClientMessage, MsgType, Point, Segment, ServerMessage, Stroke};
pub use types::{ConnId, RoomId};
