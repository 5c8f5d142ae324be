//! Room relay: registry, broadcaster, and per-connection message router.

pub mod broadcast;
pub mod connection;
pub mod registry;
pub mod router;

pub use broadcast::Broadcaster;
pub use connection::{Connection, Membership};
pub use registry::{PeerSender, RoomRegistry};
pub use router::MessageRouter;
