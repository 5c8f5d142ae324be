//! Wire message types for the drawing relay.
//!
//! Every WebSocket message carries exactly one JSON envelope discriminated by
//! its `type` field. Envelope encoding lives in [`crate::codec`].

use crate::error::{ScrawlError, ScrawlResult};
use crate::types::RoomId;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

/// Color used by renderers when a stroke carries none.
pub const DEFAULT_STROKE_COLOR: &str = "black";

/// Line width used by renderers when a stroke carries none.
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

/// Envelope `type` tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    JoinRoom,
    DrawEvent,
    RoomJoined,
}

impl MsgType {
    pub fn as_str(self) -> &'static str {
        match self {
            MsgType::JoinRoom => "join_room",
            MsgType::DrawEvent => "draw_event",
            MsgType::RoomJoined => "room_joined",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "join_room" => Some(MsgType::JoinRoom),
            "draw_event" => Some(MsgType::DrawEvent),
            "room_joined" => Some(MsgType::RoomJoined),
            _ => None,
        }
    }
}

/// A point on the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Typed view of a stroke, as a renderer reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

impl Segment {
    /// A segment with no styling.
    pub fn new(from: Point, to: Point) -> Self {
        Self {
            from,
            to,
            color: None,
            width: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    /// Color a renderer should paint with.
    pub fn effective_color(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_STROKE_COLOR)
    }

    /// Width a renderer should paint with.
    pub fn effective_width(&self) -> f64 {
        self.width.unwrap_or(DEFAULT_STROKE_WIDTH)
    }
}

/// One line segment drawn by a client.
///
/// Holds the stroke's JSON exactly as it arrived together with its parsed
/// [`Segment`]. Only the original text is ever written back out, so number
/// spelling, absent styling and unknown fields all survive the relay.
#[derive(Debug, Clone)]
pub struct Stroke {
    raw: Box<RawValue>,
    segment: Segment,
}

impl Stroke {
    /// Parse and validate stroke JSON, keeping the text as given.
    pub fn from_json(json: &str) -> ScrawlResult<Self> {
        let raw = RawValue::from_string(json.to_string())?;
        Self::from_raw(raw)
    }

    /// Validate an already extracted JSON value.
    pub fn from_raw(raw: Box<RawValue>) -> ScrawlResult<Self> {
        let segment = serde_json::from_str(raw.get())
            .map_err(|e| ScrawlError::InvalidMessage(format!("stroke: {e}")))?;
        Ok(Self { raw, segment })
    }

    /// Encode a locally drawn segment.
    pub fn from_segment(segment: Segment) -> ScrawlResult<Self> {
        let raw = serde_json::value::to_raw_value(&segment)?;
        Ok(Self { raw, segment })
    }

    /// The stroke JSON as it will be sent.
    pub fn as_json(&self) -> &str {
        self.raw.get()
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }
}

impl PartialEq for Stroke {
    fn eq(&self, other: &Self) -> bool {
        self.raw.get() == other.raw.get()
    }
}

impl Serialize for Stroke {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Stroke {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Stroke::from_raw(raw).map_err(D::Error::custom)
    }
}

/// Messages sent from clients to the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Join a room, leaving any room joined earlier.
    JoinRoom { room_id: RoomId },
    /// A stroke to relay to the rest of the room.
    DrawEvent { stroke: Stroke },
}

/// Messages sent from the relay to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Acknowledges a `join_room`.
    RoomJoined { room_id: RoomId },
    /// A stroke drawn by another member of the room.
    DrawEvent { stroke: Stroke },
}
