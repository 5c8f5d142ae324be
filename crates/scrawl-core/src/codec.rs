//! JSON text codec for the relay envelopes.
//!
//! Wire format: one UTF-8 JSON object per WebSocket message, no extra framing.
//! Decoding reads straight from the received text so a stroke keeps the exact
//! bytes the client sent.

use crate::error::{ScrawlError, ScrawlResult};
use crate::messages::{ClientMessage, MsgType, ServerMessage, Stroke};
use crate::types::RoomId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize)]
struct RoomEnvelope<'a> {
    #[serde(rename = "type", skip_deserializing)]
    kind: &'a str,
    #[serde(rename = "roomId")]
    room_id: RoomId,
}

#[derive(Serialize, Deserialize)]
struct StrokeEnvelope<'a> {
    #[serde(rename = "type", skip_deserializing)]
    kind: &'a str,
    stroke: Stroke,
}

/// Encode a server envelope.
pub fn encode_server(msg: &ServerMessage) -> ScrawlResult<String> {
    match msg {
        ServerMessage::RoomJoined { room_id } => encode_room(MsgType::RoomJoined, room_id),
        ServerMessage::DrawEvent { stroke } => encode_stroke(MsgType::DrawEvent, stroke),
    }
}

/// Encode a client envelope.
pub fn encode_client(msg: &ClientMessage) -> ScrawlResult<String> {
    match msg {
        ClientMessage::JoinRoom { room_id } => encode_room(MsgType::JoinRoom, room_id),
        ClientMessage::DrawEvent { stroke } => encode_stroke(MsgType::DrawEvent, stroke),
    }
}

fn encode_room(kind: MsgType, room_id: &RoomId) -> ScrawlResult<String> {
    Ok(serde_json::to_string(&RoomEnvelope {
        kind: kind.as_str(),
        room_id: room_id.clone(),
    })?)
}

fn encode_stroke(kind: MsgType, stroke: &Stroke) -> ScrawlResult<String> {
    Ok(serde_json::to_string(&StrokeEnvelope {
        kind: kind.as_str(),
        stroke: stroke.clone(),
    })?)
}

/// Decode a client envelope.
///
/// Distinguishes unparsable text (`Codec`), envelopes whose `type` is not a
/// client message (`UnknownType`), and known types with bad fields
/// (`InvalidMessage`).
pub fn decode_client(text: &str) -> ScrawlResult<ClientMessage> {
    match classify(text)? {
        MsgType::JoinRoom => {
            let env: RoomEnvelope<'_> = parse_fields(text, MsgType::JoinRoom)?;
            Ok(ClientMessage::JoinRoom {
                room_id: env.room_id,
            })
        }
        MsgType::DrawEvent => {
            let env: StrokeEnvelope<'_> = parse_fields(text, MsgType::DrawEvent)?;
            Ok(ClientMessage::DrawEvent { stroke: env.stroke })
        }
        other => Err(ScrawlError::UnknownType(other.as_str().to_string())),
    }
}

/// Decode a server envelope (used by clients and tests).
pub fn decode_server(text: &str) -> ScrawlResult<ServerMessage> {
    match classify(text)? {
        MsgType::RoomJoined => {
            let env: RoomEnvelope<'_> = parse_fields(text, MsgType::RoomJoined)?;
            Ok(ServerMessage::RoomJoined {
                room_id: env.room_id,
            })
        }
        MsgType::DrawEvent => {
            let env: StrokeEnvelope<'_> = parse_fields(text, MsgType::DrawEvent)?;
            Ok(ServerMessage::DrawEvent { stroke: env.stroke })
        }
        other => Err(ScrawlError::UnknownType(other.as_str().to_string())),
    }
}

/// Check the text is a JSON object and read its `type` tag.
fn classify(text: &str) -> ScrawlResult<MsgType> {
    let value: Value = serde_json::from_str(text)?;
    let tag = value
        .as_object()
        .ok_or_else(|| ScrawlError::InvalidMessage("envelope is not a JSON object".into()))?
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ScrawlError::InvalidMessage("missing or non-string `type`".into()))?;
    MsgType::from_tag(tag).ok_or_else(|| ScrawlError::UnknownType(tag.to_string()))
}

fn parse_fields<'a, T: Deserialize<'a>>(text: &'a str, kind: MsgType) -> ScrawlResult<T> {
    serde_json::from_str(text)
        .map_err(|e| ScrawlError::InvalidMessage(format!("{}: {e}", kind.as_str())))
}
