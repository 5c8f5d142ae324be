// End-to-end tests for the relay server.
//
// Starts a server on localhost with an OS-assigned port and drives it with
// plain tokio-tungstenite clients speaking the JSON protocol.

use futures_util::{SinkExt, StreamExt};
use scrawl_core::{
    decode_server, encode_client, ClientMessage, Point, RoomId, Segment, ServerMessage, Stroke,
};
use scrawl_server::transport::websocket::start_listener;
use scrawl_server::{RoomRegistry, ScrawlServer, ServerConfig};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);
const SILENCE: Duration = Duration::from_millis(200);

/// Start a server on 127.0.0.1:0; returns its address and registry.
async fn start_server(config: ServerConfig) -> (SocketAddr, Arc<RoomRegistry>) {
    let listener = start_listener("127.0.0.1", 0).await.unwrap();
    let addr = listener.local_addr();
    let server = ScrawlServer::new(config);
    let registry = server.registry();
    tokio::spawn(server.serve(listener));
    (addr, registry)
}

async fn start() -> (SocketAddr, Arc<RoomRegistry>) {
    start_server(ServerConfig {
        stats_interval: 0,
        ..ServerConfig::default()
    })
    .await
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    ws
}

async fn send_raw(ws: &mut Client, text: &str) {
    ws.send(Message::Text(text.to_string().into())).await.unwrap();
}

async fn send(ws: &mut Client, msg: &ClientMessage) {
    send_raw(ws, &encode_client(msg).unwrap()).await;
}

/// Next text message from the server.
async fn recv_raw(ws: &mut Client) -> String {
    timeout(RECV_TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text.to_string(),
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for a message")
}

async fn recv(ws: &mut Client) -> ServerMessage {
    decode_server(&recv_raw(ws).await).unwrap()
}

/// Assert nothing arrives for a short while.
async fn expect_silence(ws: &mut Client) {
    if let Ok(msg) = timeout(SILENCE, ws.next()).await {
        panic!("expected no message, got {msg:?}");
    }
}

async fn join(ws: &mut Client, room: &str) {
    send(
        ws,
        &ClientMessage::JoinRoom {
            room_id: RoomId::new(room),
        },
    )
    .await;
    assert_eq!(
        recv(ws).await,
        ServerMessage::RoomJoined {
            room_id: RoomId::new(room)
        }
    );
}

async fn draw(ws: &mut Client, stroke: &Stroke) {
    send(
        ws,
        &ClientMessage::DrawEvent {
            stroke: stroke.clone(),
        },
    )
    .await;
}

async fn wait_for_members(registry: &RoomRegistry, room: &str, count: usize) {
    let room = RoomId::new(room);
    timeout(RECV_TIMEOUT, async {
        while registry.member_count(&room).await != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("room membership did not settle");
}

fn stroke() -> Stroke {
    let segment = Segment::new(Point::new(10.0, 20.0), Point::new(30.0, 40.5))
        .with_color("black")
        .with_width(2.0);
    Stroke::from_segment(segment).unwrap()
}

#[tokio::test]
async fn peers_in_room_receive_strokes() {
    let (addr, _registry) = start().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    join(&mut a, "r1").await;
    join(&mut b, "r1").await;

    draw(&mut a, &stroke()).await;

    assert_eq!(recv(&mut b).await, ServerMessage::DrawEvent { stroke: stroke() });
    expect_silence(&mut b).await;
    expect_silence(&mut a).await;
}

#[tokio::test]
async fn other_rooms_are_isolated() {
    let (addr, _registry) = start().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    let mut c = connect(addr).await;
    join(&mut a, "r1").await;
    join(&mut b, "r1").await;
    join(&mut c, "r2").await;

    draw(&mut a, &stroke()).await;

    assert_eq!(recv(&mut b).await, ServerMessage::DrawEvent { stroke: stroke() });
    expect_silence(&mut c).await;
}

#[tokio::test]
async fn draw_before_join_goes_nowhere() {
    let (addr, registry) = start().await;
    let mut a = connect(addr).await;
    let mut u = connect(addr).await;
    join(&mut a, "r1").await;

    draw(&mut u, &stroke()).await;
    expect_silence(&mut a).await;
    expect_silence(&mut u).await;

    // The unjoined connection is still usable.
    join(&mut u, "r1").await;
    draw(&mut u, &stroke()).await;
    assert_eq!(recv(&mut a).await, ServerMessage::DrawEvent { stroke: stroke() });
    assert_eq!(registry.member_count(&RoomId::new("r1")).await, 2);
}

#[tokio::test]
async fn closed_peer_leaves_room() {
    let (addr, registry) = start().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    join(&mut a, "r1").await;
    join(&mut b, "r1").await;
    assert_eq!(registry.member_count(&RoomId::new("r1")).await, 2);

    b.close(None).await.unwrap();
    wait_for_members(&registry, "r1", 1).await;

    draw(&mut a, &stroke()).await;
    expect_silence(&mut a).await;
    assert_eq!(registry.member_count(&RoomId::new("r1")).await, 1);
}

#[tokio::test]
async fn last_close_removes_room() {
    let (addr, registry) = start().await;
    let mut a = connect(addr).await;
    join(&mut a, "solo").await;
    assert!(registry.contains(&RoomId::new("solo")).await);

    drop(a);
    wait_for_members(&registry, "solo", 0).await;
    assert!(registry.rooms().await.is_empty());
}

#[tokio::test]
async fn relay_does_not_inject_style_defaults() {
    let (addr, _registry) = start().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    join(&mut a, "r1").await;
    join(&mut b, "r1").await;

    send_raw(
        &mut a,
        r#"{"type":"draw_event","stroke":{"from":{"x":1.5,"y":2.5},"to":{"x":3.5,"y":4.5}}}"#,
    )
    .await;

    let received: Value = serde_json::from_str(&recv_raw(&mut b).await).unwrap();
    assert_eq!(received["type"], "draw_event");
    let stroke = received["stroke"].as_object().unwrap();
    assert!(!stroke.contains_key("color"));
    assert!(!stroke.contains_key("width"));
    assert_eq!(received["stroke"]["from"]["x"], 1.5);
    assert_eq!(received["stroke"]["to"]["y"], 4.5);
}

#[tokio::test]
async fn stroke_json_is_forwarded_exactly() {
    let (addr, _registry) = start().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    join(&mut a, "r1").await;
    join(&mut b, "r1").await;

    // Integer spelling, a value past f64 precision, and a nested field the
    // relay knows nothing about.
    let stroke = r#"{"from":{"x":1,"y":2,"p":0.5},"to":{"x":9007199254740993,"y":4},"width":2}"#;
    let sent = format!(r#"{{"type":"draw_event","stroke":{stroke}}}"#);
    send_raw(&mut a, &sent).await;

    let received = recv_raw(&mut b).await;
    assert!(received.contains(stroke), "stroke rewritten: {received}");
    assert_eq!(received, sent);

    let value: Value = serde_json::from_str(&received).unwrap();
    assert_eq!(value["stroke"]["from"]["p"], 0.5);
    assert_eq!(value["stroke"]["to"]["x"].as_u64(), Some(9007199254740993));
    assert_eq!(value["stroke"]["width"].as_u64(), Some(2));
}

#[tokio::test]
async fn malformed_json_keeps_connection_open() {
    let (addr, _registry) = start().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    join(&mut a, "r1").await;
    join(&mut b, "r1").await;

    send_raw(&mut a, "{this is not json").await;
    send_raw(&mut a, r#"{"type":"erase","all":true}"#).await;
    expect_silence(&mut a).await;
    expect_silence(&mut b).await;

    draw(&mut a, &stroke()).await;
    assert_eq!(recv(&mut b).await, ServerMessage::DrawEvent { stroke: stroke() });

    draw(&mut b, &stroke()).await;
    assert_eq!(recv(&mut a).await, ServerMessage::DrawEvent { stroke: stroke() });
}

#[tokio::test]
async fn switching_rooms_leaves_the_old_one() {
    let (addr, registry) = start().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    join(&mut a, "r1").await;
    join(&mut b, "r1").await;
    join(&mut a, "r2").await;

    assert_eq!(registry.member_count(&RoomId::new("r1")).await, 1);
    assert_eq!(registry.member_count(&RoomId::new("r2")).await, 1);

    draw(&mut b, &stroke()).await;
    expect_silence(&mut a).await;
}

#[tokio::test]
async fn rejoining_same_room_delivers_once() {
    let (addr, registry) = start().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    join(&mut a, "r1").await;
    join(&mut a, "r1").await;
    join(&mut b, "r1").await;
    assert_eq!(registry.member_count(&RoomId::new("r1")).await, 2);

    draw(&mut b, &stroke()).await;
    assert_eq!(recv(&mut a).await, ServerMessage::DrawEvent { stroke: stroke() });
    expect_silence(&mut a).await;
}

#[tokio::test]
async fn oversized_message_is_dropped_not_fatal() {
    let (addr, _registry) = start_server(ServerConfig {
        stats_interval: 0,
        max_message_size: 256,
        ..ServerConfig::default()
    })
    .await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    join(&mut a, "r1").await;
    join(&mut b, "r1").await;

    let big = Segment::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0)).with_color("x".repeat(512));
    let big = Stroke::from_segment(big).unwrap();
    draw(&mut a, &big).await;
    expect_silence(&mut b).await;

    draw(&mut a, &stroke()).await;
    assert_eq!(recv(&mut b).await, ServerMessage::DrawEvent { stroke: stroke() });
}
