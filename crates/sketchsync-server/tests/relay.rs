//! Drives a real relay over loopback sockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use sketchsync_server::{AppState, ServerConfig, serve};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig::default()
        .with_token("alice-token", "alice")
        .with_token("bob-token", "bob")
        .with_share_token("share");
    tokio::spawn(serve(listener, Arc::new(AppState::from_config(config))));
    addr
}

async fn connect(addr: SocketAddr, board: &str, query: &str) -> Ws {
    let (ws, _) = connect_async(format!("ws://{addr}/ws/{board}?{query}")).await.unwrap();
    ws
}

async fn recv(ws: &mut Ws) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send(ws: &mut Ws, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

fn rect(id: &str) -> Value {
    json!({ "id": id, "type": "rect", "x": 10.0, "y": 20.0, "width": 100.0, "height": 50.0 })
}

/// Connect and consume the initial `sync_state` and own `join`.
async fn join(addr: SocketAddr, board: &str, query: &str) -> (Ws, Value) {
    let mut ws = connect(addr, board, query).await;
    let state = recv(&mut ws).await;
    assert_eq!(state["type"], "sync_state");
    let joined = recv(&mut ws).await;
    assert_eq!(joined["type"], "join");
    (ws, state)
}

#[tokio::test]
async fn test_health() {
    let addr = start().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("ok"));
}

#[tokio::test]
async fn test_bad_credentials_rejected_before_upgrade() {
    let addr = start().await;
    for query in ["token=wrong", "share_token=wrong", ""] {
        let result = connect_async(format!("ws://{addr}/ws/b1?{query}")).await;
        match result {
            Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 401),
            other => panic!("expected 401 for {query:?}, got {:?}", other.map(|_| ())),
        }
    }
}

#[tokio::test]
async fn test_join_presence() {
    let addr = start().await;
    let (mut alice, state) = join(addr, "b1", "token=alice-token").await;
    assert_eq!(state["elements"], json!([]));

    let mut bob = connect(addr, "b1", "token=bob-token").await;
    assert_eq!(recv(&mut bob).await["type"], "sync_state");
    let bob_join = recv(&mut bob).await;
    assert_eq!(bob_join["users"].as_array().unwrap().len(), 2);

    let seen = recv(&mut alice).await;
    assert_eq!(seen["type"], "join");
    assert_eq!(seen["username"], "bob");
    assert_eq!(seen["users"][0]["username"], "alice");
    assert_eq!(seen["users"][0]["color"], "#F44336");
    assert_eq!(seen["users"][1]["color"], "#2196F3");
}

#[tokio::test]
async fn test_relay_without_echo() {
    let addr = start().await;
    let (mut alice, _) = join(addr, "b1", "token=alice-token").await;
    let (mut bob, _) = join(addr, "b1", "token=bob-token").await;
    assert_eq!(recv(&mut alice).await["type"], "join");

    send(&mut alice, json!({ "type": "element_add", "element": rect("e1") })).await;
    let added = recv(&mut bob).await;
    assert_eq!(added["type"], "element_add");
    assert_eq!(added["element"]["id"], "e1");

    send(&mut alice, json!({ "type": "cursor", "x": 5.0, "y": 6.0 })).await;
    let cursor = recv(&mut bob).await;
    assert_eq!(cursor["type"], "cursor");
    assert_eq!(cursor["username"], "alice");
    assert_eq!(cursor["color"], "#F44336");
    assert!(cursor["userId"].is_string());

    // Alice's next frame is Bob's edit, not an echo of her own.
    send(&mut bob, json!({ "type": "element_remove", "elementId": "e1" })).await;
    let removed = recv(&mut alice).await;
    assert_eq!(removed["type"], "element_remove");
    assert_eq!(removed["elementId"], "e1");
}

#[tokio::test]
async fn test_late_joiner_receives_board() {
    let addr = start().await;
    let (mut alice, _) = join(addr, "b1", "token=alice-token").await;
    let (mut bob, _) = join(addr, "b1", "token=bob-token").await;
    assert_eq!(recv(&mut alice).await["type"], "join");

    send(&mut alice, json!({ "type": "element_add", "element": rect("e1") })).await;
    send(&mut alice, json!({ "type": "element_add", "element": rect("e2") })).await;
    send(&mut alice, json!({ "type": "element_remove", "elementId": "e1" })).await;
    for _ in 0..3 {
        recv(&mut bob).await;
    }

    let mut guest = connect(addr, "b1", "share_token=share").await;
    let state = recv(&mut guest).await;
    assert_eq!(state["type"], "sync_state");
    let elements = state["elements"].as_array().unwrap();
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0]["id"], "e2");
    assert_eq!(recv(&mut guest).await["username"], "Guest");
}

#[tokio::test]
async fn test_leave_and_room_reopen() {
    let addr = start().await;
    let (mut alice, _) = join(addr, "b1", "token=alice-token").await;
    let (mut bob, _) = join(addr, "b1", "token=bob-token").await;
    assert_eq!(recv(&mut alice).await["type"], "join");

    send(&mut bob, json!({ "type": "element_add", "element": rect("e1") })).await;
    assert_eq!(recv(&mut alice).await["type"], "element_add");

    bob.close(None).await.unwrap();
    let leave = recv(&mut alice).await;
    assert_eq!(leave["type"], "leave");
    assert_eq!(leave["users"].as_array().unwrap().len(), 1);
    assert_eq!(leave["users"][0]["username"], "alice");

    alice.close(None).await.unwrap();
    drop(alice);

    // The board outlives the empty room. The close may still be in flight,
    // so retry until a fresh room has loaded it.
    let mut elements = Vec::new();
    for _ in 0..50 {
        let (mut ws, state) = join(addr, "b1", "token=alice-token").await;
        elements = state["elements"].as_array().cloned().unwrap_or_default();
        ws.close(None).await.unwrap();
        if !elements.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(elements.len(), 1);
}

#[tokio::test]
async fn test_boards_are_isolated() {
    let addr = start().await;
    let (mut alice, _) = join(addr, "b1", "token=alice-token").await;
    let (mut bob, _) = join(addr, "b2", "token=bob-token").await;

    send(&mut alice, json!({ "type": "element_add", "element": rect("e1") })).await;
    send(&mut bob, json!({ "type": "element_add", "element": rect("e2") })).await;

    // Neither sees the other's board.
    let pending = tokio::time::timeout(Duration::from_millis(200), alice.next()).await;
    assert!(pending.is_err());

    let (_carol, state) = join(addr, "b2", "share_token=share").await;
    let elements = state["elements"].as_array().unwrap();
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0]["id"], "e2");
}
