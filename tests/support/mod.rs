// Shared primitives for one-time server bootstrapping across integration tests.
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::{
    // `Arc` shares data between threads; `OnceLock` writes a value only once.
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, protocol::CloseFrame},
};

pub type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Upper bound for any single expected reply.
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

// Global base URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Ensure the test server is running and return the shared base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                fight_lobby::run(listener).await.expect("server failed");
            });
        });
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// Wait for URL publication and then wait for the server socket to accept TCP connections.
fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    // Retry for a short period to avoid racing server bind/accept.
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

// Room names are unique per test because every test binary shares one server.
pub fn unique_room(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

pub async fn connect() -> Ws {
    let base_url = ensure_server();
    let url = format!("{}/ws", base_url.replacen("http://", "ws://", 1));
    let (ws, _response) = connect_async(url).await.expect("websocket connect");
    ws
}

pub async fn send_json(ws: &mut Ws, value: serde_json::Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("websocket send");
}

pub async fn send_raw(ws: &mut Ws, text: &str) {
    ws.send(Message::text(text.to_string()))
        .await
        .expect("websocket send");
}

pub async fn send_binary(ws: &mut Ws, bytes: &[u8]) {
    ws.send(Message::binary(bytes.to_vec()))
        .await
        .expect("websocket send");
}

// Next text frame as sent on the wire, skipping control frames.
pub async fn recv_text(ws: &mut Ws) -> String {
    loop {
        let next = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for message")
            .expect("stream ended")
            .expect("websocket error");
        match next {
            Message::Text(_) => return next.to_text().expect("utf-8 text frame").to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

// Next JSON frame, skipping control frames.
pub async fn recv_json(ws: &mut Ws) -> serde_json::Value {
    serde_json::from_str(&recv_text(ws).await).expect("json frame")
}

// The close frame the server sent; `None` if the socket ended without one.
pub async fn recv_close_frame(ws: &mut Ws) -> Option<CloseFrame> {
    loop {
        match tokio::time::timeout(RECV_TIMEOUT, ws.next()).await {
            Ok(Some(Ok(Message::Close(frame)))) => return frame,
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            Ok(Some(Ok(other))) => panic!("expected close frame, got {other:?}"),
            Ok(None) | Ok(Some(Err(_))) => return None,
            Err(_) => panic!("timed out waiting for close frame"),
        }
    }
}

// True when the socket closes before any text frame arrives.
pub async fn closed_without_reply(ws: &mut Ws) -> bool {
    loop {
        match tokio::time::timeout(RECV_TIMEOUT, ws.next()).await {
            Err(_) | Ok(Some(Ok(Message::Text(_)))) => return false,
            Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
            Ok(Some(Ok(_))) => continue,
        }
    }
}

// Asserts nothing but control frames arrive within `window`.
pub async fn expect_silence(ws: &mut Ws, window: Duration) {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        match tokio::time::timeout_at(deadline, ws.next()).await {
            Err(_) => return,
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            Ok(other) => panic!("expected no message, got {other:?}"),
        }
    }
}

// Client A creates `room`, client B joins it; both assignment replies are consumed.
pub async fn paired(room: &str) -> (Ws, Ws) {
    let mut a = connect().await;
    let mut b = connect().await;

    send_json(
        &mut a,
        serde_json::json!({ "type": "createRoom", "name": room, "clientId": format!("{room}-a") }),
    )
    .await;
    assert_eq!(recv_json(&mut a).await["type"], "roomCreated");

    send_json(
        &mut b,
        serde_json::json!({ "type": "joinRoom", "name": room, "clientId": format!("{room}-b") }),
    )
    .await;
    assert_eq!(recv_json(&mut b).await["type"], "roomJoined");
    assert_eq!(recv_json(&mut a).await["type"], "roomJoined");

    (a, b)
}
