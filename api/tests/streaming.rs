//! End-to-end tests driving the hub over real WebSocket connections.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use algostream_api::{HubConfig, HubState, Server};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct Hub {
    addr: SocketAddr,
    state: HubState,
    _stop: oneshot::Sender<()>,
}

impl Hub {
    async fn start(config: HubConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let state = HubState::new(config);
        let (stop, stopped) = oneshot::channel::<()>();

        let server = Server::new(state.clone());
        tokio::spawn(async move {
            server
                .serve_with(listener, async move {
                    let _ = stopped.await;
                })
                .await
                .expect("serve");
        });

        Self {
            addr,
            state,
            _stop: stop,
        }
    }

    async fn fast() -> Self {
        Self::start(HubConfig::new("127.0.0.1", 0).with_intervals(50, 100)).await
    }

    async fn connect(&self, path: &str) -> Client {
        let url = format!("ws://{}{}", self.addr, path);
        let (client, _) = connect_async(url).await.expect("connect");
        client
    }
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let message = tokio::time::timeout(WAIT, client.next())
            .await
            .expect("frame in time")
            .expect("stream open")
            .expect("frame");
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("json frame");
        }
    }
}

async fn next_of_type(client: &mut Client, kind: &str) -> Value {
    loop {
        let event = next_json(client).await;
        if event["type"] == kind {
            return event;
        }
    }
}

async fn send_text(client: &mut Client, text: &str) {
    client.send(Message::text(text)).await.expect("send");
}

/// Waits until the server side has closed the socket.
async fn expect_closed(client: &mut Client) {
    let closed = tokio::time::timeout(WAIT, async {
        loop {
            match client.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "server did not close the socket");
}

async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

#[tokio::test]
async fn test_ticks_connected_first_then_control_replies() {
    let hub = Hub::fast().await;
    let mut client = hub.connect("/ws/ticks").await;

    let first = next_json(&mut client).await;
    assert_eq!(first["type"], "connected");
    assert_eq!(first["message"], "Connected to market data stream");

    send_text(&mut client, r#"{"type":"ping"}"#).await;
    let pong = next_of_type(&mut client, "pong").await;
    assert!(pong["timestamp"].is_string());

    send_text(&mut client, r#"{"type":"subscribe","symbols":["NIFTY"]}"#).await;
    let subscribed = next_of_type(&mut client, "subscribed").await;
    assert_eq!(subscribed["symbols"], serde_json::json!(["NIFTY"]));

    let tick = next_of_type(&mut client, "tick").await;
    assert!(tick["data"]["ltp"].is_number());
    assert!(tick["data"]["changePercent"].is_number());
}

#[tokio::test]
async fn test_subscribe_does_not_filter_broadcast() {
    let hub = Hub::fast().await;
    let mut a = hub.connect("/ws/ticks").await;
    let mut b = hub.connect("/ws/ticks").await;
    assert_eq!(next_json(&mut a).await["type"], "connected");
    assert_eq!(next_json(&mut b).await["type"], "connected");

    send_text(&mut a, r#"{"type":"subscribe","symbols":["NIFTY"]}"#).await;
    next_of_type(&mut a, "subscribed").await;

    for client in [&mut a, &mut b] {
        let mut seen = std::collections::HashSet::new();
        while !(seen.contains("BANKNIFTY") && seen.contains("FINNIFTY")) {
            let tick = next_of_type(client, "tick").await;
            seen.insert(tick["data"]["symbol"].as_str().expect("symbol").to_string());
        }
    }
}

#[tokio::test]
async fn test_disconnect_releases_registry_and_producer() {
    let hub = Hub::fast().await;
    let mut a = hub.connect("/ws/ticks").await;
    let mut b = hub.connect("/ws/ticks").await;
    next_of_type(&mut a, "tick").await;
    next_of_type(&mut b, "tick").await;

    assert_eq!(hub.state.registry.len(), 2);
    assert!(hub.state.ticks.is_running());

    a.close(None).await.expect("close a");
    assert!(eventually(|| hub.state.registry.len() == 1).await);
    assert!(hub.state.ticks.is_running());

    // Abrupt drop without a close handshake.
    drop(b);
    let state = hub.state.clone();
    assert!(eventually(|| state.registry.is_empty() && !state.ticks.is_running()).await);
}

#[tokio::test]
async fn test_malformed_control_message_closes_session() {
    let hub = Hub::fast().await;
    let mut client = hub.connect("/ws/ticks").await;
    next_json(&mut client).await;

    send_text(&mut client, "not json").await;
    expect_closed(&mut client).await;

    let state = hub.state.clone();
    assert!(eventually(|| state.registry.is_empty()).await);
    assert!(state.metrics.errors() >= 1);
}

#[tokio::test]
async fn test_lenient_mode_skips_malformed_message() {
    let config = HubConfig::new("127.0.0.1", 0)
        .with_intervals(50, 100)
        .with_strict_control_messages(false);
    let hub = Hub::start(config).await;
    let mut client = hub.connect("/ws/ticks").await;
    next_json(&mut client).await;

    send_text(&mut client, "not json").await;
    send_text(&mut client, r#"{"type":"ping"}"#).await;
    next_of_type(&mut client, "pong").await;
    assert_eq!(hub.state.registry.len(), 1);
}

#[tokio::test]
async fn test_pnl_streams_are_spaced_and_private() {
    let hub = Hub::fast().await;
    let mut a = hub.connect("/ws/pnl").await;
    let mut b = hub.connect("/ws/pnl").await;

    let greeting = next_json(&mut a).await;
    assert_eq!(greeting["type"], "connected");
    assert_eq!(greeting["message"], "Connected to P&L stream");
    next_json(&mut b).await;

    let first = next_of_type(&mut a, "pnl").await;
    let started = Instant::now();
    let second = next_of_type(&mut a, "pnl").await;
    assert!(started.elapsed() >= Duration::from_millis(60));

    for event in [&first, &second] {
        assert_eq!(event["data"]["strategyId"], "test-strategy-1");
        assert!(event["data"]["currentPnL"].is_number());
        assert!(event["data"]["totalPnL"].is_number());
        assert!(event["data"]["openPositions"].is_u64());
    }

    // P&L connections never join the tick registry.
    assert!(hub.state.registry.is_empty());

    drop(a);
    let pnl = next_of_type(&mut b, "pnl").await;
    assert_eq!(pnl["data"]["strategyId"], "test-strategy-1");
}

#[tokio::test]
async fn test_order_channel_echoes() {
    let hub = Hub::fast().await;
    let mut client = hub.connect("/ws/orders").await;

    let greeting = next_json(&mut client).await;
    assert_eq!(greeting["message"], "Connected to order update stream");

    send_text(&mut client, "hello").await;
    let reply = tokio::time::timeout(WAIT, client.next())
        .await
        .expect("reply in time")
        .expect("stream open")
        .expect("frame");
    assert_eq!(reply, Message::text("Received: hello"));
    assert!(hub.state.registry.is_empty());
}
