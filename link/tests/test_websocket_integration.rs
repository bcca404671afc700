//! WebSocket integration tests for market-link.
//!
//! Each test runs the real `WebSocketTransport` against an in-process
//! `tokio-tungstenite` server (see `common/mod.rs`), so no external service
//! is needed.

mod common;

use std::time::Duration;

use common::{init_logging, wait_for_state, TestServer, TEST_TIMEOUT};
use market_link::{
    ConnectionLostPayload, ConnectionState, EventKind, MarketLinkClient, MarketLinkTimeouts,
    TransportErrorPayload, WireFrame,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn client_for(server: &TestServer) -> MarketLinkClient {
    MarketLinkClient::builder()
        .url(server.url.clone())
        .auth_token("tok-xyz")
        .auto_connect(false)
        .reconnect_attempts(3)
        .reconnect_delay(Duration::from_millis(50))
        .timeouts(MarketLinkTimeouts::fast())
        .build()
        .expect("client builds")
}

#[tokio::test]
async fn test_handshake_sends_bearer_header_and_auth_frame() {
    init_logging();
    let mut server = TestServer::start().await;
    let client = MarketLinkClient::builder()
        .url(server.url.clone())
        .auth(
            [("userId".to_string(), json!(5))]
                .into_iter()
                .collect(),
        )
        .auth_token("tok-xyz")
        .timeouts(MarketLinkTimeouts::fast())
        .build()
        .expect("client builds");

    let mut session = server.accept().await;
    assert_eq!(session.authorization.as_deref(), Some("Bearer tok-xyz"));

    let auth = session.recv_frame().await;
    assert_eq!(auth.event, "auth");
    assert_eq!(auth.data, json!({"token": "tok-xyz", "userId": 5}));

    wait_for_state(&client, ConnectionState::Connected).await;
    client.destroy();
}

#[tokio::test]
async fn test_inbound_events_fan_out_by_kind() {
    init_logging();
    let mut server = TestServer::start().await;
    let client = client_for(&server);
    let (_balance_sub, mut balances) = client.subscribe_channel(EventKind::WalletBalanceChanged);
    let (_order_sub, mut orders) = client.subscribe_channel(EventKind::OrderCreated);

    client.connect();
    let mut session = server.accept().await;
    session.recv_frame().await;
    wait_for_state(&client, ConnectionState::Connected).await;

    session.send_raw("{not json").await;
    session.send_frame(&WireFrame::new("loyalty:points", json!({"points": 3}))).await;
    session
        .send_frame(&WireFrame::new("wallet:balance_update", json!({"balance": 4200})))
        .await;

    let balance = timeout(TEST_TIMEOUT, balances.recv()).await.expect("balance event").expect("open channel");
    assert_eq!(balance, json!({"balance": 4200}));
    assert!(orders.try_recv().is_err());
    assert!(client.is_connected());

    client.destroy();
}

#[tokio::test]
async fn test_outbound_send_reaches_server() {
    init_logging();
    let mut server = TestServer::start().await;
    let client = client_for(&server);

    assert!(!client.send(EventKind::MessageTyping, json!({"conversationId": 1})));

    client.connect();
    let mut session = server.accept().await;
    session.recv_frame().await;
    wait_for_state(&client, ConnectionState::Connected).await;

    assert!(client.send(EventKind::MessageTyping, json!({"conversationId": 42})));
    let frame = session.recv_frame().await;
    assert_eq!(frame, WireFrame::new("message:typing", json!({"conversationId": 42})));

    client.destroy();
}

#[tokio::test]
async fn test_server_close_triggers_reconnect() {
    init_logging();
    let mut server = TestServer::start().await;
    let client = client_for(&server);

    let (lost_tx, mut lost_rx) = mpsc::unbounded_channel();
    client.subscribe_as(EventKind::ConnectionLost, move |payload: ConnectionLostPayload| {
        let _ = lost_tx.send(payload);
    });

    client.connect();
    let mut first = server.accept().await;
    first.recv_frame().await;
    wait_for_state(&client, ConnectionState::Connected).await;

    first.close(1001, "going away").await;

    let lost = timeout(TEST_TIMEOUT, lost_rx.recv()).await.expect("connection-lost").expect("open channel");
    assert!(!lost.manual);
    assert_eq!(lost.code, Some(1001));

    let mut second = server.accept().await;
    let auth = second.recv_frame().await;
    assert_eq!(auth.event, "auth");
    wait_for_state(&client, ConnectionState::Connected).await;

    client.destroy();
}

#[tokio::test]
async fn test_manual_disconnect_closes_session_without_reconnect() {
    init_logging();
    let mut server = TestServer::start().await;
    let client = client_for(&server);

    client.connect();
    let mut session = server.accept().await;
    session.recv_frame().await;
    wait_for_state(&client, ConnectionState::Connected).await;

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Disconnected);
    session.expect_client_close().await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);

    client.destroy();
}

#[tokio::test]
async fn test_unreachable_server_exhausts_retries() {
    init_logging();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let client = MarketLinkClient::builder()
        .url(format!("http://{}/realtime", addr))
        .auto_connect(false)
        .reconnect_attempts(1)
        .reconnect_delay(Duration::from_millis(20))
        .timeouts(MarketLinkTimeouts::fast())
        .build()
        .expect("client builds");

    let (error_tx, mut error_rx) = mpsc::unbounded_channel();
    client.subscribe_as(EventKind::TransportError, move |payload: TransportErrorPayload| {
        let _ = error_tx.send(payload);
    });

    client.connect();
    wait_for_state(&client, ConnectionState::Error).await;

    let mut errors = Vec::new();
    while let Ok(error) = error_rx.try_recv() {
        errors.push(error);
    }
    assert_eq!(errors.len(), 3);
    assert!(!errors[0].fatal);
    assert!(!errors[1].fatal);
    assert!(errors[2].is_exhaustion());

    client.destroy();
}
