#![allow(dead_code)]
//! Local WebSocket server used by the integration tests.
//!
//! Binds `127.0.0.1:0`, accepts every upgrade and hands each session to the
//! test together with the `Authorization` header it arrived with.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use market_link::{ConnectionState, MarketLinkClient, WireFrame};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tokio_tungstenite::WebSocketStream;

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(true)
        .try_init();
}

pub struct TestServer {
    pub url: String,
    sessions: mpsc::UnboundedReceiver<ServerSession>,
    task: JoinHandle<()>,
}

pub struct ServerSession {
    pub authorization: Option<String>,
    ws: WebSocketStream<TcpStream>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        let (tx, sessions) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let header = Arc::new(Mutex::new(None));
                let header_clone = Arc::clone(&header);
                let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                    *header_clone.lock() = request
                        .headers()
                        .get(AUTHORIZATION)
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_string);
                    Ok(response)
                };
                let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    continue;
                };
                let authorization = header.lock().take();
                if tx.send(ServerSession { authorization, ws }).is_err() {
                    break;
                }
            }
        });

        Self {
            url: format!("ws://{}/realtime", addr),
            sessions,
            task,
        }
    }

    /// Wait for the next client session.
    pub async fn accept(&mut self) -> ServerSession {
        timeout(TEST_TIMEOUT, self.sessions.recv())
            .await
            .expect("timed out waiting for a client session")
            .expect("test server stopped")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl ServerSession {
    /// Next JSON frame from the client, skipping control frames.
    pub async fn recv_frame(&mut self) -> WireFrame {
        loop {
            let message = timeout(TEST_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a client frame")
                .expect("client closed the session")
                .expect("websocket error");
            if let Message::Text(text) = message {
                return WireFrame::from_json(text.as_str()).expect("client sent a valid frame");
            }
        }
    }

    pub async fn send_frame(&mut self, frame: &WireFrame) {
        let text = frame.to_json().expect("encode frame");
        self.ws.send(Message::Text(text.into())).await.expect("send frame");
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws.send(Message::Text(text.to_string().into())).await.expect("send raw text");
    }

    /// Close from the server side with `code`.
    pub async fn close(mut self, code: u16, reason: &str) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        let _ = self.ws.close(Some(frame)).await;
    }

    /// Wait until the client closes the session.
    pub async fn expect_client_close(&mut self) {
        loop {
            match timeout(TEST_TIMEOUT, self.ws.next()).await.expect("timed out waiting for close") {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    }
}

pub async fn wait_for_state(client: &MarketLinkClient, wanted: ConnectionState) {
    let mut states = client.state_changes();
    timeout(TEST_TIMEOUT, async {
        loop {
            if *states.borrow_and_update() == wanted {
                return;
            }
            if states.changed().await.is_err() {
                return;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("client never reached {}", wanted));
}
