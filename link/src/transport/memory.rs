//! Scriptable in-process transport.
//!
//! `MemoryTransport` never touches the network. Tests script how the next
//! `open` calls resolve, push inbound frames into the live link, simulate
//! network drops and inspect everything the client sent.
//!
//! ```rust,no_run
//! use market_link::transport::{CloseReason, MemoryTransport};
//! use market_link::WireFrame;
//! use serde_json::json;
//!
//! let transport = MemoryTransport::new();
//! transport.fail_next(2, "connection refused");
//! // ... build a client with `.transport(Arc::new(transport.clone()))` ...
//! transport.push(WireFrame::new("order:new", json!({"orderId": 1})));
//! transport.drop_connection(CloseReason::TransportFailure("reset".into()));
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::error::{MarketLinkError, Result};
use crate::models::WireFrame;

use super::{CloseReason, HandshakeRequest, Link, LinkCommand, LinkEndpoint, LinkEvent, Transport};

#[derive(Debug, Default)]
struct MemoryState {
    fail_next: u32,
    fail_always: bool,
    failure_message: String,
    hold_next: u32,
    held: Vec<oneshot::Sender<()>>,
    handshakes: Vec<HandshakeRequest>,
    sent: Vec<WireFrame>,
    links_opened: u64,
    live: Option<(u64, mpsc::UnboundedSender<LinkEvent>)>,
    client_closes: usize,
}

/// In-memory [`Transport`] with scripted outcomes. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    /// A transport whose opens all succeed immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` opens fail with `message`.
    pub fn fail_next(&self, count: u32, message: impl Into<String>) {
        let mut state = self.state.lock();
        state.fail_next = count;
        state.failure_message = message.into();
    }

    /// Make every open fail until [`accept_all`](Self::accept_all).
    pub fn fail_always(&self, message: impl Into<String>) {
        let mut state = self.state.lock();
        state.fail_always = true;
        state.failure_message = message.into();
    }

    /// Clear any scripted failures.
    pub fn accept_all(&self) {
        let mut state = self.state.lock();
        state.fail_next = 0;
        state.fail_always = false;
    }

    /// Keep the next `count` opens pending until [`release_held`](Self::release_held).
    pub fn hold_next(&self, count: u32) {
        self.state.lock().hold_next = count;
    }

    /// Let every held open complete successfully. Returns how many were
    /// still waiting.
    pub fn release_held(&self) -> usize {
        let held: Vec<_> = self.state.lock().held.drain(..).collect();
        held.into_iter().map(|tx| tx.send(())).filter(|sent| sent.is_ok()).count()
    }

    pub fn open_calls(&self) -> usize {
        self.state.lock().handshakes.len()
    }

    pub fn handshakes(&self) -> Vec<HandshakeRequest> {
        self.state.lock().handshakes.clone()
    }

    /// Frames the client handed to any link so far, in order.
    pub fn sent_frames(&self) -> Vec<WireFrame> {
        self.state.lock().sent.clone()
    }

    /// How many links the client closed itself.
    pub fn client_closes(&self) -> usize {
        self.state.lock().client_closes
    }

    pub fn has_live_link(&self) -> bool {
        self.state.lock().live.as_ref().is_some_and(|(_, tx)| !tx.is_closed())
    }

    /// Deliver an inbound frame on the most recent link.
    pub fn push(&self, frame: WireFrame) -> bool {
        match &self.state.lock().live {
            Some((_, tx)) => tx.send(LinkEvent::Frame(frame)).is_ok(),
            None => false,
        }
    }

    /// End the most recent link from the transport side.
    pub fn drop_connection(&self, reason: CloseReason) -> bool {
        match self.state.lock().live.take() {
            Some((_, tx)) => tx.send(LinkEvent::Closed(reason)).is_ok(),
            None => false,
        }
    }

    fn record_commands(&self, link_id: u64, mut commands: mpsc::UnboundedReceiver<LinkCommand>) {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                match command {
                    LinkCommand::Send(frame) => state.lock().sent.push(frame),
                    LinkCommand::Close => {
                        let mut state = state.lock();
                        state.client_closes += 1;
                        if state.live.as_ref().is_some_and(|(id, _)| *id == link_id) {
                            state.live = None;
                        }
                        break;
                    },
                }
            }
        });
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, handshake: &HandshakeRequest) -> Result<Link> {
        let hold = {
            let mut state = self.state.lock();
            state.handshakes.push(handshake.clone());

            if state.fail_always || state.fail_next > 0 {
                state.fail_next = state.fail_next.saturating_sub(1);
                return Err(MarketLinkError::ConnectionError(state.failure_message.clone()));
            }

            if state.hold_next > 0 {
                state.hold_next -= 1;
                let (tx, rx) = oneshot::channel();
                state.held.push(tx);
                Some(rx)
            } else {
                None
            }
        };

        if let Some(release) = hold {
            release.await.map_err(|_| {
                MarketLinkError::ConnectionError("held open abandoned".to_string())
            })?;
        }

        let (link, endpoint) = Link::pair();
        let LinkEndpoint { commands, events } = endpoint;
        let link_id = {
            let mut state = self.state.lock();
            state.links_opened += 1;
            let link_id = state.links_opened;
            state.live = Some((link_id, events));
            link_id
        };
        self.record_commands(link_id, commands);
        Ok(link)
    }
}
