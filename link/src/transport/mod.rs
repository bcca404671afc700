//! Transport seam.
//!
//! This module contains:
//! - [`Transport`]: opens one session and returns it as a [`Link`]
//! - [`websocket`]: the production WebSocket transport
//! - [`memory`]: a scriptable in-process transport for tests
//!
//! A [`Link`] is a pair of unbounded channels. The connection manager pushes
//! [`LinkCommand`]s down and reads [`LinkEvent`]s up; the transport owns the
//! other ends through a [`LinkEndpoint`].

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::models::{AuthPayload, WireFrame};

pub mod memory;
pub mod websocket;

pub use memory::MemoryTransport;
pub use websocket::WebSocketTransport;

/// Everything a transport needs to open a session.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeRequest {
    pub url: String,
    pub auth: AuthPayload,
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// This client asked for the close.
    ClientRequested,
    /// The server sent a close frame.
    ServerClosed { code: Option<u16>, message: String },
    /// The network or protocol failed underneath the session.
    TransportFailure(String),
}

impl CloseReason {
    /// Only a client-requested close suppresses automatic reconnection.
    pub fn is_manual(&self) -> bool {
        matches!(self, CloseReason::ClientRequested)
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            CloseReason::ServerClosed { code, .. } => *code,
            _ => None,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::ClientRequested => write!(f, "client disconnect"),
            CloseReason::ServerClosed {
                code: Some(code),
                message,
            } => write!(f, "server closed connection: {} (code: {})", message, code),
            CloseReason::ServerClosed { code: None, message } => {
                write!(f, "server closed connection: {}", message)
            },
            CloseReason::TransportFailure(message) => write!(f, "transport failure: {}", message),
        }
    }
}

/// Manager → transport.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkCommand {
    Send(WireFrame),
    Close,
}

/// Transport → manager.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Frame(WireFrame),
    Closed(CloseReason),
}

/// Manager side of an open session.
#[derive(Debug)]
pub struct Link {
    commands: mpsc::UnboundedSender<LinkCommand>,
    events: mpsc::UnboundedReceiver<LinkEvent>,
}

/// Transport side of an open session.
#[derive(Debug)]
pub struct LinkEndpoint {
    pub commands: mpsc::UnboundedReceiver<LinkCommand>,
    pub events: mpsc::UnboundedSender<LinkEvent>,
}

impl Link {
    /// Create a connected `(Link, LinkEndpoint)` pair.
    pub fn pair() -> (Link, LinkEndpoint) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (
            Link {
                commands: command_tx,
                events: event_rx,
            },
            LinkEndpoint {
                commands: command_rx,
                events: event_tx,
            },
        )
    }

    pub(crate) fn into_parts(
        self,
    ) -> (mpsc::UnboundedSender<LinkCommand>, mpsc::UnboundedReceiver<LinkEvent>) {
        (self.commands, self.events)
    }
}

/// Opens sessions to the realtime server.
///
/// `open` resolves once the session is usable (or failed). It must not retry
/// on its own: retries belong to the connection manager's policy.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, handshake: &HandshakeRequest) -> Result<Link>;
}
