//! Payloads of the locally-raised lifecycle events.
//!
//! They are dispatched as JSON values like every other event, so subscribers
//! either read fields off the `Value` or use
//! [`MarketLinkClient::subscribe_as`](crate::MarketLinkClient::subscribe_as).

use serde::{Deserialize, Serialize};

/// Reason string of the terminal `transport-error` raised on retry exhaustion.
pub const MAX_ATTEMPTS_REACHED: &str = "max reconnection attempts reached";

/// Payload of `connection-established`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEstablishedPayload {
    pub url: String,
}

/// Payload of `connection-lost`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionLostPayload {
    pub reason: String,
    /// True when the close was requested by this client.
    pub manual: bool,
    /// WebSocket close code, if the server sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

/// Payload of `transport-error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportErrorPayload {
    pub reason: String,
    /// Retries used so far when the error was raised.
    pub attempt: u32,
    pub max_attempts: u32,
    /// True only for retry exhaustion; the client then stays in the error
    /// state until `connect()` is called again.
    pub fatal: bool,
}

impl TransportErrorPayload {
    pub fn is_exhaustion(&self) -> bool {
        self.fatal && self.reason == MAX_ATTEMPTS_REACHED
    }
}
