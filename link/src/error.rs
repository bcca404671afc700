//! Error types for market-link.
//!
//! Only construction-time and transport-internal paths return these errors.
//! The runtime surface of [`MarketLinkClient`](crate::MarketLinkClient)
//! reports failures as `transport-error` / `connection-lost` events instead.

use thiserror::Error;

/// Errors produced while configuring the client or talking to the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketLinkError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),

    #[error("Unknown event kind: {0}")]
    UnknownEventKind(String),
}

impl From<serde_json::Error> for MarketLinkError {
    fn from(err: serde_json::Error) -> Self {
        MarketLinkError::SerializationError(err.to_string())
    }
}

/// Result type for market-link operations.
pub type Result<T> = std::result::Result<T, MarketLinkError>;
