//! # market-link
//!
//! Realtime event client for the marketplace server.
//!
//! One persistent connection carries every server-pushed event (messages,
//! orders, wallet changes, auction bids, notifications, presence,
//! subscriptions, listings). Any number of independent subscribers register
//! per [`EventKind`]; the connection reconnects on its own under a bounded
//! [`ReconnectPolicy`].
//!
//! ```rust,no_run
//! use market_link::{ConnectionState, EventKind, MarketLinkClient};
//!
//! # async fn example() -> market_link::Result<()> {
//! let client = MarketLinkClient::builder()
//!     .url("https://market.example.com/realtime")
//!     .auth_token("session-token")
//!     .reconnect_attempts(5)
//!     .build()?;
//!
//! client.subscribe(EventKind::OrderStatusChanged, |order| {
//!     println!("order {} is now {}", order["orderId"], order["status"]);
//! });
//!
//! let mut states = client.state_changes();
//! while states.changed().await.is_ok() {
//!     if *states.borrow() == ConnectionState::Connected {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
mod connection;
pub mod diagnostics;
pub mod error;
pub mod models;
pub mod registry;
pub mod subscription;
pub mod timeouts;
pub mod transport;
pub mod wire;

// Re-export commonly used types
pub use client::{MarketLinkClient, MarketLinkClientBuilder};
pub use diagnostics::DiagnosticHooks;
pub use error::{MarketLinkError, Result};
pub use models::{
    AuthPayload, BackoffStrategy, ClientOptions, ConnectionEstablishedPayload,
    ConnectionLostPayload, ConnectionState, EventKind, ReconnectPolicy, TransportErrorPayload,
    WireFrame, MAX_ATTEMPTS_REACHED,
};
pub use registry::{EventHandler, EventRegistry, SubscriptionId};
pub use subscription::Subscription;
pub use timeouts::{MarketLinkTimeouts, MarketLinkTimeoutsBuilder};
pub use transport::{CloseReason, MemoryTransport, Transport, WebSocketTransport};
pub use wire::WireAdapter;
