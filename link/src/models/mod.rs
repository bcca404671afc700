//! Data models for the market-link client library.
//!
//! Defines the event vocabulary, connection state, client options and the
//! JSON envelope exchanged with the server.

pub mod connection_options;
pub mod connection_state;
pub mod event_kind;
pub mod lifecycle;
pub mod reconnect_policy;
pub mod wire_frame;


pub use connection_options::{AuthPayload, ClientOptions};
pub use connection_state::ConnectionState;
pub use event_kind::EventKind;
pub use lifecycle::{
    ConnectionEstablishedPayload, ConnectionLostPayload, TransportErrorPayload,
    MAX_ATTEMPTS_REACHED,
};
pub use reconnect_policy::{BackoffStrategy, ReconnectPolicy};
pub use wire_frame::WireFrame;
