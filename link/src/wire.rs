//! Translation between server wire names and [`EventKind`].
//!
//! The table below is the contract with the server and must stay in lockstep
//! with what it emits. Lifecycle kinds have no wire name.

use serde_json::Value as JsonValue;

use crate::diagnostics::DiagnosticHooks;
use crate::models::{EventKind, WireFrame};

/// Every wire-backed kind with its event name on the wire.
pub const WIRE_TABLE: [(EventKind, &str); 16] = [
    (EventKind::MessageReceived, "message:new"),
    (EventKind::MessageTyping, "message:typing"),
    (EventKind::MessageRead, "message:read"),
    (EventKind::OrderCreated, "order:new"),
    (EventKind::OrderStatusChanged, "order:status_update"),
    (EventKind::WalletBalanceChanged, "wallet:balance_update"),
    (EventKind::WalletTransactionRecorded, "wallet:transaction"),
    (EventKind::AuctionBidPlaced, "auction:bid"),
    (EventKind::AuctionOutbid, "auction:outbid"),
    (EventKind::AuctionEnded, "auction:ended"),
    (EventKind::UserPresenceChanged, "user:presence"),
    (EventKind::NotificationCreated, "notification:new"),
    (EventKind::SubscriptionCreated, "subscription:created"),
    (EventKind::SubscriptionCancelled, "subscription:cancelled"),
    (EventKind::ListingCreated, "listing:new"),
    (EventKind::ListingSold, "listing:sold"),
];

/// Wire name for `kind`, or `None` for lifecycle kinds.
pub fn wire_name(kind: EventKind) -> Option<&'static str> {
    WIRE_TABLE
        .iter()
        .find(|(candidate, _)| *candidate == kind)
        .map(|(_, name)| *name)
}

/// Kind for an inbound wire name, or `None` if the name is not in the table.
pub fn kind_for_wire(name: &str) -> Option<EventKind> {
    WIRE_TABLE
        .iter()
        .find(|(_, candidate)| *candidate == name)
        .map(|(kind, _)| *kind)
}

/// Stateless adapter used by the connection manager on both directions.
#[derive(Debug, Clone, Default)]
pub struct WireAdapter {
    diagnostics: DiagnosticHooks,
}

impl WireAdapter {
    pub fn new(diagnostics: DiagnosticHooks) -> Self {
        Self { diagnostics }
    }

    /// Translate an inbound frame. Unknown names are logged at debug level
    /// and dropped.
    pub fn decode(&self, frame: WireFrame) -> Option<(EventKind, JsonValue)> {
        self.diagnostics.emit_receive(&frame);
        match kind_for_wire(&frame.event) {
            Some(kind) => Some((kind, frame.data)),
            None => {
                log::debug!("[market-link] Dropping unknown wire event '{}'", frame.event);
                None
            },
        }
    }

    /// Build the outbound frame for `kind`. Lifecycle kinds cannot be sent.
    pub fn encode(&self, kind: EventKind, payload: JsonValue) -> Option<WireFrame> {
        let Some(name) = wire_name(kind) else {
            log::warn!("[market-link] '{}' is a local lifecycle event and cannot be sent", kind);
            return None;
        };
        let frame = WireFrame::new(name, payload);
        self.diagnostics.emit_send(&frame);
        Some(frame)
    }
}
