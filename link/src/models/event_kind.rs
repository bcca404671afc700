use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MarketLinkError;

/// The closed set of real-time event categories the application understands.
///
/// Three kinds are *lifecycle* kinds raised locally by the connection manager
/// (`connection-established`, `connection-lost`, `transport-error`). All the
/// others correspond to a named event on the wire, see [`crate::wire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    ConnectionEstablished,
    ConnectionLost,
    TransportError,
    MessageReceived,
    MessageTyping,
    MessageRead,
    OrderCreated,
    OrderStatusChanged,
    WalletBalanceChanged,
    WalletTransactionRecorded,
    AuctionBidPlaced,
    AuctionOutbid,
    AuctionEnded,
    UserPresenceChanged,
    NotificationCreated,
    SubscriptionCreated,
    SubscriptionCancelled,
    ListingCreated,
    ListingSold,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 19] = [
        EventKind::ConnectionEstablished,
        EventKind::ConnectionLost,
        EventKind::TransportError,
        EventKind::MessageReceived,
        EventKind::MessageTyping,
        EventKind::MessageRead,
        EventKind::OrderCreated,
        EventKind::OrderStatusChanged,
        EventKind::WalletBalanceChanged,
        EventKind::WalletTransactionRecorded,
        EventKind::AuctionBidPlaced,
        EventKind::AuctionOutbid,
        EventKind::AuctionEnded,
        EventKind::UserPresenceChanged,
        EventKind::NotificationCreated,
        EventKind::SubscriptionCreated,
        EventKind::SubscriptionCancelled,
        EventKind::ListingCreated,
        EventKind::ListingSold,
    ];

    /// Stable kebab-case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ConnectionEstablished => "connection-established",
            EventKind::ConnectionLost => "connection-lost",
            EventKind::TransportError => "transport-error",
            EventKind::MessageReceived => "message-received",
            EventKind::MessageTyping => "message-typing",
            EventKind::MessageRead => "message-read",
            EventKind::OrderCreated => "order-created",
            EventKind::OrderStatusChanged => "order-status-changed",
            EventKind::WalletBalanceChanged => "wallet-balance-changed",
            EventKind::WalletTransactionRecorded => "wallet-transaction-recorded",
            EventKind::AuctionBidPlaced => "auction-bid-placed",
            EventKind::AuctionOutbid => "auction-outbid",
            EventKind::AuctionEnded => "auction-ended",
            EventKind::UserPresenceChanged => "user-presence-changed",
            EventKind::NotificationCreated => "notification-created",
            EventKind::SubscriptionCreated => "subscription-created",
            EventKind::SubscriptionCancelled => "subscription-cancelled",
            EventKind::ListingCreated => "listing-created",
            EventKind::ListingSold => "listing-sold",
        }
    }

    /// Whether this kind is raised locally by the connection manager rather
    /// than received from the server.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            EventKind::ConnectionEstablished | EventKind::ConnectionLost | EventKind::TransportError
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = MarketLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| MarketLinkError::UnknownEventKind(s.to_string()))
    }
}
