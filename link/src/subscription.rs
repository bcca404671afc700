//! Handle returned by [`MarketLinkClient::subscribe`](crate::MarketLinkClient::subscribe).

use std::sync::Weak;

use crate::models::EventKind;
use crate::registry::{EventRegistry, SubscriptionId};

/// One registration of a handler for one [`EventKind`].
///
/// Dropping the handle does **not** unsubscribe; the handler stays registered
/// until [`unsubscribe`](Self::unsubscribe) is called or the client is
/// destroyed. The handle only keeps a weak reference to the registry, so it
/// never keeps a destroyed client alive.
#[derive(Debug, Clone)]
pub struct Subscription {
    kind: EventKind,
    id: Option<SubscriptionId>,
    registry: Weak<EventRegistry>,
}

impl Subscription {
    pub(crate) fn new(kind: EventKind, id: SubscriptionId, registry: Weak<EventRegistry>) -> Self {
        Self {
            kind,
            id: Some(id),
            registry,
        }
    }

    /// A handle that was never registered (returned after `destroy()`).
    pub(crate) fn inert(kind: EventKind) -> Self {
        Self {
            kind,
            id: None,
            registry: Weak::new(),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Registration id, `None` for an inert handle.
    pub fn id(&self) -> Option<SubscriptionId> {
        self.id
    }

    /// Whether the handler is still registered.
    pub fn is_active(&self) -> bool {
        match (self.id, self.registry.upgrade()) {
            (Some(id), Some(registry)) => registry.contains(self.kind, id),
            _ => false,
        }
    }

    /// Remove exactly this registration. Safe to call more than once, from
    /// any thread, including from inside a handler.
    ///
    /// Returns `true` only for the call that actually removed it.
    pub fn unsubscribe(&self) -> bool {
        match (self.id, self.registry.upgrade()) {
            (Some(id), Some(registry)) => registry.unregister(self.kind, id),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JsonValue;
    use std::sync::Arc;

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let registry = Arc::new(EventRegistry::new());
        let id = registry.register(EventKind::OrderCreated, Arc::new(|_: &JsonValue| {}));
        let sub = Subscription::new(EventKind::OrderCreated, id, Arc::downgrade(&registry));
        let copy = sub.clone();

        assert!(sub.is_active());
        assert!(sub.unsubscribe());
        assert!(!copy.unsubscribe());
        assert!(!sub.is_active());
    }

    #[test]
    fn test_dropping_handle_keeps_registration() {
        let registry = Arc::new(EventRegistry::new());
        let id = registry.register(EventKind::AuctionEnded, Arc::new(|_: &JsonValue| {}));
        drop(Subscription::new(EventKind::AuctionEnded, id, Arc::downgrade(&registry)));

        assert_eq!(registry.subscriber_count(EventKind::AuctionEnded), 1);
    }

    #[test]
    fn test_inert_handle() {
        let sub = Subscription::inert(EventKind::ListingSold);
        assert_eq!(sub.kind(), EventKind::ListingSold);
        assert!(sub.id().is_none());
        assert!(!sub.is_active());
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn test_handle_outliving_registry() {
        let registry = Arc::new(EventRegistry::new());
        let id = registry.register(EventKind::UserPresenceChanged, Arc::new(|_: &JsonValue| {}));
        let sub = Subscription::new(EventKind::UserPresenceChanged, id, Arc::downgrade(&registry));
        drop(registry);

        assert!(!sub.is_active());
        assert!(!sub.unsubscribe());
    }
}
