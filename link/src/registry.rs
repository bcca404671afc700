//! Event registry: per-kind ordered subscriber sets with isolated fan-out.
//!
//! Registration ids grow monotonically, so iterating a kind's `BTreeMap`
//! visits handlers in registration order. Dispatch clones the handler
//! `Arc`s under the read lock and invokes them after releasing it, which
//! makes `register` / `unregister` safe to call from inside a handler.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value as JsonValue;

use crate::models::EventKind;

/// Subscriber callback. Receives the payload of one event.
pub type EventHandler = Arc<dyn Fn(&JsonValue) + Send + Sync>;

/// Identifier of one registration, unique within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Mapping from [`EventKind`] to the handlers currently registered for it.
pub struct EventRegistry {
    handlers: RwLock<HashMap<EventKind, BTreeMap<SubscriptionId, EventHandler>>>,
    next_id: AtomicU64,
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        let counts: BTreeMap<&'static str, usize> =
            handlers.iter().map(|(kind, subs)| (kind.as_str(), subs.len())).collect();
        f.debug_struct("EventRegistry").field("subscribers", &counts).finish()
    }
}

impl EventRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add `handler` for `kind`. The same handler registered twice yields two
    /// independent registrations.
    pub fn register(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().entry(kind).or_default().insert(id, handler);
        log::debug!("[market-link] Registered {} for '{}'", id, kind);
        id
    }

    /// Remove exactly one registration. Returns `false` if it was already gone.
    pub fn unregister(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(subs) = handlers.get_mut(&kind) else {
            return false;
        };
        let removed = subs.remove(&id).is_some();
        if subs.is_empty() {
            handlers.remove(&kind);
        }
        if removed {
            log::debug!("[market-link] Unregistered {} from '{}'", id, kind);
        }
        removed
    }

    /// Whether `id` is still registered for `kind`.
    pub fn contains(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.handlers
            .read()
            .get(&kind)
            .is_some_and(|subs| subs.contains_key(&id))
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, BTreeMap::len)
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    /// Invoke every handler registered for `kind` when dispatch begins.
    ///
    /// A panicking handler is logged and skipped; the rest still run and the
    /// panic never reaches the caller. Returns the number of handlers that
    /// completed normally.
    pub fn dispatch(&self, kind: EventKind, payload: &JsonValue) -> usize {
        let snapshot: Vec<(SubscriptionId, EventHandler)> = match self.handlers.read().get(&kind) {
            Some(subs) => subs.iter().map(|(id, handler)| (*id, Arc::clone(handler))).collect(),
            None => return 0,
        };

        let mut completed = 0;
        for (id, handler) in snapshot {
            if invoke_isolated(&format!("subscriber {} for '{}'", id, kind), || handler(payload)) {
                completed += 1;
            }
        }
        completed
    }
}

/// Run `f`, containing any panic. Returns `true` if `f` returned normally.
pub(crate) fn invoke_isolated(label: &str, f: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(panic) => {
            log::error!("[market-link] {} panicked: {}", label, panic_message(&panic));
            false
        },
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
