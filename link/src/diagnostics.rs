//! Opt-in diagnostic hooks for raw wire traffic.
//!
//! Hooks see every wire frame, including inbound frames whose name is not in
//! the event table and is therefore dropped before fan-out. They are off
//! unless registered, so normal dispatch pays nothing for them.
//!
//! # Example
//!
//! ```rust
//! use market_link::DiagnosticHooks;
//!
//! let hooks = DiagnosticHooks::new()
//!     .on_receive(|frame| println!("[RECV] {} {}", frame.event, frame.data))
//!     .on_send(|frame| println!("[SEND] {} {}", frame.event, frame.data));
//! assert!(hooks.has_any());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::models::WireFrame;
use crate::registry::invoke_isolated;

/// Type alias for a raw-frame hook.
pub type WireHook = Arc<dyn Fn(&WireFrame) + Send + Sync>;

/// Raw traffic hooks, all optional.
#[derive(Clone, Default)]
pub struct DiagnosticHooks {
    pub(crate) on_receive: Option<WireHook>,
    pub(crate) on_send: Option<WireHook>,
}

impl fmt::Debug for DiagnosticHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticHooks")
            .field("on_receive", &self.on_receive.is_some())
            .field("on_send", &self.on_send.is_some())
            .finish()
    }
}

impl DiagnosticHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for every inbound frame before it is translated.
    pub fn on_receive(mut self, f: impl Fn(&WireFrame) + Send + Sync + 'static) -> Self {
        self.on_receive = Some(Arc::new(f));
        self
    }

    /// Called for every outbound frame just before it is handed to the link.
    pub fn on_send(mut self, f: impl Fn(&WireFrame) + Send + Sync + 'static) -> Self {
        self.on_send = Some(Arc::new(f));
        self
    }

    pub fn has_any(&self) -> bool {
        self.on_receive.is_some() || self.on_send.is_some()
    }

    pub(crate) fn emit_receive(&self, frame: &WireFrame) {
        if let Some(hook) = &self.on_receive {
            invoke_isolated("on_receive hook", || hook(frame));
        }
    }

    pub(crate) fn emit_send(&self, frame: &WireFrame) {
        if let Some(hook) = &self.on_send {
            invoke_isolated("on_send hook", || hook(frame));
        }
    }
}
