//! Connection manager: the single owner of the live link.
//!
//! Provides one connection shared by every subscriber. Handles:
//!
//! - The [`ConnectionState`] machine (all transitions under one lock)
//! - Opening links through the [`Transport`] seam, one attempt at a time
//! - Automatic reconnection under the bounded [`ReconnectPolicy`]
//! - Forwarding decoded inbound frames to the [`EventRegistry`]
//! - Raising `connection-established`, `connection-lost` and `transport-error`
//!
//! Every attempt and every disconnect bumps a generation counter. Open
//! results, reader closes and timer fires carry the generation they were
//! started under and are ignored once it is stale.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::models::{
    ConnectionEstablishedPayload, ConnectionLostPayload, ConnectionState, EventKind,
    ReconnectPolicy, TransportErrorPayload, MAX_ATTEMPTS_REACHED,
};
use crate::registry::EventRegistry;
use crate::transport::{CloseReason, HandshakeRequest, Link, LinkCommand, LinkEvent, Transport};
use crate::wire::WireAdapter;

// ── Configuration ───────────────────────────────────────────────────────────

/// Immutable inputs of a manager, captured when the client is built.
#[derive(Debug, Clone)]
pub(crate) struct ManagerConfig {
    pub handshake: HandshakeRequest,
    pub reconnect: bool,
    pub policy: ReconnectPolicy,
}

// ── Lifecycle emissions ─────────────────────────────────────────────────────

/// Lifecycle events collected under the lock and dispatched after it is
/// released, so handlers may call back into the client.
enum Emission {
    Established(ConnectionEstablishedPayload),
    Lost(ConnectionLostPayload),
    TransportError(TransportErrorPayload),
}

// ── Mutable state ───────────────────────────────────────────────────────────

#[derive(Default)]
struct Core {
    state: ConnectionState,
    attempts_used: u32,
    generation: u64,
    link: Option<mpsc::UnboundedSender<LinkCommand>>,
    pending_open: Option<JoinHandle<()>>,
    retry_timer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

impl Core {
    fn cancel_tasks(&mut self) {
        for task in [self.pending_open.take(), self.retry_timer.take(), self.reader.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}

struct ManagerInner {
    config: ManagerConfig,
    transport: Arc<dyn Transport>,
    registry: Arc<EventRegistry>,
    wire: WireAdapter,
    runtime: Handle,
    core: Mutex<Core>,
    state_tx: watch::Sender<ConnectionState>,
}

/// Cheaply cloneable handle to the manager.
#[derive(Clone)]
pub(crate) struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

impl ConnectionManager {
    pub(crate) fn new(
        config: ManagerConfig,
        transport: Arc<dyn Transport>,
        registry: Arc<EventRegistry>,
        wire: WireAdapter,
        runtime: Handle,
    ) -> Self {
        let (state_tx, _state_rx) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(ManagerInner {
                config,
                transport,
                registry,
                wire,
                runtime,
                core: Mutex::new(Core::default()),
                state_tx,
            }),
        }
    }

    /// Start connecting unless an attempt is running or a link is live.
    pub(crate) fn connect(&self) {
        self.inner.connect();
    }

    /// Stop everything and go to `Disconnected`.
    pub(crate) fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Hand `payload` to the live link. Returns `false` if nothing was sent.
    pub(crate) fn send(&self, kind: EventKind, payload: JsonValue) -> bool {
        self.inner.send(kind, payload)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    pub(crate) fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    #[cfg(test)]
    fn attempts_used(&self) -> u32 {
        self.inner.core.lock().attempts_used
    }
}

impl ManagerInner {
    fn transition(&self, core: &mut Core, next: ConnectionState) {
        if core.state == next {
            return;
        }
        log::debug!("[market-link] State {} -> {}", core.state, next);
        core.state = next;
        self.state_tx.send_replace(next);
    }

    fn connect(self: &Arc<Self>) {
        let mut core = self.core.lock();
        match core.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                log::debug!("[market-link] connect() ignored while {}", core.state);
            },
            ConnectionState::Disconnected | ConnectionState::Error | ConnectionState::Reconnecting => {
                if let Some(timer) = core.retry_timer.take() {
                    timer.abort();
                }
                core.attempts_used = 0;
                self.begin_attempt(&mut core);
            },
        }
    }

    /// Open a fresh link under a new generation.
    fn begin_attempt(self: &Arc<Self>, core: &mut Core) {
        core.generation += 1;
        let generation = core.generation;
        if let Some(stale) = core.pending_open.take() {
            stale.abort();
        }
        self.transition(core, ConnectionState::Connecting);
        log::info!(
            "[market-link] Connecting to {} (attempt {}/{})",
            self.config.handshake.url,
            core.attempts_used,
            self.config.policy.max_attempts
        );

        let this = Arc::clone(self);
        core.pending_open = Some(self.runtime.spawn(async move {
            let result = this.transport.open(&this.config.handshake).await;
            this.on_open_result(generation, result);
        }));
    }

    fn on_open_result(self: &Arc<Self>, generation: u64, result: Result<Link>) {
        let mut emissions = Vec::new();
        let events = {
            let mut core = self.core.lock();
            if core.generation != generation || core.state != ConnectionState::Connecting {
                drop(core);
                if let Ok(link) = result {
                    log::debug!("[market-link] Discarding link opened by a superseded attempt");
                    let (commands, _events) = link.into_parts();
                    let _ = commands.send(LinkCommand::Close);
                }
                return;
            }
            core.pending_open = None;

            match result {
                Ok(link) => {
                    let (commands, events) = link.into_parts();
                    core.link = Some(commands);
                    core.attempts_used = 0;
                    if let Some(timer) = core.retry_timer.take() {
                        timer.abort();
                    }
                    self.transition(&mut core, ConnectionState::Connected);
                    log::info!("[market-link] Connected to {}", self.config.handshake.url);
                    emissions.push(Emission::Established(ConnectionEstablishedPayload {
                        url: self.config.handshake.url.clone(),
                    }));
                    Some(events)
                },
                Err(e) => {
                    log::warn!("[market-link] Connection attempt failed: {}", e);
                    emissions.push(Emission::TransportError(TransportErrorPayload {
                        reason: e.to_string(),
                        attempt: core.attempts_used,
                        max_attempts: self.config.policy.max_attempts,
                        fatal: false,
                    }));
                    if self.config.reconnect {
                        self.schedule_retry(&mut core, &mut emissions);
                    } else {
                        self.transition(&mut core, ConnectionState::Error);
                    }
                    None
                },
            }
        };

        self.emit(emissions);

        // Subscribers see connection-established before the first inbound frame.
        if let Some(events) = events {
            let mut core = self.core.lock();
            if core.generation == generation && core.state == ConnectionState::Connected {
                core.reader = Some(self.spawn_reader(generation, events));
            }
        }
    }

    /// Either arm the retry timer or give up with `Error`.
    fn schedule_retry(self: &Arc<Self>, core: &mut Core, emissions: &mut Vec<Emission>) {
        let policy = self.config.policy;
        if core.attempts_used >= policy.max_attempts {
            self.transition(core, ConnectionState::Error);
            log::error!(
                "[market-link] Giving up after {} reconnection attempts",
                core.attempts_used
            );
            emissions.push(Emission::TransportError(TransportErrorPayload {
                reason: MAX_ATTEMPTS_REACHED.to_string(),
                attempt: core.attempts_used,
                max_attempts: policy.max_attempts,
                fatal: true,
            }));
            return;
        }

        core.attempts_used += 1;
        let attempt = core.attempts_used;
        let delay = policy.delay_for_attempt(attempt);
        self.transition(core, ConnectionState::Reconnecting);
        log::info!(
            "[market-link] Reconnecting in {:?} (attempt {}/{})",
            delay,
            attempt,
            policy.max_attempts
        );

        let generation = core.generation;
        let this = Arc::clone(self);
        core.retry_timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            this.on_retry_timer(generation);
        }));
    }

    fn on_retry_timer(self: &Arc<Self>, generation: u64) {
        let mut core = self.core.lock();
        if core.generation != generation || core.state != ConnectionState::Reconnecting {
            return;
        }
        core.retry_timer = None;
        self.begin_attempt(&mut core);
    }

    fn spawn_reader(
        self: &Arc<Self>,
        generation: u64,
        mut events: mpsc::UnboundedReceiver<LinkEvent>,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        self.runtime.spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    LinkEvent::Frame(frame) => {
                        if this.core.lock().generation != generation {
                            return;
                        }
                        if let Some((kind, payload)) = this.wire.decode(frame) {
                            this.registry.dispatch(kind, &payload);
                        }
                    },
                    LinkEvent::Closed(reason) => {
                        this.on_link_closed(generation, reason);
                        return;
                    },
                }
            }
            this.on_link_closed(
                generation,
                CloseReason::TransportFailure("transport dropped the link".to_string()),
            );
        })
    }

    fn on_link_closed(self: &Arc<Self>, generation: u64, reason: CloseReason) {
        let mut emissions = Vec::new();
        {
            let mut core = self.core.lock();
            if core.generation != generation || core.state != ConnectionState::Connected {
                return;
            }
            core.link = None;
            // Dropping our own handle detaches the running reader.
            core.reader = None;

            log::warn!("[market-link] Connection lost: {}", reason);
            emissions.push(Emission::Lost(ConnectionLostPayload {
                reason: reason.to_string(),
                manual: reason.is_manual(),
                code: reason.code(),
            }));

            if reason.is_manual() || !self.config.reconnect {
                self.transition(&mut core, ConnectionState::Disconnected);
            } else {
                self.schedule_retry(&mut core, &mut emissions);
            }
        }
        self.emit(emissions);
    }

    fn disconnect(&self) {
        let mut emissions = Vec::new();
        {
            let mut core = self.core.lock();
            core.generation += 1;
            core.cancel_tasks();
            if let Some(link) = core.link.take() {
                let _ = link.send(LinkCommand::Close);
            }
            let was_connected = core.state == ConnectionState::Connected;
            core.attempts_used = 0;
            self.transition(&mut core, ConnectionState::Disconnected);

            if was_connected {
                log::info!("[market-link] Disconnected from {}", self.config.handshake.url);
                emissions.push(Emission::Lost(ConnectionLostPayload {
                    reason: CloseReason::ClientRequested.to_string(),
                    manual: true,
                    code: None,
                }));
            }
        }
        self.emit(emissions);
    }

    fn send(&self, kind: EventKind, payload: JsonValue) -> bool {
        let link = {
            let core = self.core.lock();
            if core.state != ConnectionState::Connected {
                log::warn!("[market-link] Dropping outbound '{}': connection is {}", kind, core.state);
                return false;
            }
            core.link.clone()
        };
        let Some(link) = link else {
            return false;
        };
        let Some(frame) = self.wire.encode(kind, payload) else {
            return false;
        };
        link.send(LinkCommand::Send(frame)).is_ok()
    }

    fn emit(&self, emissions: Vec<Emission>) {
        for emission in emissions {
            match emission {
                Emission::Established(payload) => {
                    self.dispatch_lifecycle(EventKind::ConnectionEstablished, &payload)
                },
                Emission::Lost(payload) => self.dispatch_lifecycle(EventKind::ConnectionLost, &payload),
                Emission::TransportError(payload) => {
                    self.dispatch_lifecycle(EventKind::TransportError, &payload)
                },
            }
        }
    }

    fn dispatch_lifecycle(&self, kind: EventKind, payload: &impl Serialize) {
        match serde_json::to_value(payload) {
            Ok(value) => {
                self.registry.dispatch(kind, &value);
            },
            Err(e) => log::error!("[market-link] Failed to encode '{}' payload: {}", kind, e),
        }
    }
}
