//! Main market-link client with builder pattern.
//!
//! Provides the single entry point the application uses: connect, disconnect,
//! send, subscribe, state queries and shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

use crate::connection::{ConnectionManager, ManagerConfig};
use crate::diagnostics::DiagnosticHooks;
use crate::error::{MarketLinkError, Result};
use crate::models::{AuthPayload, BackoffStrategy, ClientOptions, ConnectionState, EventKind};
use crate::registry::EventRegistry;
use crate::subscription::Subscription;
use crate::timeouts::MarketLinkTimeouts;
use crate::transport::websocket::resolve_ws_url;
use crate::transport::{HandshakeRequest, Transport, WebSocketTransport};
use crate::wire::WireAdapter;

/// Realtime marketplace client.
///
/// Use [`MarketLinkClientBuilder`] to construct instances. Clones share one
/// connection and one set of subscribers.
///
/// None of the runtime methods return errors or panic: connection problems
/// surface as `transport-error` / `connection-lost` events and through
/// [`state`](Self::state).
///
/// # Examples
///
/// ```rust,no_run
/// use market_link::{EventKind, MarketLinkClient};
/// use serde_json::json;
///
/// # async fn example() -> market_link::Result<()> {
/// let client = MarketLinkClient::builder()
///     .url("wss://market.example.com/realtime")
///     .auth_token("session-token")
///     .build()?;
///
/// let balance = client.subscribe(EventKind::WalletBalanceChanged, |payload| {
///     println!("balance is now {}", payload["balance"]);
/// });
///
/// client.send(EventKind::MessageTyping, json!({"conversationId": 42}));
///
/// balance.unsubscribe();
/// client.destroy();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MarketLinkClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    options: ClientOptions,
    manager: ConnectionManager,
    registry: Arc<EventRegistry>,
    destroyed: AtomicBool,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if !self.destroyed.swap(true, Ordering::SeqCst) {
            log::debug!("[market-link] Last client handle dropped, shutting down");
            self.registry.clear();
            self.manager.disconnect();
        }
    }
}

impl std::fmt::Debug for MarketLinkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketLinkClient")
            .field("url", &self.inner.options.url)
            .field("state", &self.state())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl MarketLinkClient {
    /// Create a new builder for configuring the client
    pub fn builder() -> MarketLinkClientBuilder {
        MarketLinkClientBuilder::new()
    }

    /// Options captured when the client was built.
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Start connecting. Returns immediately; the outcome is reported through
    /// `connection-established` / `transport-error` and [`state_changes`](Self::state_changes).
    ///
    /// Ignored while an attempt is running or a connection is live. From
    /// `Error` or `Reconnecting` it starts a fresh attempt with the retry
    /// counter reset.
    pub fn connect(&self) {
        if self.is_destroyed() {
            return;
        }
        self.inner.manager.connect();
    }

    /// Close the connection and cancel any scheduled retry.
    ///
    /// The state is `Disconnected` when this returns.
    pub fn disconnect(&self) {
        if self.is_destroyed() {
            return;
        }
        self.inner.manager.disconnect();
    }

    /// Send an event to the server.
    ///
    /// Returns `true` if the frame was handed to the live connection. While
    /// not connected the event is dropped with a warning; nothing is queued.
    pub fn send(&self, kind: EventKind, payload: impl Serialize) -> bool {
        if self.is_destroyed() {
            return false;
        }
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("[market-link] Dropping outbound '{}': {}", kind, e);
                return false;
            },
        };
        self.inner.manager.send(kind, payload)
    }

    /// Register `handler` for `kind`. Valid in every connection state.
    ///
    /// A handler that captures a clone of this client keeps the client alive,
    /// so dropping the other handles does not shut it down. Call
    /// [`destroy`](Self::destroy) to release such a client.
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&JsonValue) + Send + Sync + 'static,
    ) -> Subscription {
        if self.is_destroyed() {
            log::debug!("[market-link] subscribe('{}') after destroy is ignored", kind);
            return Subscription::inert(kind);
        }
        let id = self.inner.registry.register(kind, Arc::new(handler));
        Subscription::new(kind, id, Arc::downgrade(&self.inner.registry))
    }

    /// Like [`subscribe`](Self::subscribe), but deserializes the payload into
    /// `T` first. Payloads that do not fit `T` are logged and skipped.
    ///
    /// ```rust,no_run
    /// use market_link::{EventKind, MarketLinkClient, TransportErrorPayload};
    ///
    /// # fn example(client: &MarketLinkClient) {
    /// client.subscribe_as(EventKind::TransportError, |error: TransportErrorPayload| {
    ///     if error.is_exhaustion() {
    ///         eprintln!("realtime connection gave up");
    ///     }
    /// });
    /// # }
    /// ```
    pub fn subscribe_as<T, F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe(kind, move |payload: &JsonValue| match T::deserialize(payload) {
            Ok(value) => handler(value),
            Err(e) => log::warn!("[market-link] Skipping '{}' handler, unexpected payload: {}", kind, e),
        })
    }

    /// Receive payloads of `kind` on a channel instead of a callback.
    ///
    /// The channel closes once the subscription is removed and every
    /// in-flight dispatch has finished.
    pub fn subscribe_channel(
        &self,
        kind: EventKind,
    ) -> (Subscription, mpsc::UnboundedReceiver<JsonValue>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(kind, move |payload: &JsonValue| {
            let _ = tx.send(payload.clone());
        });
        (subscription, rx)
    }

    /// Current connection state. Never blocks.
    pub fn state(&self) -> ConnectionState {
        self.inner.manager.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Watch every state transition.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.manager.state_changes()
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.inner.registry.subscriber_count(kind)
    }

    /// Drop every subscription, disconnect and release the connection.
    ///
    /// Subscriptions are removed before the connection closes, so no
    /// `connection-lost` is delivered. Afterwards every method is a no-op.
    /// Calling it again does nothing.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.registry.clear();
        self.inner.manager.disconnect();
        log::info!("[market-link] Client destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }
}

/// Builder for configuring [`MarketLinkClient`] instances.
pub struct MarketLinkClientBuilder {
    options: ClientOptions,
    timeouts: MarketLinkTimeouts,
    transport: Option<Arc<dyn Transport>>,
    diagnostics: DiagnosticHooks,
}

impl MarketLinkClientBuilder {
    fn new() -> Self {
        Self {
            options: ClientOptions::new(String::new()),
            timeouts: MarketLinkTimeouts::default(),
            transport: None,
            diagnostics: DiagnosticHooks::default(),
        }
    }

    /// Set the realtime endpoint (`http(s)://` or `ws(s)://`)
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.options.url = url.into();
        self
    }

    /// Replace all connection options at once
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use market_link::{ClientOptions, MarketLinkClient};
    ///
    /// # async fn example() -> market_link::Result<()> {
    /// let options = ClientOptions::from_json_str(
    ///     r#"{"url": "https://market.example.com/realtime", "reconnectAttempts": 8}"#,
    /// )?;
    /// let client = MarketLinkClient::builder().options(options).build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the handshake metadata map
    pub fn auth(mut self, auth: AuthPayload) -> Self {
        self.options.auth = auth;
        self
    }

    /// Set a session token (sent as `Authorization: Bearer` and in the auth frame)
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.options = self.options.with_auth_token(token);
        self
    }

    pub fn auto_connect(mut self, enabled: bool) -> Self {
        self.options.auto_connect = enabled;
        self
    }

    /// Enable or disable automatic reconnection after network closes
    pub fn reconnect(mut self, enabled: bool) -> Self {
        self.options.reconnect = enabled;
        self
    }

    pub fn reconnect_attempts(mut self, attempts: u32) -> Self {
        self.options.reconnect_attempts = attempts;
        self
    }

    /// Delay between reconnection attempts (initial delay for exponential backoff)
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.options.reconnect_delay_ms = duration_ms(delay);
        self
    }

    pub fn backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.options.backoff = backoff;
        self
    }

    /// Cap for exponential backoff
    pub fn max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.options.max_reconnect_delay_ms = duration_ms(delay);
        self
    }

    /// Set timeouts for the default WebSocket transport
    ///
    /// Ignored when a custom [`transport`](Self::transport) is supplied.
    pub fn timeouts(mut self, timeouts: MarketLinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Use a custom transport instead of the WebSocket one
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Install raw wire-traffic hooks
    pub fn diagnostics(mut self, hooks: DiagnosticHooks) -> Self {
        self.diagnostics = hooks;
        self
    }

    /// Build the client
    ///
    /// Must be called from within a Tokio runtime. Connects immediately when
    /// `auto_connect` is set.
    pub fn build(self) -> Result<MarketLinkClient> {
        if self.options.url.trim().is_empty() {
            return Err(MarketLinkError::ConfigurationError("url is required".into()));
        }
        self.options.validate()?;
        resolve_ws_url(&self.options.url)?;

        let runtime = Handle::try_current().map_err(|_| {
            MarketLinkError::RuntimeError(
                "MarketLinkClient must be built inside a Tokio runtime".to_string(),
            )
        })?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(WebSocketTransport::new(self.timeouts)),
        };

        let registry = Arc::new(EventRegistry::new());
        let manager = ConnectionManager::new(
            ManagerConfig {
                handshake: HandshakeRequest {
                    url: self.options.url.clone(),
                    auth: self.options.auth.clone(),
                },
                reconnect: self.options.reconnect,
                policy: self.options.reconnect_policy(),
            },
            transport,
            Arc::clone(&registry),
            WireAdapter::new(self.diagnostics),
            runtime,
        );

        log::debug!(
            "[market-link] Client built for {} (reconnect={}, attempts={}, delay={}ms)",
            self.options.url,
            self.options.reconnect,
            self.options.reconnect_attempts,
            self.options.reconnect_delay_ms
        );

        let auto_connect = self.options.auto_connect;
        let client = MarketLinkClient {
            inner: Arc::new(ClientInner {
                options: self.options,
                manager,
                registry,
                destroyed: AtomicBool::new(false),
            }),
        };
        if auto_connect {
            client.connect();
        }
        Ok(client)
    }
}

fn duration_ms(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
