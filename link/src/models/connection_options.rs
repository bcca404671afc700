use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MarketLinkError, Result};

use super::reconnect_policy::{BackoffStrategy, ReconnectPolicy};

/// Opaque key/value metadata attached to the transport handshake
/// (typically a session `token`).
pub type AuthPayload = BTreeMap<String, serde_json::Value>;

/// Client construction options.
///
/// Captured once when the client is built and never mutated afterwards.
/// Field names deserialize from camelCase so the same JSON the web front-end
/// uses (`autoConnect`, `reconnectAttempts`, ...) can be loaded directly.
///
/// # Example
///
/// ```rust
/// use market_link::ClientOptions;
///
/// let options = ClientOptions::new("wss://market.example.com/realtime")
///     .with_auto_connect(false)
///     .with_reconnect_attempts(10)
///     .with_reconnect_delay_ms(1500);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOptions {
    /// Transport endpoint (`http(s)://` or `ws(s)://`).
    pub url: String,

    /// Connect as soon as the client is built.
    /// Default: true
    #[serde(default = "default_true")]
    pub auto_connect: bool,

    /// Reconnect automatically after a network-initiated close.
    /// Default: true
    #[serde(default = "default_true")]
    pub reconnect: bool,

    /// Maximum automatic retries before giving up with an error state.
    /// Default: 5
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    /// Delay between attempts in milliseconds (initial delay for exponential backoff).
    /// Default: 3000
    #[serde(default = "default_reconnect_delay_ms", rename = "reconnectDelay")]
    pub reconnect_delay_ms: u64,

    /// Default: fixed
    #[serde(default)]
    pub backoff: BackoffStrategy,

    /// Cap for exponential backoff in milliseconds.
    /// Default: 30000
    #[serde(default = "default_max_reconnect_delay_ms", rename = "maxReconnectDelay")]
    pub max_reconnect_delay_ms: u64,

    /// Forwarded verbatim to the handshake.
    #[serde(default)]
    pub auth: AuthPayload,
}

fn default_true() -> bool {
    true
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30000
}

impl ClientOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auto_connect: default_true(),
            reconnect: default_true(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            backoff: BackoffStrategy::default(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            auth: AuthPayload::new(),
        }
    }

    /// Parse options from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: ClientOptions = serde_json::from_str(json).map_err(|e| {
            MarketLinkError::ConfigurationError(format!("Invalid client options: {}", e))
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn with_auto_connect(mut self, enabled: bool) -> Self {
        self.auto_connect = enabled;
        self
    }

    pub fn with_reconnect(mut self, enabled: bool) -> Self {
        self.reconnect = enabled;
        self
    }

    pub fn with_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_attempts = attempts;
        self
    }

    pub fn with_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_reconnect_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_reconnect_delay_ms = max_delay_ms;
        self
    }

    /// Add one handshake metadata entry.
    pub fn with_auth_entry(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.auth.insert(key.into(), value.into());
        self
    }

    /// Shorthand for `with_auth_entry("token", token)`.
    pub fn with_auth_token(self, token: impl Into<String>) -> Self {
        self.with_auth_entry("token", token.into())
    }

    /// The immutable reconnect policy derived from these options.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.reconnect_attempts,
            delay: Duration::from_millis(self.reconnect_delay_ms),
            backoff: self.backoff,
            max_delay: Duration::from_millis(self.max_reconnect_delay_ms),
        }
    }

    /// Check that the options can drive a connection.
    ///
    /// The URL itself is fully validated by the transport when it resolves
    /// the endpoint; here we only reject values no transport could use.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(MarketLinkError::ConfigurationError("url must not be empty".to_string()));
        }
        if self.backoff == BackoffStrategy::Exponential
            && self.max_reconnect_delay_ms < self.reconnect_delay_ms
        {
            return Err(MarketLinkError::ConfigurationError(format!(
                "maxReconnectDelay ({}ms) must be >= reconnectDelay ({}ms)",
                self.max_reconnect_delay_ms, self.reconnect_delay_ms
            )));
        }
        Ok(())
    }
}
