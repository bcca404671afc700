//! Timeout configuration for the WebSocket transport.
//!
//! The reconnect delay is not here: it belongs to the
//! [`ReconnectPolicy`](crate::ReconnectPolicy). These values only govern a
//! single transport session.

use std::time::Duration;

/// Timeouts applied by [`WebSocketTransport`](crate::transport::WebSocketTransport).
///
/// # Examples
///
/// ```rust
/// use market_link::MarketLinkTimeouts;
/// use std::time::Duration;
///
/// let timeouts = MarketLinkTimeouts::default();
///
/// let timeouts = MarketLinkTimeouts::builder()
///     .connection_timeout(Duration::from_secs(30))
///     .keepalive_interval_secs(0)
///     .build();
///
/// let timeouts = MarketLinkTimeouts::fast();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketLinkTimeouts {
    /// Timeout for the TCP + TLS + WebSocket upgrade.
    /// Default: 10 seconds
    pub connection_timeout: Duration,

    /// Idle time after which a Ping is sent.
    /// Set to 0 to disable keep-alive pings.
    /// Default: 25 seconds
    pub keepalive_interval: Duration,

    /// Maximum wait for any frame after a keep-alive Ping. When it expires the
    /// session is treated as lost by the network and the reconnect policy applies.
    /// Set to 0 to disable.
    /// Default: 10 seconds
    pub pong_timeout: Duration,
}

impl Default for MarketLinkTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(25),
            pong_timeout: Duration::from_secs(10),
        }
    }
}

impl MarketLinkTimeouts {
    pub fn builder() -> MarketLinkTimeoutsBuilder {
        MarketLinkTimeoutsBuilder::new()
    }

    /// Short timeouts for localhost development and tests.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            keepalive_interval: Duration::from_secs(5),
            pong_timeout: Duration::from_secs(2),
        }
    }

    /// Long timeouts for high-latency mobile or remote networks.
    pub fn relaxed() -> Self {
        Self {
            connection_timeout: Duration::from_secs(30),
            keepalive_interval: Duration::from_secs(45),
            pong_timeout: Duration::from_secs(20),
        }
    }

    /// Check if a duration represents "no timeout" (zero or very large).
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero() || duration > Duration::from_secs(86400 * 365)
    }
}

/// Builder for custom [`MarketLinkTimeouts`].
#[derive(Debug, Clone)]
pub struct MarketLinkTimeoutsBuilder {
    timeouts: MarketLinkTimeouts,
}

impl MarketLinkTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: MarketLinkTimeouts::default(),
        }
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection_timeout = timeout;
        self
    }

    pub fn connection_timeout_secs(self, secs: u64) -> Self {
        self.connection_timeout(Duration::from_secs(secs))
    }

    /// Set to 0 to disable keepalive pings.
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.timeouts.keepalive_interval = interval;
        self
    }

    pub fn keepalive_interval_secs(self, secs: u64) -> Self {
        self.keepalive_interval(Duration::from_secs(secs))
    }

    /// Set to 0 to disable pong timeout checking.
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.pong_timeout = timeout;
        self
    }

    pub fn pong_timeout_secs(self, secs: u64) -> Self {
        self.pong_timeout(Duration::from_secs(secs))
    }

    pub fn build(self) -> MarketLinkTimeouts {
        self.timeouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = MarketLinkTimeouts::default();
        assert_eq!(timeouts.connection_timeout, Duration::from_secs(10));
        assert_eq!(timeouts.keepalive_interval, Duration::from_secs(25));
        assert_eq!(timeouts.pong_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder() {
        let timeouts = MarketLinkTimeouts::builder()
            .connection_timeout_secs(60)
            .keepalive_interval_secs(0)
            .pong_timeout_secs(3)
            .build();

        assert_eq!(timeouts.connection_timeout, Duration::from_secs(60));
        assert!(timeouts.keepalive_interval.is_zero());
        assert_eq!(timeouts.pong_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_presets_are_ordered() {
        let fast = MarketLinkTimeouts::fast();
        let relaxed = MarketLinkTimeouts::relaxed();
        assert!(fast.connection_timeout < MarketLinkTimeouts::default().connection_timeout);
        assert!(relaxed.connection_timeout > MarketLinkTimeouts::default().connection_timeout);
    }

    #[test]
    fn test_is_no_timeout() {
        assert!(MarketLinkTimeouts::is_no_timeout(Duration::ZERO));
        assert!(!MarketLinkTimeouts::is_no_timeout(Duration::from_secs(1)));
        assert!(MarketLinkTimeouts::is_no_timeout(Duration::from_secs(86400 * 400)));
    }
}
