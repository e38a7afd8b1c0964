//! Bridge configuration types.
//!
//! [`BridgeConfig`] names the two loopback ports, the reconnect policy of
//! every outbound link and the fetch deadline.  A [`Bridge`] takes it by
//! value at start and only reads it afterwards.
//!
//! Ephemeral fetch links get the same [`ReconnectPolicy`] as the long-lived
//! link; only the deadline is specific to fetches.
//!
//! [`Bridge`]: crate::Bridge

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default delay between two reconnect attempts of an outbound link.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(3000);

/// Default number of reconnect attempts before a link gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default deadline for a `fetch_var` exchange.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(5000);

/// Fixed-delay reconnect policy shared by every outbound link.
///
/// There is deliberately no back-off: each retry waits exactly
/// `retry_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Maximum number of reconnect attempts between two successful opens.
    pub max_attempts: u32,
    /// Delay before each reconnect attempt.
    pub retry_interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// All runtime configuration for the bridge.
///
/// # Example
///
/// ```rust
/// use editor_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::new("my-app", 9001, 9002);
/// assert_eq!(cfg.outbound_url(), "ws://127.0.0.1:9002");
/// assert_eq!(cfg.max_attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Name of the embedding application; attached to every log event.
    pub app_name: String,

    /// Local port the inbound listener binds on `127.0.0.1`.
    ///
    /// Port `0` asks the OS for a free port; the bound address is available
    /// from `Bridge::local_addr`.
    pub inbound_port: u16,

    /// Loopback port of the editor peer the outbound links dial.
    pub outbound_port: u16,

    /// Delay between reconnect attempts of an outbound link.
    pub retry_interval: Duration,

    /// Reconnect attempts allowed before a link becomes `Exhausted`.
    pub max_attempts: u32,

    /// Deadline for one `fetch_var` exchange, dial included.
    pub fetch_timeout: Duration,
}

impl BridgeConfig {
    /// Builds a config with the default retry interval, attempt budget and
    /// fetch deadline.
    pub fn new(app_name: impl Into<String>, inbound_port: u16, outbound_port: u16) -> Self {
        Self {
            app_name: app_name.into(),
            inbound_port,
            outbound_port,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Address the inbound listener binds. Always loopback.
    pub fn inbound_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.inbound_port))
    }

    /// URL every outbound link dials.
    pub fn outbound_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.outbound_port)
    }

    /// The reconnect policy derived from `max_attempts` and `retry_interval`.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.max_attempts,
            retry_interval: self.retry_interval,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_applies_default_retry_interval() {
        // Arrange / Act
        let cfg = BridgeConfig::new("app", 1, 2);
        // Assert
        assert_eq!(cfg.retry_interval, Duration::from_millis(3000));
    }

    #[test]
    fn test_new_applies_default_max_attempts() {
        let cfg = BridgeConfig::new("app", 1, 2);
        assert_eq!(cfg.max_attempts, 5);
    }

    #[test]
    fn test_new_applies_default_fetch_timeout() {
        let cfg = BridgeConfig::new("app", 1, 2);
        assert_eq!(cfg.fetch_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_inbound_addr_is_loopback() {
        let cfg = BridgeConfig::new("app", 8123, 2);
        assert_eq!(cfg.inbound_addr().to_string(), "127.0.0.1:8123");
    }

    #[test]
    fn test_outbound_url_targets_loopback_port() {
        let cfg = BridgeConfig::new("app", 1, 40123);
        assert_eq!(cfg.outbound_url(), "ws://127.0.0.1:40123");
    }

    #[test]
    fn test_reconnect_policy_mirrors_config_fields() {
        // Arrange
        let mut cfg = BridgeConfig::new("app", 1, 2);
        cfg.max_attempts = 2;
        cfg.retry_interval = Duration::from_millis(10);

        // Act
        let policy = cfg.reconnect_policy();

        // Assert
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.retry_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_default_policy_matches_config_defaults() {
        let cfg = BridgeConfig::new("app", 1, 2);
        assert_eq!(cfg.reconnect_policy(), ReconnectPolicy::default());
    }
}
