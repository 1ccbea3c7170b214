//! Stream Configuration Settings
//!
//! Configuration types for the tick stream client, loaded from environment
//! variables.

use std::time::Duration;

use crate::domain::market::{ParseKeyError, SubscriptionKey};

/// Default quote gateway WebSocket URL.
const DEFAULT_GATEWAY_URL: &str = "wss://stream.tickstream.dev/v1/quotes";

/// Quote gateway settings.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Gateway WebSocket URL.
    pub url: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
        }
    }
}

/// WebSocket connection settings.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Heartbeat ping interval.
    pub heartbeat_interval: Duration,
    /// Reconnection delay unit; attempt n waits `reconnect_delay_base * n`.
    pub reconnect_delay_base: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            reconnect_delay_base: Duration::from_secs(1),
            reconnect_delay_max: Duration::from_secs(30),
            max_reconnect_attempts: 5,
        }
    }
}

/// Channel capacity settings.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Capacity of each consumer's tick channel.
    pub consumer_capacity: usize,
    /// Capacity of the lifecycle event channel.
    pub event_capacity: usize,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            consumer_capacity: 256,
            event_capacity: 1024,
        }
    }
}

/// Complete stream client configuration.
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    /// Quote gateway settings.
    pub gateway: GatewaySettings,
    /// WebSocket connection settings.
    pub websocket: WebSocketSettings,
    /// Channel capacity settings.
    pub channels: ChannelSettings,
    /// Keys subscribed at startup.
    pub watchlist: Vec<SubscriptionKey>,
}

impl StreamConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `TICKSTREAM_WATCHLIST` contains an entry that is
    /// not of the form `SYMBOL.MARKET`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let gateway = GatewaySettings {
            url: std::env::var("TICKSTREAM_GATEWAY_URL")
                .unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string()),
        };

        let websocket = WebSocketSettings {
            heartbeat_interval: parse_env_duration_secs(
                "TICKSTREAM_HEARTBEAT_INTERVAL_SECS",
                WebSocketSettings::default().heartbeat_interval,
            ),
            reconnect_delay_base: parse_env_duration_millis(
                "TICKSTREAM_RECONNECT_DELAY_BASE_MS",
                WebSocketSettings::default().reconnect_delay_base,
            ),
            reconnect_delay_max: parse_env_duration_secs(
                "TICKSTREAM_RECONNECT_DELAY_MAX_SECS",
                WebSocketSettings::default().reconnect_delay_max,
            ),
            max_reconnect_attempts: parse_env_u32(
                "TICKSTREAM_MAX_RECONNECT_ATTEMPTS",
                WebSocketSettings::default().max_reconnect_attempts,
            ),
        };

        let channels = ChannelSettings {
            consumer_capacity: parse_env_usize(
                "TICKSTREAM_CONSUMER_CAPACITY",
                ChannelSettings::default().consumer_capacity,
            ),
            event_capacity: parse_env_usize(
                "TICKSTREAM_EVENT_CAPACITY",
                ChannelSettings::default().event_capacity,
            ),
        };

        let watchlist = match std::env::var("TICKSTREAM_WATCHLIST") {
            Ok(raw) => parse_watchlist(&raw)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            gateway,
            websocket,
            channels,
            watchlist,
        })
    }

    /// Log the effective configuration at startup.
    pub fn log(&self) {
        tracing::info!(
            url = %self.gateway.url,
            heartbeat_interval_secs = self.websocket.heartbeat_interval.as_secs(),
            reconnect_delay_base_ms = self.websocket.reconnect_delay_base.as_millis(),
            reconnect_delay_max_secs = self.websocket.reconnect_delay_max.as_secs(),
            max_reconnect_attempts = self.websocket.max_reconnect_attempts,
            consumer_capacity = self.channels.consumer_capacity,
            watchlist_len = self.watchlist.len(),
            "Loaded configuration"
        );
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Watchlist entry is not a valid subscription key.
    #[error("invalid watchlist entry {entry:?}: {source}")]
    InvalidWatchlistEntry {
        /// The offending entry.
        entry: String,
        /// Parse failure detail.
        source: ParseKeyError,
    },
}

/// Parse a comma-separated watchlist like `AAPL.NASDAQ,TCS.NSE`.
fn parse_watchlist(raw: &str) -> Result<Vec<SubscriptionKey>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse()
                .map_err(|source| ConfigError::InvalidWatchlistEntry {
                    entry: entry.to_string(),
                    source,
                })
        })
        .collect()
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
