//! Gateway Wire Message Types
//!
//! Wire format for the quote gateway's WebSocket protocol. Frames are JSON
//! text, either a single object or an array of objects, discriminated by a
//! `type` field.
//!
//! # Outbound (control)
//!
//! ```json
//! {"type":"subscribe","symbol":"AAPL","exchange":"NASDAQ","timestamp":"2026-08-23T10:00:00Z"}
//! {"type":"unsubscribe","symbol":"AAPL","exchange":"NASDAQ","timestamp":"..."}
//! {"type":"ping","timestamp":"..."}
//! ```
//!
//! # Inbound
//!
//! Ticks, control echoes (the gateway echoes control frames back, which
//! serve as subscription acks and heartbeat replies), and errors:
//!
//! ```json
//! {"type":"tick","symbol":"AAPL","exchange":"NASDAQ","price":175.20,
//!  "change":0.52,"changePercent":0.30,"volume":48123901,
//!  "high":176.10,"low":173.88,"open":174.00,
//!  "timestamp":"2026-08-23T10:00:00Z","bid":175.19,"ask":175.21}
//! {"type":"error","code":429,"msg":"symbol limit exceeded"}
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market::{DepthLevel, Market, MarketDepth, MarketTick, SubscriptionKey};

// =============================================================================
// Control Messages
// =============================================================================

/// Control frame action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    /// Request ticks for a symbol.
    Subscribe,
    /// Stop ticks for a symbol.
    Unsubscribe,
    /// Heartbeat probe.
    Ping,
    /// Heartbeat reply (inbound only).
    Pong,
}

impl ControlAction {
    /// Get the wire name of the action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }
}

/// Outbound control frame (also received back as an echo).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Frame action.
    #[serde(rename = "type")]
    pub action: ControlAction,

    /// Subject symbol; absent on heartbeat frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    /// Subject market; absent on heartbeat frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<Market>,

    /// Client send time.
    pub timestamp: DateTime<Utc>,
}

impl ControlMessage {
    /// Build a subscribe frame for `key`.
    #[must_use]
    pub fn subscribe(key: &SubscriptionKey) -> Self {
        Self::for_key(ControlAction::Subscribe, key)
    }

    /// Build an unsubscribe frame for `key`.
    #[must_use]
    pub fn unsubscribe(key: &SubscriptionKey) -> Self {
        Self::for_key(ControlAction::Unsubscribe, key)
    }

    /// Build a heartbeat ping frame.
    #[must_use]
    pub fn ping() -> Self {
        Self {
            action: ControlAction::Ping,
            symbol: None,
            exchange: None,
            timestamp: Utc::now(),
        }
    }

    fn for_key(action: ControlAction, key: &SubscriptionKey) -> Self {
        Self {
            action,
            symbol: Some(key.symbol.clone()),
            exchange: Some(key.market),
            timestamp: Utc::now(),
        }
    }

    /// The subscription key named by this frame, when both fields are set.
    #[must_use]
    pub fn key(&self) -> Option<SubscriptionKey> {
        match (&self.symbol, self.exchange) {
            (Some(symbol), Some(market)) => Some(SubscriptionKey::new(symbol.clone(), market)),
            _ => None,
        }
    }
}

// =============================================================================
// Tick Messages
// =============================================================================

/// One order book level on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevelMessage {
    /// Price at this level.
    pub price: Decimal,
    /// Quantity at this level.
    pub quantity: u64,
}

/// Order book snapshot on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthMessage {
    /// Bid levels, best first.
    #[serde(default)]
    pub bids: Vec<DepthLevelMessage>,
    /// Ask levels, best first.
    #[serde(default)]
    pub asks: Vec<DepthLevelMessage>,
}

/// Inbound tick frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickMessage {
    /// Frame type (always "tick").
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Ticker symbol.
    pub symbol: String,

    /// Market the tick came from.
    pub exchange: Market,

    /// Last traded price.
    pub price: Decimal,

    /// Absolute change since the previous close.
    #[serde(default)]
    pub change: Decimal,

    /// Percentage change since the previous close.
    #[serde(default, rename = "changePercent")]
    pub change_percent: Decimal,

    /// Cumulative traded volume.
    #[serde(default)]
    pub volume: u64,

    /// Session high.
    #[serde(default)]
    pub high: Decimal,

    /// Session low.
    #[serde(default)]
    pub low: Decimal,

    /// Session open.
    #[serde(default)]
    pub open: Decimal,

    /// Exchange timestamp.
    pub timestamp: DateTime<Utc>,

    /// Best bid, if the gateway provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<Decimal>,

    /// Best ask, if the gateway provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<Decimal>,

    /// Order book snapshot, if the gateway provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<DepthMessage>,
}

impl From<DepthMessage> for MarketDepth {
    fn from(msg: DepthMessage) -> Self {
        let level = |l: DepthLevelMessage| DepthLevel {
            price: l.price,
            quantity: l.quantity,
        };
        Self {
            bids: msg.bids.into_iter().map(level).collect(),
            asks: msg.asks.into_iter().map(level).collect(),
        }
    }
}

impl From<TickMessage> for MarketTick {
    fn from(msg: TickMessage) -> Self {
        Self {
            symbol: msg.symbol,
            market: msg.exchange,
            price: msg.price,
            change: msg.change,
            change_percent: msg.change_percent,
            volume: msg.volume,
            high: msg.high,
            low: msg.low,
            open: msg.open,
            timestamp: msg.timestamp,
            bid: msg.bid,
            ask: msg.ask,
            depth: msg.depth.map(MarketDepth::from),
        }
    }
}

// =============================================================================
// Error Messages
// =============================================================================

/// Inbound error frame.
///
/// Gateway errors are surfaced to the owning caller as stream events; they
/// never tear the connection down by themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Frame type (always "error").
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Gateway error code.
    pub code: i32,

    /// Error description.
    pub msg: String,
}

// =============================================================================
// Decoded Frame
// =============================================================================

/// Any decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayMessage {
    /// A market tick.
    Tick(TickMessage),
    /// A control echo or heartbeat reply.
    Control(ControlMessage),
    /// A gateway error.
    Error(ErrorMessage),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_frame_shape() {
        let key = SubscriptionKey::new("AAPL", Market::Nasdaq);
        let json = serde_json::to_string(&ControlMessage::subscribe(&key)).unwrap();

        assert!(json.contains(r#""type":"subscribe""#));
        assert!(json.contains(r#""symbol":"AAPL""#));
        assert!(json.contains(r#""exchange":"NASDAQ""#));
        assert!(json.contains(r#""timestamp""#));
    }

    #[test]
    fn ping_frame_omits_symbol_and_exchange() {
        let json = serde_json::to_string(&ControlMessage::ping()).unwrap();

        assert!(json.contains(r#""type":"ping""#));
        assert!(!json.contains("symbol"));
        assert!(!json.contains("exchange"));
    }

    #[test]
    fn control_key_requires_both_fields() {
        let key = SubscriptionKey::new("TCS", Market::Nse);
        assert_eq!(ControlMessage::unsubscribe(&key).key(), Some(key));
        assert_eq!(ControlMessage::ping().key(), None);
    }

    #[test]
    fn tick_deserializes_from_wire_json() {
        let json = r#"{
            "type": "tick",
            "symbol": "AAPL",
            "exchange": "NASDAQ",
            "price": 175.20,
            "change": 0.52,
            "changePercent": 0.30,
            "volume": 48123901,
            "high": 176.10,
            "low": 173.88,
            "open": 174.00,
            "timestamp": "2026-08-23T10:00:00Z",
            "bid": 175.19,
            "ask": 175.21
        }"#;

        let msg: TickMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.symbol, "AAPL");
        assert_eq!(msg.exchange, Market::Nasdaq);
        assert_eq!(msg.price, Decimal::new(175_20, 2));
        assert_eq!(msg.bid, Some(Decimal::new(175_19, 2)));
        assert!(msg.depth.is_none());
    }

    #[test]
    fn tick_optional_fields_default() {
        let json = r#"{
            "type": "tick",
            "symbol": "TCS",
            "exchange": "NSE",
            "price": 3500.00,
            "timestamp": "2026-08-23T10:00:00Z"
        }"#;

        let msg: TickMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.change, Decimal::ZERO);
        assert_eq!(msg.volume, 0);
        assert!(msg.bid.is_none());
    }

    #[test]
    fn tick_with_depth_converts_to_domain() {
        let json = r#"{
            "type": "tick",
            "symbol": "RELIANCE",
            "exchange": "NSE",
            "price": 2900.50,
            "timestamp": "2026-08-23T10:00:00Z",
            "depth": {
                "bids": [{"price": 2900.45, "quantity": 120}],
                "asks": [{"price": 2900.55, "quantity": 80}]
            }
        }"#;

        let msg: TickMessage = serde_json::from_str(json).unwrap();
        let tick = MarketTick::from(msg);

        let depth = tick.depth.as_ref().unwrap();
        assert_eq!(depth.bids.len(), 1);
        assert_eq!(depth.bids[0].quantity, 120);
        assert_eq!(depth.asks[0].price, Decimal::new(2900_55, 2));
        assert_eq!(tick.key(), SubscriptionKey::new("RELIANCE", Market::Nse));
    }

    #[test]
    fn error_frame_round_trip() {
        let msg = ErrorMessage {
            msg_type: "error".to_string(),
            code: 429,
            msg: "symbol limit exceeded".to_string(),
        };

        let json = serde_json::to_string(&msg).unwrap();
        let back: ErrorMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
