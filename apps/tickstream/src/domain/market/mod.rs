//! Market Data Types
//!
//! Canonical internal representation of a quote stream: the exchanges we
//! track, the (symbol, market) key identifying one logical stream, and the
//! decoded tick delivered to consumers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Market
// =============================================================================

/// Exchange a symbol trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    /// National Stock Exchange of India.
    Nse,
    /// Bombay Stock Exchange.
    Bse,
    /// NASDAQ.
    Nasdaq,
    /// New York Stock Exchange.
    Nyse,
}

impl Market {
    /// Get the wire name of the market.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Nse => "NSE",
            Self::Bse => "BSE",
            Self::Nasdaq => "NASDAQ",
            Self::Nyse => "NYSE",
        }
    }

    /// Get all supported markets.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Nse, Self::Bse, Self::Nasdaq, Self::Nyse]
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a market name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown market: {0}")]
pub struct ParseMarketError(pub String);

impl FromStr for Market {
    type Err = ParseMarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NSE" => Ok(Self::Nse),
            "BSE" => Ok(Self::Bse),
            "NASDAQ" => Ok(Self::Nasdaq),
            "NYSE" => Ok(Self::Nyse),
            other => Err(ParseMarketError(other.to_string())),
        }
    }
}

// =============================================================================
// Subscription Key
// =============================================================================

/// Identifies one logical quote stream: a symbol on a market.
///
/// Immutable once created. Displayed as `SYMBOL.MARKET`, e.g. `AAPL.NASDAQ`,
/// which is also the accepted [`FromStr`] form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionKey {
    /// Ticker symbol (e.g., "AAPL").
    pub symbol: String,
    /// Market the symbol trades on.
    pub market: Market,
}

impl SubscriptionKey {
    /// Create a new subscription key.
    pub fn new(symbol: impl Into<String>, market: Market) -> Self {
        Self {
            symbol: symbol.into(),
            market,
        }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.symbol, self.market)
    }
}

/// Error parsing a `SYMBOL.MARKET` subscription key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid subscription key (expected SYMBOL.MARKET): {0}")]
pub struct ParseKeyError(pub String);

impl FromStr for SubscriptionKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (symbol, market) = s
            .rsplit_once('.')
            .ok_or_else(|| ParseKeyError(s.to_string()))?;

        if symbol.is_empty() {
            return Err(ParseKeyError(s.to_string()));
        }

        let market = Market::from_str(market).map_err(|_| ParseKeyError(s.to_string()))?;
        Ok(Self::new(symbol, market))
    }
}

// =============================================================================
// Market Tick
// =============================================================================

/// One price level of an order book snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    /// Price at this level.
    pub price: Decimal,
    /// Quantity available at this level.
    pub quantity: u64,
}

/// Order book snapshot attached to a tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDepth {
    /// Bid levels, best first.
    pub bids: Vec<DepthLevel>,
    /// Ask levels, best first.
    pub asks: Vec<DepthLevel>,
}

/// One timestamped market price update for a symbol.
///
/// Produced by the gateway codec on each inbound message and delivered to
/// consumers immediately; the core never retains ticks (callers may cache
/// the latest value themselves, see `application::services::TickCache`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketTick {
    /// Ticker symbol.
    pub symbol: String,
    /// Market the tick came from.
    pub market: Market,
    /// Last traded price.
    pub price: Decimal,
    /// Absolute change since the previous close.
    pub change: Decimal,
    /// Percentage change since the previous close.
    pub change_percent: Decimal,
    /// Cumulative traded volume.
    pub volume: u64,
    /// Session high.
    pub high: Decimal,
    /// Session low.
    pub low: Decimal,
    /// Session open.
    pub open: Decimal,
    /// Exchange timestamp (UTC).
    pub timestamp: DateTime<Utc>,
    /// Best bid, if provided.
    pub bid: Option<Decimal>,
    /// Best ask, if provided.
    pub ask: Option<Decimal>,
    /// Order book snapshot, if provided.
    pub depth: Option<MarketDepth>,
}

impl MarketTick {
    /// The subscription key this tick belongs to.
    #[must_use]
    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey::new(self.symbol.clone(), self.market)
    }
}
