#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Tickstream - Market Data Subscription Client
//!
//! Maintains a single WebSocket connection to a quote gateway, tracks
//! which (symbol, market) streams are wanted and by whom, and fans
//! decoded ticks out to every interested consumer.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core types and fan-out logic
//!   - `market`: Markets, subscription keys, ticks
//!   - `connection`: Connection lifecycle state
//!   - `registry`: Subscription tracking per key
//!   - `dispatch`: Tick fan-out to consumer channels
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: The `MarketDataFeed` consumer-facing interface
//!   - `services`: Latest-tick cache built on the port
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `gateway`: WebSocket client, codec, heartbeat, reconnect policy
//!   - `config`: Environment-based configuration
//!   - `metrics`: Prometheus instrumentation
//!   - `telemetry`: Tracing subscriber setup
//!
//! # Data Flow
//!
//! ```text
//! Quote Gateway WS ──► MarketStreamClient ──► TickDispatcher ──► Consumer 1
//!                        │        ▲                          ├─► Consumer 2
//!                        │        │                          └─► Consumer N
//!                        ▼        │
//!                     JsonCodec  SubscriptionRegistry
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core streaming types with no transport dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::connection::{ConnectionState, StateCell};
pub use domain::dispatch::{DispatchOutcome, TickDispatcher};
pub use domain::market::{
    DepthLevel, Market, MarketDepth, MarketTick, ParseKeyError, ParseMarketError, SubscriptionKey,
};
pub use domain::registry::{
    Deregistration, RegistryStats, Subscription, SubscriptionRegistry, SubscriptionToken,
};

// Application port and services
pub use application::ports::MarketDataFeed;
pub use application::services::TickCache;

// Infrastructure config
pub use infrastructure::config::{
    ChannelSettings, ConfigError, GatewaySettings, StreamConfig, WebSocketSettings,
};

// Gateway client (for integration tests)
pub use infrastructure::gateway::{
    CodecError, ControlAction, ControlMessage, GatewayMessage, JsonCodec, MarketStreamClient,
    MarketStreamConfig, MarketStreamError, ReconnectConfig, ReconnectPolicy, StreamEvent,
    TickMessage,
};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::init as init_telemetry;
