//! Domain layer - Core market data types and subscription logic.

/// Connection lifecycle state.
pub mod connection;

/// Tick fan-out to registered consumers.
pub mod dispatch;

/// Markets, subscription keys, and tick types.
pub mod market;

/// Consumer subscription tracking.
pub mod registry;
