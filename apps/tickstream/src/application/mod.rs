//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for the market data feed.
pub mod ports;

/// Application services built on the ports.
pub mod services;
