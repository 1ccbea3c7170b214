//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Configuration loading from the environment.
pub mod config;

/// Quote gateway WebSocket client adapter.
pub mod gateway;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Tracing subscriber setup.
pub mod telemetry;
