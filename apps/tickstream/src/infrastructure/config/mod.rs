//! Configuration Module
//!
//! Configuration loading for the stream client.

mod settings;

pub use settings::{
    ChannelSettings, ConfigError, GatewaySettings, StreamConfig, WebSocketSettings,
};
