//! Quote Gateway Adapter
//!
//! Implements the WebSocket client for the quote gateway: connection
//! lifecycle, heartbeat, linear-backoff reconnection, the JSON wire
//! codec, and the subscribe/unsubscribe protocol.

pub mod client;
pub mod codec;
pub mod heartbeat;
pub mod messages;
pub mod reconnect;

pub use client::{
    ControlCommand, MarketStreamClient, MarketStreamConfig, MarketStreamError, StreamEvent,
};
pub use codec::{CodecError, JsonCodec};
pub use heartbeat::{HeartbeatConfig, HeartbeatEvent, HeartbeatManager, HeartbeatState};
pub use messages::{
    ControlAction, ControlMessage, DepthLevelMessage, DepthMessage, ErrorMessage, GatewayMessage,
    TickMessage,
};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
