//! Heartbeat Manager
//!
//! Emits a ping request at a fixed interval while the connection is up.
//! Heartbeating is best-effort: the gateway's replies are recorded for
//! diagnostics but a missing reply does not tear the connection down;
//! transport close/error detection handles dead connections.

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Configuration for heartbeat behavior.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between ping frames.
    pub ping_interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl HeartbeatConfig {
    /// Create a new configuration with a custom interval.
    #[must_use]
    pub const fn new(ping_interval: Duration) -> Self {
        Self { ping_interval }
    }

    /// Create configuration from `WebSocketSettings`.
    #[must_use]
    pub const fn from_websocket_settings(settings: &crate::WebSocketSettings) -> Self {
        Self {
            ping_interval: settings.heartbeat_interval,
        }
    }
}

/// Events emitted by the heartbeat manager.
#[derive(Debug, Clone)]
pub enum HeartbeatEvent {
    /// Request to send a ping frame.
    SendPing,
}

/// Reply bookkeeping shared between the heartbeat task and the message loop.
#[derive(Debug)]
pub struct HeartbeatState {
    last_pong: RwLock<Instant>,
}

impl Default for HeartbeatState {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatState {
    /// Create new heartbeat state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_pong: RwLock::new(Instant::now()),
        }
    }

    /// Record that a heartbeat reply arrived.
    pub fn record_pong(&self) {
        *self.last_pong.write() = Instant::now();
    }

    /// Time since the last recorded reply.
    #[must_use]
    pub fn time_since_pong(&self) -> Duration {
        self.last_pong.read().elapsed()
    }
}

/// Periodic ping scheduler for one connection session.
///
/// Runs until cancelled; each tick asks the owning message loop (via the
/// event channel) to send a ping frame, keeping all socket writes on the
/// loop that owns the sink.
pub struct HeartbeatManager {
    config: HeartbeatConfig,
    event_tx: mpsc::Sender<HeartbeatEvent>,
    cancel: CancellationToken,
}

impl HeartbeatManager {
    /// Create a new heartbeat manager.
    #[must_use]
    pub const fn new(
        config: HeartbeatConfig,
        event_tx: mpsc::Sender<HeartbeatEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            event_tx,
            cancel,
        }
    }

    /// Run the heartbeat loop until cancelled.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.config.ping_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; skip it so the first ping
        // goes out one full interval after connect.
        interval.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("Heartbeat manager cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if self.event_tx.send(HeartbeatEvent::SendPing).await.is_err() {
                        tracing::debug!("Event channel closed, stopping heartbeat");
                        break;
                    }
                }
            }
        }
    }
}
