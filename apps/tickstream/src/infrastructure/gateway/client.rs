//! Market Stream Client
//!
//! Owns the WebSocket connection to the quote gateway and everything tied to
//! its lifecycle: connect, heartbeat, linear-backoff reconnect, and the
//! subscribe/unsubscribe protocol traffic driven by the registry.
//!
//! # Lifecycle
//!
//! `Disconnected -> Connecting -> Connected`, and back to `Disconnected` on
//! any transport failure. Each failed session schedules a reconnect with
//! linearly growing delay; once the attempt budget is spent the client
//! returns [`MarketStreamError::MaxReconnectAttemptsExceeded`] and the
//! connection is terminally failed.
//!
//! # Subscriptions
//!
//! Consumers subscribe through [`MarketStreamClient::subscribe`] at any time,
//! connected or not. Protocol frames are only written by the session loop:
//! registration changes while connected enqueue a [`ControlCommand`], and a
//! fresh session discards any stale queued commands before replaying one
//! subscribe per active key.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::codec::{CodecError, JsonCodec};
use super::heartbeat::{HeartbeatConfig, HeartbeatEvent, HeartbeatManager, HeartbeatState};
use super::messages::{ControlAction, ControlMessage, GatewayMessage};
use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::domain::connection::{ConnectionState, StateCell};
use crate::domain::dispatch::TickDispatcher;
use crate::domain::market::{MarketTick, SubscriptionKey};
use crate::domain::registry::{
    Deregistration, Subscription, SubscriptionRegistry, SubscriptionToken,
};
use crate::infrastructure::metrics;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur in the market stream client.
#[derive(Debug, thiserror::Error)]
pub enum MarketStreamError {
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Codec error on an outbound frame.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Maximum reconnection attempts exceeded.
    #[error("maximum reconnection attempts exceeded")]
    MaxReconnectAttemptsExceeded,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,
}

// =============================================================================
// Stream Events
// =============================================================================

/// Lifecycle events emitted by the client.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Successfully connected to the gateway.
    Connected,
    /// Disconnected from the gateway.
    Disconnected,
    /// Reconnecting to the gateway.
    Reconnecting {
        /// Reconnection attempt number.
        attempt: u32,
    },
    /// The gateway acknowledged a subscribe or unsubscribe.
    SubscriptionAck {
        /// Acknowledged action.
        action: ControlAction,
        /// Acknowledged key.
        key: SubscriptionKey,
    },
    /// The gateway reported an error.
    Error(String),
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the market stream client.
#[derive(Debug, Clone)]
pub struct MarketStreamConfig {
    /// Gateway WebSocket URL.
    pub url: String,
    /// Reconnection configuration.
    pub reconnect: ReconnectConfig,
    /// Heartbeat configuration.
    pub heartbeat: HeartbeatConfig,
    /// Capacity of each consumer's tick channel.
    pub consumer_capacity: usize,
}

impl MarketStreamConfig {
    /// Create a new configuration with default reconnect and heartbeat
    /// behavior.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            consumer_capacity: 256,
        }
    }

    /// Create configuration from loaded application settings.
    #[must_use]
    pub fn from_settings(config: &crate::StreamConfig) -> Self {
        Self {
            url: config.gateway.url.clone(),
            reconnect: ReconnectConfig::from_websocket_settings(&config.websocket),
            heartbeat: HeartbeatConfig::from_websocket_settings(&config.websocket),
            consumer_capacity: config.channels.consumer_capacity,
        }
    }
}

// =============================================================================
// Control Commands
// =============================================================================

/// Protocol traffic requested by registration changes, executed by the
/// session loop that owns the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Send a subscribe frame for the key.
    Subscribe(SubscriptionKey),
    /// Send an unsubscribe frame for the key.
    Unsubscribe(SubscriptionKey),
}

// =============================================================================
// Client
// =============================================================================

/// WebSocket client for the quote gateway.
///
/// Manages the connection lifecycle including:
/// - Heartbeat pings
/// - Automatic reconnection with linear backoff
/// - Subscription registry and tick fan-out
pub struct MarketStreamClient {
    config: MarketStreamConfig,
    codec: JsonCodec,
    registry: Arc<SubscriptionRegistry>,
    dispatcher: TickDispatcher,
    state: StateCell,
    event_tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
    command_tx: mpsc::UnboundedSender<ControlCommand>,
    /// Held by the session loop for the lifetime of each connection.
    command_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ControlCommand>>,
}

impl MarketStreamClient {
    /// Create a new client.
    #[must_use]
    pub fn new(
        config: MarketStreamConfig,
        event_tx: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = TickDispatcher::new(Arc::clone(&registry));
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        Self {
            config,
            codec: JsonCodec::new(),
            registry,
            dispatcher,
            state: StateCell::new(),
            event_tx,
            cancel,
            command_tx,
            command_rx: tokio::sync::Mutex::new(command_rx),
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// The subscription registry backing this client.
    #[must_use]
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Subscribe a consumer to ticks for `key`.
    ///
    /// Valid in any connection state. When this is the key's first consumer
    /// and the client is connected, a protocol subscribe is sent; otherwise
    /// the key is picked up by resubscribe-all on the next connect. Further
    /// consumers on an already-subscribed key produce no protocol traffic.
    #[must_use]
    pub fn subscribe(&self, key: SubscriptionKey) -> Subscription {
        tracing::debug!(key = %key, "Registering consumer");

        let (sender, receiver) = mpsc::channel(self.config.consumer_capacity);
        let (token, first_for_key) = self.registry.register(key.clone(), sender);
        self.sync_subscription_gauge();

        if first_for_key && self.state.get() == ConnectionState::Connected {
            let _ = self.command_tx.send(ControlCommand::Subscribe(key));
        }

        Subscription { token, receiver }
    }

    /// Cancel the subscription identified by `token`.
    ///
    /// Idempotent: a stale or unknown token is a no-op. When this removes
    /// the key's last consumer and the client is connected, a protocol
    /// unsubscribe is sent.
    pub fn unsubscribe(&self, token: SubscriptionToken) {
        match self.registry.deregister(token) {
            Deregistration::Removed { key, key_removed } => {
                tracing::debug!(key = %key, key_removed, "Deregistered consumer");
                self.sync_subscription_gauge();

                if key_removed && self.state.get() == ConnectionState::Connected {
                    let _ = self.command_tx.send(ControlCommand::Unsubscribe(key));
                }
            }
            Deregistration::NotFound => {
                tracing::debug!("Ignoring stale subscription token");
            }
        }
    }

    /// Run the client connection loop.
    ///
    /// Connects to the gateway, replays subscriptions, and processes
    /// messages until cancelled or the reconnect budget is spent.
    ///
    /// # Errors
    ///
    /// Returns [`MarketStreamError::MaxReconnectAttemptsExceeded`] once
    /// `max_attempts` consecutive reconnects have failed.
    pub async fn run(self: Arc<Self>) -> Result<(), MarketStreamError> {
        let mut reconnect_policy = ReconnectPolicy::new(self.config.reconnect.clone());

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Market stream client cancelled");
                return Ok(());
            }

            match self.connect_and_run(&mut reconnect_policy).await {
                Ok(()) => {
                    self.state.set(ConnectionState::Disconnected);
                    tracing::info!("Gateway connection closed gracefully");
                    return Ok(());
                }
                Err(e) => {
                    self.state.set(ConnectionState::Disconnected);
                    tracing::warn!(error = %e, "Gateway connection error");

                    let _ = self.event_tx.send(StreamEvent::Disconnected).await;

                    if let Some(delay) = reconnect_policy.next_delay() {
                        let attempt = reconnect_policy.attempt_count();
                        tracing::info!(
                            attempt,
                            delay_ms = delay.as_millis(),
                            "Reconnecting to quote gateway"
                        );
                        metrics::record_reconnect();

                        let _ = self
                            .event_tx
                            .send(StreamEvent::Reconnecting { attempt })
                            .await;

                        tokio::select! {
                            () = self.cancel.cancelled() => {
                                tracing::info!("Cancelled during reconnect delay");
                                return Ok(());
                            }
                            () = tokio::time::sleep(delay) => {}
                        }
                    } else {
                        tracing::error!(
                            max_attempts = self.config.reconnect.max_attempts,
                            "Reconnect attempts exhausted, connection terminally failed"
                        );
                        return Err(MarketStreamError::MaxReconnectAttemptsExceeded);
                    }
                }
            }
        }
    }

    /// Connect to the gateway and run one session until error or
    /// cancellation.
    async fn connect_and_run(
        &self,
        reconnect_policy: &mut ReconnectPolicy,
    ) -> Result<(), MarketStreamError> {
        self.state.set(ConnectionState::Connecting);
        tracing::info!(url = %self.config.url, "Connecting to quote gateway");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(&self.config.url).await?;
        let (mut write, mut read) = ws_stream.split();

        self.state.set(ConnectionState::Connected);
        reconnect_policy.reset();
        tracing::info!("Connected to quote gateway");
        let _ = self.event_tx.send(StreamEvent::Connected).await;

        // Set up heartbeat for this session
        let heartbeat_state = Arc::new(HeartbeatState::new());
        let (heartbeat_tx, mut heartbeat_rx) = mpsc::channel::<HeartbeatEvent>(10);
        let heartbeat_cancel = CancellationToken::new();
        let heartbeat_manager = HeartbeatManager::new(
            self.config.heartbeat.clone(),
            heartbeat_tx,
            heartbeat_cancel.clone(),
        );
        let _heartbeat_handle = tokio::spawn(heartbeat_manager.run());

        let mut commands = self.command_rx.lock().await;

        // Commands queued while disconnected are stale: resubscribe-all
        // below already covers every live key exactly once.
        while commands.try_recv().is_ok() {}

        for key in self.registry.active_keys() {
            self.send_control(&mut write, &ControlMessage::subscribe(&key))
                .await?;
        }

        // Process messages
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    heartbeat_cancel.cancel();
                    return Ok(());
                }
                heartbeat_event = heartbeat_rx.recv() => {
                    if let Some(HeartbeatEvent::SendPing) = heartbeat_event {
                        tracing::trace!(
                            since_last_reply_ms = heartbeat_state.time_since_pong().as_millis(),
                            "Sending heartbeat ping"
                        );
                        self.send_control(&mut write, &ControlMessage::ping()).await?;
                    }
                }
                command = commands.recv() => {
                    let message = match command {
                        Some(ControlCommand::Subscribe(key)) => ControlMessage::subscribe(&key),
                        Some(ControlCommand::Unsubscribe(key)) => ControlMessage::unsubscribe(&key),
                        // The client owns the sender; the channel never closes first.
                        None => continue,
                    };
                    self.send_control(&mut write, &message).await?;
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_frame(text.as_str(), &heartbeat_state).await;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            heartbeat_state.record_pong();
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Gateway sent close frame");
                            heartbeat_cancel.cancel();
                            return Err(MarketStreamError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {
                            // Ignore other message types
                        }
                        Some(Err(e)) => {
                            heartbeat_cancel.cancel();
                            return Err(e.into());
                        }
                        None => {
                            tracing::info!("WebSocket stream ended");
                            heartbeat_cancel.cancel();
                            return Err(MarketStreamError::ConnectionClosed);
                        }
                    }
                }
            }
        }
    }

    /// Handle a text frame from the gateway.
    ///
    /// Frame-level failures never propagate: an undecodable frame is logged
    /// and dropped without touching the connection.
    async fn handle_frame(&self, text: &str, heartbeat_state: &HeartbeatState) {
        let messages = match self.codec.decode(text) {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable gateway frame");
                metrics::record_decode_error();
                return;
            }
        };

        for message in messages {
            match message {
                GatewayMessage::Tick(tick) => {
                    let tick = MarketTick::from(tick);
                    metrics::record_tick_received(tick.market.as_str());

                    let outcome = self.dispatcher.dispatch(&tick);
                    if !outcome.had_subscribers() {
                        tracing::trace!(key = %tick.key(), "Dropping tick with no subscribers");
                    }

                    metrics::record_ticks_delivered(outcome.delivered as u64);
                    if outcome.dropped_full > 0 {
                        metrics::record_ticks_dropped(
                            metrics::DropReason::Full,
                            outcome.dropped_full as u64,
                        );
                    }
                    if outcome.dropped_closed > 0 {
                        metrics::record_ticks_dropped(
                            metrics::DropReason::Closed,
                            outcome.dropped_closed as u64,
                        );
                    }
                }
                GatewayMessage::Control(ctrl) => match ctrl.action {
                    ControlAction::Ping | ControlAction::Pong => {
                        heartbeat_state.record_pong();
                    }
                    ControlAction::Subscribe | ControlAction::Unsubscribe => {
                        if let Some(key) = ctrl.key() {
                            tracing::debug!(
                                action = ctrl.action.as_str(),
                                key = %key,
                                "Subscription acknowledged"
                            );
                            let _ = self
                                .event_tx
                                .send(StreamEvent::SubscriptionAck {
                                    action: ctrl.action,
                                    key,
                                })
                                .await;
                        }
                    }
                },
                GatewayMessage::Error(err) => {
                    tracing::error!(code = err.code, msg = %err.msg, "Gateway error");
                    let _ = self.event_tx.send(StreamEvent::Error(err.msg)).await;
                }
            }
        }
    }

    /// Send a control frame.
    async fn send_control<W>(
        &self,
        write: &mut W,
        message: &ControlMessage,
    ) -> Result<(), MarketStreamError>
    where
        W: SinkExt<Message> + Unpin,
        W::Error: std::fmt::Display,
    {
        let json = self.codec.encode(message)?;

        tracing::debug!(
            action = message.action.as_str(),
            symbol = message.symbol.as_deref(),
            "Sending control frame"
        );

        write.send(Message::Text(json.into())).await.map_err(|e| {
            MarketStreamError::ConnectionFailed(format!(
                "failed to send {} frame: {e}",
                message.action.as_str()
            ))
        })?;

        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn sync_subscription_gauge(&self) {
        metrics::set_active_subscriptions(self.registry.key_count() as f64);
    }
}

impl crate::application::ports::MarketDataFeed for MarketStreamClient {
    fn subscribe(&self, key: SubscriptionKey) -> Subscription {
        Self::subscribe(self, key)
    }

    fn unsubscribe(&self, token: SubscriptionToken) {
        Self::unsubscribe(self, token);
    }

    fn connection_state(&self) -> ConnectionState {
        Self::connection_state(self)
    }
}
