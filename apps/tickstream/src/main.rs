//! Tickstream Binary
//!
//! Starts the market data stream client.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tickstream
//! ```
//!
//! # Environment Variables
//!
//! - `TICKSTREAM_GATEWAY_URL`: Quote gateway WebSocket URL
//! - `TICKSTREAM_WATCHLIST`: Comma-separated keys, e.g. `AAPL.NASDAQ,TCS.NSE`
//! - `TICKSTREAM_HEARTBEAT_INTERVAL_SECS`: Heartbeat interval (default: 30)
//! - `TICKSTREAM_RECONNECT_DELAY_BASE_MS`: Reconnect delay unit (default: 1000)
//! - `TICKSTREAM_RECONNECT_DELAY_MAX_SECS`: Reconnect delay cap (default: 30)
//! - `TICKSTREAM_MAX_RECONNECT_ATTEMPTS`: Reconnect budget, 0 = unlimited (default: 5)
//! - `TICKSTREAM_CONSUMER_CAPACITY`: Per-consumer channel capacity (default: 256)
//! - `TICKSTREAM_EVENT_CAPACITY`: Lifecycle event channel capacity (default: 1024)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use tickstream::infrastructure::gateway::{MarketStreamClient, MarketStreamConfig, StreamEvent};
use tickstream::infrastructure::telemetry;
use tickstream::{StreamConfig, SubscriptionKey, init_metrics};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    telemetry::init();

    tracing::info!("Starting Tickstream");

    let _metrics_handle = init_metrics();

    let config = StreamConfig::from_env()?;
    config.log();

    if config.watchlist.is_empty() {
        tracing::warn!("TICKSTREAM_WATCHLIST is empty, no streams will be subscribed");
    }

    let shutdown_token = CancellationToken::new();

    let (event_tx, event_rx) = mpsc::channel::<StreamEvent>(config.channels.event_capacity);

    let client = Arc::new(MarketStreamClient::new(
        MarketStreamConfig::from_settings(&config),
        event_tx,
        shutdown_token.clone(),
    ));

    tokio::spawn(handle_stream_events(event_rx));

    for key in config.watchlist.clone() {
        let subscription = client.subscribe(key.clone());
        tokio::spawn(log_ticks(key, subscription));
    }

    let run_client = Arc::clone(&client);
    tokio::spawn(async move {
        if let Err(e) = run_client.run().await {
            tracing::error!(error = %e, "Market stream client error");
        }
    });

    tracing::info!("Tickstream ready");

    await_shutdown(shutdown_token).await;

    tracing::info!("Tickstream stopped");
    Ok(())
}

/// Handle lifecycle events from the stream client.
async fn handle_stream_events(mut rx: mpsc::Receiver<StreamEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Connected => {
                tracing::info!("Gateway connected");
            }
            StreamEvent::Disconnected => {
                tracing::warn!("Gateway disconnected");
            }
            StreamEvent::Reconnecting { attempt } => {
                tracing::info!(attempt, "Gateway reconnecting");
            }
            StreamEvent::SubscriptionAck { action, key } => {
                tracing::debug!(action = action.as_str(), key = %key, "Subscription acknowledged");
            }
            StreamEvent::Error(msg) => {
                tracing::error!(error = %msg, "Gateway error");
            }
        }
    }
}

/// Log every tick delivered for a watched key.
async fn log_ticks(key: SubscriptionKey, mut subscription: tickstream::Subscription) {
    while let Some(tick) = subscription.receiver.recv().await {
        tracing::info!(
            key = %key,
            price = %tick.price,
            change_percent = %tick.change_percent,
            volume = tick.volume,
            "Tick"
        );
    }
    tracing::debug!(key = %key, "Tick stream ended");
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
