//! Tracing Subscriber Setup
//!
//! Configures structured logging with an environment-driven filter.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: standard tracing filter directives; the `tickstream=info`
//!   directive is always appended as a baseline.
//!
//! # Usage
//!
//! ```ignore
//! use tickstream::infrastructure::telemetry;
//!
//! // Initialize once at startup
//! telemetry::init();
//!
//! tracing::info!("ready");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the tracing subscriber.
///
/// # Panics
///
/// Panics if a subscriber has already been installed.
#[allow(clippy::expect_used)]
pub fn init() {
    let env_filter = EnvFilter::from_default_env()
        .add_directive(
            "tickstream=info"
                .parse()
                .expect("static directive 'tickstream=info' is valid"),
        )
        .add_directive(
            "tokio_tungstenite=warn"
                .parse()
                .expect("static directive 'tokio_tungstenite=warn' is valid"),
        )
        .add_directive(
            "tungstenite=warn"
                .parse()
                .expect("static directive 'tungstenite=warn' is valid"),
        );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
