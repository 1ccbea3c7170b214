//! Application Services
//!
//! Services that orchestrate domain logic over the ports.
//!
//! [`TickCache`] keeps the latest tick per subscription key for callers
//! that want current-value reads instead of a stream. The core pipeline
//! never retains ticks; this cache is strictly a consumer.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use super::ports::MarketDataFeed;
use crate::domain::market::{MarketTick, SubscriptionKey};
use crate::domain::registry::SubscriptionToken;

/// Latest-tick-per-key cache fed by a [`MarketDataFeed`].
///
/// Each watched key gets its own consumer task that drains the
/// subscription channel into the shared map. Tasks stop on cancellation
/// or when the feed closes their channel.
#[derive(Debug, Clone)]
pub struct TickCache {
    latest: Arc<RwLock<HashMap<SubscriptionKey, MarketTick>>>,
    cancel: CancellationToken,
}

impl TickCache {
    /// Create an empty cache whose watch tasks stop when `cancel` fires.
    #[must_use]
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            latest: Arc::new(RwLock::new(HashMap::new())),
            cancel,
        }
    }

    /// Start caching ticks for `key`.
    ///
    /// Subscribes through `feed` and spawns a task that keeps the latest
    /// tick. Returns the subscription token; pass it back to the feed's
    /// `unsubscribe` to stop the stream (the watch task then drains out
    /// and exits).
    pub fn watch(&self, feed: &dyn MarketDataFeed, key: SubscriptionKey) -> SubscriptionToken {
        let mut subscription = feed.subscribe(key.clone());
        let token = subscription.token;

        let latest = Arc::clone(&self.latest);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    tick = subscription.receiver.recv() => {
                        let Some(tick) = tick else { break };
                        latest.write().insert(tick.key(), tick);
                    }
                }
            }
            tracing::debug!(key = %key, "Tick cache watch stopped");
        });

        token
    }

    /// The most recent tick seen for `key`, if any.
    #[must_use]
    pub fn latest(&self, key: &SubscriptionKey) -> Option<MarketTick> {
        self.latest.read().get(key).cloned()
    }

    /// Number of keys with a cached tick.
    #[must_use]
    pub fn len(&self) -> usize {
        self.latest.read().len()
    }

    /// Whether no ticks have been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.latest.read().is_empty()
    }
}
