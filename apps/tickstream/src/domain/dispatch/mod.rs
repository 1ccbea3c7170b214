//! Tick Dispatcher
//!
//! Delivers each decoded tick to every consumer registered for its key.
//!
//! Delivery is a non-blocking channel send: the dispatcher never waits on a
//! consumer, so a slow or departed consumer cannot stall the connection's
//! message loop, and a failed send to one consumer never prevents delivery
//! to the consumers after it.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;

use super::market::MarketTick;
use super::registry::SubscriptionRegistry;

/// Result of dispatching one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Consumers that received the tick.
    pub delivered: usize,
    /// Consumers skipped because their channel was full (slow consumer).
    pub dropped_full: usize,
    /// Consumers skipped because their receiver was dropped.
    pub dropped_closed: usize,
}

impl DispatchOutcome {
    /// Whether any consumer was registered for the tick's key.
    #[must_use]
    pub const fn had_subscribers(&self) -> bool {
        self.delivered + self.dropped_full + self.dropped_closed > 0
    }
}

/// Fans decoded ticks out to the consumers in the registry.
#[derive(Debug, Clone)]
pub struct TickDispatcher {
    registry: Arc<SubscriptionRegistry>,
}

impl TickDispatcher {
    /// Create a dispatcher over `registry`.
    #[must_use]
    pub const fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `tick` to every consumer of its key, in registration order.
    ///
    /// A tick for a key with no subscription is dropped silently (late or
    /// unsolicited message). The consumer set is snapshotted before sending,
    /// so concurrent registration changes never affect an in-flight dispatch.
    pub fn dispatch(&self, tick: &MarketTick) -> DispatchOutcome {
        let senders = self.registry.senders_for(&tick.key());

        let mut outcome = DispatchOutcome::default();
        for sender in senders {
            match sender.try_send(tick.clone()) {
                Ok(()) => outcome.delivered += 1,
                Err(TrySendError::Full(_)) => outcome.dropped_full += 1,
                Err(TrySendError::Closed(_)) => outcome.dropped_closed += 1,
            }
        }

        outcome
    }
}
