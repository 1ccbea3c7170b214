//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern.
//!
//! [`MarketDataFeed`] is the seam between consumers and the connection
//! controller: consumers subscribe and receive ticks through it without
//! knowing anything about the transport underneath.

use crate::domain::connection::ConnectionState;
use crate::domain::market::SubscriptionKey;
use crate::domain::registry::{Subscription, SubscriptionToken};

/// Inbound port exposed to tick consumers.
#[cfg_attr(test, mockall::automock)]
pub trait MarketDataFeed: Send + Sync {
    /// Subscribe a consumer to ticks for `key`.
    ///
    /// Valid in any connection state; delivery starts once the underlying
    /// stream is connected and subscribed.
    fn subscribe(&self, key: SubscriptionKey) -> Subscription;

    /// Cancel the subscription identified by `token`. Idempotent.
    fn unsubscribe(&self, token: SubscriptionToken);

    /// Current state of the underlying connection.
    fn connection_state(&self) -> ConnectionState;
}
