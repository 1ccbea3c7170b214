//! Subscription Registry
//!
//! Tracks which (symbol, market) streams are wanted and by whom,
//! independent of connection state.
//!
//! # Design
//!
//! Each consumer holds one end of a bounded channel; the registry stores the
//! sender half under the consumer's subscription key, in registration order.
//! Keys are reference counted implicitly by their consumer list: an entry
//! exists if and only if it has at least one consumer, so `active_keys`
//! is exactly the set of streams the gateway must be subscribed to. The
//! `register`/`deregister` return values tell the caller when a key crossed
//! the 0→1 or 1→0 boundary and a protocol message is due.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::market::{MarketTick, SubscriptionKey};

// =============================================================================
// Types
// =============================================================================

/// Sending half of one consumer's tick channel.
pub type ConsumerSender = mpsc::Sender<MarketTick>;

/// Opaque cancel token returned by `register`.
///
/// The only way to release a subscription; dropping the receiver alone
/// leaves the registry entry in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(Uuid);

impl SubscriptionToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A live subscription handed to a consumer: the cancel token plus the
/// receiving end of the tick channel.
#[derive(Debug)]
pub struct Subscription {
    /// Token used to cancel this subscription.
    pub token: SubscriptionToken,
    /// Channel delivering every tick for the subscribed key.
    pub receiver: mpsc::Receiver<MarketTick>,
}

/// Outcome of removing a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deregistration {
    /// Token was stale or unknown; treated as success (idempotent no-op).
    NotFound,
    /// The consumer was removed.
    Removed {
        /// Key the consumer was subscribed to.
        key: SubscriptionKey,
        /// True when this was the key's last consumer and the entry
        /// was deleted; the caller owes the gateway an unsubscribe.
        key_removed: bool,
    },
}

/// Registry statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of distinct active keys.
    pub key_count: usize,
    /// Total consumers across all keys.
    pub consumer_count: usize,
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug)]
struct ConsumerEntry {
    token: SubscriptionToken,
    sender: ConsumerSender,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Consumers per key, in registration order.
    subscriptions: HashMap<SubscriptionKey, Vec<ConsumerEntry>>,
    /// Reverse index for O(1) cancellation.
    tokens: HashMap<SubscriptionToken, SubscriptionKey>,
}

/// Thread-safe map from subscription key to interested consumers.
///
/// Mutation is mutually exclusive with dispatch iteration: dispatch takes a
/// snapshot of the consumer senders under the read lock before sending, so
/// a consumer cancelling mid-dispatch never invalidates the iteration.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    state: RwLock<RegistryState>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer under `key`.
    ///
    /// Returns the cancel token and whether this was the key's first
    /// consumer (the caller owes the gateway a subscribe when connected).
    pub fn register(&self, key: SubscriptionKey, sender: ConsumerSender) -> (SubscriptionToken, bool) {
        let token = SubscriptionToken::new();
        let mut state = self.state.write();

        state.tokens.insert(token, key.clone());

        let entries = state.subscriptions.entry(key).or_default();
        let first_for_key = entries.is_empty();
        entries.push(ConsumerEntry { token, sender });

        (token, first_for_key)
    }

    /// Remove exactly the consumer identified by `token`.
    ///
    /// A stale or unknown token is a no-op, not an error. Other consumers
    /// on the same key are never affected.
    pub fn deregister(&self, token: SubscriptionToken) -> Deregistration {
        let mut state = self.state.write();

        let Some(key) = state.tokens.remove(&token) else {
            return Deregistration::NotFound;
        };

        let Some(entries) = state.subscriptions.get_mut(&key) else {
            return Deregistration::NotFound;
        };

        entries.retain(|e| e.token != token);

        let key_removed = entries.is_empty();
        if key_removed {
            state.subscriptions.remove(&key);
        }

        Deregistration::Removed { key, key_removed }
    }

    /// All keys with at least one consumer.
    ///
    /// Drives resubscribe-all after a reconnect: one protocol subscribe per
    /// returned key, regardless of consumer count.
    #[must_use]
    pub fn active_keys(&self) -> Vec<SubscriptionKey> {
        self.state.read().subscriptions.keys().cloned().collect()
    }

    /// Snapshot of the consumer senders for `key`, in registration order.
    #[must_use]
    pub fn senders_for(&self, key: &SubscriptionKey) -> Vec<ConsumerSender> {
        self.state
            .read()
            .subscriptions
            .get(key)
            .map(|entries| entries.iter().map(|e| e.sender.clone()).collect())
            .unwrap_or_default()
    }

    /// Whether `key` has at least one consumer.
    #[must_use]
    pub fn contains_key(&self, key: &SubscriptionKey) -> bool {
        self.state.read().subscriptions.contains_key(key)
    }

    /// Number of consumers currently registered under `key`.
    #[must_use]
    pub fn consumer_count(&self, key: &SubscriptionKey) -> usize {
        self.state
            .read()
            .subscriptions
            .get(key)
            .map_or(0, Vec::len)
    }

    /// Number of distinct active keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.state.read().subscriptions.len()
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let state = self.state.read();
        RegistryStats {
            key_count: state.subscriptions.len(),
            consumer_count: state.tokens.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Market;

    fn key(symbol: &str) -> SubscriptionKey {
        SubscriptionKey::new(symbol, Market::Nasdaq)
    }

    fn sender() -> ConsumerSender {
        mpsc::channel(8).0
    }

    #[test]
    fn first_consumer_signals_new_key() {
        let registry = SubscriptionRegistry::new();

        let (_, first) = registry.register(key("AAPL"), sender());
        assert!(first);

        let (_, first) = registry.register(key("AAPL"), sender());
        assert!(!first);
    }

    #[test]
    fn last_consumer_removes_key() {
        let registry = SubscriptionRegistry::new();

        let (a, _) = registry.register(key("AAPL"), sender());
        let (b, _) = registry.register(key("AAPL"), sender());

        assert_eq!(
            registry.deregister(a),
            Deregistration::Removed {
                key: key("AAPL"),
                key_removed: false,
            }
        );
        assert!(registry.contains_key(&key("AAPL")));

        assert_eq!(
            registry.deregister(b),
            Deregistration::Removed {
                key: key("AAPL"),
                key_removed: true,
            }
        );
        assert!(!registry.contains_key(&key("AAPL")));
        assert_eq!(registry.key_count(), 0);
    }

    #[test]
    fn stale_token_is_a_noop() {
        let registry = SubscriptionRegistry::new();
        let (token, _) = registry.register(key("AAPL"), sender());

        assert!(matches!(
            registry.deregister(token),
            Deregistration::Removed { .. }
        ));
        // Second cancel with the same token.
        assert_eq!(registry.deregister(token), Deregistration::NotFound);
    }

    #[test]
    fn no_empty_entries_ever() {
        let registry = SubscriptionRegistry::new();

        let (a, _) = registry.register(key("AAPL"), sender());
        let (b, _) = registry.register(key("MSFT"), sender());

        registry.deregister(a);
        registry.deregister(b);

        assert!(registry.active_keys().is_empty());
        assert_eq!(registry.stats(), RegistryStats::default());
    }

    #[test]
    fn senders_preserve_registration_order() {
        let registry = SubscriptionRegistry::new();

        let (tx_a, _rx_a) = mpsc::channel::<MarketTick>(1);
        let (tx_b, _rx_b) = mpsc::channel::<MarketTick>(1);

        registry.register(key("AAPL"), tx_a.clone());
        registry.register(key("AAPL"), tx_b.clone());

        let senders = registry.senders_for(&key("AAPL"));
        assert_eq!(senders.len(), 2);
        assert!(senders[0].same_channel(&tx_a));
        assert!(senders[1].same_channel(&tx_b));
    }

    #[test]
    fn senders_for_unknown_key_is_empty() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.senders_for(&key("AAPL")).is_empty());
    }

    #[test]
    fn same_symbol_different_market_are_distinct_keys() {
        let registry = SubscriptionRegistry::new();

        registry.register(SubscriptionKey::new("INFY", Market::Nse), sender());
        registry.register(SubscriptionKey::new("INFY", Market::Bse), sender());

        assert_eq!(registry.key_count(), 2);
        assert_eq!(
            registry.consumer_count(&SubscriptionKey::new("INFY", Market::Nse)),
            1
        );
    }

    #[test]
    fn stats_count_keys_and_consumers() {
        let registry = SubscriptionRegistry::new();

        registry.register(key("AAPL"), sender());
        registry.register(key("AAPL"), sender());
        registry.register(key("MSFT"), sender());

        let stats = registry.stats();
        assert_eq!(stats.key_count, 2);
        assert_eq!(stats.consumer_count, 3);
    }

    #[test]
    fn thread_safety_concurrent_registration() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(SubscriptionRegistry::new());
        let mut handles = vec![];

        for i in 0..10 {
            let r = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                r.register(key(&format!("SYM{i}")), sender());
                r.register(key("SHARED"), sender());
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = registry.stats();
        assert_eq!(stats.consumer_count, 20);
        // SYM0-SYM9 plus SHARED.
        assert_eq!(stats.key_count, 11);
        assert_eq!(registry.consumer_count(&key("SHARED")), 10);
    }
}
