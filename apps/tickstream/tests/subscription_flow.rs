//! Subscription and fan-out integration tests.
//!
//! Exercises the registry and dispatcher together through the public API:
//! shared keys, per-consumer isolation, and idempotent cancellation.

use std::sync::Arc;

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tickstream::{
    Deregistration, Market, MarketTick, SubscriptionKey, SubscriptionRegistry, TickDispatcher,
};
use tokio::sync::mpsc;

fn key(symbol: &str, market: Market) -> SubscriptionKey {
    SubscriptionKey::new(symbol, market)
}

fn tick(symbol: &str, market: Market, price: i64) -> MarketTick {
    MarketTick {
        symbol: symbol.to_string(),
        market,
        price: Decimal::new(price, 2),
        change: Decimal::ZERO,
        change_percent: Decimal::ZERO,
        volume: 1_000,
        high: Decimal::new(price, 2),
        low: Decimal::new(price, 2),
        open: Decimal::new(price, 2),
        timestamp: Utc::now(),
        bid: None,
        ask: None,
        depth: None,
    }
}

/// Two dashboard widgets watch AAPL on NASDAQ; each sees every tick, and
/// each stops exactly when its own subscription is cancelled.
#[tokio::test]
async fn shared_key_fan_out_and_independent_cancellation() {
    let registry = Arc::new(SubscriptionRegistry::new());
    let dispatcher = TickDispatcher::new(Arc::clone(&registry));
    let aapl = key("AAPL", Market::Nasdaq);

    let (tx_a, mut rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);

    let (token_a, first_a) = registry.register(aapl.clone(), tx_a);
    let (token_b, first_b) = registry.register(aapl.clone(), tx_b);
    assert!(first_a, "first consumer creates the key");
    assert!(!first_b, "second consumer shares the existing key");
    assert_eq!(registry.consumer_count(&aapl), 2);

    // Both consumers receive the same tick.
    let outcome = dispatcher.dispatch(&tick("AAPL", Market::Nasdaq, 175_20));
    assert_eq!(outcome.delivered, 2);
    assert_eq!(
        rx_a.recv().await.unwrap().price,
        Decimal::new(175_20, 2)
    );
    assert_eq!(
        rx_b.recv().await.unwrap().price,
        Decimal::new(175_20, 2)
    );

    // Cancelling A leaves B's stream intact.
    assert_eq!(
        registry.deregister(token_a),
        Deregistration::Removed {
            key: aapl.clone(),
            key_removed: false,
        }
    );
    let outcome = dispatcher.dispatch(&tick("AAPL", Market::Nasdaq, 175_40));
    assert_eq!(outcome.delivered, 1);
    assert_eq!(
        rx_b.recv().await.unwrap().price,
        Decimal::new(175_40, 2)
    );
    assert!(rx_a.try_recv().is_err());

    // Cancelling B removes the key entirely.
    assert_eq!(
        registry.deregister(token_b),
        Deregistration::Removed {
            key: aapl.clone(),
            key_removed: true,
        }
    );
    assert!(!registry.contains_key(&aapl));

    // Ticks for the now-unsubscribed key vanish silently.
    let outcome = dispatcher.dispatch(&tick("AAPL", Market::Nasdaq, 175_60));
    assert!(!outcome.had_subscribers());
}

#[tokio::test]
async fn ticks_route_only_to_their_own_key() {
    let registry = Arc::new(SubscriptionRegistry::new());
    let dispatcher = TickDispatcher::new(Arc::clone(&registry));

    let (tx_nse, mut rx_nse) = mpsc::channel(8);
    let (tx_nasdaq, mut rx_nasdaq) = mpsc::channel(8);
    registry.register(key("INFY", Market::Nse), tx_nse);
    registry.register(key("INFY", Market::Nasdaq), tx_nasdaq);

    dispatcher.dispatch(&tick("INFY", Market::Nse, 1_500_00));

    let received = rx_nse.recv().await.unwrap();
    assert_eq!(received.market, Market::Nse);
    assert!(rx_nasdaq.try_recv().is_err());
}

#[test]
fn stale_token_cancellation_is_idempotent() {
    let registry = SubscriptionRegistry::new();
    let (tx, _rx) = mpsc::channel(8);
    let (token, _) = registry.register(key("TCS", Market::Nse), tx);

    assert!(matches!(
        registry.deregister(token),
        Deregistration::Removed { .. }
    ));
    assert_eq!(registry.deregister(token), Deregistration::NotFound);
    assert_eq!(registry.deregister(token), Deregistration::NotFound);
}

proptest! {
    /// Under any interleaving of registrations and cancellations, an entry
    /// exists iff it has at least one consumer, and the registry's stats
    /// agree with a straightforward model.
    #[test]
    fn registry_never_holds_empty_entries(ops in prop::collection::vec((0u8..4, any::<bool>()), 1..100)) {
        let symbols = ["AAPL", "MSFT", "TCS", "INFY"];
        let registry = SubscriptionRegistry::new();
        let mut live: Vec<(tickstream::SubscriptionToken, SubscriptionKey)> = Vec::new();

        for (idx, register) in ops {
            let k = key(symbols[idx as usize], Market::Nasdaq);
            if register || live.is_empty() {
                let (tx, _rx) = mpsc::channel(1);
                let (token, first) = registry.register(k.clone(), tx);
                let model_first = !live.iter().any(|(_, lk)| *lk == k);
                prop_assert_eq!(first, model_first);
                live.push((token, k));
            } else {
                let (token, k) = live.swap_remove(idx as usize % live.len());
                let model_last = live.iter().filter(|(_, lk)| *lk == k).count() == 0;
                match registry.deregister(token) {
                    Deregistration::Removed { key: removed, key_removed } => {
                        prop_assert_eq!(removed, k);
                        prop_assert_eq!(key_removed, model_last);
                    }
                    Deregistration::NotFound => prop_assert!(false, "live token reported NotFound"),
                }
            }

            // Entry exists iff >= 1 consumer.
            for symbol in symbols {
                let k = key(symbol, Market::Nasdaq);
                let model_count = live.iter().filter(|(_, lk)| *lk == k).count();
                prop_assert_eq!(registry.consumer_count(&k), model_count);
                prop_assert_eq!(registry.contains_key(&k), model_count > 0);
            }

            let stats = registry.stats();
            prop_assert_eq!(stats.consumer_count, live.len());
            let distinct = {
                let mut keys: Vec<_> = live.iter().map(|(_, lk)| lk.clone()).collect();
                keys.sort_by_key(std::string::ToString::to_string);
                keys.dedup();
                keys.len()
            };
            prop_assert_eq!(stats.key_count, distinct);
            prop_assert_eq!(registry.active_keys().len(), distinct);
        }
    }
}
