//! Hybrid engine manager
//!
//! Unifies the two execution paths behind one submission surface: pairs
//! configured as high-volume get a dedicated ring buffer engine, all
//! others go through the pool-based manager. Reconfiguration at runtime
//! swaps a pair between paths; resting depth does not migrate, so pairs
//! should be reclassified while their book is empty.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{info, warn};

use types::errors::EngineError;
use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::Order;
use types::trade::Trade;

use crate::book::depth::BookDepth;
use crate::config::PairConfigurationManager;
use crate::events::EventStore;
use crate::manager::EngineManager;
use crate::metrics::MetricsCollector;
use crate::publish::EventPublisher;
use crate::ring::RingBufferEngine;

pub struct HybridEngineManager {
    standard: EngineManager,
    ring_engines: DashMap<Symbol, Arc<RingBufferEngine>>,
    config: Arc<PairConfigurationManager>,
    metrics: Arc<MetricsCollector>,
    publisher: RwLock<Option<Arc<dyn EventPublisher>>>,
    event_store: RwLock<Option<Arc<dyn EventStore>>>,
}

impl HybridEngineManager {
    pub fn new(
        config: Arc<PairConfigurationManager>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, EngineError> {
        let standard = EngineManager::new(config.clone(), metrics.clone())?;
        Ok(Self {
            standard,
            ring_engines: DashMap::new(),
            config,
            metrics,
            publisher: RwLock::new(None),
            event_store: RwLock::new(None),
        })
    }

    /// Manager with explicit pool sizes, mainly for tests
    pub fn with_pool_sizes(
        config: Arc<PairConfigurationManager>,
        metrics: Arc<MetricsCollector>,
        standard_threads: usize,
        high_volume_threads: usize,
    ) -> Result<Self, EngineError> {
        let standard = EngineManager::with_pool_sizes(
            config.clone(),
            metrics.clone(),
            standard_threads,
            high_volume_threads,
        )?;
        Ok(Self {
            standard,
            ring_engines: DashMap::new(),
            config,
            metrics,
            publisher: RwLock::new(None),
            event_store: RwLock::new(None),
        })
    }

    fn ring_engine(&self, symbol: &Symbol) -> Option<Arc<RingBufferEngine>> {
        self.ring_engines.get(symbol).map(|entry| entry.clone())
    }

    /// Route an order to the pair's configured path
    pub async fn process_order(&self, order: Order) -> Result<Vec<Trade>, EngineError> {
        if let Some(ring) = self.ring_engine(&order.symbol) {
            self.metrics.record_engine_use("ring");
            ring.process_order(order).await
        } else {
            self.metrics.record_engine_use("standard");
            self.standard.process_order(order).await
        }
    }

    pub fn cancel_order(&self, symbol: &Symbol, order_id: &OrderId) -> bool {
        if let Some(ring) = self.ring_engine(symbol) {
            ring.cancel_order(order_id)
        } else {
            self.standard.cancel_order(symbol, order_id)
        }
    }

    pub fn modify_order(
        &self,
        symbol: &Symbol,
        order_id: &OrderId,
        new_price: Option<Price>,
        new_quantity: Option<Quantity>,
    ) -> Option<Order> {
        if let Some(ring) = self.ring_engine(symbol) {
            ring.modify_order(order_id, new_price, new_quantity)
        } else {
            self.standard
                .modify_order(symbol, order_id, new_price, new_quantity)
        }
    }

    pub fn depth_snapshot(&self, symbol: &Symbol, depth: usize) -> Option<BookDepth> {
        if let Some(ring) = self.ring_engine(symbol) {
            ring.depth_snapshot(depth)
        } else {
            self.standard.depth_snapshot(symbol, depth)
        }
    }

    pub fn is_high_volume(&self, symbol: &Symbol) -> bool {
        self.ring_engines.contains_key(symbol)
    }

    /// Move a pair onto or off the ring buffer path
    ///
    /// Resting depth does not migrate between paths. Reclassify a pair
    /// only while its book is empty; orders resting on the abandoned path
    /// become unreachable through this manager and are logged as
    /// discarded.
    pub fn configure_high_volume_pair(
        &self,
        symbol: &Symbol,
        high_volume: bool,
    ) -> Result<(), EngineError> {
        if high_volume {
            if self.ring_engines.contains_key(symbol) {
                return Ok(());
            }
            if let Some(engine) = self.standard.engine_if_exists(symbol) {
                let resting = engine.resting_orders();
                if resting > 0 {
                    warn!(
                        symbol = %symbol,
                        resting,
                        "Pair reclassified with resting orders; standard book depth discarded"
                    );
                }
            }

            let ring = Arc::new(RingBufferEngine::new(symbol.clone(), self.metrics.clone())?);
            if let Some(publisher) = self.publisher.read().clone() {
                ring.set_publisher(publisher);
            }
            if let Some(store) = self.event_store.read().clone() {
                ring.set_event_store(store);
            }
            self.ring_engines.insert(symbol.clone(), ring);
            self.config.mark_high_volume(symbol.clone());
            info!(symbol = %symbol, "Pair configured for ring buffer path");
        } else {
            self.config.clear_high_volume(symbol);
            if let Some((_, ring)) = self.ring_engines.remove(symbol) {
                let resting = ring.resting_orders();
                if resting > 0 {
                    warn!(
                        symbol = %symbol,
                        resting,
                        "Pair reclassified with resting orders; ring book depth discarded"
                    );
                }
                ring.shutdown();
                info!(symbol = %symbol, "Pair reverted to standard path");
            }
        }
        Ok(())
    }

    /// Inject the publish boundary into both paths, current and future
    pub fn set_event_publisher(&self, publisher: Arc<dyn EventPublisher>) {
        *self.publisher.write() = Some(publisher.clone());
        self.standard.set_event_publisher(publisher.clone());
        for entry in self.ring_engines.iter() {
            entry.value().set_publisher(publisher.clone());
        }
    }

    pub fn set_event_store(&self, store: Arc<dyn EventStore>) {
        *self.event_store.write() = Some(store.clone());
        self.standard.set_event_store(store.clone());
        for entry in self.ring_engines.iter() {
            entry.value().set_event_store(store.clone());
        }
    }

    /// Every symbol with a live engine on either path
    pub fn active_pairs(&self) -> Vec<Symbol> {
        let mut pairs = self.standard.active_pairs();
        pairs.extend(self.ring_engines.iter().map(|entry| entry.key().clone()));
        pairs
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Shut down every ring engine, then both pools. Idempotent.
    pub fn shutdown(&self) {
        for entry in self.ring_engines.iter() {
            entry.value().shutdown();
        }
        self.ring_engines.clear();
        self.standard.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::UserId;
    use types::order::{Side, TimeInForce};
    use types::time::now_nanos;

    fn hybrid() -> HybridEngineManager {
        HybridEngineManager::with_pool_sizes(
            Arc::new(PairConfigurationManager::new()),
            Arc::new(MetricsCollector::new()),
            2,
            2,
        )
        .unwrap()
    }

    fn limit(id: &str, symbol: &str, side: Side, price: u64, qty: u64) -> Order {
        Order::limit(
            OrderId::from(id),
            UserId::from("user"),
            Symbol::new(symbol),
            side,
            Price::from_u64(price),
            Quantity::from_u64(qty),
            TimeInForce::GTC,
            now_nanos(),
        )
    }

    #[tokio::test]
    async fn test_default_routing_is_standard() {
        let hybrid = hybrid();
        hybrid
            .process_order(limit("a", "BTC/USDT", Side::BUY, 100, 1))
            .await
            .unwrap();

        assert!(!hybrid.is_high_volume(&Symbol::new("BTC/USDT")));
        assert_eq!(hybrid.metrics().engine_usage("standard"), 1);
        assert_eq!(hybrid.metrics().engine_usage("ring"), 0);
        hybrid.shutdown();
    }

    #[tokio::test]
    async fn test_high_volume_pair_routes_to_ring() {
        let hybrid = hybrid();
        let symbol = Symbol::new("BTC/USDT");
        hybrid.configure_high_volume_pair(&symbol, true).unwrap();

        let trades = hybrid
            .process_order(limit("s", "BTC/USDT", Side::SELL, 100, 3))
            .await
            .unwrap();
        assert!(trades.is_empty());
        let trades = hybrid
            .process_order(limit("b", "BTC/USDT", Side::BUY, 100, 3))
            .await
            .unwrap();
        assert_eq!(trades.len(), 1);

        assert!(hybrid.is_high_volume(&symbol));
        assert_eq!(hybrid.metrics().engine_usage("ring"), 2);
        hybrid.shutdown();
    }

    #[tokio::test]
    async fn test_matching_semantics_identical_across_paths() {
        let hybrid = hybrid();
        hybrid
            .configure_high_volume_pair(&Symbol::new("HV/USDT"), true)
            .unwrap();

        for symbol in ["HV/USDT", "STD/USDT"] {
            hybrid
                .process_order(limit(&format!("s-{symbol}"), symbol, Side::SELL, 101, 5))
                .await
                .unwrap();
            let trades = hybrid
                .process_order(limit(&format!("b-{symbol}"), symbol, Side::BUY, 103, 2))
                .await
                .unwrap();

            assert_eq!(trades.len(), 1);
            assert_eq!(trades[0].price, Price::from_u64(101));
            assert_eq!(trades[0].quantity, Quantity::from_u64(2));
        }
        hybrid.shutdown();
    }

    #[tokio::test]
    async fn test_cancel_follows_routing() {
        let hybrid = hybrid();
        let symbol = Symbol::new("BTC/USDT");
        hybrid.configure_high_volume_pair(&symbol, true).unwrap();
        hybrid
            .process_order(limit("a", "BTC/USDT", Side::BUY, 100, 1))
            .await
            .unwrap();

        assert!(hybrid.cancel_order(&symbol, &OrderId::from("a")));
        assert!(!hybrid.cancel_order(&symbol, &OrderId::from("a")));
        hybrid.shutdown();
    }

    #[tokio::test]
    async fn test_reconfigure_back_to_standard() {
        let hybrid = hybrid();
        let symbol = Symbol::new("BTC/USDT");
        hybrid.configure_high_volume_pair(&symbol, true).unwrap();
        hybrid.configure_high_volume_pair(&symbol, false).unwrap();

        assert!(!hybrid.is_high_volume(&symbol));
        hybrid
            .process_order(limit("a", "BTC/USDT", Side::BUY, 100, 1))
            .await
            .unwrap();
        assert_eq!(hybrid.metrics().engine_usage("standard"), 1);
        hybrid.shutdown();
    }

    #[tokio::test]
    async fn test_configure_is_idempotent() {
        let hybrid = hybrid();
        let symbol = Symbol::new("BTC/USDT");
        hybrid.configure_high_volume_pair(&symbol, true).unwrap();
        hybrid.configure_high_volume_pair(&symbol, true).unwrap();
        hybrid.configure_high_volume_pair(&symbol, false).unwrap();
        hybrid.configure_high_volume_pair(&symbol, false).unwrap();

        assert!(!hybrid.is_high_volume(&symbol));
        hybrid.shutdown();
    }
}
