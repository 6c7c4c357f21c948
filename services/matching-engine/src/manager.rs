//! Pool-based engine manager
//!
//! Routes each order to one of two engine pools based on the pair's
//! classification: a standard pool for the long tail of symbols and a
//! larger pool reserved for high-volume pairs. Both pools share one
//! metrics collector and one pair configuration.

use std::sync::Arc;

use tracing::info;

use types::errors::EngineError;
use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::Order;
use types::trade::Trade;

use crate::book::depth::BookDepth;
use crate::config::PairConfigurationManager;
use crate::engine::MatchingEngine;
use crate::events::EventStore;
use crate::metrics::MetricsCollector;
use crate::pool::EnginePool;
use crate::publish::EventPublisher;

/// Worker threads in the standard pool
pub const STANDARD_POOL_SIZE: usize = 100;
/// Worker threads in the high-volume pool (fewer symbols, each one hot)
pub const HIGH_VOLUME_POOL_SIZE: usize = 50;

pub struct EngineManager {
    standard_pool: EnginePool,
    high_volume_pool: EnginePool,
    config: Arc<PairConfigurationManager>,
}

impl EngineManager {
    pub fn new(
        config: Arc<PairConfigurationManager>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, EngineError> {
        Self::with_pool_sizes(config, metrics, STANDARD_POOL_SIZE, HIGH_VOLUME_POOL_SIZE)
    }

    pub fn with_pool_sizes(
        config: Arc<PairConfigurationManager>,
        metrics: Arc<MetricsCollector>,
        standard_threads: usize,
        high_volume_threads: usize,
    ) -> Result<Self, EngineError> {
        let standard_pool = EnginePool::new("standard", standard_threads, metrics.clone())?;
        let high_volume_pool = EnginePool::new("high-volume", high_volume_threads, metrics)?;
        info!(standard_threads, high_volume_threads, "Engine manager started");
        Ok(Self {
            standard_pool,
            high_volume_pool,
            config,
        })
    }

    fn pool_for(&self, symbol: &Symbol) -> &EnginePool {
        if self.config.is_high_volume(symbol) {
            &self.high_volume_pool
        } else {
            &self.standard_pool
        }
    }

    /// Route an order to its pool and await the matching pass
    pub async fn process_order(&self, order: Order) -> Result<Vec<Trade>, EngineError> {
        self.pool_for(&order.symbol).process_order(order).await
    }

    pub fn cancel_order(&self, symbol: &Symbol, order_id: &OrderId) -> bool {
        self.pool_for(symbol).cancel_order(symbol, order_id)
    }

    pub fn modify_order(
        &self,
        symbol: &Symbol,
        order_id: &OrderId,
        new_price: Option<Price>,
        new_quantity: Option<Quantity>,
    ) -> Option<Order> {
        self.pool_for(symbol)
            .modify_order(symbol, order_id, new_price, new_quantity)
    }

    pub fn depth_snapshot(&self, symbol: &Symbol, depth: usize) -> Option<BookDepth> {
        self.pool_for(symbol).depth_snapshot(symbol, depth)
    }

    /// Engine for a symbol, if one has been created
    pub fn engine_if_exists(&self, symbol: &Symbol) -> Option<Arc<MatchingEngine>> {
        self.pool_for(symbol).engine_if_exists(symbol)
    }

    pub fn set_event_publisher(&self, publisher: Arc<dyn EventPublisher>) {
        self.standard_pool.set_event_publisher(publisher.clone());
        self.high_volume_pool.set_event_publisher(publisher);
    }

    pub fn set_event_store(&self, store: Arc<dyn EventStore>) {
        self.standard_pool.set_event_store(store.clone());
        self.high_volume_pool.set_event_store(store);
    }

    pub fn engine_count(&self) -> usize {
        self.standard_pool.engine_count() + self.high_volume_pool.engine_count()
    }

    /// Symbols with an engine in either pool
    pub fn active_pairs(&self) -> Vec<Symbol> {
        let mut pairs = self.standard_pool.active_pairs();
        pairs.extend(self.high_volume_pool.active_pairs());
        pairs
    }

    /// Shut down both pools. Idempotent.
    pub fn shutdown(&self) {
        self.standard_pool.shutdown();
        self.high_volume_pool.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::UserId;
    use types::order::{Side, TimeInForce};
    use types::time::now_nanos;

    fn manager() -> EngineManager {
        EngineManager::with_pool_sizes(
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
    async fn test_routes_to_standard_pool_by_default() {
        let manager = manager();
        manager
            .process_order(limit("a", "BTC/USDT", Side::BUY, 100, 1))
            .await
            .unwrap();

        assert_eq!(manager.engine_count(), 1);
        manager.shutdown();
    }

    #[tokio::test]
    async fn test_high_volume_pair_uses_other_pool() {
        let config = Arc::new(PairConfigurationManager::new());
        config.mark_high_volume(Symbol::new("BTC/USDT"));
        let manager = EngineManager::with_pool_sizes(
            config,
            Arc::new(MetricsCollector::new()),
            2,
            2,
        )
        .unwrap();

        manager
            .process_order(limit("a", "BTC/USDT", Side::BUY, 100, 1))
            .await
            .unwrap();
        manager
            .process_order(limit("b", "ETH/USDT", Side::BUY, 100, 1))
            .await
            .unwrap();

        // One engine per pool: the pair classification decided the route
        assert_eq!(manager.engine_count(), 2);
        manager.shutdown();
    }

    #[tokio::test]
    async fn test_cancel_and_modify_follow_routing() {
        let manager = manager();
        let symbol = Symbol::new("BTC/USDT");
        manager
            .process_order(limit("a", "BTC/USDT", Side::BUY, 100, 5))
            .await
            .unwrap();

        let modified = manager
            .modify_order(&symbol, &OrderId::from("a"), None, Some(Quantity::from_u64(2)))
            .unwrap();
        assert_eq!(modified.remaining_quantity, Quantity::from_u64(2));

        assert!(manager.cancel_order(&symbol, &OrderId::from("a")));
        manager.shutdown();
    }
}
