//! Engine pool with a dedicated worker runtime
//!
//! A pool owns a fixed-size multi-thread runtime and lazily creates one
//! matching engine per symbol. Submissions are spawned onto the pool's
//! runtime so matching work never runs on the caller's threads; per-symbol
//! serialization comes from the book's own lock.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use types::errors::EngineError;
use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::Order;
use types::trade::Trade;

use crate::book::depth::BookDepth;
use crate::engine::MatchingEngine;
use crate::events::EventStore;
use crate::metrics::MetricsCollector;
use crate::publish::EventPublisher;

pub struct EnginePool {
    name: String,
    /// None after shutdown; submissions then fail fast
    runtime: Mutex<Option<Runtime>>,
    engines: DashMap<Symbol, Arc<MatchingEngine>>,
    metrics: Arc<MetricsCollector>,
    publisher: RwLock<Option<Arc<dyn EventPublisher>>>,
    event_store: RwLock<Option<Arc<dyn EventStore>>>,
}

impl EnginePool {
    /// Create a pool with `worker_threads` dedicated OS threads
    pub fn new(
        name: &str,
        worker_threads: usize,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, EngineError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .thread_name(format!("{name}-worker"))
            .enable_all()
            .build()
            .map_err(|e| EngineError::Pool {
                message: format!("failed to build {name} runtime: {e}"),
            })?;
        info!(pool = name, worker_threads, "Engine pool started");
        Ok(Self {
            name: name.to_string(),
            runtime: Mutex::new(Some(runtime)),
            engines: DashMap::new(),
            metrics,
            publisher: RwLock::new(None),
            event_store: RwLock::new(None),
        })
    }

    /// Get or lazily create the engine for a symbol
    pub fn engine(&self, symbol: &Symbol) -> Arc<MatchingEngine> {
        self.engines
            .entry(symbol.clone())
            .or_insert_with(|| {
                debug!(pool = %self.name, symbol = %symbol, "Creating engine");
                let engine = Arc::new(MatchingEngine::new(symbol.clone(), self.metrics.clone()));
                if let Some(publisher) = self.publisher.read().clone() {
                    engine.set_publisher(publisher);
                }
                if let Some(store) = self.event_store.read().clone() {
                    engine.set_event_store(store);
                }
                engine
            })
            .clone()
    }

    /// Engine for a symbol, without creating one
    pub fn engine_if_exists(&self, symbol: &Symbol) -> Option<Arc<MatchingEngine>> {
        self.engines.get(symbol).map(|entry| entry.clone())
    }

    /// Submit an order onto the pool's runtime and await its trades
    ///
    /// One end-to-end latency sample is recorded per completed order,
    /// covering queue wait plus the matching pass.
    pub async fn process_order(&self, order: Order) -> Result<Vec<Trade>, EngineError> {
        let symbol = order.symbol.clone();
        order.validate()?;
        let engine = self.engine(&symbol);
        let started = Instant::now();

        let handle = {
            let runtime = self.runtime.lock();
            let Some(runtime) = runtime.as_ref() else {
                return Err(EngineError::Shutdown {
                    symbol: symbol.to_string(),
                });
            };
            runtime.spawn(async move { engine.process_order(order) })
        };

        let result = handle.await.map_err(|e| {
            if e.is_cancelled() {
                // The runtime dropped the task before polling it:
                // shutdown won the race with this submission.
                EngineError::Shutdown {
                    symbol: symbol.to_string(),
                }
            } else {
                EngineError::Pool {
                    message: format!("matching task failed: {e}"),
                }
            }
        })?;

        self.metrics
            .record_latency_nanos(started.elapsed().as_nanos() as u64);
        Ok(result)
    }

    /// Cancel a resting order; runs on the caller's thread
    pub fn cancel_order(&self, symbol: &Symbol, order_id: &OrderId) -> bool {
        self.engine_if_exists(symbol)
            .map(|engine| engine.cancel_order(order_id))
            .unwrap_or(false)
    }

    /// Modify a resting order; runs on the caller's thread
    pub fn modify_order(
        &self,
        symbol: &Symbol,
        order_id: &OrderId,
        new_price: Option<Price>,
        new_quantity: Option<Quantity>,
    ) -> Option<Order> {
        self.engine_if_exists(symbol)?
            .modify_order(order_id, new_price, new_quantity)
    }

    pub fn depth_snapshot(&self, symbol: &Symbol, depth: usize) -> Option<BookDepth> {
        self.engine_if_exists(symbol)
            .map(|engine| engine.depth_snapshot(depth))
    }

    /// Inject the publish boundary into current and future engines
    pub fn set_event_publisher(&self, publisher: Arc<dyn EventPublisher>) {
        *self.publisher.write() = Some(publisher.clone());
        for entry in self.engines.iter() {
            entry.value().set_publisher(publisher.clone());
        }
    }

    /// Inject the event store into current and future engines
    pub fn set_event_store(&self, store: Arc<dyn EventStore>) {
        *self.event_store.write() = Some(store.clone());
        for entry in self.engines.iter() {
            entry.value().set_event_store(store.clone());
        }
    }

    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    /// Symbols with an engine in this pool
    pub fn active_pairs(&self) -> Vec<Symbol> {
        self.engines.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Stop accepting submissions and release the runtime
    ///
    /// Tasks already running finish on background threads; queued tasks
    /// that never started are dropped and their callers get a `Shutdown`
    /// error. Idempotent.
    pub fn shutdown(&self) {
        if let Some(runtime) = self.runtime.lock().take() {
            info!(pool = %self.name, "Engine pool shutting down");
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::UserId;
    use types::order::{Side, TimeInForce};
    use types::time::now_nanos;

    fn pool() -> EnginePool {
        EnginePool::new("test", 2, Arc::new(MetricsCollector::new())).unwrap()
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
    async fn test_orders_match_within_symbol() {
        let pool = pool();
        let trades = pool
            .process_order(limit("s", "BTC/USDT", Side::SELL, 100, 5))
            .await
            .unwrap();
        assert!(trades.is_empty());

        let trades = pool
            .process_order(limit("b", "BTC/USDT", Side::BUY, 100, 5))
            .await
            .unwrap();
        assert_eq!(trades.len(), 1);
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_engines_created_per_symbol() {
        let pool = pool();
        pool.process_order(limit("a", "BTC/USDT", Side::BUY, 100, 1))
            .await
            .unwrap();
        pool.process_order(limit("b", "ETH/USDT", Side::BUY, 100, 1))
            .await
            .unwrap();

        assert_eq!(pool.engine_count(), 2);
        assert!(pool.engine_if_exists(&Symbol::new("BTC/USDT")).is_some());
        assert!(pool.engine_if_exists(&Symbol::new("SOL/USDT")).is_none());
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_cancel_routes_to_engine() {
        let pool = pool();
        let symbol = Symbol::new("BTC/USDT");
        pool.process_order(limit("a", "BTC/USDT", Side::BUY, 100, 1))
            .await
            .unwrap();

        assert!(pool.cancel_order(&symbol, &OrderId::from("a")));
        assert!(!pool.cancel_order(&symbol, &OrderId::from("a")));
        assert!(!pool.cancel_order(&Symbol::new("ETH/USDT"), &OrderId::from("a")));
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_one_latency_sample_per_order() {
        let metrics = Arc::new(MetricsCollector::new());
        let pool = EnginePool::new("latency", 2, metrics.clone()).unwrap();

        pool.process_order(limit("s", "BTC/USDT", Side::SELL, 100, 5))
            .await
            .unwrap();
        pool.process_order(limit("b", "BTC/USDT", Side::BUY, 100, 5))
            .await
            .unwrap();

        assert_eq!(metrics.latency_samples(), 2);
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_priceless_limit_rejected() {
        let pool = pool();
        let mut order = limit("a", "BTC/USDT", Side::BUY, 100, 1);
        order.price = None;

        let result = pool.process_order(order).await;
        assert!(matches!(result, Err(EngineError::InvalidOrder { .. })));
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_submission_after_shutdown_fails() {
        let pool = pool();
        pool.shutdown();

        let result = pool
            .process_order(limit("a", "BTC/USDT", Side::BUY, 100, 1))
            .await;
        assert!(matches!(result, Err(EngineError::Shutdown { .. })));
    }
}
