//! Per-symbol matching engine
//!
//! Thin wrapper around the order book that owns the cross-cutting
//! concerns of a matching pass: lifecycle events, metrics, and latency
//! accounting. Thread-safe; all synchronization lives in the book.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::{Order, TimeInForce};
use types::time::now_nanos;
use types::trade::Trade;

use crate::book::depth::BookDepth;
use crate::book::order_book::OrderBook;
use crate::events::{EventStore, OrderEvent};
use crate::metrics::MetricsCollector;
use crate::publish::EventPublisher;

pub struct MatchingEngine {
    book: OrderBook,
    metrics: Arc<MetricsCollector>,
    events: RwLock<Option<Arc<dyn EventStore>>>,
    processed: AtomicU64,
}

impl MatchingEngine {
    pub fn new(symbol: Symbol, metrics: Arc<MetricsCollector>) -> Self {
        info!(symbol = %symbol, "Matching engine created");
        Self {
            book: OrderBook::new(symbol, metrics.clone()),
            metrics,
            events: RwLock::new(None),
            processed: AtomicU64::new(0),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        self.book.symbol()
    }

    pub fn set_publisher(&self, publisher: Arc<dyn EventPublisher>) {
        self.book.set_publisher(publisher);
    }

    pub fn set_event_store(&self, store: Arc<dyn EventStore>) {
        *self.events.write() = Some(store);
    }

    /// Run one complete matching pass for an incoming order
    ///
    /// Records the lifecycle events and counters around the book's own
    /// critical section; latency is sampled once per order at the
    /// submission boundary (pool or ring), not here. An all-or-nothing
    /// order that produced no trades was rejected; any other empty result
    /// means the order rested (or, for market orders, was discarded).
    pub fn process_order(&self, order: Order) -> Vec<Trade> {
        let order_id = order.order_id.clone();
        let symbol = order.symbol.clone();
        let all_or_nothing = order.time_in_force == TimeInForce::FOK;

        self.processed.fetch_add(1, Ordering::Relaxed);
        self.metrics.record_order_received();
        self.record_event(OrderEvent::Received {
            order_id: order_id.clone(),
            symbol: symbol.clone(),
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            timestamp: now_nanos(),
        });

        let trades = self.book.match_order(order);

        self.metrics.record_trades(&trades);

        if !trades.is_empty() {
            let filled_quantity = trades
                .iter()
                .fold(Quantity::zero(), |total, trade| total + trade.quantity);
            self.record_event(OrderEvent::Matched {
                order_id,
                symbol,
                trade_count: trades.len(),
                filled_quantity,
                timestamp: now_nanos(),
            });
        } else if all_or_nothing {
            self.record_event(OrderEvent::Rejected {
                order_id,
                symbol,
                reason: "insufficient liquidity".to_string(),
                timestamp: now_nanos(),
            });
        }

        trades
    }

    pub fn cancel_order(&self, order_id: &OrderId) -> bool {
        self.book.cancel_order(order_id)
    }

    pub fn modify_order(
        &self,
        order_id: &OrderId,
        new_price: Option<Price>,
        new_quantity: Option<Quantity>,
    ) -> Option<Order> {
        self.book.modify_order(order_id, new_price, new_quantity)
    }

    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.book.order(order_id)
    }

    pub fn depth_snapshot(&self, depth: usize) -> BookDepth {
        self.book.depth_snapshot(depth)
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.book.best_bid()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.book.best_ask()
    }

    pub fn resting_orders(&self) -> usize {
        self.book.resting_orders()
    }

    /// Orders this engine has run matching passes for
    pub fn processed_orders(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    fn record_event(&self, event: OrderEvent) {
        let store = self.events.read().clone();
        if let Some(store) = store {
            store.append(event);
        }
    }
}
