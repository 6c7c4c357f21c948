//! Core order book with price-time priority matching
//!
//! One `OrderBook` exists per symbol. All mutating operations (match,
//! cancel, modify) run under a single exclusive critical section, so
//! concurrent submissions to the same symbol serialize and the emitted
//! trade sequence is a valid linearization. Pure reads take the shared
//! side of the lock and return point-in-time copies.
//!
//! Publishing to the external boundary happens after the write lock is
//! released: trade emission and quantity reduction are step-locked,
//! never interleaved with publish-side I/O.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderType, Side, TimeInForce};
use types::time::now_nanos;
use types::trade::Trade;

use super::depth::{BookDepth, DepthLevel};
use super::price_level::PriceLevel;
use crate::metrics::MetricsCollector;
use crate::publish::EventPublisher;

/// Depth broadcast with every book-update publication
const PUBLISH_DEPTH: usize = 50;

/// Both sides of the book plus the order lookup index
///
/// Invariant: every resting order appears in exactly one side's price level
/// AND in the index. The two structures are only ever updated together,
/// under the write lock.
struct BookInner {
    /// Bid levels; best bid = highest price = last key
    bids: BTreeMap<Price, PriceLevel>,
    /// Ask levels; best ask = lowest price = first key
    asks: BTreeMap<Price, PriceLevel>,
    /// OrderId -> (price, side) for O(1) cancel and modify
    index: HashMap<OrderId, (Price, Side)>,
}

impl BookInner {
    fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    fn side_mut(&mut self, side: Side) -> (&mut BTreeMap<Price, PriceLevel>, &mut HashMap<OrderId, (Price, Side)>) {
        match side {
            Side::BUY => (&mut self.bids, &mut self.index),
            Side::SELL => (&mut self.asks, &mut self.index),
        }
    }

    /// Best price on the given side, if any
    fn best_price(&self, side: Side) -> Option<Price> {
        match side {
            Side::BUY => self.bids.keys().next_back().copied(),
            Side::SELL => self.asks.keys().next().copied(),
        }
    }

    /// Insert a resting order at the tail of its price level
    fn add_order(&mut self, order: Order) {
        let Some(price) = order.price else {
            // Market orders never rest; nothing to do for a priceless order.
            return;
        };
        let side = order.side;
        let order_id = order.order_id.clone();
        let (levels, index) = self.side_mut(side);
        levels.entry(price).or_default().push_back(order);
        index.insert(order_id, (price, side));
    }

    /// Remove a resting order from its level and the index
    ///
    /// Returns the removed order, or None if unknown.
    fn remove_order(&mut self, order_id: &OrderId) -> Option<Order> {
        let (price, side) = self.index.remove(order_id)?;
        let (levels, _) = self.side_mut(side);
        let level = levels.get_mut(&price)?;
        let removed = level.remove(order_id);
        if level.is_empty() {
            levels.remove(&price);
        }
        removed
    }
}

/// Per-symbol order book
///
/// Owns all matching invariants: maker-price execution, FIFO time priority,
/// FOK all-or-nothing, and the side/index consistency of resting orders.
pub struct OrderBook {
    symbol: Symbol,
    inner: RwLock<BookInner>,
    /// Monotonic per-symbol trade sequence (first trade gets ID 1)
    trade_seq: AtomicU64,
    /// Injected publish boundary; the book never constructs its own
    publisher: RwLock<Option<Arc<dyn EventPublisher>>>,
    metrics: Arc<MetricsCollector>,
}

impl OrderBook {
    /// Create a new empty order book for the given symbol
    pub fn new(symbol: Symbol, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            symbol,
            inner: RwLock::new(BookInner::new()),
            trade_seq: AtomicU64::new(0),
            publisher: RwLock::new(None),
            metrics,
        }
    }

    /// Get the symbol of this order book
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Inject the publish boundary
    pub fn set_publisher(&self, publisher: Arc<dyn EventPublisher>) {
        *self.publisher.write() = Some(publisher);
    }

    /// Match an incoming order against the book
    ///
    /// Runs the entire pass (FOK pre-check, matching loop, GTC remainder
    /// insertion) under one exclusive critical section, then publishes.
    /// A rejected FOK order returns an empty trade list and leaves the
    /// book untouched.
    pub fn match_order(&self, mut order: Order) -> Vec<Trade> {
        let trades = {
            let mut inner = self.inner.write();

            if order.time_in_force == TimeInForce::FOK
                && !Self::can_fill_completely(&inner, &order)
            {
                self.metrics.record_rejected_order();
                debug!(
                    symbol = %self.symbol,
                    order_id = %order.order_id,
                    "FOK order rejected: insufficient liquidity"
                );
                return Vec::new();
            }

            let mut trades = Vec::new();
            self.match_against_book(&mut inner, &mut order, &mut trades);

            let should_rest = !order.is_filled()
                && order.order_type != OrderType::MARKET
                && order.time_in_force == TimeInForce::GTC;
            if should_rest {
                trace!(
                    symbol = %self.symbol,
                    order_id = %order.order_id,
                    remaining = %order.remaining_quantity,
                    "Resting unfilled remainder"
                );
                inner.add_order(order);
            }

            trades
        };

        self.publish_after_mutation(&trades);
        trades
    }

    /// The matching loop: repeatedly take the best opposite level's oldest
    /// order until the taker is filled, the side is exhausted, or the
    /// taker's limit stops crossing.
    fn match_against_book(
        &self,
        inner: &mut BookInner,
        taker: &mut Order,
        trades: &mut Vec<Trade>,
    ) {
        while !taker.is_filled() {
            let Some(best_price) = inner.best_price(taker.side.opposite()) else {
                break;
            };

            if taker.order_type == OrderType::LIMIT
                && !Self::crosses(taker.side, taker.price, best_price)
            {
                break;
            }

            let (levels, index) = inner.side_mut(taker.side.opposite());
            let Some(level) = levels.get_mut(&best_price) else {
                break;
            };

            let (filled_maker_id, level_empty) = {
                let Some(maker) = level.front() else {
                    // Empty level left behind; clean up and keep matching.
                    levels.remove(&best_price);
                    continue;
                };

                let trade_quantity = taker.remaining_quantity.min(maker.remaining_quantity);
                trades.push(self.build_trade(taker, maker, best_price, trade_quantity));

                taker.fill(trade_quantity);
                let maker_remaining = level
                    .fill_front(trade_quantity)
                    .unwrap_or_else(Quantity::zero);

                if maker_remaining.is_zero() {
                    let filled = level.pop_front().map(|order| order.order_id);
                    (filled, level.is_empty())
                } else {
                    (None, false)
                }
            };

            if let Some(maker_id) = filled_maker_id {
                index.remove(&maker_id);
            }
            if level_empty {
                levels.remove(&best_price);
            }
        }
    }

    /// Whether a limit order crosses the best opposite price
    fn crosses(side: Side, limit: Option<Price>, best_opposite: Price) -> bool {
        match (side, limit) {
            (Side::BUY, Some(limit)) => limit >= best_opposite,
            (Side::SELL, Some(limit)) => limit <= best_opposite,
            // A LIMIT order without a price never crosses.
            (_, None) => false,
        }
    }

    /// Build a trade at the maker's price with role and side attribution
    fn build_trade(
        &self,
        taker: &Order,
        maker: &Order,
        price: Price,
        quantity: Quantity,
    ) -> Trade {
        let trade_id = self.trade_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let taker_is_buyer = taker.side == Side::BUY;

        let (buy_order_id, sell_order_id) = if taker_is_buyer {
            (taker.order_id.clone(), maker.order_id.clone())
        } else {
            (maker.order_id.clone(), taker.order_id.clone())
        };
        let (buyer_user_id, seller_user_id) = if taker_is_buyer {
            (taker.user_id.clone(), maker.user_id.clone())
        } else {
            (maker.user_id.clone(), taker.user_id.clone())
        };

        Trade::new(
            trade_id,
            self.symbol.clone(),
            buy_order_id,
            sell_order_id,
            maker.order_id.clone(),
            taker.order_id.clone(),
            buyer_user_id,
            seller_user_id,
            price,
            quantity,
            now_nanos(),
        )
    }

    /// FOK pre-check: can the opposite side fully satisfy this order within
    /// its price limit?
    fn can_fill_completely(inner: &BookInner, order: &Order) -> bool {
        let mut available = Quantity::zero();

        let levels: Box<dyn Iterator<Item = (&Price, &PriceLevel)>> = match order.side {
            Side::BUY => Box::new(inner.asks.iter()),
            Side::SELL => Box::new(inner.bids.iter().rev()),
        };

        for (price, level) in levels {
            if order.order_type == OrderType::LIMIT
                && !Self::crosses(order.side, order.price, *price)
            {
                break;
            }
            available = available + level.total_quantity();
            if available >= order.remaining_quantity {
                return true;
            }
        }
        false
    }

    /// Cancel a resting order
    ///
    /// O(1) lookup via the index; removes from the price level (and the
    /// level itself if now empty) and the index atomically. Returns false
    /// if the order is unknown.
    pub fn cancel_order(&self, order_id: &OrderId) -> bool {
        let removed = {
            let mut inner = self.inner.write();
            inner.remove_order(order_id).is_some()
        };
        if removed {
            trace!(symbol = %self.symbol, order_id = %order_id, "Order canceled");
            self.publish_after_mutation(&[]);
        }
        removed
    }

    /// Modify a resting order
    ///
    /// A quantity-only reduction at the same price mutates in place and
    /// preserves queue position. Any price change or quantity increase is
    /// a cancel/replace: the order moves to the tail of its new level,
    /// forfeiting time priority. Returns None if the order is unknown.
    pub fn modify_order(
        &self,
        order_id: &OrderId,
        new_price: Option<Price>,
        new_quantity: Option<Quantity>,
    ) -> Option<Order> {
        let result = {
            let mut inner = self.inner.write();

            let (price, side) = *inner.index.get(order_id)?;
            let existing = {
                let (levels, _) = inner.side_mut(side);
                levels.get(&price)?.get(order_id)?.clone()
            };

            let same_price = new_price.is_none() || new_price == existing.price;
            let in_place = match new_quantity {
                Some(quantity) if same_price => quantity <= existing.remaining_quantity,
                _ => false,
            };

            if in_place {
                let target = new_quantity.unwrap_or(existing.remaining_quantity);
                let (levels, _) = inner.side_mut(side);
                levels.get_mut(&price)?.reduce_in_place(order_id, target)
            } else {
                let existing = inner.remove_order(order_id)?;
                let quantity = new_quantity.unwrap_or(existing.quantity);
                let replacement = Order {
                    order_id: existing.order_id.clone(),
                    user_id: existing.user_id.clone(),
                    symbol: existing.symbol.clone(),
                    side: existing.side,
                    order_type: existing.order_type,
                    time_in_force: existing.time_in_force,
                    price: new_price.or(existing.price),
                    quantity,
                    remaining_quantity: quantity,
                    created_at: now_nanos(),
                };
                if !replacement.is_filled() {
                    inner.add_order(replacement.clone());
                }
                Some(replacement)
            }
        };

        if result.is_some() {
            self.publish_after_mutation(&[]);
        }
        result
    }

    /// All resting bids, best price first, FIFO within a level
    pub fn bids(&self) -> Vec<Order> {
        let inner = self.inner.read();
        inner
            .bids
            .iter()
            .rev()
            .flat_map(|(_, level)| level.iter().cloned())
            .collect()
    }

    /// All resting asks, best price first, FIFO within a level
    pub fn asks(&self) -> Vec<Order> {
        let inner = self.inner.read();
        inner
            .asks
            .iter()
            .flat_map(|(_, level)| level.iter().cloned())
            .collect()
    }

    /// Aggregated depth for one side, best price first, up to `depth` levels
    pub fn aggregated_depth(&self, side: Side, depth: usize) -> Vec<DepthLevel> {
        let inner = self.inner.read();
        let levels: Box<dyn Iterator<Item = (&Price, &PriceLevel)>> = match side {
            Side::BUY => Box::new(inner.bids.iter().rev()),
            Side::SELL => Box::new(inner.asks.iter()),
        };
        levels
            .filter(|(_, level)| !level.is_empty())
            .take(depth)
            .map(|(price, level)| DepthLevel {
                price: *price,
                quantity: level.total_quantity(),
                order_count: level.order_count(),
            })
            .collect()
    }

    /// Point-in-time snapshot of both sides
    pub fn depth_snapshot(&self, depth: usize) -> BookDepth {
        BookDepth {
            symbol: self.symbol.clone(),
            timestamp: now_nanos(),
            bids: self.aggregated_depth(Side::BUY, depth),
            asks: self.aggregated_depth(Side::SELL, depth),
        }
    }

    /// Best bid price, if any
    pub fn best_bid(&self) -> Option<Price> {
        self.inner.read().best_price(Side::BUY)
    }

    /// Best ask price, if any
    pub fn best_ask(&self) -> Option<Price> {
        self.inner.read().best_price(Side::SELL)
    }

    /// Look up a resting order by ID
    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        let inner = self.inner.read();
        let (price, side) = *inner.index.get(order_id)?;
        let levels = match side {
            Side::BUY => &inner.bids,
            Side::SELL => &inner.asks,
        };
        levels.get(&price)?.get(order_id).cloned()
    }

    /// Number of resting orders across both sides
    pub fn resting_orders(&self) -> usize {
        self.inner.read().index.len()
    }

    /// Whether the book has no resting orders
    pub fn is_empty(&self) -> bool {
        self.resting_orders() == 0
    }

    /// Invoke the injected publish boundary after a completed mutation
    ///
    /// Runs without any book lock held; the depth snapshot takes the
    /// shared read side only.
    fn publish_after_mutation(&self, trades: &[Trade]) {
        let publisher = self.publisher.read().clone();
        if let Some(publisher) = publisher {
            if !trades.is_empty() {
                publisher.publish_trade_execution(&self.symbol, trades);
            }
            publisher.publish_order_book_update(&self.symbol, &self.depth_snapshot(PUBLISH_DEPTH));
        }
    }
}
