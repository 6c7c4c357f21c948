//! Price level with a FIFO order queue
//!
//! A price level contains all resting orders at one price point. Orders are
//! maintained in strict FIFO order to enforce time priority: among equal
//! prices, the earlier-submitted order always matches first.

use std::collections::VecDeque;
use types::ids::OrderId;
use types::numeric::Quantity;
use types::order::Order;

/// A price level owning the resting orders at a specific price
///
/// The level owns the orders outright; the book's lookup index only stores
/// their location. `total_quantity` is maintained incrementally so depth
/// aggregation never walks the queue.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// Resting orders in arrival order (front = oldest)
    orders: VecDeque<Order>,
    /// Sum of remaining quantities at this level
    total_quantity: Quantity,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total_quantity: Quantity::zero(),
        }
    }

    /// Append an order at the back of the queue (time priority)
    pub fn push_back(&mut self, order: Order) {
        self.total_quantity = self.total_quantity + order.remaining_quantity;
        self.orders.push_back(order);
    }

    /// Peek at the oldest order without removing it
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Pop the oldest order from the queue
    pub fn pop_front(&mut self) -> Option<Order> {
        let order = self.orders.pop_front()?;
        self.total_quantity = self.total_quantity.saturating_sub(order.remaining_quantity);
        Some(order)
    }

    /// Reduce the oldest order's remaining quantity by a fill
    ///
    /// Returns the order's remaining quantity after the fill.
    pub fn fill_front(&mut self, fill_quantity: Quantity) -> Option<Quantity> {
        let order = self.orders.front_mut()?;
        order.fill(fill_quantity);
        self.total_quantity = self.total_quantity.saturating_sub(fill_quantity);
        Some(order.remaining_quantity)
    }

    /// Remove an order from the queue by ID, wherever it sits
    ///
    /// Returns the removed order, or None if not found.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Order> {
        let position = self
            .orders
            .iter()
            .position(|order| &order.order_id == order_id)?;
        let order = self.orders.remove(position)?;
        self.total_quantity = self.total_quantity.saturating_sub(order.remaining_quantity);
        Some(order)
    }

    /// Reduce an order's remaining quantity in place, preserving its
    /// queue position
    ///
    /// Returns a copy of the updated order, or None if not found.
    pub fn reduce_in_place(
        &mut self,
        order_id: &OrderId,
        new_remaining: Quantity,
    ) -> Option<Order> {
        let order = self
            .orders
            .iter_mut()
            .find(|order| &order.order_id == order_id)?;
        let reduction = order.remaining_quantity.saturating_sub(new_remaining);
        order.fill(reduction);
        self.total_quantity = self.total_quantity.saturating_sub(reduction);
        Some(order.clone())
    }

    /// Get an order by ID
    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| &order.order_id == order_id)
    }

    /// Iterate the orders in time-priority order
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    /// Check if the price level is empty
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Sum of remaining quantities at this level
    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    /// Number of orders at this level
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::{Symbol, UserId};
    use types::numeric::Price;
    use types::order::{Side, TimeInForce};
    use types::time::now_nanos;

    fn resting_order(id: &str, qty: &str) -> Order {
        Order::limit(
            OrderId::from(id),
            UserId::from("user-1"),
            Symbol::new("BTC/USDT"),
            Side::BUY,
            Price::from_u64(50000),
            Quantity::from_str(qty).unwrap(),
            TimeInForce::GTC,
            now_nanos(),
        )
    }

    #[test]
    fn test_push_back_tracks_total() {
        let mut level = PriceLevel::new();
        level.push_back(resting_order("a", "1.5"));
        level.push_back(resting_order("b", "2.5"));

        assert_eq!(level.order_count(), 2);
        assert_eq!(level.total_quantity(), Quantity::from_str("4.0").unwrap());
    }

    #[test]
    fn test_fifo_order_preserved() {
        let mut level = PriceLevel::new();
        level.push_back(resting_order("first", "1.0"));
        level.push_back(resting_order("second", "2.0"));

        assert_eq!(level.front().unwrap().order_id, OrderId::from("first"));
        let popped = level.pop_front().unwrap();
        assert_eq!(popped.order_id, OrderId::from("first"));
        assert_eq!(level.front().unwrap().order_id, OrderId::from("second"));
    }

    #[test]
    fn test_fill_front_partial() {
        let mut level = PriceLevel::new();
        level.push_back(resting_order("a", "5.0"));

        let remaining = level.fill_front(Quantity::from_str("2.0").unwrap());
        assert_eq!(remaining, Some(Quantity::from_str("3.0").unwrap()));
        assert_eq!(level.total_quantity(), Quantity::from_str("3.0").unwrap());
        assert_eq!(level.order_count(), 1);
    }

    #[test]
    fn test_remove_middle_order() {
        let mut level = PriceLevel::new();
        level.push_back(resting_order("a", "1.0"));
        level.push_back(resting_order("b", "2.0"));
        level.push_back(resting_order("c", "3.0"));

        let removed = level.remove(&OrderId::from("b")).unwrap();
        assert_eq!(removed.remaining_quantity, Quantity::from_str("2.0").unwrap());
        assert_eq!(level.order_count(), 2);
        assert_eq!(level.total_quantity(), Quantity::from_str("4.0").unwrap());
        assert!(level.remove(&OrderId::from("missing")).is_none());
    }

    #[test]
    fn test_reduce_in_place_keeps_position() {
        let mut level = PriceLevel::new();
        level.push_back(resting_order("a", "1.0"));
        level.push_back(resting_order("b", "5.0"));

        let updated = level
            .reduce_in_place(&OrderId::from("b"), Quantity::from_str("2.0").unwrap())
            .unwrap();
        assert_eq!(updated.remaining_quantity, Quantity::from_str("2.0").unwrap());

        // "b" is still behind "a"
        let ids: Vec<_> = level.iter().map(|o| o.order_id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(level.total_quantity(), Quantity::from_str("3.0").unwrap());
    }
}
