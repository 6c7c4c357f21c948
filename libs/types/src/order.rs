//! Order lifecycle types
//!
//! An order is created by the caller, submitted to the matching core, and
//! from acceptance onward is owned exclusively by one order book. The only
//! mutation the book performs is quantity reduction during a matching pass.

use crate::errors::EngineError;
use crate::ids::{OrderId, Symbol, UserId};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Execute at the given price or better; remainder may rest
    LIMIT,
    /// Execute against the best available prices; never rests
    MARKET,
}

/// Time-in-force policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good-Till-Cancel: unfilled remainder rests in the book
    #[default]
    GTC,
    /// Fill-Or-Kill: complete immediate fill or full rejection
    FOK,
}

/// An order submitted to the matching core
///
/// `price` is absent for MARKET orders. Invariant:
/// `0 <= remaining_quantity <= quantity`, and the order is filled exactly
/// when `remaining_quantity` is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub price: Option<Price>,
    pub quantity: Quantity,
    pub remaining_quantity: Quantity,
    pub created_at: i64, // Unix nanos
}

impl Order {
    /// Create a new limit order
    #[allow(clippy::too_many_arguments)]
    pub fn limit(
        order_id: OrderId,
        user_id: UserId,
        symbol: Symbol,
        side: Side,
        price: Price,
        quantity: Quantity,
        time_in_force: TimeInForce,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id,
            user_id,
            symbol,
            side,
            order_type: OrderType::LIMIT,
            time_in_force,
            price: Some(price),
            quantity,
            remaining_quantity: quantity,
            created_at: timestamp,
        }
    }

    /// Create a new market order
    pub fn market(
        order_id: OrderId,
        user_id: UserId,
        symbol: Symbol,
        side: Side,
        quantity: Quantity,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id,
            user_id,
            symbol,
            side,
            order_type: OrderType::MARKET,
            time_in_force: TimeInForce::GTC,
            price: None,
            quantity,
            remaining_quantity: quantity,
            created_at: timestamp,
        }
    }

    /// Validate structural invariants before submission
    ///
    /// The constructors cannot produce an invalid order, but orders also
    /// arrive deserialized from upstream systems.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.order_type == OrderType::LIMIT && self.price.is_none() {
            return Err(EngineError::InvalidOrder {
                reason: "LIMIT order requires a price".to_string(),
            });
        }
        if self.quantity.is_zero() {
            return Err(EngineError::InvalidOrder {
                reason: "quantity must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Check if the order is completely filled
    pub fn is_filled(&self) -> bool {
        self.remaining_quantity.is_zero()
    }

    /// Quantity filled so far
    pub fn filled_quantity(&self) -> Quantity {
        self.quantity - self.remaining_quantity
    }

    /// Check quantity invariant: 0 <= remaining <= total
    pub fn check_invariant(&self) -> bool {
        self.remaining_quantity <= self.quantity
    }

    /// Reduce the remaining quantity by a fill
    ///
    /// # Panics
    /// Panics if the fill exceeds the remaining quantity
    pub fn fill(&mut self, fill_quantity: Quantity) {
        assert!(
            fill_quantity <= self.remaining_quantity,
            "Fill would exceed remaining quantity"
        );
        self.remaining_quantity = self.remaining_quantity - fill_quantity;

        debug_assert!(self.check_invariant(), "Invariant violated after fill");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now_nanos;

    fn limit_order(side: Side, price: u64, qty: &str) -> Order {
        Order::limit(
            OrderId::new(),
            UserId::new(),
            Symbol::new("BTC/USDT"),
            side,
            Price::from_u64(price),
            Quantity::from_str(qty).unwrap(),
            TimeInForce::GTC,
            now_nanos(),
        )
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::BUY.opposite(), Side::SELL);
        assert_eq!(Side::SELL.opposite(), Side::BUY);
    }

    #[test]
    fn test_time_in_force_default() {
        assert_eq!(TimeInForce::default(), TimeInForce::GTC);
    }

    #[test]
    fn test_limit_order_creation() {
        let order = limit_order(Side::BUY, 50000, "1.0");
        assert_eq!(order.order_type, OrderType::LIMIT);
        assert_eq!(order.price, Some(Price::from_u64(50000)));
        assert_eq!(order.remaining_quantity, order.quantity);
        assert!(!order.is_filled());
        assert!(order.check_invariant());
    }

    #[test]
    fn test_market_order_has_no_price() {
        let order = Order::market(
            OrderId::new(),
            UserId::new(),
            Symbol::new("BTC/USDT"),
            Side::SELL,
            Quantity::from_str("2.5").unwrap(),
            now_nanos(),
        );
        assert_eq!(order.order_type, OrderType::MARKET);
        assert_eq!(order.price, None);
    }

    #[test]
    fn test_validate_rejects_priceless_limit() {
        let mut order = limit_order(Side::BUY, 50000, "1.0");
        assert!(order.validate().is_ok());

        order.price = None;
        assert!(matches!(
            order.validate(),
            Err(EngineError::InvalidOrder { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let mut order = limit_order(Side::BUY, 50000, "1.0");
        order.quantity = Quantity::zero();
        order.remaining_quantity = Quantity::zero();
        assert!(matches!(
            order.validate(),
            Err(EngineError::InvalidOrder { .. })
        ));
    }

    #[test]
    fn test_order_fill() {
        let mut order = limit_order(Side::BUY, 50000, "1.0");

        order.fill(Quantity::from_str("0.3").unwrap());
        assert_eq!(order.remaining_quantity, Quantity::from_str("0.7").unwrap());
        assert_eq!(order.filled_quantity(), Quantity::from_str("0.3").unwrap());
        assert!(!order.is_filled());

        order.fill(Quantity::from_str("0.7").unwrap());
        assert!(order.is_filled());
        assert!(order.check_invariant());
    }

    #[test]
    #[should_panic(expected = "Fill would exceed remaining quantity")]
    fn test_order_overfill_panics() {
        let mut order = limit_order(Side::BUY, 50000, "1.0");
        order.fill(Quantity::from_str("1.5").unwrap());
    }

    #[test]
    fn test_order_serialization() {
        let order = limit_order(Side::SELL, 3000, "2.5");
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();

        assert_eq!(order.order_id, deserialized.order_id);
        assert_eq!(order.side, deserialized.side);
        assert_eq!(order.price, deserialized.price);
    }
}
