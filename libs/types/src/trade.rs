//! Trade execution types
//!
//! A trade is created exactly once per fill event by the order book and is
//! never mutated afterwards. The trade price is always the resting (maker)
//! order's price.

use crate::ids::{OrderId, Symbol, UserId};
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An immutable record of a single fill between a maker and a taker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Monotonic per-symbol trade sequence
    pub trade_id: u64,
    pub symbol: Symbol,

    // Side attribution
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,

    // Role attribution
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,

    pub buyer_user_id: UserId,
    pub seller_user_id: UserId,

    /// Execution price (the maker's price)
    pub price: Price,
    pub quantity: Quantity,

    pub executed_at: i64, // Unix nanos
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trade_id: u64,
        symbol: Symbol,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        maker_order_id: OrderId,
        taker_order_id: OrderId,
        buyer_user_id: UserId,
        seller_user_id: UserId,
        price: Price,
        quantity: Quantity,
        executed_at: i64,
    ) -> Self {
        Self {
            trade_id,
            symbol,
            buy_order_id,
            sell_order_id,
            maker_order_id,
            taker_order_id,
            buyer_user_id,
            seller_user_id,
            price,
            quantity,
            executed_at,
        }
    }

    /// Calculate trade value (price × quantity)
    pub fn trade_value(&self) -> Decimal {
        self.quantity.as_decimal() * self.price.as_decimal()
    }

    /// Whether the buyer was the resting (maker) side
    pub fn is_buyer_maker(&self) -> bool {
        self.buy_order_id == self.maker_order_id
    }
}
