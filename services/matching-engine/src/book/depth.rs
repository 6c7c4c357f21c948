//! Depth snapshot types for the publish boundary
//!
//! Snapshots are point-in-time copies: safe to hand to subscribers without
//! holding any book lock.

use serde::{Deserialize, Serialize};
use types::ids::Symbol;
use types::numeric::{Price, Quantity};

/// One aggregated price level of a depth snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Price,
    /// Sum of remaining quantities at this price
    pub quantity: Quantity,
    /// Number of resting orders at this price
    pub order_count: usize,
}

/// Point-in-time aggregated view of both book sides
///
/// Bids are ordered best-first (price descending), asks best-first
/// (price ascending).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookDepth {
    pub symbol: Symbol,
    pub timestamp: i64, // Unix nanos
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

impl BookDepth {
    /// Best bid price, if any
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|level| level.price)
    }

    /// Best ask price, if any
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|level| level.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_prices() {
        let depth = BookDepth {
            symbol: Symbol::new("BTC/USDT"),
            timestamp: 1708123456789000000,
            bids: vec![DepthLevel {
                price: Price::from_u64(100),
                quantity: Quantity::from_u64(5),
                order_count: 2,
            }],
            asks: vec![],
        };
        assert_eq!(depth.best_bid(), Some(Price::from_u64(100)));
        assert_eq!(depth.best_ask(), None);
    }
}
